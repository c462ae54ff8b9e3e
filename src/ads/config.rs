//! Ad unit credentials and inventory behaviour.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{AdKind, AdTypes, RetryPolicy};

/// Vendor test unit for interstitials.
pub const TEST_INTERSTITIAL_UNIT: &str = "ca-app-pub-3940256099942544/1033173712";
/// Vendor test unit for rewarded ads.
pub const TEST_REWARDED_UNIT: &str = "ca-app-pub-3940256099942544/5224354917";
/// Vendor test unit for banners.
pub const TEST_BANNER_UNIT: &str = "ca-app-pub-3940256099942544/2934735716";
/// Vendor test unit for app-open ads.
pub const TEST_APP_OPEN_UNIT: &str = "ca-app-pub-3940256099942544/9257395921";

/// Ads configuration.
///
/// An empty unit id disables that kind: it is never loaded and is left out
/// of composite readiness waits. Debug mode ignores the configured ids and
/// uses the vendor test units for every kind, so nothing is disabled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdsConfig {
    /// Interstitial unit id.
    pub interstitial_unit: String,
    /// Rewarded unit id.
    pub rewarded_unit: String,
    /// Banner unit id.
    pub banner_unit: String,
    /// App-open unit id.
    pub app_open_unit: String,
    /// Consecutive failed loads retried per kind.
    pub max_retry_attempts: u32,
    /// Kinds the Ads integration waits for before reporting ready.
    pub await_types: AdTypes,
    /// Budget for that wait.
    pub await_timeout: Duration,
    /// Use the vendor's test unit for every kind, configured or not.
    pub debug: bool,
}

impl Default for AdsConfig {
    fn default() -> Self {
        Self {
            interstitial_unit: String::new(),
            rewarded_unit: String::new(),
            banner_unit: String::new(),
            app_open_unit: String::new(),
            max_retry_attempts: 2,
            await_types: AdTypes::NONE,
            await_timeout: Duration::from_secs(10),
            debug: false,
        }
    }
}

impl AdsConfig {
    /// Sets the unit id for `kind`.
    #[must_use]
    pub fn with_unit(mut self, kind: AdKind, unit_id: impl Into<String>) -> Self {
        let unit_id = unit_id.into();
        match kind {
            AdKind::Interstitial => self.interstitial_unit = unit_id,
            AdKind::Rewarded => self.rewarded_unit = unit_id,
            AdKind::AppOpen => self.app_open_unit = unit_id,
        }
        self
    }

    /// Sets the banner unit id.
    #[must_use]
    pub fn with_banner_unit(mut self, unit_id: impl Into<String>) -> Self {
        self.banner_unit = unit_id.into();
        self
    }

    /// Makes the Ads integration wait for `types` (bounded by `timeout`)
    /// before reporting ready.
    #[must_use]
    pub const fn with_await(mut self, types: AdTypes, timeout: Duration) -> Self {
        self.await_types = types;
        self.await_timeout = timeout;
        self
    }

    /// Sets the retry budget.
    #[must_use]
    pub const fn with_max_retry_attempts(mut self, attempts: u32) -> Self {
        self.max_retry_attempts = attempts;
        self
    }

    /// Enables or disables debug units.
    #[must_use]
    pub const fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Effective unit id for `kind`. In debug mode every kind resolves to
    /// the vendor test unit.
    #[must_use]
    pub fn unit_for(&self, kind: AdKind) -> &str {
        let (configured, test) = match kind {
            AdKind::Interstitial => (&self.interstitial_unit, TEST_INTERSTITIAL_UNIT),
            AdKind::Rewarded => (&self.rewarded_unit, TEST_REWARDED_UNIT),
            AdKind::AppOpen => (&self.app_open_unit, TEST_APP_OPEN_UNIT),
        };
        if self.debug { test } else { configured }
    }

    /// Effective banner unit id.
    #[must_use]
    pub fn banner_unit(&self) -> &str {
        if self.debug {
            TEST_BANNER_UNIT
        } else {
            &self.banner_unit
        }
    }

    /// Kinds with a non-empty unit id.
    #[must_use]
    pub fn configured_kinds(&self) -> AdTypes {
        AdKind::ALL
            .into_iter()
            .filter(|kind| !self.unit_for(*kind).is_empty())
            .collect()
    }

    /// Retry policy derived from `max_retry_attempts`.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::default().with_max_attempts(self.max_retry_attempts)
    }
}
