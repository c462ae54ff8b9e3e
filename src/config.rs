//! Hub configuration loaded from environment variables.
//!
//! All settings come from environment variables (or a `.env` file via
//! `dotenvy`). Unit ids are credentials: an empty one disables that ad
//! kind.
//!
//! | Key | Default |
//! |---|---|
//! | `HUB_READY_TIMEOUT_SECS` | `10` |
//! | `ADS_INTERSTITIAL_UNIT` | `""` |
//! | `ADS_REWARDED_UNIT` | `""` |
//! | `ADS_BANNER_UNIT` | `""` |
//! | `ADS_APP_OPEN_UNIT` | `""` |
//! | `ADS_MAX_RETRY_ATTEMPTS` | `2` |
//! | `ADS_AWAIT_TYPES` | `""` |
//! | `ADS_AWAIT_TIMEOUT_SECS` | `10` |
//! | `ADS_DEBUG` | `false` |

use std::time::Duration;

use crate::ads::{AdTypes, AdsConfig};
use crate::error::HubError;

/// Top-level hub configuration.
///
/// Loaded once at startup via [`HubConfig::from_env`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HubConfig {
    /// Budget for the host's wait on the readiness barrier.
    pub ready_timeout: Duration,

    /// Ads integration settings.
    pub ads: AdsConfig,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            ready_timeout: Duration::from_secs(10),
            ads: AdsConfig::default(),
        }
    }
}

impl HubConfig {
    /// Loads configuration from environment variables.
    ///
    /// Falls back to defaults when a variable is unset or unparsable.
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::InvalidConfig`] if `ADS_AWAIT_TYPES` names an
    /// unknown ad kind.
    pub fn from_env() -> Result<Self, HubError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Same as [`HubConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, HubError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);

        let await_types: AdTypes = env.string("ADS_AWAIT_TYPES").parse()?;
        let ads = AdsConfig {
            interstitial_unit: env.string("ADS_INTERSTITIAL_UNIT"),
            rewarded_unit: env.string("ADS_REWARDED_UNIT"),
            banner_unit: env.string("ADS_BANNER_UNIT"),
            app_open_unit: env.string("ADS_APP_OPEN_UNIT"),
            max_retry_attempts: env.parse("ADS_MAX_RETRY_ATTEMPTS", 2),
            await_types,
            await_timeout: Duration::from_secs(env.parse("ADS_AWAIT_TIMEOUT_SECS", 10)),
            debug: env.parse_bool("ADS_DEBUG", false),
        };

        Ok(Self {
            ready_timeout: Duration::from_secs(env.parse("HUB_READY_TIMEOUT_SECS", 10)),
            ads,
        })
    }
}

struct Env<F>(F);

impl<F: Fn(&str) -> Option<String>> Env<F> {
    fn string(&self, key: &str) -> String {
        (self.0)(key).map(|v| v.trim().to_owned()).unwrap_or_default()
    }

    /// Parses `key` as `T`, returning `default` on missing or invalid
    /// values.
    fn parse<T: std::str::FromStr>(&self, key: &str, default: T) -> T {
        (self.0)(key)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(default)
    }

    /// Accepts `"true"`, `"1"`, `"false"`, `"0"` (case-insensitive).
    fn parse_bool(&self, key: &str, default: bool) -> bool {
        match (self.0)(key).map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("true" | "1") => true,
            Some("false" | "0") => false,
            _ => default,
        }
    }
}
