//! Per-kind inventory slot.
//!
//! A slot holds at most one loaded unit. The slot itself is plain state;
//! the manager locks it, and timing comes in through explicit `now`
//! arguments so freshness is testable without a real clock.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use super::{AdKind, LoadedAd, RetryPolicy};

/// Inventory slot for one [`AdKind`].
pub struct AdInventory {
    kind: AdKind,
    unit_id: String,
    current: Option<Arc<dyn LoadedAd>>,
    loaded_at: Option<DateTime<Utc>>,
    retry_count: u32,
    loading: bool,
}

impl AdInventory {
    /// Creates an empty slot. An empty `unit_id` means the kind is not
    /// configured and never loads.
    #[must_use]
    pub fn new(kind: AdKind, unit_id: impl Into<String>) -> Self {
        Self {
            kind,
            unit_id: unit_id.into(),
            current: None,
            loaded_at: None,
            retry_count: 0,
            loading: false,
        }
    }

    /// Kind this slot holds.
    #[must_use]
    pub const fn kind(&self) -> AdKind {
        self.kind
    }

    /// Unit identifier loads are issued against.
    #[must_use]
    pub fn unit_id(&self) -> &str {
        &self.unit_id
    }

    /// `false` when the unit identifier is empty.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        !self.unit_id.is_empty()
    }

    /// Whether a unit is held and still fresh at `now`.
    #[must_use]
    pub fn is_ready(&self, now: DateTime<Utc>) -> bool {
        if self.current.is_none() {
            return false;
        }
        match (self.kind.freshness_window(), self.loaded_at) {
            (Some(window), Some(loaded_at)) => now - loaded_at < window,
            (Some(_), None) => false,
            (None, _) => true,
        }
    }

    /// Holds a unit that has outlived its freshness window.
    #[must_use]
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        self.current.is_some() && !self.is_ready(now)
    }

    /// Consecutive failed loads since the last success.
    #[must_use]
    pub const fn retry_count(&self) -> u32 {
        self.retry_count
    }

    /// A fetch is in flight.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.loading
    }

    /// When the held unit was fetched.
    #[must_use]
    pub const fn loaded_at(&self) -> Option<DateTime<Utc>> {
        self.loaded_at
    }

    /// Claims the slot for a fetch. Returns `false` when the slot is not
    /// configured, already fetching, or already holds a fresh unit.
    pub(crate) fn begin_load(&mut self, now: DateTime<Utc>) -> bool {
        if !self.is_configured() || self.loading || self.is_ready(now) {
            return false;
        }
        self.loading = true;
        true
    }

    /// Releases a claim taken by [`AdInventory::begin_load`] without a
    /// result.
    pub(crate) fn abandon_load(&mut self) {
        self.loading = false;
    }

    pub(crate) fn load_succeeded(&mut self, ad: Arc<dyn LoadedAd>, now: DateTime<Utc>) {
        self.current = Some(ad);
        self.loaded_at = Some(now);
        self.retry_count = 0;
        self.loading = false;
    }

    /// Records a failed fetch and returns the delay before the next
    /// attempt, or `None` once `policy` is exhausted.
    pub(crate) fn load_failed(&mut self, policy: &RetryPolicy) -> Option<Duration> {
        self.loading = false;
        let delay = policy.next_retry(self.retry_count)?;
        self.retry_count = self.retry_count.saturating_add(1);
        Some(delay)
    }

    pub(crate) fn current(&self) -> Option<Arc<dyn LoadedAd>> {
        self.current.as_ref().map(Arc::clone)
    }

    /// Empties the slot after the held unit was used up.
    pub(crate) fn clear(&mut self) {
        self.current = None;
        self.loaded_at = None;
        self.retry_count = 0;
    }
}

impl fmt::Debug for AdInventory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdInventory")
            .field("kind", &self.kind)
            .field("unit_id", &self.unit_id)
            .field("has_ad", &self.current.is_some())
            .field("loaded_at", &self.loaded_at)
            .field("retry_count", &self.retry_count)
            .field("loading", &self.loading)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;

    use super::*;
    use crate::ads::{PresentationContext, PresentationSink};
    use crate::error::HubError;

    struct Unit;

    impl LoadedAd for Unit {
        fn present(
            &self,
            _context: &PresentationContext,
            sink: PresentationSink,
        ) -> Result<(), HubError> {
            sink.dismissed();
            Ok(())
        }
    }

    fn unit() -> Arc<dyn LoadedAd> {
        Arc::new(Unit)
    }

    #[test]
    fn unconfigured_slot_never_loads() {
        let mut slot = AdInventory::new(AdKind::Interstitial, "");
        assert!(!slot.is_configured());
        assert!(!slot.begin_load(Utc::now()));
    }

    #[test]
    fn load_claim_is_exclusive() {
        let now = Utc::now();
        let mut slot = AdInventory::new(AdKind::Rewarded, "unit");
        assert!(slot.begin_load(now));
        assert!(!slot.begin_load(now));

        slot.load_succeeded(unit(), now);
        assert!(slot.is_ready(now));
        assert!(!slot.begin_load(now));
    }

    #[test]
    fn app_open_goes_stale_after_four_hours() {
        let loaded = Utc::now();
        let mut slot = AdInventory::new(AdKind::AppOpen, "unit");
        slot.load_succeeded(unit(), loaded);

        let almost = loaded + TimeDelta::hours(4) - TimeDelta::seconds(1);
        assert!(slot.is_ready(almost));
        let expired = loaded + TimeDelta::hours(4);
        assert!(!slot.is_ready(expired));
        assert!(slot.is_stale(expired));
        assert!(slot.begin_load(expired));
    }

    #[test]
    fn interstitial_never_goes_stale() {
        let loaded = Utc::now();
        let mut slot = AdInventory::new(AdKind::Interstitial, "unit");
        slot.load_succeeded(unit(), loaded);
        assert!(slot.is_ready(loaded + TimeDelta::days(30)));
    }

    #[test]
    fn failures_count_until_exhausted_and_success_resets() {
        let policy = RetryPolicy::default();
        let mut slot = AdInventory::new(AdKind::Interstitial, "unit");

        assert_eq!(slot.load_failed(&policy), Some(Duration::from_secs(1)));
        assert_eq!(slot.load_failed(&policy), Some(Duration::from_secs(2)));
        assert_eq!(slot.load_failed(&policy), None);
        assert_eq!(slot.retry_count(), 2);

        slot.load_succeeded(unit(), Utc::now());
        assert_eq!(slot.retry_count(), 0);
    }

    #[test]
    fn clear_empties_the_slot() {
        let now = Utc::now();
        let mut slot = AdInventory::new(AdKind::Interstitial, "unit");
        slot.load_succeeded(unit(), now);
        slot.clear();
        assert!(!slot.is_ready(now));
        assert!(slot.loaded_at().is_none());
        assert!(slot.current().is_none());
    }
}
