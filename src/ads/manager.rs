//! # Ad inventory manager
//!
//! Owns one [`AdInventory`] slot per [`AdKind`] and drives it through the
//! load, retry, wait, and present lifecycle:
//!
//! ```text
//!  load(kind) ──► fetch ──ok──► slot filled ──► ready bit set ──► composite wait resolves
//!                   │
//!                   └─err──► retry after 1s, 2s, 4s … (capped at 30s) until the budget is spent
//!
//!  present(kind) ──► not ready ──► NotReady, load(kind)
//!        │
//!        ├─► another ad on screen ──► Busy
//!        └─► vendor presents ──► dismissed ──► slot cleared, refilled (except app-open)
//!                               └► failed ────► slot refilled (except app-open)
//! ```
//!
//! At most one full-screen ad is on screen at a time. The claim is a
//! semaphore permit held by the presentation task, so it is released on
//! every exit path. The presentation runs on its own task: a caller that
//! stops awaiting does not leave the slot half-updated.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::runtime::Handle;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::network::PresentationEnd;
use super::{
    AdInventory, AdKind, AdNetwork, AdTypes, AdsConfig, BannerSize, BannerView, Clock, LoadedAd,
    PresentationContext, PresentationSink, RetryPolicy, SystemClock,
};
use crate::error::HubError;
use crate::readiness::WaitOutcome;
use crate::readiness::wait_slot::{WaitSlot, WaitState, deadline_after, wait_until};

/// Result of a full-screen presentation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum PresentationOutcome {
    /// No fresh unit was held; a load was requested.
    NotReady,
    /// Another full-screen ad is on screen.
    Busy,
    /// The ad was shown and dismissed.
    Dismissed {
        /// The user earned the reward (rewarded ads only).
        rewarded: bool,
    },
    /// The vendor failed to present the ad.
    Failed,
}

impl PresentationOutcome {
    /// `true` if the ad was shown and dismissed.
    #[must_use]
    pub const fn was_shown(self) -> bool {
        matches!(self, Self::Dismissed { .. })
    }

    /// `true` if the user earned the reward.
    #[must_use]
    pub const fn is_rewarded(self) -> bool {
        matches!(self, Self::Dismissed { rewarded: true })
    }
}

#[derive(Debug)]
struct ManagerState {
    interstitial: AdInventory,
    rewarded: AdInventory,
    app_open: AdInventory,
    /// Kinds some caller of the open wait cycle still lacks.
    awaited: AdTypes,
    wait: WaitSlot,
}

impl ManagerState {
    fn new(config: &AdsConfig) -> Self {
        Self {
            interstitial: AdInventory::new(
                AdKind::Interstitial,
                config.unit_for(AdKind::Interstitial),
            ),
            rewarded: AdInventory::new(AdKind::Rewarded, config.unit_for(AdKind::Rewarded)),
            app_open: AdInventory::new(AdKind::AppOpen, config.unit_for(AdKind::AppOpen)),
            awaited: AdTypes::NONE,
            wait: WaitSlot::default(),
        }
    }

    const fn inventory(&self, kind: AdKind) -> &AdInventory {
        match kind {
            AdKind::Interstitial => &self.interstitial,
            AdKind::Rewarded => &self.rewarded,
            AdKind::AppOpen => &self.app_open,
        }
    }

    const fn inventory_mut(&mut self, kind: AdKind) -> &mut AdInventory {
        match kind {
            AdKind::Interstitial => &mut self.interstitial,
            AdKind::Rewarded => &mut self.rewarded,
            AdKind::AppOpen => &mut self.app_open,
        }
    }

    fn all_ready(&self, types: AdTypes, now: chrono::DateTime<chrono::Utc>) -> bool {
        types.iter().all(|kind| self.inventory(kind).is_ready(now))
    }

    /// Wakes the open wait cycle if some caller was waiting on `kind`.
    ///
    /// Woken callers re-check their own kinds and re-enter if still short.
    fn wake_waiters_for(&mut self, kind: AdKind) -> bool {
        if !self.awaited.has(kind) {
            return false;
        }
        self.awaited = AdTypes::NONE;
        self.wait.resolve(WaitOutcome::Ready)
    }
}

impl WaitState for ManagerState {
    fn slot(&mut self) -> &mut WaitSlot {
        &mut self.wait
    }

    fn on_expired(&mut self) {
        self.awaited = AdTypes::NONE;
    }
}

struct Inner {
    config: AdsConfig,
    retry: RetryPolicy,
    network: Arc<dyn AdNetwork>,
    clock: Arc<dyn Clock>,
    state: Arc<Mutex<ManagerState>>,
    presenting: Arc<Semaphore>,
}

/// Loads, tracks, and presents full-screen ads.
///
/// Cheap to clone; clones share the same inventory.
#[derive(Clone)]
pub struct AdInventoryManager {
    inner: Arc<Inner>,
}

impl AdInventoryManager {
    /// Creates a manager on the system clock.
    #[must_use]
    pub fn new(config: AdsConfig, network: Arc<dyn AdNetwork>) -> Self {
        Self::with_clock(config, network, Arc::new(SystemClock))
    }

    /// Creates a manager that reads time from `clock`.
    #[must_use]
    pub fn with_clock(config: AdsConfig, network: Arc<dyn AdNetwork>, clock: Arc<dyn Clock>) -> Self {
        let state = ManagerState::new(&config);
        Self {
            inner: Arc::new(Inner {
                retry: config.retry_policy(),
                config,
                network,
                clock,
                state: Arc::new(Mutex::new(state)),
                presenting: Arc::new(Semaphore::new(1)),
            }),
        }
    }

    /// Configuration the manager was built with.
    #[must_use]
    pub fn config(&self) -> &AdsConfig {
        &self.inner.config
    }

    /// Runs the vendor SDK's one-time initialization.
    ///
    /// # Errors
    ///
    /// Returns the vendor's error unchanged.
    pub async fn initialize(&self) -> Result<(), HubError> {
        self.inner.network.initialize().await
    }

    /// `true` if a fresh unit of `kind` is held.
    #[must_use]
    pub fn is_ready(&self, kind: AdKind) -> bool {
        let now = self.inner.clock.now();
        self.inner.state.lock().inventory(kind).is_ready(now)
    }

    /// `true` if an interstitial can be shown now.
    #[must_use]
    pub fn is_interstitial_ready(&self) -> bool {
        self.is_ready(AdKind::Interstitial)
    }

    /// `true` if a rewarded ad can be shown now.
    #[must_use]
    pub fn is_rewarded_ready(&self) -> bool {
        self.is_ready(AdKind::Rewarded)
    }

    /// `true` if an app-open ad can be shown now.
    #[must_use]
    pub fn is_app_open_ready(&self) -> bool {
        self.is_ready(AdKind::AppOpen)
    }

    /// Kinds that can be shown now.
    #[must_use]
    pub fn ready_types(&self) -> AdTypes {
        let now = self.inner.clock.now();
        let state = self.inner.state.lock();
        AdKind::ALL
            .into_iter()
            .filter(|kind| state.inventory(*kind).is_ready(now))
            .collect()
    }

    /// Consecutive failed loads of `kind` since its last success.
    #[must_use]
    pub fn retry_count(&self, kind: AdKind) -> u32 {
        self.inner.state.lock().inventory(kind).retry_count()
    }

    /// `true` while a full-screen ad is on screen.
    #[must_use]
    pub fn is_presenting(&self) -> bool {
        self.inner.presenting.available_permits() == 0
    }

    /// Requests a unit of `kind`.
    ///
    /// A no-op when the kind has no unit id, a fetch is already in flight,
    /// or a fresh unit is already held. Failures are retried with backoff
    /// and only logged. Outside a tokio runtime the request is dropped with
    /// a warning.
    pub fn load(&self, kind: AdKind) {
        let Some(unit_id) = self.claim(kind) else {
            return;
        };
        let Ok(runtime) = Handle::try_current() else {
            warn!(kind = %kind, "no async runtime; ad load dropped");
            self.inner.state.lock().inventory_mut(kind).abandon_load();
            return;
        };
        let manager = self.clone();
        runtime.spawn(async move { manager.fetch(kind, unit_id).await });
    }

    /// Requests every configured kind.
    pub fn load_all(&self) {
        for kind in AdKind::ALL {
            self.load(kind);
        }
    }

    fn claim(&self, kind: AdKind) -> Option<String> {
        let now = self.inner.clock.now();
        let mut state = self.inner.state.lock();
        if state.inventory(kind).is_stale(now) {
            debug!(kind = %kind, "held ad expired");
        }
        let inventory = state.inventory_mut(kind);
        if !inventory.is_configured() {
            debug!(kind = %kind, "no unit configured; skipping load");
            return None;
        }
        if !inventory.begin_load(now) {
            return None;
        }
        Some(inventory.unit_id().to_owned())
    }

    async fn fetch(self, kind: AdKind, unit_id: String) {
        debug!(kind = %kind, unit_id = %unit_id, "loading ad");
        match self.inner.network.load(kind, unit_id).await {
            Ok(ad) => self.on_loaded(kind, ad),
            Err(err) => self.on_load_failed(kind, &err),
        }
    }

    fn on_loaded(&self, kind: AdKind, ad: Arc<dyn LoadedAd>) {
        let now = self.inner.clock.now();
        let woke = {
            let mut state = self.inner.state.lock();
            state.inventory_mut(kind).load_succeeded(ad, now);
            state.wake_waiters_for(kind)
        };
        info!(kind = %kind, "ad loaded");
        if woke {
            debug!(kind = %kind, "woke ad waiters");
        }
    }

    fn on_load_failed(&self, kind: AdKind, err: &HubError) {
        let (delay, attempt) = {
            let mut state = self.inner.state.lock();
            let inventory = state.inventory_mut(kind);
            let delay = inventory.load_failed(&self.inner.retry);
            (delay, inventory.retry_count())
        };
        let err = HubError::LoadFailed {
            kind,
            reason: err.to_string(),
        };

        let Some(delay) = delay else {
            warn!(
                kind = %kind,
                error = %err,
                max_attempts = self.inner.retry.max_attempts,
                "ad load failed; retries exhausted"
            );
            return;
        };
        warn!(
            kind = %kind,
            error = %err,
            attempt,
            max_attempts = self.inner.retry.max_attempts,
            ?delay,
            "ad load failed; retry scheduled"
        );
        let manager = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            manager.load(kind);
        });
    }

    /// Suspends until every configured kind in `types` holds a fresh unit,
    /// or `timeout` elapses.
    ///
    /// Kinds without a unit id are ignored; if none remain the wait
    /// resolves immediately. Stale units are reloaded. Concurrent waits
    /// share one cycle, but each resolves on its own kinds and its own
    /// `timeout`: a waiter is neither held back by kinds another caller
    /// asked for nor ended by another caller's shorter budget.
    pub async fn wait_until_ready(&self, types: AdTypes, timeout: Duration) -> WaitOutcome {
        let effective = types & self.inner.config.configured_kinds();
        if effective.is_empty() {
            return WaitOutcome::Ready;
        }
        let deadline = deadline_after(timeout);

        let stale = {
            let now = self.inner.clock.now();
            let state = self.inner.state.lock();
            effective
                .iter()
                .filter(|&kind| state.inventory(kind).is_stale(now))
                .fold(AdTypes::NONE, |acc, kind| acc | AdTypes::from(kind))
        };
        for kind in stale.iter() {
            self.load(kind);
        }

        let clock = &self.inner.clock;
        let outcome = wait_until(&self.inner.state, deadline, |state: &mut ManagerState| {
            let now = clock.now();
            let missing = effective
                .iter()
                .filter(|&kind| !state.inventory(kind).is_ready(now))
                .fold(AdTypes::NONE, |acc, kind| acc | AdTypes::from(kind));
            state.awaited |= missing;
            missing.is_empty()
        })
        .await;
        if outcome == WaitOutcome::TimedOut {
            warn!(types = %effective, ?timeout, "ads not ready before timeout");
        }
        outcome
    }

    /// Callback flavour of [`AdInventoryManager::wait_until_ready`].
    ///
    /// Must be called from within a tokio runtime.
    pub fn wait_until_ready_with<F>(
        &self,
        types: AdTypes,
        timeout: Duration,
        completion: F,
    ) -> JoinHandle<()>
    where
        F: FnOnce(WaitOutcome) + Send + 'static,
    {
        let manager = self.clone();
        tokio::spawn(async move { completion(manager.wait_until_ready(types, timeout).await) })
    }

    /// Shows the held unit of `kind` on `context`.
    ///
    /// Returns [`PresentationOutcome::NotReady`] (and requests a load) when
    /// no fresh unit is held, and [`PresentationOutcome::Busy`] when another
    /// full-screen ad is on screen.
    pub async fn present(&self, kind: AdKind, context: &PresentationContext) -> PresentationOutcome {
        let now = self.inner.clock.now();
        let ad = {
            let state = self.inner.state.lock();
            let inventory = state.inventory(kind);
            if inventory.is_ready(now) {
                inventory.current()
            } else {
                None
            }
        };
        let Some(ad) = ad else {
            debug!(kind = %kind, "no ad ready; requesting load");
            self.load(kind);
            return PresentationOutcome::NotReady;
        };
        let Ok(permit) = Arc::clone(&self.inner.presenting).try_acquire_owned() else {
            warn!(kind = %kind, "another ad is on screen");
            return PresentationOutcome::Busy;
        };

        let manager = self.clone();
        let context = context.clone();
        let presentation = tokio::spawn(async move {
            let _permit = permit;
            let end = run_presentation(ad, context).await;
            manager.finish_presentation(kind, end)
        });
        match presentation.await {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(kind = %kind, error = %err, "presentation task aborted");
                PresentationOutcome::Failed
            }
        }
    }

    fn finish_presentation(&self, kind: AdKind, end: PresentationEnd) -> PresentationOutcome {
        match end {
            PresentationEnd::Dismissed { rewarded } => {
                self.consume(kind);
                info!(kind = %kind, rewarded, "ad dismissed");
                if kind.reloads_after_presentation() {
                    self.load(kind);
                }
                PresentationOutcome::Dismissed { rewarded }
            }
            PresentationEnd::Failed(reason) => {
                let err = HubError::PresentationFailed(reason);
                warn!(kind = %kind, error = %err, "ad failed to present");
                if kind.reloads_after_presentation() {
                    self.consume(kind);
                    self.load(kind);
                }
                PresentationOutcome::Failed
            }
        }
    }

    fn consume(&self, kind: AdKind) {
        let mut state = self.inner.state.lock();
        state.inventory_mut(kind).clear();
    }

    /// Shows an interstitial.
    pub async fn show_interstitial(&self, context: &PresentationContext) -> PresentationOutcome {
        self.present(AdKind::Interstitial, context).await
    }

    /// Shows a rewarded ad. Returns `true` only if the user earned the
    /// reward.
    pub async fn show_rewarded(&self, context: &PresentationContext) -> bool {
        self.present(AdKind::Rewarded, context).await.is_rewarded()
    }

    /// Shows an app-open ad.
    pub async fn show_app_open(&self, context: &PresentationContext) -> PresentationOutcome {
        self.present(AdKind::AppOpen, context).await
    }

    /// Callback flavour of [`AdInventoryManager::show_interstitial`].
    ///
    /// Must be called from within a tokio runtime.
    pub fn show_interstitial_with<F>(&self, context: PresentationContext, completion: F) -> JoinHandle<()>
    where
        F: FnOnce(PresentationOutcome) + Send + 'static,
    {
        let manager = self.clone();
        tokio::spawn(async move { completion(manager.show_interstitial(&context).await) })
    }

    /// Callback flavour of [`AdInventoryManager::show_rewarded`].
    ///
    /// Must be called from within a tokio runtime.
    pub fn show_rewarded_with<F>(&self, context: PresentationContext, completion: F) -> JoinHandle<()>
    where
        F: FnOnce(bool) + Send + 'static,
    {
        let manager = self.clone();
        tokio::spawn(async move { completion(manager.show_rewarded(&context).await) })
    }

    /// Callback flavour of [`AdInventoryManager::show_app_open`].
    ///
    /// Must be called from within a tokio runtime.
    pub fn show_app_open_with<F>(&self, context: PresentationContext, completion: F) -> JoinHandle<()>
    where
        F: FnOnce(PresentationOutcome) + Send + 'static,
    {
        let manager = self.clone();
        tokio::spawn(async move { completion(manager.show_app_open(&context).await) })
    }

    /// Creates a banner on `context`. No inventory is kept for banners.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::InvalidConfig`] when no banner unit is
    /// configured, or the vendor's error.
    pub fn create_banner(
        &self,
        context: &PresentationContext,
        size: BannerSize,
    ) -> Result<Box<dyn BannerView>, HubError> {
        let unit_id = self.inner.config.banner_unit();
        if unit_id.is_empty() {
            return Err(HubError::InvalidConfig("no banner unit configured".to_owned()));
        }
        self.inner.network.create_banner(unit_id, context, size)
    }
}

async fn run_presentation(ad: Arc<dyn LoadedAd>, context: PresentationContext) -> PresentationEnd {
    let (sink, ended) = PresentationSink::channel();
    if let Err(err) = ad.present(&context, sink) {
        return PresentationEnd::Failed(err.to_string());
    }
    ended
        .await
        .unwrap_or_else(|_| PresentationEnd::Failed("presentation ended without a report".to_owned()))
}

impl fmt::Debug for AdInventoryManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdInventoryManager")
            .field("config", &self.inner.config)
            .field("ready", &self.ready_types())
            .field("presenting", &self.is_presenting())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use chrono::{TimeDelta, Utc};
    use tokio::time::Instant;
    use tokio_test::{assert_pending, assert_ready_eq, task};

    use super::*;
    use crate::ads::{ManualClock, PresentBehavior, SimulatedNetwork};

    fn all_units() -> AdsConfig {
        AdsConfig::default()
            .with_unit(AdKind::Interstitial, "int")
            .with_unit(AdKind::Rewarded, "rw")
            .with_unit(AdKind::AppOpen, "ao")
    }

    fn manager(config: AdsConfig, network: &SimulatedNetwork) -> AdInventoryManager {
        AdInventoryManager::new(config, Arc::new(network.clone()))
    }

    /// Lets spawned fetch tasks run to completion under paused time.
    async fn settle() {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn load_fills_the_slot() {
        let network = SimulatedNetwork::new();
        let ads = manager(all_units(), &network);
        ads.load(AdKind::Interstitial);
        settle().await;
        assert!(ads.is_interstitial_ready());
        assert_eq!(ads.ready_types(), AdTypes::INTERSTITIAL);
    }

    #[tokio::test(start_paused = true)]
    async fn load_is_skipped_while_in_flight_or_ready() {
        let network = SimulatedNetwork::new().with_latency(Duration::from_secs(1));
        let ads = manager(all_units(), &network);
        ads.load(AdKind::Rewarded);
        ads.load(AdKind::Rewarded);
        settle().await;
        assert_eq!(network.load_calls(AdKind::Rewarded), 1);

        tokio::time::sleep(Duration::from_secs(2)).await;
        ads.load(AdKind::Rewarded);
        settle().await;
        assert_eq!(network.load_calls(AdKind::Rewarded), 1);
        assert!(ads.is_rewarded_ready());
    }

    #[tokio::test(start_paused = true)]
    async fn unconfigured_kind_is_never_requested() {
        let network = SimulatedNetwork::new();
        let ads = manager(AdsConfig::default(), &network);
        ads.load_all();
        settle().await;
        assert_eq!(network.load_calls(AdKind::Interstitial), 0);
        assert_eq!(ads.ready_types(), AdTypes::NONE);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_loads_back_off_then_give_up() {
        let network = SimulatedNetwork::new();
        network.fail_next_loads(AdKind::Interstitial, u32::MAX);
        let ads = manager(all_units().with_max_retry_attempts(3), &network);

        ads.load(AdKind::Interstitial);
        settle().await;
        assert_eq!(network.load_calls(AdKind::Interstitial), 1);

        // Retries after 1s, 2s and 4s.
        tokio::time::sleep(Duration::from_secs(1)).await;
        settle().await;
        assert_eq!(network.load_calls(AdKind::Interstitial), 2);
        tokio::time::sleep(Duration::from_secs(2)).await;
        settle().await;
        assert_eq!(network.load_calls(AdKind::Interstitial), 3);
        tokio::time::sleep(Duration::from_secs(4)).await;
        settle().await;
        assert_eq!(network.load_calls(AdKind::Interstitial), 4);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(network.load_calls(AdKind::Interstitial), 4);
        assert_eq!(ads.retry_count(AdKind::Interstitial), 3);
        assert!(!ads.is_interstitial_ready());
    }

    #[tokio::test(start_paused = true)]
    async fn retry_succeeds_and_resets_the_counter() {
        let network = SimulatedNetwork::new();
        network.fail_next_loads(AdKind::Rewarded, 1);
        let ads = manager(all_units(), &network);

        ads.load(AdKind::Rewarded);
        settle().await;
        assert_eq!(ads.retry_count(AdKind::Rewarded), 1);

        tokio::time::sleep(Duration::from_secs(1)).await;
        settle().await;
        assert!(ads.is_rewarded_ready());
        assert_eq!(ads.retry_count(AdKind::Rewarded), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn wait_ignores_unconfigured_kinds() {
        let network = SimulatedNetwork::new();
        let config = AdsConfig::default().with_unit(AdKind::Interstitial, "int");
        let ads = manager(config, &network);
        let outcome = ads
            .wait_until_ready(AdTypes::REWARDED | AdTypes::APP_OPEN, Duration::from_secs(5))
            .await;
        assert_eq!(outcome, WaitOutcome::Ready);
    }

    #[tokio::test(start_paused = true)]
    async fn wait_resolves_when_every_awaited_kind_loads() {
        let network = SimulatedNetwork::new().with_latency(Duration::from_secs(2));
        let ads = manager(all_units(), &network);
        ads.load_all();

        let mut wait = task::spawn(
            ads.wait_until_ready(AdTypes::INTERSTITIAL | AdTypes::REWARDED, Duration::from_secs(10)),
        );
        assert_pending!(wait.poll());

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(wait.is_woken());
        assert_ready_eq!(wait.poll(), WaitOutcome::Ready);
    }

    #[tokio::test(start_paused = true)]
    async fn wait_times_out_when_a_kind_never_loads() {
        let network = SimulatedNetwork::new();
        network.fail_next_loads(AdKind::Rewarded, u32::MAX);
        let ads = manager(all_units(), &network);
        ads.load_all();

        let outcome = ads
            .wait_until_ready(AdTypes::INTERSTITIAL | AdTypes::REWARDED, Duration::from_secs(5))
            .await;
        assert_eq!(outcome, WaitOutcome::TimedOut);
        assert!(ads.is_interstitial_ready());
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_waits_share_one_cycle() {
        let network = SimulatedNetwork::new().with_latency(Duration::from_secs(2));
        let ads = manager(all_units(), &network);
        ads.load_all();

        let first = ads.clone();
        let second = ads.clone();
        let (a, b) = tokio::join!(
            first.wait_until_ready(AdTypes::INTERSTITIAL, Duration::from_secs(10)),
            second.wait_until_ready(AdTypes::APP_OPEN, Duration::from_secs(10)),
        );
        assert_eq!(a, WaitOutcome::Ready);
        assert_eq!(b, WaitOutcome::Ready);
        assert!(ads.is_app_open_ready());
    }

    #[tokio::test(start_paused = true)]
    async fn waiter_is_not_held_back_by_kinds_it_did_not_ask_for() {
        let network = SimulatedNetwork::new().with_latency(Duration::from_secs(1));
        network.fail_next_loads(AdKind::Rewarded, u32::MAX);
        let ads = manager(all_units(), &network);
        ads.load_all();

        let start = Instant::now();
        let interstitial = async {
            let outcome = ads
                .wait_until_ready(AdTypes::INTERSTITIAL, Duration::from_secs(10))
                .await;
            (outcome, start.elapsed())
        };
        let rewarded = async {
            let outcome = ads
                .wait_until_ready(AdTypes::REWARDED, Duration::from_secs(10))
                .await;
            (outcome, start.elapsed())
        };
        let ((int_outcome, int_elapsed), (rw_outcome, rw_elapsed)) =
            tokio::join!(interstitial, rewarded);

        assert_eq!(int_outcome, WaitOutcome::Ready);
        assert!(int_elapsed < Duration::from_secs(2));
        assert_eq!(rw_outcome, WaitOutcome::TimedOut);
        assert_eq!(rw_elapsed, Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn shorter_wait_timing_out_leaves_longer_one_running() {
        let network = SimulatedNetwork::new().with_latency(Duration::from_secs(5));
        let ads = manager(all_units(), &network);
        ads.load(AdKind::Interstitial);

        let mut short =
            task::spawn(ads.wait_until_ready(AdTypes::INTERSTITIAL, Duration::from_secs(1)));
        let mut long =
            task::spawn(ads.wait_until_ready(AdTypes::INTERSTITIAL, Duration::from_secs(10)));
        assert_pending!(short.poll());
        assert_pending!(long.poll());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_ready_eq!(short.poll(), WaitOutcome::TimedOut);
        assert_pending!(long.poll());

        tokio::time::sleep(Duration::from_secs(4)).await;
        assert!(long.is_woken());
        assert_ready_eq!(long.poll(), WaitOutcome::Ready);
    }

    #[tokio::test(start_paused = true)]
    async fn show_without_inventory_reports_not_ready_and_loads() {
        let network = SimulatedNetwork::new();
        let ads = manager(all_units(), &network);
        let outcome = ads.show_interstitial(&PresentationContext::root()).await;
        assert_eq!(outcome, PresentationOutcome::NotReady);
        settle().await;
        assert!(ads.is_interstitial_ready());
    }

    #[tokio::test(start_paused = true)]
    async fn dismissed_interstitial_is_replaced() {
        let network = SimulatedNetwork::new();
        let ads = manager(all_units(), &network);
        ads.load(AdKind::Interstitial);
        settle().await;

        let outcome = ads.show_interstitial(&PresentationContext::root()).await;
        assert_eq!(outcome, PresentationOutcome::Dismissed { rewarded: false });
        settle().await;
        assert_eq!(network.load_calls(AdKind::Interstitial), 2);
        assert!(ads.is_interstitial_ready());
    }

    #[tokio::test(start_paused = true)]
    async fn rewarded_reports_the_reward() {
        let network = SimulatedNetwork::new();
        network.set_behavior(AdKind::Rewarded, PresentBehavior::DismissWithReward);
        let ads = manager(all_units(), &network);
        ads.load(AdKind::Rewarded);
        settle().await;
        assert!(ads.show_rewarded(&PresentationContext::root()).await);

        settle().await;
        network.set_behavior(AdKind::Rewarded, PresentBehavior::Dismiss);
        assert!(!ads.show_rewarded(&PresentationContext::root()).await);
    }

    #[tokio::test(start_paused = true)]
    async fn app_open_is_not_reloaded_after_dismissal() {
        let network = SimulatedNetwork::new();
        let ads = manager(all_units(), &network);
        ads.load(AdKind::AppOpen);
        settle().await;

        let outcome = ads.show_app_open(&PresentationContext::root()).await;
        assert!(outcome.was_shown());
        settle().await;
        assert_eq!(network.load_calls(AdKind::AppOpen), 1);
        assert!(!ads.is_app_open_ready());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_presentation_reloads_interstitial() {
        let network = SimulatedNetwork::new();
        network.set_behavior(AdKind::Interstitial, PresentBehavior::Fail("no view".into()));
        let ads = manager(all_units(), &network);
        ads.load(AdKind::Interstitial);
        settle().await;

        let outcome = ads.show_interstitial(&PresentationContext::root()).await;
        assert_eq!(outcome, PresentationOutcome::Failed);
        settle().await;
        assert_eq!(network.load_calls(AdKind::Interstitial), 2);
        assert!(!ads.is_presenting());
    }

    #[tokio::test(start_paused = true)]
    async fn vanished_sink_counts_as_failure() {
        let network = SimulatedNetwork::new();
        network.set_behavior(AdKind::AppOpen, PresentBehavior::Vanish);
        let ads = manager(all_units(), &network);
        ads.load(AdKind::AppOpen);
        settle().await;

        let outcome = ads.show_app_open(&PresentationContext::root()).await;
        assert_eq!(outcome, PresentationOutcome::Failed);
        assert!(ads.is_app_open_ready());
        assert!(!ads.is_presenting());
    }

    #[tokio::test(start_paused = true)]
    async fn second_show_while_on_screen_is_busy() {
        let network = SimulatedNetwork::new();
        network.set_behavior(AdKind::Interstitial, PresentBehavior::Hold);
        let ads = manager(all_units(), &network);
        ads.load_all();
        settle().await;

        let on_screen = ads.clone();
        let first = tokio::spawn(async move {
            on_screen.show_interstitial(&PresentationContext::root()).await
        });
        settle().await;
        assert!(ads.is_presenting());

        let second = ads.show_rewarded(&PresentationContext::root()).await;
        assert!(!second);
        assert_eq!(network.presentations(), 1);

        assert_eq!(network.finish_held(false), 1);
        let Ok(outcome) = first.await else {
            panic!("presentation task completed");
        };
        assert!(outcome.was_shown());
        assert!(!ads.is_presenting());
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_caller_does_not_leak_the_screen() {
        let network = SimulatedNetwork::new();
        network.set_behavior(AdKind::Interstitial, PresentBehavior::Hold);
        let ads = manager(all_units(), &network);
        ads.load(AdKind::Interstitial);
        settle().await;

        let caller = ads.clone();
        let handle = tokio::spawn(async move {
            caller.show_interstitial(&PresentationContext::root()).await
        });
        settle().await;
        handle.abort();
        settle().await;
        assert!(ads.is_presenting());

        network.finish_held(false);
        settle().await;
        assert!(!ads.is_presenting());
        assert_eq!(network.load_calls(AdKind::Interstitial), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_app_open_is_not_presented() {
        let network = SimulatedNetwork::new();
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let ads = AdInventoryManager::with_clock(
            all_units(),
            Arc::new(network.clone()),
            Arc::clone(&clock) as Arc<dyn Clock>,
        );
        ads.load(AdKind::AppOpen);
        settle().await;
        assert!(ads.is_app_open_ready());

        clock.advance(TimeDelta::hours(4));
        assert!(!ads.is_app_open_ready());
        let outcome = ads.show_app_open(&PresentationContext::root()).await;
        assert_eq!(outcome, PresentationOutcome::NotReady);
        settle().await;
        assert_eq!(network.load_calls(AdKind::AppOpen), 2);
        assert!(ads.is_app_open_ready());
    }

    #[tokio::test(start_paused = true)]
    async fn callback_flavours_deliver_outcomes() {
        let network = SimulatedNetwork::new();
        network.set_behavior(AdKind::Rewarded, PresentBehavior::DismissWithReward);
        let ads = manager(all_units(), &network);
        ads.load_all();

        let waited = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&waited);
        let wait = ads.wait_until_ready_with(AdTypes::ALL, Duration::from_secs(5), move |outcome| {
            flag.store(outcome.is_ready(), Ordering::SeqCst);
        });
        let Ok(()) = wait.await else {
            panic!("wait task completed");
        };
        assert!(waited.load(Ordering::SeqCst));

        let rewarded = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&rewarded);
        let show = ads.show_rewarded_with(PresentationContext::root(), move |earned| {
            flag.store(earned, Ordering::SeqCst);
        });
        let Ok(()) = show.await else {
            panic!("show task completed");
        };
        assert!(rewarded.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn banner_requires_a_unit() {
        let network = SimulatedNetwork::new();
        let ads = manager(all_units(), &network);
        let Err(err) = ads.create_banner(&PresentationContext::root(), BannerSize::Banner) else {
            panic!("banner without unit must fail");
        };
        assert_eq!(err.kind_str(), "invalid_config");

        let ads = manager(all_units().with_banner_unit("banner"), &network);
        let Ok(banner) = ads.create_banner(
            &PresentationContext::surface("footer"),
            BannerSize::Adaptive { width: 360 },
        ) else {
            panic!("banner with unit must succeed");
        };
        assert_eq!(banner.unit_id(), "banner");
    }

    #[test]
    fn load_outside_a_runtime_is_dropped() {
        let network = SimulatedNetwork::new();
        let ads = manager(all_units(), &network);
        ads.load(AdKind::Interstitial);
        assert_eq!(network.load_calls(AdKind::Interstitial), 0);
        ads.load(AdKind::Interstitial);
        assert_eq!(ads.retry_count(AdKind::Interstitial), 0);
    }
}
