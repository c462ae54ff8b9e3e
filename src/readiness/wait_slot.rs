//! Single pending wait shared by every concurrent caller.
//!
//! Both the named [`super::ReadinessBarrier`] and the ad inventory's
//! bitmask wait keep exactly one [`WaitSlot`] inside their locked state. A
//! wait cycle is opened by the first caller, armed with a timeout task, and
//! resolved exactly once: either by readiness or by that timeout, whichever
//! takes the pending entry first. Callers arriving while a cycle is open
//! join it instead of replacing it.
//!
//! A resolved cycle only wakes its waiters. Each caller keeps its own
//! condition and deadline (see [`wait_until`]): a waiter whose condition
//! still does not hold, or whose deadline has not passed, re-enters the
//! slot and waits again.

use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// How a readiness wait ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitOutcome {
    /// Everything awaited became ready.
    Ready,
    /// The time budget ran out first. Not an error: the caller proceeds
    /// without full readiness.
    TimedOut,
}

impl WaitOutcome {
    /// Returns `true` for [`WaitOutcome::Ready`].
    #[must_use]
    pub const fn is_ready(self) -> bool {
        matches!(self, Self::Ready)
    }
}

#[derive(Debug)]
struct PendingWait {
    cycle: u64,
    outcome: watch::Sender<Option<WaitOutcome>>,
    timer: Option<JoinHandle<()>>,
}

/// At most one pending wait plus its timeout task.
#[derive(Debug, Default)]
pub(crate) struct WaitSlot {
    next_cycle: u64,
    pending: Option<PendingWait>,
}

impl WaitSlot {
    /// Returns `true` while a cycle is open.
    pub(crate) fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Joins the open cycle, or opens a new one.
    ///
    /// The second element is `Some(cycle)` only when a new cycle was
    /// opened; the caller must then arm it with [`WaitSlot::arm`].
    pub(crate) fn join_or_open(&mut self) -> (WaitHandle, Option<u64>) {
        if let Some(pending) = &self.pending {
            return (
                WaitHandle {
                    rx: pending.outcome.subscribe(),
                },
                None,
            );
        }

        let cycle = self.next_cycle;
        self.next_cycle = self.next_cycle.wrapping_add(1);
        let (tx, rx) = watch::channel(None);
        self.pending = Some(PendingWait {
            cycle,
            outcome: tx,
            timer: None,
        });
        (WaitHandle { rx }, Some(cycle))
    }

    /// Attaches the timeout task to `cycle`. If that cycle is already gone
    /// the task is aborted.
    pub(crate) fn arm(&mut self, cycle: u64, timer: JoinHandle<()>) {
        match &mut self.pending {
            Some(pending) if pending.cycle == cycle => pending.timer = Some(timer),
            _ => timer.abort(),
        }
    }

    /// Resolves the open cycle, if any. Returns `false` when there was
    /// nothing to resolve.
    pub(crate) fn resolve(&mut self, outcome: WaitOutcome) -> bool {
        let Some(pending) = self.pending.take() else {
            return false;
        };
        if outcome.is_ready()
            && let Some(timer) = pending.timer
        {
            timer.abort();
        }
        pending.outcome.send_replace(Some(outcome));
        true
    }

    /// Times out `cycle` if it is still the open one.
    ///
    /// A timer firing after its cycle was resolved finds either nothing or
    /// a newer cycle and does nothing.
    pub(crate) fn expire(&mut self, cycle: u64) -> bool {
        let is_current = self
            .pending
            .as_ref()
            .is_some_and(|pending| pending.cycle == cycle);
        is_current && self.resolve(WaitOutcome::TimedOut)
    }
}

/// Receiver side of a wait cycle.
#[derive(Debug)]
pub(crate) struct WaitHandle {
    rx: watch::Receiver<Option<WaitOutcome>>,
}

impl WaitHandle {
    /// Waits for the cycle's outcome, bounded by this caller's own budget.
    pub(crate) async fn wait(mut self, budget: Duration) -> WaitOutcome {
        let result = tokio::time::timeout(budget, self.rx.wait_for(Option::is_some)).await;
        match result {
            Ok(Ok(outcome)) => (*outcome).unwrap_or(WaitOutcome::TimedOut),
            Ok(Err(_)) | Err(_) => WaitOutcome::TimedOut,
        }
    }
}

/// State that owns a [`WaitSlot`].
pub(crate) trait WaitState: Send + 'static {
    /// The slot guarded by the owner's lock.
    fn slot(&mut self) -> &mut WaitSlot;

    /// Extra bookkeeping when a cycle times out.
    fn on_expired(&mut self) {}
}

/// Spawns the timeout task for `cycle`.
///
/// The task holds only a weak reference, so a dropped owner ends it
/// quietly.
fn spawn_timeout<S: WaitState>(
    owner: Weak<Mutex<S>>,
    cycle: u64,
    timeout: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::time::sleep(timeout).await;
        if let Some(owner) = owner.upgrade()
            && expire_cycle(&owner, cycle)
        {
            tracing::debug!(cycle, ?timeout, "wait cycle timed out");
        }
    })
}

/// Times out `cycle` on behalf of its opener. Returns `false` if the cycle
/// was already resolved.
fn expire_cycle<S: WaitState>(owner: &Mutex<S>, cycle: u64) -> bool {
    let mut state = owner.lock();
    let expired = state.slot().expire(cycle);
    if expired {
        state.on_expired();
    }
    expired
}

/// Deadline `timeout` from now, saturating far in the future.
pub(crate) fn deadline_after(timeout: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(timeout)
        .unwrap_or_else(|| now + Duration::from_secs(60 * 60 * 24 * 365))
}

/// Waits until `satisfied` holds or `deadline` passes.
///
/// `satisfied` runs under the owner's lock before every (re-)entry. When it
/// returns `false` it may record what the caller is waiting for; the caller
/// then joins the open cycle or opens one armed with its remaining budget.
/// A cycle that ends early, whether woken by progress or by another
/// caller's timeout, sends the caller back to the check.
pub(crate) async fn wait_until<S, F>(
    owner: &Arc<Mutex<S>>,
    deadline: Instant,
    mut satisfied: F,
) -> WaitOutcome
where
    S: WaitState,
    F: FnMut(&mut S) -> bool,
{
    loop {
        let (handle, opened, remaining) = {
            let mut state = owner.lock();
            if satisfied(&mut *state) {
                return WaitOutcome::Ready;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return WaitOutcome::TimedOut;
            }
            let (handle, opened) = state.slot().join_or_open();
            if let Some(cycle) = opened {
                let timer = spawn_timeout(Arc::downgrade(owner), cycle, remaining);
                state.slot().arm(cycle, timer);
            }
            (handle, opened, remaining)
        };

        if handle.wait(remaining).await == WaitOutcome::TimedOut
            && let Some(cycle) = opened
            && Instant::now() >= deadline
        {
            expire_cycle(owner, cycle);
        }
    }
}
