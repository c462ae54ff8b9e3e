//! Named readiness barrier.
//!
//! [`ReadinessBarrier`] tracks which integration names must become ready
//! and releases waiters once they all have, or once the wait's timeout
//! elapses.
//!
//! # States
//!
//! ```text
//! Idle ──wait_until_ready──► Waiting ──mark_ready (all)──► Complete
//!                               └──────timeout──────────► (back to Idle)
//! ```
//!
//! A barrier with nothing awaited, or whose awaited set is already
//! satisfied, is `Complete` and every wait returns immediately.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;

use super::wait_slot::{WaitSlot, WaitState, deadline_after, wait_until};
use super::WaitOutcome;

/// Observable state of a barrier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BarrierPhase {
    /// Not complete and nobody is waiting.
    Idle,
    /// A wait cycle is open.
    Waiting,
    /// Every awaited name is ready (or nothing is awaited).
    Complete,
}

#[derive(Debug, Default)]
struct BarrierState {
    awaited: HashSet<String>,
    ready: HashSet<String>,
    slot: WaitSlot,
}

impl BarrierState {
    fn is_complete(&self) -> bool {
        self.awaited.is_empty() || self.ready.is_superset(&self.awaited)
    }
}

impl WaitState for BarrierState {
    fn slot(&mut self) -> &mut WaitSlot {
        &mut self.slot
    }
}

/// Barrier over a set of integration names.
///
/// Cheap to clone; clones share state. Marks are idempotent and
/// commutative, so the order in which integrations report does not matter.
#[derive(Debug, Clone, Default)]
pub struct ReadinessBarrier {
    state: Arc<Mutex<BarrierState>>,
}

impl ReadinessBarrier {
    /// Creates a barrier with nothing awaited.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `name` to the awaited set.
    ///
    /// Must be called before integrations are started.
    pub fn add_awaited(&self, name: impl Into<String>) {
        self.state.lock().awaited.insert(name.into());
    }

    /// Records that `name` is ready.
    ///
    /// Names that were never awaited are ignored. Returns `true` if this
    /// mark completed the barrier and released a pending wait.
    pub fn mark_ready(&self, name: &str) -> bool {
        let mut state = self.state.lock();
        if !state.awaited.contains(name) {
            tracing::debug!(integration = name, "ignoring readiness of non-awaited integration");
            return false;
        }
        if !state.ready.insert(name.to_string()) {
            return false;
        }
        tracing::debug!(integration = name, "integration ready");

        if !state.is_complete() {
            return false;
        }
        let released = state.slot.resolve(WaitOutcome::Ready);
        if released {
            tracing::info!(awaited = state.awaited.len(), "all awaited integrations ready");
        }
        released
    }

    /// Returns `true` if nothing is awaited or every awaited name is ready.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.state.lock().is_complete()
    }

    /// Returns the current [`BarrierPhase`].
    #[must_use]
    pub fn phase(&self) -> BarrierPhase {
        let state = self.state.lock();
        if state.is_complete() {
            BarrierPhase::Complete
        } else if state.slot.is_pending() {
            BarrierPhase::Waiting
        } else {
            BarrierPhase::Idle
        }
    }

    /// Returns `true` if `name` is in the awaited set.
    #[must_use]
    pub fn is_awaited(&self, name: &str) -> bool {
        self.state.lock().awaited.contains(name)
    }

    /// Returns the awaited names that are not ready yet, sorted.
    #[must_use]
    pub fn outstanding(&self) -> Vec<String> {
        let state = self.state.lock();
        let mut names: Vec<String> = state.awaited.difference(&state.ready).cloned().collect();
        names.sort();
        names
    }

    /// Suspends until every awaited name is ready or `timeout` elapses.
    ///
    /// Returns immediately when the barrier is already complete. A call
    /// made while another wait is pending shares its cycle, but resolves
    /// only on completion or its own `timeout`: a shorter concurrent wait
    /// timing out does not end this one.
    pub async fn wait_until_ready(&self, timeout: Duration) -> WaitOutcome {
        let deadline = deadline_after(timeout);
        let outcome =
            wait_until(&self.state, deadline, |state: &mut BarrierState| state.is_complete()).await;
        if outcome == WaitOutcome::TimedOut {
            tracing::warn!(
                outstanding = ?self.outstanding(),
                ?timeout,
                "readiness wait timed out; proceeding without full readiness"
            );
        }
        outcome
    }
}
