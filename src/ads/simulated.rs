//! In-process ad network for demos and tests.
//!
//! [`SimulatedNetwork`] fills every request after a configurable latency,
//! can be told to fail a number of loads per kind, and presents units
//! according to a per-kind [`PresentBehavior`].

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use parking_lot::Mutex;

use super::{AdKind, AdNetwork, BannerSize, BannerView, LoadedAd, PresentationContext, PresentationSink};
use crate::error::HubError;

/// What a simulated unit does when presented.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PresentBehavior {
    /// Dismissed without a reward.
    #[default]
    Dismiss,
    /// Reward earned, then dismissed.
    DismissWithReward,
    /// Fails with the given reason.
    Fail(String),
    /// Stays on screen until [`SimulatedNetwork::finish_held`].
    Hold,
    /// Drops the sink without reporting.
    Vanish,
}

#[derive(Debug, Default)]
struct Script {
    latency: Duration,
    initialize_error: Option<String>,
    failures_left: HashMap<AdKind, u32>,
    behavior: HashMap<AdKind, PresentBehavior>,
    load_calls: HashMap<AdKind, u32>,
    held: Vec<PresentationSink>,
    presentations: u32,
}

/// Scriptable [`AdNetwork`].
#[derive(Debug, Clone, Default)]
pub struct SimulatedNetwork {
    script: Arc<Mutex<Script>>,
}

impl SimulatedNetwork {
    /// Creates a network that fills instantly.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every load completes after `latency`.
    #[must_use]
    pub fn with_latency(self, latency: Duration) -> Self {
        self.script.lock().latency = latency;
        self
    }

    /// The next `count` loads of `kind` fail.
    pub fn fail_next_loads(&self, kind: AdKind, count: u32) {
        self.script.lock().failures_left.insert(kind, count);
    }

    /// `initialize` fails with `reason`.
    pub fn fail_initialize(&self, reason: impl Into<String>) {
        self.script.lock().initialize_error = Some(reason.into());
    }

    /// Sets what presented units of `kind` do.
    pub fn set_behavior(&self, kind: AdKind, behavior: PresentBehavior) {
        self.script.lock().behavior.insert(kind, behavior);
    }

    /// Loads issued for `kind` so far.
    #[must_use]
    pub fn load_calls(&self, kind: AdKind) -> u32 {
        self.script.lock().load_calls.get(&kind).copied().unwrap_or(0)
    }

    /// Presentations started so far.
    #[must_use]
    pub fn presentations(&self) -> u32 {
        self.script.lock().presentations
    }

    /// Dismisses every held presentation. Returns how many there were.
    pub fn finish_held(&self, rewarded: bool) -> usize {
        let held = std::mem::take(&mut self.script.lock().held);
        for sink in &held {
            if rewarded {
                sink.reward_earned();
            }
            sink.dismissed();
        }
        held.len()
    }
}

impl AdNetwork for SimulatedNetwork {
    fn initialize(&self) -> BoxFuture<'_, Result<(), HubError>> {
        let error = self.script.lock().initialize_error.clone();
        Box::pin(async move { error.map_or(Ok(()), |reason| Err(HubError::Vendor(reason))) })
    }

    fn load(
        &self,
        kind: AdKind,
        unit_id: String,
    ) -> BoxFuture<'_, Result<Arc<dyn LoadedAd>, HubError>> {
        Box::pin(async move {
            let latency = {
                let mut script = self.script.lock();
                *script.load_calls.entry(kind).or_insert(0) += 1;
                script.latency
            };
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }

            let mut script = self.script.lock();
            if let Some(left) = script.failures_left.get_mut(&kind)
                && *left > 0
            {
                *left -= 1;
                return Err(HubError::Vendor(format!("no fill for {unit_id}")));
            }
            let ad: Arc<dyn LoadedAd> = Arc::new(SimulatedAd {
                kind,
                script: Arc::clone(&self.script),
            });
            Ok(ad)
        })
    }

    fn create_banner(
        &self,
        unit_id: &str,
        _context: &PresentationContext,
        size: BannerSize,
    ) -> Result<Box<dyn BannerView>, HubError> {
        Ok(Box::new(SimulatedBanner {
            unit_id: unit_id.to_owned(),
            size,
        }))
    }
}

struct SimulatedAd {
    kind: AdKind,
    script: Arc<Mutex<Script>>,
}

impl fmt::Debug for SimulatedAd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimulatedAd").field("kind", &self.kind).finish()
    }
}

impl LoadedAd for SimulatedAd {
    fn present(
        &self,
        _context: &PresentationContext,
        sink: PresentationSink,
    ) -> Result<(), HubError> {
        let mut script = self.script.lock();
        script.presentations += 1;
        let behavior = script.behavior.get(&self.kind).cloned().unwrap_or_default();
        match behavior {
            PresentBehavior::Dismiss => sink.dismissed(),
            PresentBehavior::DismissWithReward => {
                sink.reward_earned();
                sink.dismissed();
            }
            PresentBehavior::Fail(reason) => sink.failed(reason),
            PresentBehavior::Hold => script.held.push(sink),
            PresentBehavior::Vanish => drop(sink),
        }
        Ok(())
    }
}

/// Banner created by [`SimulatedNetwork`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulatedBanner {
    unit_id: String,
    size: BannerSize,
}

impl SimulatedBanner {
    /// Requested size.
    #[must_use]
    pub const fn size(&self) -> BannerSize {
        self.size
    }
}

impl BannerView for SimulatedBanner {
    fn unit_id(&self) -> &str {
        &self.unit_id
    }
}
