//! Vendor seam: the ad network SDK the inventory drives.
//!
//! The inventory never talks to a concrete SDK. It loads units through
//! [`AdNetwork`], presents them through [`LoadedAd`], and learns how the
//! presentation ended through a [`PresentationSink`].

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures_util::future::BoxFuture;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use super::AdKind;
use crate::error::HubError;

/// Where a full-screen ad or banner should appear.
///
/// `None` means the host's root surface; the vendor resolves it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresentationContext {
    surface: Option<String>,
}

impl PresentationContext {
    /// The host's root surface.
    #[must_use]
    pub const fn root() -> Self {
        Self { surface: None }
    }

    /// A named surface.
    #[must_use]
    pub fn surface(name: impl Into<String>) -> Self {
        Self {
            surface: Some(name.into()),
        }
    }

    /// The surface name, or `None` for the root surface.
    #[must_use]
    pub fn surface_name(&self) -> Option<&str> {
        self.surface.as_deref()
    }
}

/// Standard banner sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "size")]
pub enum BannerSize {
    /// 320x50.
    Banner,
    /// 320x100.
    LargeBanner,
    /// 300x250.
    MediumRectangle,
    /// Full-width banner sized by the vendor for `width`.
    Adaptive {
        /// Available width in points.
        width: u32,
    },
}

/// A live banner returned by the vendor. Opaque to the hub.
pub trait BannerView: Send + Sync + fmt::Debug {
    /// Unit identifier the banner was created for.
    fn unit_id(&self) -> &str;
}

/// A fetched, presentable ad unit.
pub trait LoadedAd: Send + Sync {
    /// Starts presenting on `context`.
    ///
    /// The presentation's lifecycle is reported through `sink`; dropping
    /// the sink without reporting counts as a failure.
    ///
    /// # Errors
    ///
    /// Returns an error if presentation could not start at all.
    fn present(&self, context: &PresentationContext, sink: PresentationSink)
    -> Result<(), HubError>;
}

/// Ad network SDK.
pub trait AdNetwork: Send + Sync {
    /// One-time SDK initialization.
    fn initialize(&self) -> BoxFuture<'_, Result<(), HubError>>;

    /// Fetches one unit of `kind` from `unit_id`.
    fn load(&self, kind: AdKind, unit_id: String)
    -> BoxFuture<'_, Result<Arc<dyn LoadedAd>, HubError>>;

    /// Creates a banner. No inventory is kept for banners.
    ///
    /// # Errors
    ///
    /// Returns the vendor's error if the banner could not be created.
    fn create_banner(
        &self,
        unit_id: &str,
        context: &PresentationContext,
        size: BannerSize,
    ) -> Result<Box<dyn BannerView>, HubError>;
}

/// How a presentation ended, as reported by the vendor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PresentationEnd {
    Dismissed { rewarded: bool },
    Failed(String),
}

#[derive(Debug)]
struct SinkInner {
    rewarded: AtomicBool,
    done: Mutex<Option<oneshot::Sender<PresentationEnd>>>,
}

/// Reporter handed to [`LoadedAd::present`].
///
/// Cloneable so a vendor delegate can keep it. Only the first terminal
/// report ([`dismissed`](Self::dismissed) or [`failed`](Self::failed))
/// counts.
#[derive(Debug, Clone)]
pub struct PresentationSink {
    inner: Arc<SinkInner>,
}

impl PresentationSink {
    pub(crate) fn channel() -> (Self, oneshot::Receiver<PresentationEnd>) {
        let (tx, rx) = oneshot::channel();
        let sink = Self {
            inner: Arc::new(SinkInner {
                rewarded: AtomicBool::new(false),
                done: Mutex::new(Some(tx)),
            }),
        };
        (sink, rx)
    }

    /// The user earned the reward. Only meaningful for rewarded ads.
    pub fn reward_earned(&self) {
        self.inner.rewarded.store(true, Ordering::Release);
    }

    /// The ad was dismissed.
    pub fn dismissed(&self) {
        let rewarded = self.inner.rewarded.load(Ordering::Acquire);
        self.finish(PresentationEnd::Dismissed { rewarded });
    }

    /// The ad failed to present.
    pub fn failed(&self, reason: impl Into<String>) {
        self.finish(PresentationEnd::Failed(reason.into()));
    }

    /// Returns `true` once a terminal report was made.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.inner.done.lock().is_none()
    }

    fn finish(&self, end: PresentationEnd) {
        if let Some(tx) = self.inner.done.lock().take() {
            let _ = tx.send(end);
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_terminal_report_wins() {
        let (sink, rx) = PresentationSink::channel();
        sink.reward_earned();
        sink.dismissed();
        sink.failed("late");
        assert!(sink.is_finished());

        let Ok(end) = rx.await else {
            panic!("sink reported");
        };
        assert_eq!(end, PresentationEnd::Dismissed { rewarded: true });
    }

    #[tokio::test]
    async fn dropped_sink_closes_the_channel() {
        let (sink, rx) = PresentationSink::channel();
        drop(sink);
        assert!(rx.await.is_err());
    }

    #[test]
    fn root_context_has_no_surface() {
        assert_eq!(PresentationContext::root().surface_name(), None);
        assert_eq!(
            PresentationContext::surface("shop").surface_name(),
            Some("shop")
        );
    }
}
