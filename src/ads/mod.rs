//! Full-screen ad inventory.
//!
//! One slot per [`AdKind`], filled through the [`AdNetwork`] vendor seam,
//! retried with [`RetryPolicy`] backoff, awaited as a bitmask of
//! [`AdTypes`], and presented one at a time by [`AdInventoryManager`].
//! [`AdsIntegration`] plugs the manager into the integration registry.

pub mod ad_kind;
pub mod backoff;
pub mod clock;
pub mod config;
pub mod integration;
pub mod inventory;
pub mod manager;
pub mod network;
pub mod simulated;

pub use ad_kind::{AdKind, AdTypes};
pub use backoff::RetryPolicy;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::AdsConfig;
pub use integration::{ADS_INTEGRATION_NAME, AdsIntegration};
pub use inventory::AdInventory;
pub use manager::{AdInventoryManager, PresentationOutcome};
pub use network::{AdNetwork, BannerSize, BannerView, LoadedAd, PresentationContext, PresentationSink};
pub use simulated::{PresentBehavior, SimulatedBanner, SimulatedNetwork};
