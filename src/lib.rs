//! # integration-hub
//!
//! Startup and coordination layer for third-party SDK integrations in a
//! client application.
//!
//! The host registers integrations (ads, attribution, analytics, trackers),
//! starts them once, and waits (bounded) until the ones it cares about
//! report ready. Integrations never call each other; they exchange events
//! over a process-wide bus. The ads integration keeps one preloaded unit per
//! full-screen ad kind, retries failed loads with backoff, and presents at
//! most one ad at a time.
//!
//! ## Architecture
//!
//! ```text
//! Host (main.rs)
//!     │
//!     ├── HubConfig (config)
//!     │
//!     ├── IntegrationRegistry (registry/)
//!     │     └── ReadinessBarrier (readiness/)
//!     │
//!     ├── AdsIntegration ──► AdInventoryManager (ads/) ──► AdNetwork (vendor seam)
//!     ├── AttributionIntegration, AnalyticsIntegration, RelayIntegration (service/)
//!     │
//!     └── EventBus (domain/)
//! ```

pub mod ads;
pub mod config;
pub mod domain;
pub mod error;
pub mod readiness;
pub mod registry;
pub mod service;

pub use config::HubConfig;
pub use domain::{EventBus, HubEvent};
pub use error::HubError;
pub use readiness::WaitOutcome;
pub use registry::{HostContext, IntegrationRegistry};
