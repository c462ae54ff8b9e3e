//! Service layer: integrations that talk to each other only through the
//! [`super::domain::EventBus`].
//!
//! [`AnalyticsIntegration`] publishes custom events and purchases,
//! [`AttributionIntegration`] publishes install attribution, and each
//! [`RelayIntegration`] forwards the events its tracker cares about.

pub mod analytics;
pub mod attribution;
pub mod relay;

pub use analytics::{ANALYTICS_INTEGRATION_NAME, Analytics, AnalyticsIntegration};
pub use attribution::{ATTRIBUTION_INTEGRATION_NAME, Attribution, AttributionIntegration, AttributionSource};
pub use relay::{EventSink, RelayIntegration};
