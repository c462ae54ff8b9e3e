//! The "Analytics" integration: publishes custom events and purchases.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use crate::domain::{EventBus, HubEvent};
use crate::error::HubError;
use crate::registry::{HostContext, Integration, Provides};

/// Registry name of [`AnalyticsIntegration`].
pub const ANALYTICS_INTEGRATION_NAME: &str = "Analytics";

/// Publishing surface handed to callers.
///
/// Events go to whatever trackers are listening on the bus. Before the
/// integration has started there is no bus yet and events are dropped.
#[derive(Debug, Default)]
pub struct Analytics {
    bus: OnceLock<EventBus>,
}

impl Analytics {
    /// Publishes a custom event. Returns how many listeners handled it.
    pub fn track_event(&self, name: impl Into<String>, params: HashMap<String, serde_json::Value>) -> usize {
        self.publish(HubEvent::GenericEvent {
            name: name.into(),
            params,
        })
    }

    /// Publishes a custom event without parameters.
    pub fn track(&self, name: impl Into<String>) -> usize {
        self.publish(HubEvent::named(name))
    }

    /// Publishes a completed purchase.
    pub fn track_success_purchase(&self, amount: f64, currency: impl Into<String>) -> usize {
        self.publish(HubEvent::SuccessPurchase {
            amount,
            currency: currency.into(),
        })
    }

    fn publish(&self, event: HubEvent) -> usize {
        let Some(bus) = self.bus.get() else {
            tracing::debug!(
                event_type = event.event_type_str(),
                "analytics not started; event dropped"
            );
            return 0;
        };
        bus.publish(event)
    }
}

/// Integration exposing [`Analytics`]. Not awaitable.
#[derive(Debug, Default)]
pub struct AnalyticsIntegration {
    analytics: Arc<Analytics>,
}

impl AnalyticsIntegration {
    /// Creates the integration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Integration for AnalyticsIntegration {
    fn name(&self) -> &'static str {
        ANALYTICS_INTEGRATION_NAME
    }

    fn start(&self, host: &HostContext) -> Result<(), HubError> {
        if self.analytics.bus.set(host.event_bus().clone()).is_err() {
            tracing::debug!("analytics already bound to a bus");
        }
        Ok(())
    }
}

impl Provides for AnalyticsIntegration {
    type Provider = Analytics;

    fn provider(&self) -> Arc<Analytics> {
        Arc::clone(&self.analytics)
    }
}
