//! The "Attribution" integration: fetches install attribution once and
//! shares it over the bus.

use std::collections::HashMap;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use parking_lot::RwLock;
use serde_json::{Map, Value};

use crate::domain::HubEvent;
use crate::error::HubError;
use crate::readiness::{ReadyCallback, ReadySignal};
use crate::registry::{Awaitable, HostContext, Integration, Provides};

/// Registry name of [`AttributionIntegration`].
pub const ATTRIBUTION_INTEGRATION_NAME: &str = "Attribution";

/// Attribution vendor SDK.
pub trait AttributionSource: Send + Sync {
    /// Fetches the install's conversion data.
    fn fetch_conversion_data(&self) -> BoxFuture<'_, Result<Map<String, Value>, HubError>>;
}

/// Read surface handed to callers.
#[derive(Debug, Default)]
pub struct Attribution {
    conversion_data: RwLock<HashMap<String, String>>,
}

impl Attribution {
    /// String-valued conversion pairs, empty until data has arrived.
    #[must_use]
    pub fn conversion_data(&self) -> HashMap<String, String> {
        self.conversion_data.read().clone()
    }
}

/// Integration wrapping an [`AttributionSource`].
///
/// Reports ready once the fetch has finished, whether it succeeded or not.
pub struct AttributionIntegration {
    source: Arc<dyn AttributionSource>,
    attribution: Arc<Attribution>,
    signal: Arc<ReadySignal>,
}

impl AttributionIntegration {
    /// Creates the integration.
    #[must_use]
    pub fn new(source: Arc<dyn AttributionSource>) -> Self {
        Self {
            source,
            attribution: Arc::new(Attribution::default()),
            signal: Arc::new(ReadySignal::new()),
        }
    }
}

impl std::fmt::Debug for AttributionIntegration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttributionIntegration")
            .field("attribution", &self.attribution)
            .field("signal", &self.signal)
            .finish_non_exhaustive()
    }
}

impl Integration for AttributionIntegration {
    fn name(&self) -> &'static str {
        ATTRIBUTION_INTEGRATION_NAME
    }

    fn start(&self, host: &HostContext) -> Result<(), HubError> {
        let source = Arc::clone(&self.source);
        let attribution = Arc::clone(&self.attribution);
        let signal = Arc::clone(&self.signal);
        let bus = host.event_bus().clone();
        host.spawn(async move {
            match source.fetch_conversion_data().await {
                Ok(raw) => {
                    let pairs: HashMap<String, String> = raw
                        .into_iter()
                        .filter_map(|(key, value)| match value {
                            Value::String(value) => Some((key, value)),
                            _ => None,
                        })
                        .collect();
                    tracing::info!(pairs = pairs.len(), "conversion data received");
                    attribution.conversion_data.write().clone_from(&pairs);
                    bus.publish(HubEvent::ConversionDataReceived { attribution: pairs });
                }
                Err(err) => {
                    tracing::warn!(error = %err, "conversion data fetch failed");
                }
            }
            signal.mark_ready();
        });
        Ok(())
    }

    fn as_awaitable(&self) -> Option<&dyn Awaitable> {
        Some(self)
    }
}

impl Awaitable for AttributionIntegration {
    fn is_ready(&self) -> bool {
        self.signal.is_ready()
    }

    fn set_on_ready(&self, callback: ReadyCallback) {
        self.signal.set_callback(callback);
    }
}

impl Provides for AttributionIntegration {
    type Provider = Attribution;

    fn provider(&self) -> Arc<Attribution> {
        Arc::clone(&self.attribution)
    }
}
