//! The "Ads" integration: wires the inventory manager into the registry.

use std::sync::Arc;

use tracing::{debug, warn};

use super::{AdInventoryManager, AdNetwork, AdsConfig};
use crate::error::HubError;
use crate::readiness::{ReadyCallback, ReadySignal};
use crate::registry::{Awaitable, HostContext, Integration, Provides};

/// Registry name of [`AdsIntegration`].
pub const ADS_INTEGRATION_NAME: &str = "Ads";

/// Integration owning the [`AdInventoryManager`].
///
/// On start it initializes the vendor SDK, requests every configured kind
/// and reports ready. If [`AdsConfig::await_types`] is non-empty it first
/// waits for those kinds (bounded by [`AdsConfig::await_timeout`]) and
/// reports ready on timeout too.
#[derive(Debug)]
pub struct AdsIntegration {
    manager: Arc<AdInventoryManager>,
    signal: Arc<ReadySignal>,
}

impl AdsIntegration {
    /// Creates the integration.
    #[must_use]
    pub fn new(config: AdsConfig, network: Arc<dyn AdNetwork>) -> Self {
        Self::from_manager(AdInventoryManager::new(config, network))
    }

    /// Wraps an existing manager.
    #[must_use]
    pub fn from_manager(manager: AdInventoryManager) -> Self {
        Self {
            manager: Arc::new(manager),
            signal: Arc::new(ReadySignal::new()),
        }
    }
}

impl Integration for AdsIntegration {
    fn name(&self) -> &'static str {
        ADS_INTEGRATION_NAME
    }

    fn start(&self, host: &HostContext) -> Result<(), HubError> {
        let manager = Arc::clone(&self.manager);
        let signal = Arc::clone(&self.signal);
        host.spawn(async move {
            if let Err(err) = manager.initialize().await {
                warn!(error = %err, kind = err.kind_str(), "ad network initialization failed");
            }
            manager.load_all();

            let config = manager.config();
            if !config.await_types.is_empty() {
                let outcome = manager
                    .wait_until_ready(config.await_types, config.await_timeout)
                    .await;
                debug!(?outcome, types = %config.await_types, "initial ad wait finished");
            }
            signal.mark_ready();
        });
        Ok(())
    }

    fn as_awaitable(&self) -> Option<&dyn Awaitable> {
        Some(self)
    }
}

impl Awaitable for AdsIntegration {
    fn is_ready(&self) -> bool {
        self.signal.is_ready()
    }

    fn set_on_ready(&self, callback: ReadyCallback) {
        self.signal.set_callback(callback);
    }
}

impl Provides for AdsIntegration {
    type Provider = AdInventoryManager;

    fn provider(&self) -> Arc<AdInventoryManager> {
        Arc::clone(&self.manager)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::ads::{AdKind, AdTypes, SimulatedNetwork};
    use crate::domain::EventBus;

    fn host() -> HostContext {
        let Ok(host) = HostContext::current(EventBus::new()) else {
            panic!("inside runtime");
        };
        host
    }

    #[tokio::test(start_paused = true)]
    async fn ready_right_after_requesting_loads() {
        let network = SimulatedNetwork::new().with_latency(Duration::from_secs(5));
        let config = AdsConfig::default().with_unit(AdKind::Interstitial, "int");
        let ads = AdsIntegration::new(config, Arc::new(network.clone()));

        let Ok(()) = ads.start(&host()) else {
            panic!("start succeeds");
        };
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert!(ads.is_ready());
        assert!(!ads.provider().is_interstitial_ready());
        assert_eq!(network.load_calls(AdKind::Interstitial), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn awaited_types_delay_readiness() {
        let network = SimulatedNetwork::new().with_latency(Duration::from_secs(2));
        let config = AdsConfig::default()
            .with_unit(AdKind::Rewarded, "rw")
            .with_await(AdTypes::REWARDED, Duration::from_secs(10));
        let ads = AdsIntegration::new(config, Arc::new(network));
        let Ok(()) = ads.start(&host()) else {
            panic!("start succeeds");
        };

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(!ads.is_ready());
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(ads.is_ready());
        assert!(ads.provider().is_rewarded_ready());
    }

    #[tokio::test(start_paused = true)]
    async fn ready_on_timeout_and_after_init_failure() {
        let network = SimulatedNetwork::new();
        network.fail_initialize("sdk offline");
        network.fail_next_loads(AdKind::Interstitial, u32::MAX);
        let config = AdsConfig::default()
            .with_unit(AdKind::Interstitial, "int")
            .with_await(AdTypes::INTERSTITIAL, Duration::from_secs(3));
        let ads = AdsIntegration::new(config, Arc::new(network));
        let Ok(()) = ads.start(&host()) else {
            panic!("start succeeds");
        };

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(!ads.is_ready());
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(ads.is_ready());
    }
}
