//! integration-hub demo host.
//!
//! Wires the ads, attribution, analytics, and revenue-relay integrations
//! against in-process vendor stand-ins, waits for readiness, then shows a
//! couple of ads.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use serde_json::{Map, Value, json};
use tracing_subscriber::EnvFilter;

use integration_hub::ads::{
    AdKind, AdsConfig, AdsIntegration, BannerSize, PresentBehavior, PresentationContext,
    SimulatedNetwork,
};
use integration_hub::config::HubConfig;
use integration_hub::domain::{EventBus, HubEvent};
use integration_hub::error::HubError;
use integration_hub::registry::{HostContext, IntegrationRegistry};
use integration_hub::service::{
    AnalyticsIntegration, AttributionIntegration, AttributionSource, EventSink, RelayIntegration,
};

/// Attribution stand-in answering after a short delay.
struct DemoAttribution;

impl AttributionSource for DemoAttribution {
    fn fetch_conversion_data(&self) -> BoxFuture<'_, Result<Map<String, Value>, HubError>> {
        Box::pin(async {
            tokio::time::sleep(Duration::from_millis(300)).await;
            match json!({"af_status": "Non-organic", "media_source": "demo", "is_first_launch": true}) {
                Value::Object(map) => Ok(map),
                _ => Err(HubError::Vendor("malformed conversion data".to_owned())),
            }
        })
    }
}

/// Logs purchases the way a revenue tracker SDK would receive them.
struct RevenueLog;

impl EventSink for RevenueLog {
    fn accepts(&self, event: &HubEvent) -> bool {
        matches!(event, HubEvent::SuccessPurchase { .. })
    }

    fn deliver(&self, event: &HubEvent) {
        tracing::info!(event = %serde_json::to_string(event).unwrap_or_default(), "revenue tracked");
    }
}

/// Fills in demo unit ids where the environment left them empty.
fn demo_ads(mut ads: AdsConfig) -> AdsConfig {
    for kind in AdKind::ALL {
        if ads.unit_for(kind).is_empty() {
            ads = ads.with_unit(kind, format!("demo-{kind}"));
        }
    }
    if ads.banner_unit().is_empty() {
        ads = ads.with_banner_unit("demo-banner");
    }
    ads
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = HubConfig::from_env()?;
    let ads_config = demo_ads(config.ads.clone());
    tracing::info!(
        ready_timeout = ?config.ready_timeout,
        ads = %ads_config.configured_kinds(),
        "starting integration-hub demo"
    );

    // Vendor stand-ins
    let network = SimulatedNetwork::new().with_latency(Duration::from_millis(500));
    network.fail_next_loads(AdKind::Rewarded, 1);
    network.set_behavior(AdKind::Rewarded, PresentBehavior::DismissWithReward);

    // Register integrations
    let bus = EventBus::new();
    let mut registry = IntegrationRegistry::new();
    registry.register(Arc::new(AdsIntegration::new(ads_config, Arc::new(network))), true)?;
    registry.register(Arc::new(AttributionIntegration::new(Arc::new(DemoAttribution))), true)?;
    registry.register(Arc::new(AnalyticsIntegration::new()), false)?;
    registry.register(
        Arc::new(RelayIntegration::new("RevenueRelay", Arc::new(RevenueLog))),
        true,
    )?;

    let host = HostContext::current(bus)?;
    let started = registry.start(&host);
    tracing::info!(started, integrations = ?registry.names(), "integrations started");

    let outcome = registry.wait_until_ready(config.ready_timeout).await;
    tracing::info!(
        ?outcome,
        outstanding = ?registry.barrier().outstanding(),
        "readiness wait finished"
    );

    // Use the providers
    let Some(ads) = registry.provider::<AdsIntegration>() else {
        anyhow::bail!("ads integration not registered");
    };
    let Some(attribution) = registry.provider::<AttributionIntegration>() else {
        anyhow::bail!("attribution integration not registered");
    };
    let Some(analytics) = registry.provider::<AnalyticsIntegration>() else {
        anyhow::bail!("analytics integration not registered");
    };
    tracing::info!(data = ?attribution.conversion_data(), "attribution");

    ads.wait_until_ready(ads.config().configured_kinds(), Duration::from_secs(5))
        .await;
    let shown = ads.show_interstitial(&PresentationContext::root()).await;
    tracing::info!(?shown, "interstitial");

    if ads.show_rewarded(&PresentationContext::surface("shop")).await {
        analytics.track_success_purchase(0.99, "USD");
    }
    analytics.track_event(
        "demo_finished",
        HashMap::from([("ready".to_owned(), json!(outcome.is_ready()))]),
    );

    match ads.create_banner(&PresentationContext::root(), BannerSize::Adaptive { width: 390 }) {
        Ok(banner) => tracing::info!(unit = banner.unit_id(), "banner created"),
        Err(err) => tracing::warn!(error = %err, "banner unavailable"),
    }

    Ok(())
}
