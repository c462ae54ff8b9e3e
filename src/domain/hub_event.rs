//! Domain events routed between integrations.
//!
//! Integrations never call each other directly. The attribution
//! integration publishes conversion data, the analytics provider publishes
//! purchases and custom events, and every interested tracker receives them
//! through the [`super::EventBus`].

use std::collections::HashMap;

use serde::Serialize;

/// Closed set of events carried by the bus.
///
/// Immutable once constructed; listeners receive a shared reference.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum HubEvent {
    /// Install attribution data arrived from the attribution vendor.
    ConversionDataReceived {
        /// String-valued attribution pairs.
        attribution: HashMap<String, String>,
    },

    /// A purchase completed successfully.
    SuccessPurchase {
        /// Purchase amount in `currency` units.
        amount: f64,
        /// ISO-4217 currency code.
        currency: String,
    },

    /// Free-form analytics event.
    GenericEvent {
        /// Event name.
        name: String,
        /// Arbitrary JSON parameters.
        params: HashMap<String, serde_json::Value>,
    },
}

impl HubEvent {
    /// Builds a [`HubEvent::GenericEvent`] with no parameters.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self::GenericEvent {
            name: name.into(),
            params: HashMap::new(),
        }
    }

    /// Returns the event type as a static string slice.
    #[must_use]
    pub const fn event_type_str(&self) -> &'static str {
        match self {
            Self::ConversionDataReceived { .. } => "conversion_data_received",
            Self::SuccessPurchase { .. } => "success_purchase",
            Self::GenericEvent { .. } => "generic_event",
        }
    }
}
