//! Domain layer: event vocabulary, listener identity and the event bus.
//!
//! These types have no dependency on the registry or the ad inventory;
//! every integration can publish to and listen on the bus.

pub mod event_bus;
pub mod hub_event;
pub mod listener_id;

pub use event_bus::{EventBus, HubEventListener, Subscription};
pub use hub_event::HubEvent;
pub use listener_id::ListenerId;
