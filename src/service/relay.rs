//! Event relay integration: forwards selected bus events to a tracker.
//!
//! A relay stands in for a downstream tracker SDK (an analytics backend,
//! a revenue tracker). It owns its bus membership through a
//! [`Subscription`], so dropping the relay also unsubscribes it.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::domain::{HubEvent, HubEventListener, ListenerId, Subscription};
use crate::error::HubError;
use crate::readiness::{ReadyCallback, ReadySignal};
use crate::registry::{Awaitable, HostContext, Integration};

/// Downstream tracker fed by a [`RelayIntegration`].
pub trait EventSink: Send + Sync {
    /// Whether this sink wants `event`.
    fn accepts(&self, event: &HubEvent) -> bool;

    /// Receives an accepted event. Runs on the publisher's thread.
    fn deliver(&self, event: &HubEvent);
}

struct RelayListener {
    id: ListenerId,
    sink: Arc<dyn EventSink>,
}

impl HubEventListener for RelayListener {
    fn listener_id(&self) -> ListenerId {
        self.id
    }

    fn handle(&self, event: &HubEvent) {
        if self.sink.accepts(event) {
            self.sink.deliver(event);
        }
    }
}

/// Awaitable integration that is ready as soon as it has subscribed.
pub struct RelayIntegration {
    name: &'static str,
    listener: Arc<RelayListener>,
    subscription: Mutex<Option<Subscription>>,
    signal: ReadySignal,
}

impl RelayIntegration {
    /// Creates a relay registered under `name`.
    #[must_use]
    pub fn new(name: &'static str, sink: Arc<dyn EventSink>) -> Self {
        Self {
            name,
            listener: Arc::new(RelayListener {
                id: ListenerId::new(),
                sink,
            }),
            subscription: Mutex::new(None),
            signal: ReadySignal::new(),
        }
    }

    /// Bus identity of the relay.
    #[must_use]
    pub fn listener_id(&self) -> ListenerId {
        self.listener.id
    }

    /// Leaves the bus. The relay stays ready.
    pub fn detach(&self) {
        self.subscription.lock().take();
    }
}

impl std::fmt::Debug for RelayIntegration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayIntegration")
            .field("name", &self.name)
            .field("listener", &self.listener.id)
            .field("subscribed", &self.subscription.lock().is_some())
            .field("signal", &self.signal)
            .finish()
    }
}

impl Integration for RelayIntegration {
    fn name(&self) -> &'static str {
        self.name
    }

    fn start(&self, host: &HostContext) -> Result<(), HubError> {
        let subscription = host.event_bus().subscribe_scoped(&self.listener);
        *self.subscription.lock() = Some(subscription);
        tracing::debug!(integration = self.name, listener = %self.listener.id, "relay attached");
        self.signal.mark_ready();
        Ok(())
    }

    fn as_awaitable(&self) -> Option<&dyn Awaitable> {
        Some(self)
    }
}

impl Awaitable for RelayIntegration {
    fn is_ready(&self) -> bool {
        self.signal.is_ready()
    }

    fn set_on_ready(&self, callback: ReadyCallback) {
        self.signal.set_callback(callback);
    }
}
