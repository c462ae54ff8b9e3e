//! Process-wide publish/subscribe channel for [`HubEvent`]s.
//!
//! [`EventBus`] keeps a membership table keyed by [`ListenerId`] and holds
//! only [`Weak`] references, so membership never keeps a listener alive.
//! Vendor SDK callbacks may publish from any thread: membership mutation is
//! serialized by a lock, but listener code always runs with the lock
//! released, so a listener may itself subscribe, unsubscribe or publish.

use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use super::{HubEvent, ListenerId};

/// Receiver side of the bus.
///
/// `handle` runs synchronously on the publisher's thread and must return
/// quickly; listeners that need to do real work should hand the event off
/// to their own task.
pub trait HubEventListener: Send + Sync {
    /// Stable identity of this listener.
    fn listener_id(&self) -> ListenerId;

    /// Reacts to a published event.
    fn handle(&self, event: &HubEvent);
}

type Members = HashMap<ListenerId, Weak<dyn HubEventListener>>;

/// Fan-out bus for [`HubEvent`]s.
///
/// Cheap to clone; all clones share one membership table.
#[derive(Debug, Clone, Default)]
pub struct EventBus {
    listeners: Arc<RwLock<Members>>,
}

impl EventBus {
    /// Creates an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a non-owning reference to `listener`.
    ///
    /// Subscribing the same identity twice keeps a single entry, so the
    /// listener still receives each event once.
    pub fn subscribe<L>(&self, listener: &Arc<L>) -> ListenerId
    where
        L: HubEventListener + 'static,
    {
        let id = listener.listener_id();
        let weak = Arc::downgrade(listener);
        let weak: Weak<dyn HubEventListener> = weak;
        self.listeners.write().insert(id, weak);
        tracing::debug!(listener = %id, "listener subscribed");
        id
    }

    /// Like [`EventBus::subscribe`], but returns a guard that unsubscribes
    /// the listener when dropped.
    pub fn subscribe_scoped<L>(&self, listener: &Arc<L>) -> Subscription
    where
        L: HubEventListener + 'static,
    {
        let id = self.subscribe(listener);
        Subscription {
            members: Arc::downgrade(&self.listeners),
            id,
        }
    }

    /// Removes the listener with the given identity. No-op if absent.
    pub fn unsubscribe(&self, id: ListenerId) {
        if self.listeners.write().remove(&id).is_some() {
            tracing::debug!(listener = %id, "listener unsubscribed");
        }
    }

    /// Delivers `event` once to every listener subscribed when the call
    /// begins.
    ///
    /// A listener unsubscribed while delivery is in progress is skipped, as
    /// is one that has been dropped. A panicking listener is logged and
    /// does not stop delivery to the rest.
    ///
    /// Returns the number of listeners that handled the event.
    pub fn publish(&self, event: HubEvent) -> usize {
        let snapshot: Vec<(ListenerId, Weak<dyn HubEventListener>)> = self
            .listeners
            .read()
            .iter()
            .map(|(id, weak)| (*id, Weak::clone(weak)))
            .collect();

        let mut delivered = 0;
        let mut stale = Vec::new();
        for (id, weak) in snapshot {
            if !self.listeners.read().contains_key(&id) {
                continue;
            }
            let Some(listener) = weak.upgrade() else {
                stale.push(id);
                continue;
            };
            match catch_unwind(AssertUnwindSafe(|| listener.handle(&event))) {
                Ok(()) => delivered += 1,
                Err(_) => tracing::warn!(
                    listener = %id,
                    event_type = event.event_type_str(),
                    "listener panicked while handling event"
                ),
            }
        }

        if !stale.is_empty() {
            let mut members = self.listeners.write();
            for id in stale {
                if members.get(&id).is_some_and(|weak| weak.strong_count() == 0) {
                    members.remove(&id);
                }
            }
        }

        delivered
    }

    /// Returns the number of registered entries, including entries whose
    /// listener has been dropped but not yet pruned by a publish.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    /// Returns `true` if the identity is currently registered.
    #[must_use]
    pub fn is_subscribed(&self, id: ListenerId) -> bool {
        self.listeners.read().contains_key(&id)
    }
}

/// Scoped bus membership returned by [`EventBus::subscribe_scoped`].
#[derive(Debug)]
#[must_use = "dropping a Subscription unsubscribes the listener"]
pub struct Subscription {
    members: Weak<RwLock<Members>>,
    id: ListenerId,
}

impl Subscription {
    /// Identity of the subscribed listener.
    #[must_use]
    pub const fn id(&self) -> ListenerId {
        self.id
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(members) = self.members.upgrade() {
            members.write().remove(&self.id);
        }
    }
}
