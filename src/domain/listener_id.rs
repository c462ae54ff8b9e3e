//! Stable listener identity.
//!
//! [`ListenerId`] is a newtype wrapper around [`uuid::Uuid`] (v4). The
//! [`super::EventBus`] keys its membership table by this token rather than
//! by pointer identity, so subscribing the same listener twice is a no-op
//! and unsubscribing never depends on the listener still being alive.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity token of an event listener.
///
/// Minted once when the listener is constructed and returned unchanged by
/// [`super::HubEventListener::listener_id`] for the listener's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListenerId(uuid::Uuid);

impl ListenerId {
    /// Creates a new random `ListenerId` (UUID v4).
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Returns the inner [`uuid::Uuid`].
    #[must_use]
    pub const fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }
}

impl Default for ListenerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<uuid::Uuid> for ListenerId {
    fn from(uuid: uuid::Uuid) -> Self {
        Self(uuid)
    }
}
