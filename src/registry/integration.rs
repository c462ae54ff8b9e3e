//! Integration capability traits and the host context they start in.
//!
//! An integration wraps one external capability. Every integration
//! implements [`Integration`]; those that report readiness also implement
//! [`Awaitable`] and expose it through [`Integration::as_awaitable`]. The
//! typed capability handle handed to callers comes from [`Provides`].

use std::future::Future;
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::domain::EventBus;
use crate::error::HubError;
use crate::readiness::ReadyCallback;

/// Environment passed to [`Integration::start`].
///
/// Carries the runtime integrations spawn their background work onto and
/// the shared [`EventBus`].
#[derive(Debug, Clone)]
pub struct HostContext {
    runtime: Handle,
    event_bus: EventBus,
}

impl HostContext {
    /// Creates a context from explicit parts.
    #[must_use]
    pub const fn new(runtime: Handle, event_bus: EventBus) -> Self {
        Self { runtime, event_bus }
    }

    /// Creates a context bound to the runtime the caller is running on.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::NoRuntime`] when called outside a tokio runtime.
    pub fn current(event_bus: EventBus) -> Result<Self, HubError> {
        let runtime = Handle::try_current().map_err(|_| HubError::NoRuntime)?;
        Ok(Self::new(runtime, event_bus))
    }

    /// Runtime handle for background work.
    #[must_use]
    pub const fn runtime(&self) -> &Handle {
        &self.runtime
    }

    /// Shared event bus.
    #[must_use]
    pub const fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Spawns `future` on the host runtime.
    pub fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.runtime.spawn(future)
    }
}

/// A unit wrapping one external capability.
///
/// Constructed by the host, registered once, started once by the
/// registry, and alive for the rest of the process.
pub trait Integration: Send + Sync {
    /// Stable identity, also used as the readiness barrier key.
    fn name(&self) -> &'static str;

    /// Kicks off the integration's own initialization.
    ///
    /// Fire-and-forget from the registry's point of view: long-running
    /// work should be spawned on `host`.
    ///
    /// # Errors
    ///
    /// Returns an error if initialization could not even begin. The
    /// registry logs it and starts the remaining integrations.
    fn start(&self, host: &HostContext) -> Result<(), HubError>;

    /// Returns the readiness capability, if this integration has one.
    fn as_awaitable(&self) -> Option<&dyn Awaitable> {
        None
    }
}

/// Optional readiness capability.
pub trait Awaitable: Send + Sync {
    /// `true` once the integration is usable.
    fn is_ready(&self) -> bool;

    /// Installs the sink notified on the not-ready to ready transition.
    fn set_on_ready(&self, callback: ReadyCallback);
}

/// Typed capability handle an integration hands to callers.
pub trait Provides: Integration {
    /// Public surface of the integration.
    type Provider: ?Sized + Send + Sync;

    /// Returns the provider handle.
    fn provider(&self) -> Arc<Self::Provider>;
}
