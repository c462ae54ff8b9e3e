//! Ordered store of integrations plus the readiness barrier they feed.
//!
//! [`IntegrationRegistry`] owns the registration list. Registration order
//! fixes start order. On [`IntegrationRegistry::start`] every awaitable
//! integration has its ready sink wired to the [`ReadinessBarrier`] before
//! its own `start` runs, so readiness reported synchronously from inside
//! `start` is never lost.

use std::any::{Any, TypeId};
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use super::integration::{HostContext, Integration, Provides};
use crate::error::HubError;
use crate::readiness::{ReadinessBarrier, WaitOutcome};

struct Registered {
    name: &'static str,
    type_id: TypeId,
    integration: Arc<dyn Integration>,
    typed: Arc<dyn Any + Send + Sync>,
    await_ready: bool,
}

impl fmt::Debug for Registered {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registered")
            .field("name", &self.name)
            .field("await_ready", &self.await_ready)
            .finish_non_exhaustive()
    }
}

/// Registry of integrations.
///
/// # Concurrency
///
/// Registration and start take `&mut self` and are meant to run on the
/// host's setup path. Waiting only needs `&self`, and the barrier is
/// shared with the ready callbacks, which may fire from any thread.
#[derive(Debug, Default)]
pub struct IntegrationRegistry {
    entries: Vec<Registered>,
    barrier: ReadinessBarrier,
    started: bool,
}

impl IntegrationRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `integration`. With `await_ready`, its name joins the
    /// readiness barrier's awaited set.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::InvalidConfig`] if the registry has already
    /// been started.
    pub fn register<I>(&mut self, integration: Arc<I>, await_ready: bool) -> Result<(), HubError>
    where
        I: Integration + 'static,
    {
        let name = integration.name();
        if self.started {
            return Err(HubError::InvalidConfig(format!(
                "integration {name} registered after start"
            )));
        }
        if await_ready {
            self.barrier.add_awaited(name);
        }

        let concrete: Arc<I> = Arc::clone(&integration);
        let typed: Arc<dyn Any + Send + Sync> = concrete;
        self.entries.push(Registered {
            name,
            type_id: TypeId::of::<I>(),
            integration,
            typed,
            await_ready,
        });
        tracing::debug!(integration = name, await_ready, "integration registered");
        Ok(())
    }

    /// Starts every registered integration in registration order.
    ///
    /// A failing or panicking integration is logged and skipped; the rest
    /// still start. Calling this a second time does nothing.
    ///
    /// Returns the number of integrations that started without error.
    pub fn start(&mut self, host: &HostContext) -> usize {
        if self.started {
            tracing::warn!("integration registry already started");
            return 0;
        }
        self.started = true;

        let mut started = 0;
        for entry in &self.entries {
            let name = entry.name;
            if let Some(awaitable) = entry.integration.as_awaitable() {
                let barrier = self.barrier.clone();
                awaitable.set_on_ready(Box::new(move || {
                    barrier.mark_ready(name);
                }));
                if awaitable.is_ready() {
                    self.barrier.mark_ready(name);
                }
            }

            match catch_unwind(AssertUnwindSafe(|| entry.integration.start(host))) {
                Ok(Ok(())) => {
                    started += 1;
                    tracing::info!(integration = name, "integration started");
                }
                Ok(Err(err)) => tracing::warn!(
                    integration = name,
                    error = %err,
                    error_kind = err.kind_str(),
                    "integration failed to start"
                ),
                Err(_) => tracing::warn!(integration = name, "integration panicked during start"),
            }
        }
        started
    }

    /// Returns the first registered integration of type `I`.
    #[must_use]
    pub fn integration<I>(&self) -> Option<Arc<I>>
    where
        I: Integration + 'static,
    {
        let wanted = TypeId::of::<I>();
        self.entries
            .iter()
            .filter(|entry| entry.type_id == wanted)
            .find_map(|entry| Arc::clone(&entry.typed).downcast::<I>().ok())
    }

    /// Returns the provider of the first registered integration of type
    /// `I`.
    #[must_use]
    pub fn provider<I>(&self) -> Option<Arc<I::Provider>>
    where
        I: Provides + 'static,
    {
        self.integration::<I>().map(|integration| integration.provider())
    }

    /// Suspends until every awaited integration is ready or `timeout`
    /// elapses.
    pub async fn wait_until_ready(&self, timeout: Duration) -> WaitOutcome {
        self.barrier.wait_until_ready(timeout).await
    }

    /// Callback flavour of [`IntegrationRegistry::wait_until_ready`].
    ///
    /// Must be called from within a tokio runtime.
    pub fn wait_until_ready_with<F>(&self, timeout: Duration, completion: F) -> JoinHandle<()>
    where
        F: FnOnce(WaitOutcome) + Send + 'static,
    {
        let barrier = self.barrier.clone();
        tokio::spawn(async move {
            let outcome = barrier.wait_until_ready(timeout).await;
            completion(outcome);
        })
    }

    /// The readiness barrier driven by this registry.
    #[must_use]
    pub const fn barrier(&self) -> &ReadinessBarrier {
        &self.barrier
    }

    /// Registered names in start order.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.entries.iter().map(|entry| entry.name).collect()
    }

    /// Returns `true` once [`IntegrationRegistry::start`] has run.
    #[must_use]
    pub const fn is_started(&self) -> bool {
        self.started
    }

    /// Number of registered integrations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use parking_lot::Mutex;

    use super::*;
    use crate::domain::EventBus;
    use crate::readiness::{ReadyCallback, ReadySignal};
    use crate::registry::Awaitable;

    /// Records the global start order into a shared log.
    struct Plain {
        name: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
        fail: bool,
    }

    impl Integration for Plain {
        fn name(&self) -> &'static str {
            self.name
        }

        fn start(&self, _host: &HostContext) -> Result<(), HubError> {
            self.log.lock().push(self.name);
            if self.fail {
                return Err(HubError::StartFailed {
                    integration: self.name,
                    reason: "refused".to_string(),
                });
            }
            Ok(())
        }
    }

    impl Provides for Plain {
        type Provider = str;

        fn provider(&self) -> Arc<str> {
            Arc::from(self.name)
        }
    }

    /// Becomes ready synchronously inside `start`.
    struct Eager {
        signal: ReadySignal,
        starts: AtomicUsize,
    }

    impl Integration for Eager {
        fn name(&self) -> &'static str {
            "Eager"
        }

        fn start(&self, _host: &HostContext) -> Result<(), HubError> {
            self.starts.fetch_add(1, Ordering::SeqCst);
            self.signal.mark_ready();
            Ok(())
        }

        fn as_awaitable(&self) -> Option<&dyn Awaitable> {
            Some(self)
        }
    }

    impl Awaitable for Eager {
        fn is_ready(&self) -> bool {
            self.signal.is_ready()
        }

        fn set_on_ready(&self, callback: ReadyCallback) {
            self.signal.set_callback(callback);
        }
    }

    struct Panics;

    impl Integration for Panics {
        fn name(&self) -> &'static str {
            "Panics"
        }

        fn start(&self, _host: &HostContext) -> Result<(), HubError> {
            panic!("vendor crashed");
        }
    }

    fn host() -> HostContext {
        let Ok(host) = HostContext::current(EventBus::new()) else {
            panic!("tests run inside a runtime");
        };
        host
    }

    fn plain(name: &'static str, log: &Arc<Mutex<Vec<&'static str>>>, fail: bool) -> Arc<Plain> {
        Arc::new(Plain {
            name,
            log: Arc::clone(log),
            fail,
        })
    }

    #[tokio::test]
    async fn start_follows_registration_order_despite_failures() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = IntegrationRegistry::new();
        let _ = registry.register(plain("first", &log, false), false);
        let _ = registry.register(plain("broken", &log, true), false);
        let _ = registry.register(Arc::new(Panics), false);
        let _ = registry.register(plain("last", &log, false), false);

        let started = registry.start(&host());
        assert_eq!(started, 2);
        assert_eq!(*log.lock(), vec!["first", "broken", "last"]);
        assert_eq!(registry.names(), vec!["first", "broken", "Panics", "last"]);
    }

    #[tokio::test]
    async fn second_start_is_a_no_op() {
        let eager = Arc::new(Eager {
            signal: ReadySignal::new(),
            starts: AtomicUsize::new(0),
        });
        let mut registry = IntegrationRegistry::new();
        let _ = registry.register(Arc::clone(&eager), true);

        assert_eq!(registry.start(&host()), 1);
        assert_eq!(registry.start(&host()), 0);
        assert_eq!(eager.starts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn register_after_start_is_rejected() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = IntegrationRegistry::new();
        registry.start(&host());
        let result = registry.register(plain("late", &log, false), true);
        assert!(matches!(result, Err(HubError::InvalidConfig(_))));
        assert!(registry.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn synchronously_ready_integration_completes_barrier() {
        let mut registry = IntegrationRegistry::new();
        let _ = registry.register(
            Arc::new(Eager {
                signal: ReadySignal::new(),
                starts: AtomicUsize::new(0),
            }),
            true,
        );
        assert!(!registry.barrier().is_complete());

        registry.start(&host());
        assert!(registry.barrier().is_complete());
        let start = tokio::time::Instant::now();
        assert_eq!(
            registry.wait_until_ready(Duration::from_secs(10)).await,
            WaitOutcome::Ready
        );
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn nothing_awaited_returns_immediately() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = IntegrationRegistry::new();
        let _ = registry.register(plain("a", &log, false), false);
        registry.start(&host());

        let start = tokio::time::Instant::now();
        let outcome = registry.wait_until_ready(Duration::from_secs(3600)).await;
        assert_eq!(outcome, WaitOutcome::Ready);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test]
    async fn typed_lookup_returns_first_match() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = IntegrationRegistry::new();
        let _ = registry.register(Arc::new(Panics), false);
        let _ = registry.register(plain("one", &log, false), false);
        let _ = registry.register(plain("two", &log, false), false);

        let Some(found) = registry.integration::<Plain>() else {
            panic!("Plain should be registered");
        };
        assert_eq!(found.name(), "one");
        assert_eq!(registry.provider::<Plain>().as_deref(), Some("one"));
        assert!(registry.integration::<Eager>().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn callback_wait_reports_outcome() {
        let mut registry = IntegrationRegistry::new();
        registry.barrier().add_awaited("never");
        registry.start(&host());

        let (tx, rx) = tokio::sync::oneshot::channel();
        registry.wait_until_ready_with(Duration::from_secs(5), move |outcome| {
            let _ = tx.send(outcome);
        });
        let Ok(outcome) = rx.await else {
            panic!("completion dropped");
        };
        assert_eq!(outcome, WaitOutcome::TimedOut);
    }
}
