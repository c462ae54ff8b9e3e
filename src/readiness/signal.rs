//! One-shot readiness flag with a settable notification sink.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

/// Zero-argument notification invoked when an integration becomes ready.
pub type ReadyCallback = Box<dyn Fn() + Send + Sync>;

/// Readiness flag embedded by awaitable integrations.
///
/// The flag only ever moves from `false` to `true`. The installed callback
/// fires on that transition and never again; installing a callback after
/// the transition does not fire it, so whoever wires it must also check
/// [`ReadySignal::is_ready`].
#[derive(Default)]
pub struct ReadySignal {
    ready: AtomicBool,
    callback: Mutex<Option<Arc<dyn Fn() + Send + Sync>>>,
}

impl ReadySignal {
    /// Creates a signal in the not-ready state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` once [`ReadySignal::mark_ready`] has been called.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Installs (or replaces) the notification sink.
    pub fn set_callback(&self, callback: ReadyCallback) {
        *self.callback.lock() = Some(Arc::from(callback));
    }

    /// Flips the flag and notifies the sink. Returns `false` if the signal
    /// was already ready.
    pub fn mark_ready(&self) -> bool {
        if self.ready.swap(true, Ordering::AcqRel) {
            return false;
        }
        // Invoke outside the lock; the callback may re-enter.
        let callback = self.callback.lock().as_ref().map(Arc::clone);
        if let Some(callback) = callback {
            callback();
        }
        true
    }
}

impl fmt::Debug for ReadySignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadySignal")
            .field("ready", &self.is_ready())
            .field("has_callback", &self.callback.lock().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;

    #[test]
    fn callback_fires_once_on_transition() {
        let signal = ReadySignal::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        signal.set_callback(Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        assert!(!signal.is_ready());
        assert!(signal.mark_ready());
        assert!(!signal.mark_ready());
        assert!(signal.is_ready());
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn late_callback_is_not_fired() {
        let signal = ReadySignal::new();
        signal.mark_ready();

        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        signal.set_callback(Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }
}
