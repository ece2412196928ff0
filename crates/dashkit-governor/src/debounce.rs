//! Trailing-edge debounce
//!
//! A [`Debouncer`] wraps a callback so a burst of calls produces a single
//! invocation, `delay` after the last call, with the last call's arguments.
//! Typical use is search-as-you-type on a dashboard filter.

use std::{
    fmt,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use tokio::{runtime::Handle, task::JoinHandle};
use tracing::{trace, warn};

type Callback<A> = Arc<dyn Fn(A) + Send + Sync>;

/// Debounced wrapper around a callback
///
/// Every [`call`](Self::call) restarts the timer. The pending timer runs on
/// the current Tokio runtime; a call made outside a runtime is dropped.
pub struct Debouncer<A> {
    delay: Duration,
    callback: Callback<A>,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl<A> fmt::Debug for Debouncer<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Debouncer")
            .field("delay", &self.delay)
            .field("pending", &self.is_pending())
            .finish()
    }
}

impl<A: Send + 'static> Debouncer<A> {
    pub fn new<F>(delay: Duration, callback: F) -> Self
    where
        F: Fn(A) + Send + Sync + 'static,
    {
        Self {
            delay,
            callback: Arc::new(callback),
            pending: Mutex::new(None),
        }
    }

    /// Schedules the callback with `args`, replacing any pending invocation
    pub fn call(&self, args: A) {
        let callback = Arc::clone(&self.callback);
        let delay = self.delay;

        let mut pending = self.lock();
        if let Some(previous) = pending.take() {
            previous.abort();
            trace!("Debounce timer restarted");
        }

        let Ok(handle) = Handle::try_current() else {
            warn!("No Tokio runtime, dropping debounced call");
            return;
        };
        *pending = Some(handle.spawn(async move {
            tokio::time::sleep(delay).await;
            callback(args);
        }));
    }

    /// Drops the pending invocation, if any
    pub fn cancel(&self) {
        if let Some(previous) = self.lock().take() {
            previous.abort();
        }
    }
}

impl<A> Debouncer<A> {
    fn lock(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns true while an invocation is scheduled but has not run
    pub fn is_pending(&self) -> bool {
        self.lock().as_ref().is_some_and(|h| !h.is_finished())
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

/// Wraps `callback` in a [`Debouncer`] with the given delay
pub fn debounce<A, F>(callback: F, delay: Duration) -> Debouncer<A>
where
    A: Send + 'static,
    F: Fn(A) + Send + Sync + 'static,
{
    Debouncer::new(delay, callback)
}
