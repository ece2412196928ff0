//! Concurrency-bounded request queue
//!
//! [`RequestQueue`] runs submitted jobs in FIFO start order with at most
//! `concurrency` of them active at once. Submission is synchronous; the
//! returned [`QueuedRequest`] resolves with the job's own output.
//!
//! ```text
//! add(job) ──> pending: [j4, j5, j6] ──(active < N)──> spawn ──> settle ──> drain
//! ```
//!
//! Each running job holds an active slot. The slot is released when the job
//! finishes or panics, which starts the next pending job.

use std::{
    collections::VecDeque,
    fmt,
    future::Future,
    pin::Pin,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    task::{Context, Poll},
};

use thiserror::Error;
use tokio::{runtime::Handle, sync::oneshot};
use tracing::{debug, warn};

type BoxFuture = Pin<Box<dyn Future<Output = ()> + Send>>;
type Job = Box<dyn FnOnce() -> BoxFuture + Send>;

/// Errors surfaced to the submitter of a queued job
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueueError {
    /// The job ended without producing a value (it panicked or its task was
    /// torn down with the runtime)
    #[error("Queued request was dropped before completing")]
    Dropped,
}

#[derive(Default)]
struct QueueState {
    active: usize,
    pending: VecDeque<Job>,
}

struct Inner {
    concurrency: usize,
    state: Mutex<QueueState>,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// FIFO queue with a fixed concurrency ceiling
///
/// Cloning is cheap and clones share the same queue.
#[derive(Clone)]
pub struct RequestQueue {
    inner: Arc<Inner>,
}

impl fmt::Debug for RequestQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.lock();
        f.debug_struct("RequestQueue")
            .field("concurrency", &self.inner.concurrency)
            .field("active", &state.active)
            .field("pending", &state.pending.len())
            .finish()
    }
}

impl RequestQueue {
    /// Creates a queue running at most `concurrency` jobs at once
    ///
    /// A ceiling of zero is raised to one.
    pub fn new(concurrency: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                concurrency: concurrency.max(1),
                state: Mutex::new(QueueState::default()),
            }),
        }
    }

    /// Enqueues `thunk` and starts it as soon as a slot is free
    ///
    /// The job is queued before this returns, whether or not the returned
    /// future is ever polled. Dropping the future does not cancel the job.
    /// Jobs are spawned on the current Tokio runtime.
    pub fn add<F, Fut, T>(&self, thunk: F) -> QueuedRequest<T>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let job: Job = Box::new(move || -> BoxFuture {
            Box::pin(async move {
                let output = thunk().await;
                // Submitter may have dropped its handle
                let _ = tx.send(output);
            })
        });

        {
            let mut state = self.inner.lock();
            state.pending.push_back(job);
            debug!(
                active = state.active,
                pending = state.pending.len(),
                "Request queued"
            );
        }
        drain(&self.inner);

        QueuedRequest { rx }
    }

    /// Jobs currently running
    pub fn active_count(&self) -> usize {
        self.inner.lock().active
    }

    /// Jobs waiting for a slot
    pub fn pending_count(&self) -> usize {
        self.inner.lock().pending.len()
    }

    /// The concurrency ceiling
    pub fn concurrency(&self) -> usize {
        self.inner.concurrency
    }
}

/// Starts pending jobs while slots are free
fn drain(inner: &Arc<Inner>) {
    let handle = match Handle::try_current() {
        Ok(handle) => handle,
        Err(_) => {
            warn!("No Tokio runtime available, queued requests stay pending");
            return;
        }
    };

    loop {
        let job = {
            let mut state = inner.lock();
            if state.active >= inner.concurrency {
                return;
            }
            let Some(job) = state.pending.pop_front() else {
                return;
            };
            state.active += 1;
            job
        };

        let slot = ActiveSlot {
            inner: Arc::clone(inner),
        };
        handle.spawn(async move {
            let _slot = slot;
            job().await;
        });
    }
}

/// Holds one unit of concurrency for a running job
struct ActiveSlot {
    inner: Arc<Inner>,
}

impl Drop for ActiveSlot {
    fn drop(&mut self) {
        {
            let mut state = self.inner.lock();
            state.active = state.active.saturating_sub(1);
        }
        drain(&self.inner);
    }
}

/// Handle to a queued job's output
///
/// Resolves to `Ok(output)` once the job completes, or
/// [`QueueError::Dropped`] if it ended without producing one.
#[must_use = "the job runs regardless, but its output is only available through this handle"]
pub struct QueuedRequest<T> {
    rx: oneshot::Receiver<T>,
}

impl<T> fmt::Debug for QueuedRequest<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueuedRequest").finish_non_exhaustive()
    }
}

impl<T> Future for QueuedRequest<T> {
    type Output = Result<T, QueueError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|result| result.map_err(|_| QueueError::Dropped))
    }
}
