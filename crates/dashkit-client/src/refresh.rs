//! Single-flight token refresh coordination
//!
//! When several requests hit a 401 at the same time, only one refresh call
//! may go out. The first caller starts it on a detached task; everyone
//! (the first caller included) then waits on a one-shot channel for the
//! outcome. Waiters are notified in arrival order and all see the same value
//! (`Some(token)` or `None`).
//!
//! ```text
//! request A ──401──┐
//! request B ──401──┼──> RefreshCoordinator ──(one call)──> POST /auth/refresh
//! request C ──401──┘           │
//!                              └── same outcome to A, B, C
//! ```
//!
//! The refresh runs to completion even if the caller that started it stops
//! waiting, so the remaining waiters still get its real outcome. The state
//! returns to idle as soon as the refresh settles, so a later 401 starts a
//! fresh cycle.

use std::{
    future::Future,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use dashkit_core::domain::AccessToken;
use tokio::{runtime::Handle, sync::oneshot};
use tracing::{debug, info, warn};

type Outcome = Option<AccessToken>;

#[derive(Debug, Default)]
struct RefreshState {
    /// A refresh network call is outstanding
    in_flight: bool,
    /// Callers waiting on the outstanding refresh, in arrival order
    waiters: Vec<oneshot::Sender<Outcome>>,
}

fn lock(state: &Mutex<RefreshState>) -> MutexGuard<'_, RefreshState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Coordinates token refreshes so at most one is in flight
#[derive(Debug, Default)]
pub struct RefreshCoordinator {
    state: Arc<Mutex<RefreshState>>,
}

impl RefreshCoordinator {
    /// Creates an idle coordinator
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true while a refresh is outstanding
    pub fn is_refreshing(&self) -> bool {
        lock(&self.state).in_flight
    }

    /// Number of callers currently waiting on the outstanding refresh
    pub fn waiting(&self) -> usize {
        lock(&self.state).waiters.len()
    }

    /// Starts `refresh` unless one is already in flight, then waits for the
    /// outcome of whichever refresh is outstanding.
    ///
    /// The in-flight check and the flag update happen in one critical
    /// section, so two callers can never both start a refresh. The refresh
    /// future is spawned on the current runtime and is not cancelled when
    /// this call is dropped. Outside a runtime it runs inline.
    pub async fn run<F, Fut>(&self, refresh: F) -> Outcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Outcome> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let start = {
            let mut state = lock(&self.state);
            state.waiters.push(tx);
            !std::mem::replace(&mut state.in_flight, true)
        };

        if start {
            info!("Starting token refresh");
            let mut settle = Settle {
                state: self.state.clone(),
                settled: false,
            };
            let fut = refresh();
            let task = async move {
                let outcome = fut.await;
                settle.finish(outcome);
            };
            match Handle::try_current() {
                Ok(handle) => {
                    handle.spawn(task);
                }
                Err(_) => {
                    warn!("No Tokio runtime, running token refresh inline");
                    task.await;
                }
            }
        } else {
            debug!("Refresh already in flight, waiting for its outcome");
        }

        // A dropped sender means the refresh task itself died
        rx.await.unwrap_or(None)
    }
}

/// Delivers the outcome and returns the coordinator to idle. If the refresh
/// task panics or its runtime shuts down, waiters are released with `None`.
struct Settle {
    state: Arc<Mutex<RefreshState>>,
    settled: bool,
}

impl Settle {
    fn finish(&mut self, outcome: Outcome) {
        self.settled = true;
        self.release(outcome);
    }

    fn release(&self, outcome: Outcome) {
        let waiters = {
            let mut state = lock(&self.state);
            state.in_flight = false;
            std::mem::take(&mut state.waiters)
        };

        info!(
            refreshed = outcome.is_some(),
            waiting = waiters.len(),
            "Token refresh settled"
        );

        for waiter in waiters {
            // Receiver gone means that caller stopped waiting
            let _ = waiter.send(outcome.clone());
        }
    }
}

impl Drop for Settle {
    fn drop(&mut self) {
        if !self.settled {
            debug!("Token refresh task ended without an outcome");
            self.release(None);
        }
    }
}
