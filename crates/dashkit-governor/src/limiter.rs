//! Rate limiters
//!
//! ## Architecture
//!
//! - [`SlidingWindowLimiter`]: at most `max_requests` grants in any trailing
//!   `window`. One instance is shared by the whole process.
//! - [`EndpointRateLimiter`]: a per-endpoint minimum interval in front of the
//!   global window. An endpoint call must pass both.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::{sync::Arc, time::Duration};
//!
//! use dashkit_core::domain::Endpoint;
//! use dashkit_governor::{EndpointRateLimiter, SlidingWindowLimiter};
//!
//! # async fn example() -> Result<(), dashkit_core::domain::DomainError> {
//! let global = Arc::new(SlidingWindowLimiter::new(10, Duration::from_secs(1)));
//! let guard = EndpointRateLimiter::new(Duration::from_secs(1), global);
//! let revenue = Endpoint::new("/analytics/revenue")?;
//! if guard.check_rate_limit(&revenue) {
//!     // ... make API call ...
//! }
//! # Ok(())
//! # }
//! ```

use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use dashkit_core::domain::Endpoint;
use tokio::time::Instant;
use tracing::debug;

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

// ============================================================================
// SlidingWindowLimiter
// ============================================================================

/// Global sliding-window rate limiter
///
/// Keeps the timestamps of granted requests. A timestamp counts against the
/// budget until it is `window` old.
#[derive(Debug)]
pub struct SlidingWindowLimiter {
    max_requests: usize,
    window: Duration,
    /// Grant timestamps, oldest first
    granted: Mutex<VecDeque<Instant>>,
}

impl SlidingWindowLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            granted: Mutex::new(VecDeque::with_capacity(max_requests)),
        }
    }

    pub fn max_requests(&self) -> usize {
        self.max_requests
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Locks the window and drops timestamps that have aged out
    fn pruned(&self, now: Instant) -> MutexGuard<'_, VecDeque<Instant>> {
        let mut granted = self.granted.lock().unwrap_or_else(PoisonError::into_inner);
        while let Some(&oldest) = granted.front() {
            if now.duration_since(oldest) >= self.window {
                granted.pop_front();
            } else {
                break;
            }
        }
        granted
    }

    /// Grants and records a request if the window has room
    ///
    /// A denial records nothing.
    pub fn can_make_request(&self) -> bool {
        let now = Instant::now();
        let mut granted = self.pruned(now);
        if granted.len() < self.max_requests {
            granted.push_back(now);
            true
        } else {
            debug!(
                max_requests = self.max_requests,
                window_ms = millis(self.window),
                "Global rate limit reached"
            );
            false
        }
    }

    /// Time until the oldest recorded grant leaves the window
    ///
    /// Zero when nothing is recorded. Diagnostic only.
    pub fn next_available_in(&self) -> Duration {
        let now = Instant::now();
        let granted = self.pruned(now);
        match granted.front() {
            Some(&oldest) => self.window.saturating_sub(now.duration_since(oldest)),
            None => Duration::ZERO,
        }
    }

    /// Grants left in the current window
    pub fn remaining(&self) -> usize {
        let granted = self.pruned(Instant::now());
        self.max_requests.saturating_sub(granted.len())
    }
}

// ============================================================================
// EndpointRateLimiter
// ============================================================================

/// Per-endpoint minimum-interval guard in front of a global window
///
/// Endpoints whose interval has elapsed are dropped from the map on every
/// check, so it only ever holds endpoints called within the last
/// `min_interval`.
#[derive(Debug)]
pub struct EndpointRateLimiter {
    min_interval: Duration,
    global: Arc<SlidingWindowLimiter>,
    last_call: Mutex<HashMap<Endpoint, Instant>>,
}

impl EndpointRateLimiter {
    pub fn new(min_interval: Duration, global: Arc<SlidingWindowLimiter>) -> Self {
        Self {
            min_interval,
            global,
            last_call: Mutex::new(HashMap::new()),
        }
    }

    /// The shared global limiter
    pub fn global(&self) -> &Arc<SlidingWindowLimiter> {
        &self.global
    }

    /// Permits a call to `endpoint` if its minimum interval has elapsed and
    /// the global window has room
    ///
    /// A denial from either check leaves both the endpoint clock and the
    /// global window untouched.
    pub fn check_rate_limit(&self, endpoint: &Endpoint) -> bool {
        let now = Instant::now();
        let mut last_call = self.last_call.lock().unwrap_or_else(PoisonError::into_inner);
        last_call.retain(|_, at| now.duration_since(*at) < self.min_interval);

        if let Some(at) = last_call.get(endpoint) {
            debug!(
                endpoint = %endpoint,
                wait_ms = millis(self.min_interval.saturating_sub(now.duration_since(*at))),
                "Endpoint called too recently"
            );
            return false;
        }

        if !self.global.can_make_request() {
            return false;
        }

        last_call.insert(endpoint.clone(), now);
        true
    }

    /// Grants left in the global window
    pub fn remaining_requests(&self) -> usize {
        self.global.remaining()
    }

    /// See [`SlidingWindowLimiter::next_available_in`]
    pub fn next_available_in(&self) -> Duration {
        self.global.next_available_in()
    }

    /// Number of endpoints currently inside their minimum interval
    pub fn tracked_endpoints(&self) -> usize {
        let now = Instant::now();
        let mut last_call = self.last_call.lock().unwrap_or_else(PoisonError::into_inner);
        last_call.retain(|_, at| now.duration_since(*at) < self.min_interval);
        last_call.len()
    }
}
