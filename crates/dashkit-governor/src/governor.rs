//! Request governor facade
//!
//! [`RequestGovernor`] bundles the global window, the per-endpoint guard, the
//! request queue and the debounce delay, all built from
//! [`RateLimitingConfig`]. One governor is shared by the whole process.

use std::{future::Future, sync::Arc, time::Duration};

use dashkit_core::{config::RateLimitingConfig, domain::Endpoint};
use tracing::info;

use crate::{
    debounce::Debouncer,
    limiter::{EndpointRateLimiter, SlidingWindowLimiter},
    queue::{QueuedRequest, RequestQueue},
};

#[derive(Debug)]
pub struct RequestGovernor {
    endpoints: EndpointRateLimiter,
    queue: RequestQueue,
    debounce_delay: Duration,
}

impl RequestGovernor {
    pub fn from_config(config: &RateLimitingConfig) -> Self {
        let global = Arc::new(SlidingWindowLimiter::new(
            config.max_requests as usize,
            config.window(),
        ));
        info!(
            max_requests = config.max_requests,
            window_ms = config.window_ms,
            endpoint_min_interval_ms = config.endpoint_min_interval_ms,
            queue_concurrency = config.queue_concurrency,
            "Request governor initialized"
        );

        Self {
            endpoints: EndpointRateLimiter::new(config.endpoint_min_interval(), global),
            queue: RequestQueue::new(config.queue_concurrency as usize),
            debounce_delay: config.debounce_delay(),
        }
    }

    /// Permits a call to `endpoint` under both the endpoint interval and the
    /// global window
    pub fn check_rate_limit(&self, endpoint: &Endpoint) -> bool {
        self.endpoints.check_rate_limit(endpoint)
    }

    pub fn remaining_requests(&self) -> usize {
        self.endpoints.remaining_requests()
    }

    pub fn next_available_in(&self) -> Duration {
        self.endpoints.next_available_in()
    }

    /// Submits `thunk` to the bounded queue
    pub fn queue_request<F, Fut, T>(&self, thunk: F) -> QueuedRequest<T>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        self.queue.add(thunk)
    }

    /// Wraps `callback` in a debouncer using the configured delay
    pub fn debounce<A, F>(&self, callback: F) -> Debouncer<A>
    where
        A: Send + 'static,
        F: Fn(A) + Send + Sync + 'static,
    {
        Debouncer::new(self.debounce_delay, callback)
    }

    pub fn limiter(&self) -> &Arc<SlidingWindowLimiter> {
        self.endpoints.global()
    }

    pub fn queue(&self) -> &RequestQueue {
        &self.queue
    }
}

impl Default for RequestGovernor {
    fn default() -> Self {
        Self::from_config(&RateLimitingConfig::default())
    }
}
