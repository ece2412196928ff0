//! DashKit Governor - client-side request throttling
//!
//! Keeps the dashboard from flooding the backend:
//!
//! - [`limiter`] - Global sliding-window limiter and per-endpoint minimum-interval guard
//! - [`queue`] - FIFO queue running at most N requests at once
//! - [`debounce`] - Collapses bursts of calls into one trailing invocation
//! - [`governor`] - [`RequestGovernor`], all of the above built from configuration
//!
//! Limiters never fail, they only answer yes or no. Callers decide what to do
//! with a denial.

pub mod debounce;
pub mod governor;
pub mod limiter;
pub mod queue;

pub use debounce::{debounce, Debouncer};
pub use governor::RequestGovernor;
pub use limiter::{EndpointRateLimiter, SlidingWindowLimiter};
pub use queue::{QueueError, QueuedRequest, RequestQueue};
