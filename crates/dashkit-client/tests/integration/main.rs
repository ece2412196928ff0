//! Integration tests for dashkit-client
//!
//! Uses wiremock to simulate the dashboard API and verifies end-to-end
//! behavior of the ApiClient: token attachment, single-flight refresh,
//! retry-once, forced sign-out and the auth flows.

mod common;

mod test_auth;
mod test_refresh;
mod test_requests;
