//! DashKit Client - Authenticated HTTP client for the dashboard API
//!
//! Provides an async client that:
//! - Attaches the current bearer token to every request
//! - Coordinates a single in-flight token refresh when requests hit a 401
//! - Retries each logical request at most once after a refresh
//! - Signs the user out (clear token, navigate to login) when recovery fails
//!
//! ## Modules
//!
//! - [`client`] - [`ApiClient`](client::ApiClient), the request pipeline
//! - [`request`] - [`ApiRequest`](request::ApiRequest) descriptor and builders
//! - [`refresh`] - Single-flight refresh coordination
//! - [`storage`] - Token persistence adapters (memory, file, keyring)
//! - [`navigator`] - In-process navigator used for forced sign-out
//! - [`auth`] - Login, registration and logout flows

pub mod auth;
pub mod client;
pub mod navigator;
pub mod refresh;
pub mod request;
pub mod storage;

use reqwest::StatusCode;
use thiserror::Error;

/// Errors that can occur when talking to the dashboard API
#[derive(Debug, Error)]
pub enum ApiError {
    /// No response was received (connection, TLS, timeout, ...)
    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a non-success status other than 401
    #[error("HTTP {status}: {body}")]
    Status {
        /// Response status code
        status: StatusCode,
        /// Response body, as text
        body: String,
    },

    /// Authentication failed and could not be recovered by a refresh
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The response was well-formed JSON but missing expected data
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The response body could not be decoded
    #[error("Failed to decode response body: {0}")]
    Decode(#[from] serde_json::Error),

    /// The configured base URL or request path is not a valid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    /// HTTP status associated with this error, if a response was received
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Transport(e) => e.status(),
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Unauthorized(_) => Some(StatusCode::UNAUTHORIZED),
            _ => None,
        }
    }

    /// Returns true for an unrecoverable authentication failure
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized(_))
    }
}
