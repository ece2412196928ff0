//! Domain error types
//!
//! Validation failures raised when constructing domain newtypes.

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Access token is empty or contains characters not allowed in a header
    #[error("Invalid access token: {0}")]
    InvalidToken(String),

    /// Invalid email address format
    #[error("Invalid email format: {0}")]
    InvalidEmail(String),

    /// Endpoint is not an absolute API path
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),
}
