//! Domain types
//!
//! This module contains the core value types shared across DashKit:
//! - Newtypes for access tokens, email addresses and API endpoints
//! - Domain-specific error types

pub mod errors;
pub mod newtypes;

// Re-export commonly used types
pub use errors::DomainError;
pub use newtypes::*;
