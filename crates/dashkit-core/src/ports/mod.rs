//! Port definitions (hexagonal architecture interfaces)
//!
//! Ports are the interfaces the client core depends on, whose
//! implementations live in adapter modules.
//!
//! ## Ports Overview
//!
//! - [`ITokenStore`] - Persisted slot for the access token (survives restarts)
//! - [`INavigator`] - Application location, used for the forced sign-out redirect

pub mod navigator;
pub mod token_store;

pub use navigator::INavigator;
pub use token_store::ITokenStore;
