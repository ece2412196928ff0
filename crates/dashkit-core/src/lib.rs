//! DashKit Core - Configuration, domain types and port definitions
//!
//! This crate holds everything the client and governor crates share:
//! - **Configuration** - `Config` loaded from YAML, with validation and a builder
//! - **Domain newtypes** - `AccessToken`, `Email`
//! - **Port definitions** - Traits for adapters: `ITokenStore`, `INavigator`
//!
//! # Architecture
//!
//! The domain module is pure and has no I/O. Ports define the boundaries
//! that adapter crates (token persistence, navigation) implement.

pub mod config;
pub mod domain;
pub mod ports;
