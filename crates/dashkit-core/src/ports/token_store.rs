//! Token store port (driven/secondary port)
//!
//! Defines the persisted slot holding the access token between runs.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because errors at port boundaries are adapter-specific.
//!   Callers treat persistence as best-effort and only log failures.
//! - Synchronous: every known backend (file, OS keyring, memory) is blocking
//!   and cheap, and the token is read on the request path.

use crate::domain::AccessToken;

/// Persisted storage for a single access token
pub trait ITokenStore: Send + Sync {
    /// Loads the persisted token, `None` when nothing is stored
    fn load(&self) -> anyhow::Result<Option<AccessToken>>;

    /// Persists the token, replacing any previous value
    fn save(&self, token: &AccessToken) -> anyhow::Result<()>;

    /// Removes the persisted token. Must succeed when nothing is stored.
    fn clear(&self) -> anyhow::Result<()>;
}
