//! Token persistence adapters
//!
//! Implementations of [`ITokenStore`] for the persisted token slot:
//!
//! - [`MemoryTokenStore`] - process memory, used in tests and ephemeral sessions
//! - [`FileTokenStore`] - a single opaque string in a file
//! - [`KeyringTokenStore`] - the OS credential store via `keyring`
//!
//! Every store holds exactly one value under a well-known key; there is no
//! other schema.

use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, PoisonError},
};

use anyhow::{Context, Result};
use dashkit_core::{
    config::{AuthConfig, TokenStorageKind},
    domain::AccessToken,
    ports::ITokenStore,
};
use tracing::{debug, info};

/// Keyring service name for the persisted token
const KEYRING_SERVICE: &str = "dashkit";

/// Well-known key the token is stored under
pub const TOKEN_KEY: &str = "auth_token";

// ============================================================================
// MemoryTokenStore
// ============================================================================

/// Keeps the token in process memory
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    slot: Mutex<Option<AccessToken>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that already holds `token`
    pub fn with_token(token: AccessToken) -> Self {
        Self {
            slot: Mutex::new(Some(token)),
        }
    }
}

impl ITokenStore for MemoryTokenStore {
    fn load(&self) -> Result<Option<AccessToken>> {
        Ok(self
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn save(&self, token: &AccessToken) -> Result<()> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(token.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

// ============================================================================
// FileTokenStore
// ============================================================================

/// Stores the token as the sole content of a file
///
/// The file is created with owner-only permissions on Unix.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ITokenStore for FileTokenStore {
    fn load(&self) -> Result<Option<AccessToken>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No persisted token file");
                return Ok(None);
            }
            Err(e) => {
                return Err(anyhow::Error::new(e).context(format!(
                    "Failed to read token file {}",
                    self.path.display()
                )))
            }
        };

        let content = content.trim();
        if content.is_empty() {
            return Ok(None);
        }
        let token = AccessToken::new(content).context("Token file holds an invalid token")?;
        Ok(Some(token))
    }

    fn save(&self, token: &AccessToken) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create token directory {}", parent.display())
            })?;
        }
        std::fs::write(&self.path, token.as_str())
            .with_context(|| format!("Failed to write token file {}", self.path.display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))
                .context("Failed to restrict token file permissions")?;
        }

        debug!(path = %self.path.display(), "Persisted token to file");
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(path = %self.path.display(), "Removed token file");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(anyhow::Error::new(e).context("Failed to remove token file")),
        }
    }
}

// ============================================================================
// KeyringTokenStore
// ============================================================================

/// Stores the token in the system keyring
///
/// Uses the `keyring` crate to reach the OS credential store (GNOME Keyring,
/// KDE Wallet, macOS Keychain). Service name is "dashkit", username is the
/// token key.
#[derive(Debug, Clone)]
pub struct KeyringTokenStore {
    service: String,
}

impl KeyringTokenStore {
    pub fn new() -> Self {
        Self {
            service: KEYRING_SERVICE.to_string(),
        }
    }

    /// Uses a custom keyring service name (separate profiles, tests)
    pub fn with_service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self) -> Result<keyring::Entry> {
        keyring::Entry::new(&self.service, TOKEN_KEY).context("Failed to create keyring entry")
    }
}

impl Default for KeyringTokenStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ITokenStore for KeyringTokenStore {
    fn load(&self) -> Result<Option<AccessToken>> {
        match self.entry()?.get_password() {
            Ok(secret) => {
                let token =
                    AccessToken::new(secret).context("Keyring holds an invalid token")?;
                debug!(service = %self.service, "Loaded token from keyring");
                Ok(Some(token))
            }
            Err(keyring::Error::NoEntry) => {
                debug!(service = %self.service, "No token found in keyring");
                Ok(None)
            }
            Err(e) => Err(anyhow::Error::new(e).context("Failed to read from keyring")),
        }
    }

    fn save(&self, token: &AccessToken) -> Result<()> {
        self.entry()?
            .set_password(token.as_str())
            .context("Failed to store token in keyring")?;
        debug!(service = %self.service, "Stored token in keyring");
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match self.entry()?.delete_credential() {
            Ok(()) => {
                info!(service = %self.service, "Cleared token from keyring");
                Ok(())
            }
            Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(anyhow::Error::new(e).context("Failed to delete from keyring")),
        }
    }
}

/// Builds the token store selected by `auth.token_storage`
pub fn token_store_from_config(config: &AuthConfig) -> Arc<dyn ITokenStore> {
    match config.token_storage {
        TokenStorageKind::Memory => Arc::new(MemoryTokenStore::new()),
        TokenStorageKind::File => Arc::new(FileTokenStore::new(&config.token_file)),
        TokenStorageKind::Keyring => Arc::new(KeyringTokenStore::new()),
    }
}
