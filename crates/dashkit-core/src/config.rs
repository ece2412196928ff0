//! Configuration module for DashKit.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, validation, defaults, and a builder pattern for programmatic use.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for DashKit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub auth: AuthConfig,
    pub rate_limiting: RateLimitingConfig,
    pub logging: LoggingConfig,
}

/// Backend API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL every request path is appended to.
    pub base_url: String,
    /// Path of the token refresh endpoint.
    pub refresh_path: String,
    /// Application path of the login entry point (forced sign-out target).
    pub login_path: String,
}

/// Where the access token is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenStorageKind {
    /// Process memory only; lost on exit.
    Memory,
    /// Plain file under the data directory.
    File,
    /// OS credential store (Secret Service, Keychain, ...).
    Keyring,
}

/// Authentication / token persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Token persistence backend.
    pub token_storage: TokenStorageKind,
    /// Token file used when `token_storage` is `file`.
    pub token_file: PathBuf,
}

/// Request governor settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitingConfig {
    /// Maximum requests admitted inside one sliding window.
    pub max_requests: u32,
    /// Sliding window length in milliseconds.
    pub window_ms: u64,
    /// Minimum milliseconds between permitted calls to the same endpoint.
    pub endpoint_min_interval_ms: u64,
    /// Maximum queued requests running at once.
    pub queue_concurrency: u32,
    /// Collapse window for debounced UI-triggered calls, in milliseconds.
    pub debounce_ms: u64,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
}

impl RateLimitingConfig {
    /// Sliding window as a [`Duration`].
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }

    /// Per-endpoint minimum interval as a [`Duration`].
    pub fn endpoint_min_interval(&self) -> Duration {
        Duration::from_millis(self.endpoint_min_interval_ms)
    }

    /// Debounce delay as a [`Duration`].
    pub fn debounce_delay(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

// ---------------------------------------------------------------------------
// Config::load()
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/dashkit/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("dashkit")
            .join("config.yaml")
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api".to_string(),
            refresh_path: "/auth/refresh".to_string(),
            login_path: "/login".to_string(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("~/.local/share"))
            .join("dashkit");
        Self {
            token_storage: TokenStorageKind::File,
            token_file: data_dir.join("auth_token"),
        }
    }
}

impl Default for RateLimitingConfig {
    fn default() -> Self {
        Self {
            max_requests: 10,
            window_ms: 1_000,
            endpoint_min_interval_ms: 1_000,
            queue_concurrency: 3,
            debounce_ms: 300,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"api.base_url"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- api ---
        match url::Url::parse(&self.api.base_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(url) => errors.push(ValidationError {
                field: "api.base_url".into(),
                message: format!("unsupported scheme '{}'; use http or https", url.scheme()),
            }),
            Err(e) => errors.push(ValidationError {
                field: "api.base_url".into(),
                message: format!("invalid URL '{}': {e}", self.api.base_url),
            }),
        }
        for (field, value) in [
            ("api.refresh_path", &self.api.refresh_path),
            ("api.login_path", &self.api.login_path),
        ] {
            if !value.starts_with('/') {
                errors.push(ValidationError {
                    field: field.into(),
                    message: format!("must start with '/': {value}"),
                });
            }
        }

        // --- auth ---
        if self.auth.token_storage == TokenStorageKind::File
            && self.auth.token_file.as_os_str().is_empty()
        {
            errors.push(ValidationError {
                field: "auth.token_file".into(),
                message: "must be set when token_storage is 'file'".into(),
            });
        }

        // --- rate_limiting ---
        if self.rate_limiting.max_requests == 0 {
            errors.push(ValidationError {
                field: "rate_limiting.max_requests".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.rate_limiting.window_ms == 0 {
            errors.push(ValidationError {
                field: "rate_limiting.window_ms".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.rate_limiting.endpoint_min_interval_ms == 0 {
            errors.push(ValidationError {
                field: "rate_limiting.endpoint_min_interval_ms".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.rate_limiting.queue_concurrency == 0 {
            errors.push(ValidationError {
                field: "rate_limiting.queue_concurrency".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.rate_limiting.debounce_ms == 0 {
            errors.push(ValidationError {
                field: "rate_limiting.debounce_ms".into(),
                message: "must be greater than 0".into(),
            });
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "invalid level '{}'; valid options: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Builder for constructing a [`Config`] programmatically.
///
/// Starts from [`Config::default`] and allows selective overrides.
///
/// # Example
///
/// ```rust,no_run
/// use dashkit_core::config::{ConfigBuilder, TokenStorageKind};
///
/// let config = ConfigBuilder::new()
///     .api_base_url("https://dashboard.example.com/api")
///     .auth_token_storage(TokenStorageKind::Keyring)
///     .logging_level("debug")
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder initialised with [`Config::default`] values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    // --- api ---

    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.api.base_url = url.into();
        self
    }

    pub fn api_refresh_path(mut self, path: impl Into<String>) -> Self {
        self.config.api.refresh_path = path.into();
        self
    }

    pub fn api_login_path(mut self, path: impl Into<String>) -> Self {
        self.config.api.login_path = path.into();
        self
    }

    // --- auth ---

    pub fn auth_token_storage(mut self, kind: TokenStorageKind) -> Self {
        self.config.auth.token_storage = kind;
        self
    }

    pub fn auth_token_file(mut self, file: PathBuf) -> Self {
        self.config.auth.token_file = file;
        self
    }

    // --- rate_limiting ---

    pub fn rate_limiting_max_requests(mut self, n: u32) -> Self {
        self.config.rate_limiting.max_requests = n;
        self
    }

    pub fn rate_limiting_window_ms(mut self, ms: u64) -> Self {
        self.config.rate_limiting.window_ms = ms;
        self
    }

    pub fn rate_limiting_endpoint_min_interval_ms(mut self, ms: u64) -> Self {
        self.config.rate_limiting.endpoint_min_interval_ms = ms;
        self
    }

    pub fn rate_limiting_queue_concurrency(mut self, n: u32) -> Self {
        self.config.rate_limiting.queue_concurrency = n;
        self
    }

    pub fn rate_limiting_debounce_ms(mut self, ms: u64) -> Self {
        self.config.rate_limiting.debounce_ms = ms;
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    // --- build ---

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate in one step. Returns `Err` with the list of
    /// validation errors if the configuration is invalid.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
