//! Authenticated client for the dashboard API
//!
//! [`ApiClient`] wraps `reqwest::Client` with bearer-token attachment and a
//! 401 recovery pipeline:
//!
//! 1. Attach the current token unless the request brings its own `Authorization`.
//! 2. On 401, ask the [`RefreshCoordinator`] for a fresh token (one refresh
//!    call no matter how many requests failed at once).
//! 3. Re-issue the original request once with the new token.
//! 4. If recovery is impossible, clear the token and send the user to the
//!    login path.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use dashkit_client::{client::ApiClient, navigator::SessionNavigator, storage::MemoryTokenStore};
//! use dashkit_core::config::ApiConfig;
//!
//! # async fn example() -> Result<(), dashkit_client::ApiError> {
//! let client = ApiClient::new(
//!     &ApiConfig::default(),
//!     Arc::new(MemoryTokenStore::new()),
//!     Arc::new(SessionNavigator::default()),
//! )?;
//! client.set_token("abc123");
//! let revenue: serde_json::Value = client.get("/analytics/revenue").await?;
//! println!("{revenue}");
//! # Ok(())
//! # }
//! ```

use std::sync::{Arc, PoisonError, RwLock};

use dashkit_core::{
    config::ApiConfig,
    domain::AccessToken,
    ports::{INavigator, ITokenStore},
};
use reqwest::{
    header::{HeaderValue, AUTHORIZATION},
    Client, StatusCode,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, info, warn};
use url::Url;

use crate::{refresh::RefreshCoordinator, request::ApiRequest, ApiError};

// ============================================================================
// Response types
// ============================================================================

/// Body returned by the refresh endpoint
#[derive(Debug, Deserialize)]
struct RefreshResponse {
    #[serde(alias = "accessToken")]
    access_token: String,
}

// ============================================================================
// Session
// ============================================================================

/// Connection and token state shared with the detached refresh task
struct Session {
    /// The underlying HTTP client (cookie store enabled for the refresh cookie)
    http: Client,
    /// Base URL every relative path is appended to
    base_url: String,
    /// Path of the token refresh endpoint
    refresh_path: String,
    /// In-memory default token, attached to every request
    token: RwLock<Option<AccessToken>>,
    /// Persisted token slot
    store: Arc<dyn ITokenStore>,
}

impl Session {
    fn token(&self) -> Option<AccessToken> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Token to attach: the in-memory slot, falling back to the persisted one
    fn current_token(&self) -> Option<AccessToken> {
        if let Some(token) = self.token() {
            return Some(token);
        }
        match self.store.load() {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "Failed to read persisted access token");
                None
            }
        }
    }

    fn set_access_token(&self, token: AccessToken) {
        if let Err(e) = self.store.save(&token) {
            warn!(error = %e, "Failed to persist access token");
        }
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = Some(token);
        debug!("Updated access token");
    }

    fn clear_token(&self) {
        self.token
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Err(e) = self.store.clear() {
            warn!(error = %e, "Failed to clear persisted access token");
        }
        debug!("Cleared access token");
    }

    /// Resolves `path` against the base URL; absolute URLs pass through
    fn url_for(&self, path: &str) -> Result<Url, ApiError> {
        let raw = if path.contains("://") {
            path.to_string()
        } else if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        };
        Url::parse(&raw).map_err(|e| ApiError::InvalidUrl(format!("{raw}: {e}")))
    }

    /// Transmits `request` once, mapping 401 to [`ApiError::Unauthorized`]
    async fn send_once(&self, request: &ApiRequest) -> Result<Vec<u8>, ApiError> {
        let url = self.url_for(&request.path)?;
        let mut builder = self
            .http
            .request(request.method.clone(), url)
            .headers(request.headers.clone());

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if !request.has_authorization() {
            if let Some(token) = self.current_token() {
                builder = builder.bearer_auth(token.as_str());
            }
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        if status == StatusCode::UNAUTHORIZED {
            return Err(ApiError::Unauthorized(
                String::from_utf8_lossy(&body).into_owned(),
            ));
        }
        if !status.is_success() {
            return Err(ApiError::Status {
                status,
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }
        Ok(body.to_vec())
    }

    /// The refresh network call. Runs on the coordinator's detached task, so
    /// it owns its handle to the session.
    async fn perform_refresh(self: Arc<Self>) -> Option<AccessToken> {
        let request = ApiRequest::post(self.refresh_path.as_str()).bypass_auth_retry();

        let body = match self.send_once(&request).await {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, "Token refresh request failed");
                return None;
            }
        };

        let response: RefreshResponse = match serde_json::from_slice(&body) {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Token refresh response has no access token");
                return None;
            }
        };

        match AccessToken::new(response.access_token) {
            Ok(token) => {
                self.set_access_token(token.clone());
                Some(token)
            }
            Err(e) => {
                warn!(error = %e, "Token refresh returned an unusable token");
                None
            }
        }
    }
}

// ============================================================================
// ApiClient
// ============================================================================

/// HTTP client for the dashboard API
///
/// One instance is shared (via `Arc`) by everything issuing requests. All
/// methods take `&self`.
pub struct ApiClient {
    session: Arc<Session>,
    /// Application path of the login entry point
    login_path: String,
    /// Used for the forced sign-out redirect
    navigator: Arc<dyn INavigator>,
    /// Single-flight refresh state
    refresh: RefreshCoordinator,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.session.base_url)
            .field("refresh_path", &self.session.refresh_path)
            .field("login_path", &self.login_path)
            .field("has_token", &self.token().is_some())
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Creates a client and loads any persisted token into memory
    ///
    /// # Errors
    /// Returns [`ApiError::InvalidUrl`] for an unusable base URL, or
    /// [`ApiError::Transport`] if the HTTP client cannot be built.
    pub fn new(
        config: &ApiConfig,
        store: Arc<dyn ITokenStore>,
        navigator: Arc<dyn INavigator>,
    ) -> Result<Self, ApiError> {
        let http = Client::builder()
            .cookie_store(true)
            .user_agent(concat!("dashkit/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Self::with_http_client(config, http, store, navigator)
    }

    /// Creates a client around an existing `reqwest::Client`
    pub fn with_http_client(
        config: &ApiConfig,
        http: Client,
        store: Arc<dyn ITokenStore>,
        navigator: Arc<dyn INavigator>,
    ) -> Result<Self, ApiError> {
        Url::parse(&config.base_url)
            .map_err(|e| ApiError::InvalidUrl(format!("{}: {e}", config.base_url)))?;

        let client = Self {
            session: Arc::new(Session {
                http,
                base_url: config.base_url.trim_end_matches('/').to_string(),
                refresh_path: config.refresh_path.clone(),
                token: RwLock::new(None),
                store,
            }),
            login_path: config.login_path.clone(),
            navigator,
            refresh: RefreshCoordinator::new(),
        };
        client.bootstrap();
        Ok(client)
    }

    /// Copies the persisted token (if any) into the in-memory slot
    fn bootstrap(&self) {
        match self.session.store.load() {
            Ok(Some(token)) => {
                info!("Restored persisted access token");
                *self
                    .session
                    .token
                    .write()
                    .unwrap_or_else(PoisonError::into_inner) = Some(token);
            }
            Ok(None) => debug!("No persisted access token"),
            Err(e) => warn!(error = %e, "Failed to load persisted access token"),
        }
    }

    /// Base URL requests are issued against
    pub fn base_url(&self) -> &str {
        &self.session.base_url
    }

    /// Path of the refresh endpoint
    pub fn refresh_path(&self) -> &str {
        &self.session.refresh_path
    }

    /// Path the user is sent to on forced sign-out
    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    /// Returns true while a token refresh is outstanding
    pub fn is_refreshing(&self) -> bool {
        self.refresh.is_refreshing()
    }

    // ------------------------------------------------------------------------
    // Token management
    // ------------------------------------------------------------------------

    /// Stores `token` in memory and in the persisted slot
    ///
    /// Empty or header-unsafe values are ignored.
    pub fn set_token(&self, token: impl AsRef<str>) {
        match AccessToken::new(token.as_ref()) {
            Ok(token) => self.set_access_token(token),
            Err(e) => debug!(error = %e, "Ignoring unusable token"),
        }
    }

    /// Stores an already validated token
    pub fn set_access_token(&self, token: AccessToken) {
        self.session.set_access_token(token);
    }

    /// Removes the token from memory and from the persisted slot
    pub fn clear_token(&self) {
        self.session.clear_token();
    }

    /// The in-memory token
    pub fn token(&self) -> Option<AccessToken> {
        self.session.token()
    }

    // ------------------------------------------------------------------------
    // Request pipeline
    // ------------------------------------------------------------------------

    /// Sends `request` and decodes the JSON response body
    ///
    /// An empty body decodes as JSON `null`, so `()`, `Option<_>` and
    /// `serde_json::Value` all work for 204 responses.
    ///
    /// # Errors
    /// - [`ApiError::Transport`] when no response was received
    /// - [`ApiError::Status`] for a non-success status other than 401
    /// - [`ApiError::Unauthorized`] when a 401 could not be recovered
    /// - [`ApiError::Decode`] when the body does not match `T`
    pub async fn request<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        let body = self.execute(request).await?;
        decode_body(&body)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.request(ApiRequest::get(path)).await
    }

    pub async fn post<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request(ApiRequest::post(path).json(body)?).await
    }

    pub async fn put<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request(ApiRequest::put(path).json(body)?).await
    }

    pub async fn patch<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request(ApiRequest::patch(path).json(body)?).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.request(ApiRequest::delete(path)).await
    }

    /// Runs one logical request through the 401 recovery pipeline
    async fn execute(&self, mut request: ApiRequest) -> Result<Vec<u8>, ApiError> {
        loop {
            let unauthorized = match self.session.send_once(&request).await {
                Ok(body) => {
                    debug!(
                        method = %request.method,
                        path = %request.path,
                        retried = request.is_retried(),
                        "Request succeeded"
                    );
                    return Ok(body);
                }
                Err(ApiError::Unauthorized(body)) => body,
                Err(e) => {
                    debug!(method = %request.method, path = %request.path, error = %e, "Request failed");
                    return Err(e);
                }
            };

            if request.targets(&self.session.refresh_path)
                || request.is_retried()
                || request.bypass_auth_retry
            {
                warn!(
                    path = %request.path,
                    retried = request.is_retried(),
                    bypass = request.bypass_auth_retry,
                    "Unrecoverable 401"
                );
                self.force_sign_out();
                return Err(ApiError::Unauthorized(unauthorized));
            }

            debug!(path = %request.path, "Got 401, refreshing token");
            request.mark_retried();

            match self.refresh_access_token().await {
                Some(token) => {
                    let value = HeaderValue::from_str(&token.bearer())
                        .map_err(|e| ApiError::InvalidResponse(e.to_string()))?;
                    request.headers.insert(AUTHORIZATION, value);
                    debug!(path = %request.path, "Retrying request with refreshed token");
                }
                None => {
                    self.force_sign_out();
                    return Err(ApiError::Unauthorized(unauthorized));
                }
            }
        }
    }

    /// Obtains a fresh token, sharing an in-flight refresh if there is one
    ///
    /// Returns `None` when the refresh fails for any reason. The refresh
    /// call itself keeps running if this future is dropped.
    pub async fn refresh_access_token(&self) -> Option<AccessToken> {
        let session = self.session.clone();
        self.refresh.run(move || session.perform_refresh()).await
    }

    /// Clears the token and redirects to login unless already there
    fn force_sign_out(&self) {
        warn!("Session could not be recovered, signing out");
        self.clear_token();

        let current = self.navigator.current_path();
        if same_path(&current, &self.login_path) {
            debug!(path = %current, "Already on login path, not redirecting");
        } else {
            self.navigator.navigate(&self.login_path);
        }
    }
}

/// Compares application paths ignoring query string and trailing slash
fn same_path(a: &str, b: &str) -> bool {
    let normalize = |p: &str| {
        p.split('?')
            .next()
            .unwrap_or_default()
            .trim_end_matches('/')
            .to_string()
    };
    normalize(a) == normalize(b)
}

fn decode_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(serde_json::from_value(serde_json::Value::Null)?);
    }
    Ok(serde_json::from_slice(body)?)
}
