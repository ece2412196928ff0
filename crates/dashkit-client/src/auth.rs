//! Login, registration and logout against the dashboard API
//!
//! [`AuthApi`] sits on top of [`ApiClient`] and feeds the tokens it receives
//! into the client's token slots. Login and registration are sent with
//! `bypass_auth_retry` so bad credentials never trigger a token refresh.

use std::{fmt, sync::Arc};

use dashkit_core::domain::{AccessToken, Email};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{client::ApiClient, request::ApiRequest, ApiError};

const LOGIN_PATH: &str = "/auth/login";
const REGISTER_PATH: &str = "/register";
const LOGOUT_PATH: &str = "/auth/logout";

// ============================================================================
// Request / response bodies
// ============================================================================

/// Email and password for `POST /auth/login`
#[derive(Clone, Serialize)]
pub struct Credentials {
    pub email: Email,
    pub password: String,
}

impl Credentials {
    pub fn new(email: Email, password: impl Into<String>) -> Self {
        Self {
            email,
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

/// New account details for `POST /register`
#[derive(Clone, Serialize)]
pub struct Registration {
    pub name: String,
    pub email: Email,
    pub password: String,
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

/// A successful login or registration
#[derive(Debug, Clone, Deserialize)]
pub struct AuthSession {
    #[serde(alias = "accessToken")]
    pub access_token: AccessToken,
    /// User profile as returned by the backend, if any
    #[serde(default)]
    pub user: Option<serde_json::Value>,
}

// ============================================================================
// AuthApi
// ============================================================================

/// Session lifecycle operations
#[derive(Debug, Clone)]
pub struct AuthApi {
    client: Arc<ApiClient>,
}

impl AuthApi {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    /// The underlying client
    pub fn client(&self) -> &Arc<ApiClient> {
        &self.client
    }

    /// Signs in and stores the returned token
    ///
    /// # Errors
    /// [`ApiError::Unauthorized`] for rejected credentials, or any transport,
    /// status or decode error.
    pub async fn login(&self, credentials: &Credentials) -> Result<AuthSession, ApiError> {
        info!(email = %credentials.email, "Logging in");
        let request = ApiRequest::post(LOGIN_PATH)
            .json(credentials)?
            .bypass_auth_retry();
        let session: AuthSession = self.client.request(request).await?;
        self.client.set_access_token(session.access_token.clone());
        info!(email = %credentials.email, "Logged in");
        Ok(session)
    }

    /// Creates an account and stores the returned token
    pub async fn register(&self, registration: &Registration) -> Result<AuthSession, ApiError> {
        info!(email = %registration.email, "Registering account");
        let request = ApiRequest::post(REGISTER_PATH)
            .json(registration)?
            .bypass_auth_retry();
        let session: AuthSession = self.client.request(request).await?;
        self.client.set_access_token(session.access_token.clone());
        Ok(session)
    }

    /// Ends the session on the server (best effort) and always clears the
    /// local token
    pub async fn logout(&self) {
        let request = ApiRequest::post(LOGOUT_PATH).bypass_auth_retry();
        match self.client.request::<serde_json::Value>(request).await {
            Ok(_) => info!("Logged out"),
            Err(e) => warn!(error = %e, "Server logout failed, clearing local session anyway"),
        }
        self.client.clear_token();
    }

    /// Returns true when a token is held in memory
    pub fn is_authenticated(&self) -> bool {
        self.client.token().is_some()
    }
}
