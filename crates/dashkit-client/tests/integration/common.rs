//! Shared test helpers for dashkit-client integration tests
//!
//! Each helper starts a wiremock server and returns an ApiClient pointing at
//! it, together with the store and navigator so tests can observe the token
//! slots and forced sign-out redirects.

use std::{sync::Arc, time::Duration};

use dashkit_client::{client::ApiClient, navigator::SessionNavigator, storage::MemoryTokenStore};
use dashkit_core::{config::ApiConfig, domain::AccessToken, ports::ITokenStore};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub struct TestEnv {
    pub server: MockServer,
    pub client: Arc<ApiClient>,
    pub store: Arc<MemoryTokenStore>,
    pub navigator: Arc<SessionNavigator>,
}

pub fn config_for(server: &MockServer) -> ApiConfig {
    ApiConfig {
        base_url: server.uri(),
        ..ApiConfig::default()
    }
}

/// Starts a mock server and a client positioned on `/dashboard`
///
/// When `token` is given it is pre-loaded into the persisted store, so the
/// client picks it up at bootstrap.
pub async fn setup(token: Option<&str>) -> TestEnv {
    let server = MockServer::start().await;
    let store = Arc::new(match token {
        Some(t) => MemoryTokenStore::with_token(AccessToken::new(t).unwrap()),
        None => MemoryTokenStore::new(),
    });
    let navigator = Arc::new(SessionNavigator::new("/dashboard"));
    let client = Arc::new(
        ApiClient::new(&config_for(&server), store.clone(), navigator.clone())
            .expect("client should build"),
    );

    TestEnv {
        server,
        client,
        store,
        navigator,
    }
}

/// Mounts `POST /auth/refresh` answering with `new_token` after `delay`,
/// expected to be called exactly `times` times.
pub async fn mount_refresh_ok(server: &MockServer, new_token: &str, delay: Duration, times: u64) {
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "access_token": new_token }))
                .set_delay(delay),
        )
        .expect(times)
        .named("refresh")
        .mount(server)
        .await;
}

/// Mounts `POST /auth/refresh` answering 401 (refresh cookie expired)
pub async fn mount_refresh_rejected(server: &MockServer, times: u64) {
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(401).set_body_string("refresh expired"))
        .expect(times)
        .named("refresh rejected")
        .mount(server)
        .await;
}

/// Current persisted token, as a string
pub fn persisted(store: &MemoryTokenStore) -> Option<String> {
    store
        .load()
        .unwrap()
        .map(|t| t.as_str().to_string())
}
