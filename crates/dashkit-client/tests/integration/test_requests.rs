//! Integration tests for the happy path: token attachment, verbs, bodies,
//! and error propagation for non-401 failures.

use std::sync::Arc;

use dashkit_client::{
    client::ApiClient, navigator::SessionNavigator, request::ApiRequest,
    storage::FileTokenStore, ApiError,
};
use dashkit_core::config::ApiConfig;
use reqwest::{header::AUTHORIZATION, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, Request, ResponseTemplate};

use crate::common;

#[derive(Debug, Deserialize)]
struct Revenue {
    total: u64,
    currency: String,
}

#[tokio::test]
async fn test_attaches_bearer_token() {
    let env = common::setup(Some("abc123")).await;

    Mock::given(method("GET"))
        .and(path("/analytics/revenue"))
        .and(header("authorization", "Bearer abc123"))
        .and(query_param("range", "30d"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "total": 4200,
            "currency": "EUR"
        })))
        .expect(1)
        .mount(&env.server)
        .await;

    let revenue: Revenue = env
        .client
        .request(ApiRequest::get("/analytics/revenue").query("range", "30d"))
        .await
        .expect("request failed");

    assert_eq!(revenue.total, 4200);
    assert_eq!(revenue.currency, "EUR");
    env.server.verify().await;
}

#[tokio::test]
async fn test_no_token_sends_no_authorization() {
    let env = common::setup(None).await;

    Mock::given(method("GET"))
        .and(path("/public/status"))
        .and(|req: &Request| !req.headers.contains_key("authorization"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!("up")))
        .expect(1)
        .mount(&env.server)
        .await;

    let status: String = env.client.get("/public/status").await.unwrap();
    assert_eq!(status, "up");
    env.server.verify().await;
}

#[tokio::test]
async fn test_explicit_authorization_wins() {
    let env = common::setup(Some("stored")).await;

    Mock::given(method("GET"))
        .and(path("/admin"))
        .and(header("authorization", "Bearer override"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .expect(1)
        .mount(&env.server)
        .await;

    let request = ApiRequest::get("/admin").header(
        AUTHORIZATION,
        reqwest::header::HeaderValue::from_static("Bearer override"),
    );
    let _: Value = env.client.request(request).await.unwrap();
    env.server.verify().await;
}

#[tokio::test]
async fn test_json_verbs() {
    let env = common::setup(Some("t")).await;

    Mock::given(method("POST"))
        .and(path("/orgs"))
        .and(body_json(serde_json::json!({"name": "Acme"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({"id": 7})))
        .mount(&env.server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/orgs/7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": 7})))
        .mount(&env.server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/orgs/7"))
        .and(body_json(serde_json::json!({"plan": "pro"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"plan": "pro"})))
        .mount(&env.server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/orgs/7"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&env.server)
        .await;

    let created: Value = env
        .client
        .post("/orgs", &serde_json::json!({"name": "Acme"}))
        .await
        .unwrap();
    assert_eq!(created["id"], 7);

    let updated: Value = env
        .client
        .put("/orgs/7", &serde_json::json!({"name": "Acme Inc"}))
        .await
        .unwrap();
    assert_eq!(updated["id"], 7);

    let patched: Value = env
        .client
        .patch("/orgs/7", &serde_json::json!({"plan": "pro"}))
        .await
        .unwrap();
    assert_eq!(patched["plan"], "pro");

    // 204 with an empty body decodes as unit
    env.client.delete::<()>("/orgs/7").await.unwrap();
}

#[tokio::test]
async fn test_non_401_errors_propagate_unchanged() {
    let env = common::setup(Some("t")).await;

    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(1)
        .mount(&env.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/forbidden"))
        .respond_with(ResponseTemplate::new(403).set_body_string("nope"))
        .expect(1)
        .mount(&env.server)
        .await;
    common::mount_refresh_ok(&env.server, "new", std::time::Duration::ZERO, 0).await;

    let err = env.client.get::<Value>("/broken").await.unwrap_err();
    match err {
        ApiError::Status { status, body } => {
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(body, "boom");
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let err = env.client.get::<Value>("/forbidden").await.unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::FORBIDDEN));

    // Token survives ordinary failures
    assert_eq!(env.client.token().unwrap().as_str(), "t");
    assert_eq!(env.navigator.navigation_count(), 0);
    env.server.verify().await;
}

#[tokio::test]
async fn test_transport_error_propagates() {
    // Nothing listens on port 1
    let config = ApiConfig {
        base_url: "http://127.0.0.1:1".to_string(),
        ..ApiConfig::default()
    };
    let navigator = Arc::new(SessionNavigator::new("/dashboard"));
    let client = ApiClient::new(
        &config,
        Arc::new(dashkit_client::storage::MemoryTokenStore::new()),
        navigator.clone(),
    )
    .unwrap();
    client.set_token("t");

    let err = client.get::<Value>("/anything").await.unwrap_err();
    assert!(matches!(err, ApiError::Transport(_)));
    assert!(err.status().is_none());
    assert!(client.token().is_some());
    assert_eq!(navigator.navigation_count(), 0);
}

#[tokio::test]
async fn test_decode_error() {
    let env = common::setup(None).await;

    Mock::given(method("GET"))
        .and(path("/revenue"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"total": "lots"})))
        .mount(&env.server)
        .await;

    let err = env.client.get::<Revenue>("/revenue").await.unwrap_err();
    assert!(matches!(err, ApiError::Decode(_)));
}

#[tokio::test]
async fn test_file_store_survives_restart() {
    let env = common::setup(None).await;
    let dir = tempfile::tempdir().unwrap();
    let token_file = dir.path().join("dashkit").join("auth_token");

    Mock::given(method("GET"))
        .and(path("/me"))
        .and(header("authorization", "Bearer persisted-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": 1})))
        .expect(1)
        .mount(&env.server)
        .await;

    let config = common::config_for(&env.server);
    {
        let first = ApiClient::new(
            &config,
            Arc::new(FileTokenStore::new(&token_file)),
            Arc::new(SessionNavigator::default()),
        )
        .unwrap();
        first.set_token("persisted-token");
    }

    let second = ApiClient::new(
        &config,
        Arc::new(FileTokenStore::new(&token_file)),
        Arc::new(SessionNavigator::default()),
    )
    .unwrap();
    assert_eq!(second.token().unwrap().as_str(), "persisted-token");

    let me: Value = second.get("/me").await.unwrap();
    assert_eq!(me["id"], 1);

    second.clear_token();
    assert!(!token_file.exists());
    env.server.verify().await;
}
