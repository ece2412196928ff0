//! Integration tests for 401 recovery: single-flight refresh, retry-once
//! and forced sign-out.

use std::time::Duration;

use dashkit_client::{request::ApiRequest, ApiError};
use dashkit_core::ports::INavigator;
use futures_util::future::join_all;
use serde_json::Value;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::common;

#[tokio::test]
async fn test_concurrent_401s_share_one_refresh() {
    let env = common::setup(Some("old")).await;

    Mock::given(method("GET"))
        .and(header("authorization", "Bearer old"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&env.server)
        .await;
    Mock::given(method("GET"))
        .and(header("authorization", "Bearer new"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
        .expect(5)
        .mount(&env.server)
        .await;
    common::mount_refresh_ok(&env.server, "new", Duration::from_millis(300), 1).await;

    let paths = ["/a", "/b", "/c", "/d", "/e"];
    let results = join_all(paths.iter().map(|p| {
        let client = env.client.clone();
        async move { client.get::<Value>(p).await }
    }))
    .await;

    for result in results {
        assert_eq!(result.expect("request should recover")["ok"], true);
    }
    assert_eq!(env.client.token().unwrap().as_str(), "new");
    assert_eq!(common::persisted(&env.store).as_deref(), Some("new"));
    assert!(!env.client.is_refreshing());
    assert_eq!(env.navigator.navigation_count(), 0);

    env.server.verify().await;
}

#[tokio::test]
async fn test_retries_only_once() {
    let env = common::setup(Some("old")).await;

    Mock::given(method("GET"))
        .and(path("/reports"))
        .respond_with(ResponseTemplate::new(401).set_body_string("still no"))
        .expect(2)
        .mount(&env.server)
        .await;
    common::mount_refresh_ok(&env.server, "new", Duration::ZERO, 1).await;

    let err = env.client.get::<Value>("/reports").await.unwrap_err();

    assert!(matches!(err, ApiError::Unauthorized(ref body) if body == "still no"));
    assert!(env.client.token().is_none());
    assert!(common::persisted(&env.store).is_none());
    assert_eq!(env.navigator.current_path(), "/login");
    assert_eq!(env.navigator.navigation_count(), 1);

    env.server.verify().await;
}

#[tokio::test]
async fn test_failed_refresh_signs_out() {
    let env = common::setup(Some("old")).await;

    Mock::given(method("GET"))
        .and(path("/reports"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&env.server)
        .await;
    common::mount_refresh_rejected(&env.server, 1).await;

    let err = env.client.get::<Value>("/reports").await.unwrap_err();

    assert!(err.is_unauthorized());
    assert!(env.client.token().is_none());
    assert_eq!(env.navigator.current_path(), "/login");
    // The refresh failure and the original request share one redirect
    assert_eq!(env.navigator.history(), vec!["/login"]);

    env.server.verify().await;
}

#[tokio::test]
async fn test_refresh_without_token_in_body_signs_out() {
    let env = common::setup(Some("old")).await;

    Mock::given(method("GET"))
        .and(path("/reports"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&env.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .expect(1)
        .mount(&env.server)
        .await;

    let err = env.client.get::<Value>("/reports").await.unwrap_err();
    assert!(err.is_unauthorized());
    assert_eq!(env.navigator.current_path(), "/login");

    env.server.verify().await;
}

#[tokio::test]
async fn test_bypass_flag_never_refreshes() {
    let env = common::setup(Some("old")).await;

    Mock::given(method("POST"))
        .and(path("/webhooks/test"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&env.server)
        .await;
    common::mount_refresh_ok(&env.server, "new", Duration::ZERO, 0).await;

    let request = ApiRequest::post("/webhooks/test").bypass_auth_retry();
    let err = env.client.request::<Value>(request).await.unwrap_err();

    assert!(err.is_unauthorized());
    assert!(env.client.token().is_none());

    env.server.verify().await;
}

#[tokio::test]
async fn test_no_redirect_when_already_on_login() {
    let env = common::setup(Some("old")).await;
    env.navigator.navigate("/login");

    Mock::given(method("GET"))
        .and(path("/me"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&env.server)
        .await;
    common::mount_refresh_rejected(&env.server, 1).await;

    let err = env.client.get::<Value>("/me").await.unwrap_err();
    assert!(err.is_unauthorized());
    assert_eq!(env.navigator.history(), vec!["/login"]);
}

#[tokio::test]
async fn test_explicit_refresh_call() {
    let env = common::setup(None).await;
    common::mount_refresh_ok(&env.server, "fresh", Duration::ZERO, 1).await;

    let token = env.client.refresh_access_token().await.unwrap();
    assert_eq!(token.as_str(), "fresh");
    assert_eq!(env.client.token().unwrap().as_str(), "fresh");

    env.server.verify().await;
}

#[tokio::test]
async fn test_sequential_401s_start_new_cycles() {
    let env = common::setup(Some("old")).await;

    // Each successful retry is followed by another expiry
    Mock::given(method("GET"))
        .and(header("authorization", "Bearer old"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&env.server)
        .await;
    Mock::given(method("GET"))
        .and(header("authorization", "Bearer new"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!(1)))
        .mount(&env.server)
        .await;
    common::mount_refresh_ok(&env.server, "new", Duration::ZERO, 2).await;

    let first: u32 = env.client.get("/x").await.unwrap();
    env.client.set_token("old");
    let second: u32 = env.client.get("/x").await.unwrap();

    assert_eq!(first + second, 2);
    env.server.verify().await;
}

#[tokio::test]
async fn test_waiting_request_recovers_when_refresh_starter_is_aborted() {
    let env = common::setup(Some("old")).await;

    Mock::given(method("GET"))
        .and(header("authorization", "Bearer old"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&env.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/b"))
        .and(header("authorization", "Bearer new"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
        .expect(1)
        .mount(&env.server)
        .await;
    common::mount_refresh_ok(&env.server, "new", Duration::from_millis(400), 1).await;

    let starter = {
        let client = env.client.clone();
        tokio::spawn(async move { client.get::<Value>("/a").await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(env.client.is_refreshing());

    let waiter = {
        let client = env.client.clone();
        tokio::spawn(async move { client.get::<Value>("/b").await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;
    starter.abort();

    let body = waiter.await.unwrap().expect("waiting request should recover");
    assert_eq!(body["ok"], true);
    assert_eq!(env.client.token().unwrap().as_str(), "new");
    assert_eq!(common::persisted(&env.store).as_deref(), Some("new"));
    assert_eq!(env.navigator.current_path(), "/dashboard");
    assert_eq!(env.navigator.navigation_count(), 0);

    env.server.verify().await;
}
