//! Integration tests for AuthApi: login, register and logout

use std::time::Duration;

use dashkit_client::auth::{AuthApi, Credentials, Registration};
use dashkit_core::{domain::Email, ports::INavigator};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::common;

fn credentials() -> Credentials {
    Credentials::new(Email::new("jane@example.com").unwrap(), "s3cret")
}

#[tokio::test]
async fn test_login_stores_token() {
    let env = common::setup(None).await;

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .and(body_json(serde_json::json!({
            "email": "jane@example.com",
            "password": "s3cret"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "login-token",
            "user": {"name": "Jane"}
        })))
        .expect(1)
        .mount(&env.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/me"))
        .and(header("authorization", "Bearer login-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"name": "Jane"})))
        .expect(1)
        .mount(&env.server)
        .await;

    let auth = AuthApi::new(env.client.clone());
    let session = auth.login(&credentials()).await.expect("login failed");

    assert_eq!(session.access_token.as_str(), "login-token");
    assert_eq!(session.user.unwrap()["name"], "Jane");
    assert!(auth.is_authenticated());
    assert_eq!(common::persisted(&env.store).as_deref(), Some("login-token"));

    let me: serde_json::Value = env.client.get("/me").await.unwrap();
    assert_eq!(me["name"], "Jane");
    env.server.verify().await;
}

#[tokio::test]
async fn test_rejected_login_does_not_refresh() {
    let env = common::setup(None).await;
    env.navigator.navigate("/login");

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad credentials"))
        .expect(1)
        .mount(&env.server)
        .await;
    common::mount_refresh_ok(&env.server, "new", Duration::ZERO, 0).await;

    let auth = AuthApi::new(env.client.clone());
    let err = auth.login(&credentials()).await.unwrap_err();

    assert!(err.is_unauthorized());
    assert!(!auth.is_authenticated());
    // Already on the login page, so no redirect happens
    assert_eq!(env.navigator.navigation_count(), 1);
    env.server.verify().await;
}

#[tokio::test]
async fn test_register_stores_token() {
    let env = common::setup(None).await;

    Mock::given(method("POST"))
        .and(path("/register"))
        .and(body_json(serde_json::json!({
            "name": "Jane",
            "email": "jane@example.com",
            "password": "s3cret"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "access_token": "new-account"
        })))
        .expect(1)
        .mount(&env.server)
        .await;

    let auth = AuthApi::new(env.client.clone());
    let registration = Registration {
        name: "Jane".to_string(),
        email: Email::new("jane@example.com").unwrap(),
        password: "s3cret".to_string(),
    };
    let session = auth.register(&registration).await.unwrap();

    assert_eq!(session.access_token.as_str(), "new-account");
    assert_eq!(env.client.token().unwrap().as_str(), "new-account");
    env.server.verify().await;
}

#[tokio::test]
async fn test_rejected_register_does_not_refresh() {
    let env = common::setup(Some("stale")).await;
    env.navigator.navigate("/login");

    Mock::given(method("POST"))
        .and(path("/register"))
        .respond_with(ResponseTemplate::new(401).set_body_string("signup closed"))
        .expect(1)
        .mount(&env.server)
        .await;
    common::mount_refresh_ok(&env.server, "new", Duration::ZERO, 0).await;

    let auth = AuthApi::new(env.client.clone());
    let registration = Registration {
        name: "Jane".to_string(),
        email: Email::new("jane@example.com").unwrap(),
        password: "s3cret".to_string(),
    };
    let err = auth.register(&registration).await.unwrap_err();

    assert!(err.is_unauthorized());
    assert!(env.client.token().is_none());
    assert_eq!(env.navigator.navigation_count(), 1);
    env.server.verify().await;
}

#[tokio::test]
async fn test_logout_clears_token() {
    let env = common::setup(Some("session")).await;

    Mock::given(method("POST"))
        .and(path("/auth/logout"))
        .and(header("authorization", "Bearer session"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&env.server)
        .await;

    let auth = AuthApi::new(env.client.clone());
    auth.logout().await;

    assert!(!auth.is_authenticated());
    assert!(common::persisted(&env.store).is_none());
    env.server.verify().await;
}

#[tokio::test]
async fn test_logout_clears_token_when_server_fails() {
    let env = common::setup(Some("session")).await;

    Mock::given(method("POST"))
        .and(path("/auth/logout"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&env.server)
        .await;

    let auth = AuthApi::new(env.client.clone());
    auth.logout().await;

    assert!(env.client.token().is_none());
    assert!(common::persisted(&env.store).is_none());
}
