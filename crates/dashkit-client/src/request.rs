//! Request descriptor for [`ApiClient`](crate::client::ApiClient)
//!
//! An [`ApiRequest`] carries everything needed to (re)issue a logical request:
//! method, path, query, headers, JSON body, plus two pieces of interceptor
//! metadata:
//!
//! - `bypass_auth_retry`: a 401 on this request never triggers a refresh
//! - `retried`: set by the client before the single post-refresh retry

use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION},
    Method,
};
use serde::Serialize;

use crate::ApiError;

/// A logical API request
#[derive(Debug, Clone)]
pub struct ApiRequest {
    /// HTTP method
    pub method: Method,
    /// Path relative to the base URL (e.g. `/analytics/revenue`), or an absolute URL
    pub path: String,
    /// Query string pairs
    pub query: Vec<(String, String)>,
    /// Extra headers; an explicit `Authorization` here wins over the stored token
    pub headers: HeaderMap,
    /// JSON body
    pub body: Option<serde_json::Value>,
    /// Never refresh-and-retry this request on 401
    pub bypass_auth_retry: bool,
    retried: bool,
}

impl ApiRequest {
    /// Creates a request for the given method and path
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: HeaderMap::new(),
            body: None,
            bypass_auth_retry: false,
            retried: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Appends a query parameter
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Sets a header, replacing any previous value
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Serializes `body` as the JSON request body
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, ApiError> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    /// Marks the request so a 401 goes straight to sign-out, never to refresh
    pub fn bypass_auth_retry(mut self) -> Self {
        self.bypass_auth_retry = true;
        self
    }

    /// Whether this request has already been retried after a refresh
    pub fn is_retried(&self) -> bool {
        self.retried
    }

    pub(crate) fn mark_retried(&mut self) {
        self.retried = true;
    }

    /// Whether the request carries its own `Authorization` header
    pub fn has_authorization(&self) -> bool {
        self.headers.contains_key(AUTHORIZATION)
    }

    /// Whether this request targets `path`, ignoring query string and trailing slash
    pub fn targets(&self, path: &str) -> bool {
        let own = self.path.split('?').next().unwrap_or_default();
        let own = own.trim_end_matches('/');
        let path = path.trim_end_matches('/');
        own == path || (own.contains("://") && own.ends_with(path))
    }
}
