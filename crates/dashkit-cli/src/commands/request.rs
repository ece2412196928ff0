//! Request command - Send an authenticated request to the API
//!
//! `dashkit request <METHOD> <PATH> [--data JSON] [--query key=value]...`
//! attaches the stored token, recovers from an expired token through the
//! refresh endpoint, and prints the JSON response.

use anyhow::{Context, Result};
use clap::Args;
use dashkit_client::request::ApiRequest;
use dashkit_core::{config::Config, ports::INavigator};
use reqwest::Method;
use serde_json::Value;
use tracing::debug;

use super::build_client;
use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Args)]
pub struct RequestCommand {
    /// HTTP method (GET, POST, PUT, PATCH, DELETE)
    #[arg(value_parser = parse_method)]
    method: Method,

    /// Path relative to the API base URL, e.g. /analytics/revenue
    path: String,

    /// JSON request body
    #[arg(long)]
    data: Option<String>,

    /// Query parameter as key=value (repeatable)
    #[arg(short, long = "query", value_parser = parse_key_value)]
    query: Vec<(String, String)>,
}

impl RequestCommand {
    pub async fn execute(&self, config: &Config, format: OutputFormat) -> Result<()> {
        let fmt = get_formatter(format == OutputFormat::Json);
        let (client, navigator) = build_client(config)?;

        let mut request = ApiRequest::new(self.method.clone(), self.path.as_str());
        for (key, value) in &self.query {
            request = request.query(key.as_str(), value.as_str());
        }
        if let Some(data) = &self.data {
            let body: Value = serde_json::from_str(data).context("--data is not valid JSON")?;
            request.body = Some(body);
        }

        debug!(method = %self.method, path = %self.path, "Sending request");
        match client.request::<Value>(request).await {
            Ok(body) => {
                fmt.print_body(&body);
                Ok(())
            }
            Err(e) => {
                if e.is_unauthorized() {
                    fmt.warn("Session expired and could not be refreshed");
                    if navigator.navigation_count() > 0 {
                        fmt.info(&format!(
                            "Signed out (redirected to {})",
                            navigator.current_path()
                        ));
                    }
                    fmt.info("Run 'dashkit auth login' to sign in again");
                }
                Err(e).with_context(|| format!("{} {} failed", self.method, self.path))
            }
        }
    }
}

fn parse_method(s: &str) -> Result<Method, String> {
    Method::from_bytes(s.to_ascii_uppercase().as_bytes())
        .map_err(|_| format!("invalid HTTP method: {s}"))
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{s}'"))?;
    if key.is_empty() {
        return Err(format!("empty key in '{s}'"));
    }
    Ok((key.to_string(), value.to_string()))
}
