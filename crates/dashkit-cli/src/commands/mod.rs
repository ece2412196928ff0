//! CLI subcommands

pub mod auth;
pub mod burst;
pub mod config;
pub mod request;

use std::sync::Arc;

use anyhow::{Context, Result};
use dashkit_client::{client::ApiClient, navigator::SessionNavigator, storage};
use dashkit_core::config::Config;

/// Builds the API client from configuration
///
/// The returned navigator starts at `/` and records any forced sign-out.
pub(crate) fn build_client(config: &Config) -> Result<(Arc<ApiClient>, Arc<SessionNavigator>)> {
    let store = storage::token_store_from_config(&config.auth);
    let navigator = Arc::new(SessionNavigator::default());
    let client = ApiClient::new(&config.api, store, navigator.clone())
        .context("Failed to create API client")?;
    Ok((Arc::new(client), navigator))
}
