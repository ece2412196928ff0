//! Auth commands - Login, Register, Logout and Status
//!
//! Provides the `dashkit auth` CLI subcommands which:
//! 1. `login`    - Exchanges email and password for an access token and persists it.
//! 2. `register` - Creates an account and persists the returned token.
//! 3. `logout`   - Ends the server session and clears the persisted token.
//! 4. `status`   - Shows whether a token is stored and where.

use anyhow::{Context, Result};
use clap::Subcommand;
use dashkit_client::auth::{AuthApi, Credentials, Registration};
use dashkit_core::{config::Config, domain::Email};
use tracing::info;

use super::build_client;
use crate::output::{get_formatter, OutputFormat, OutputFormatter};

#[derive(Debug, Subcommand)]
pub enum AuthCommand {
    /// Sign in with email and password
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Create a new account
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// End the session and remove the stored token
    Logout,
    /// Check authentication status
    Status,
}

impl AuthCommand {
    pub async fn execute(&self, config: &Config, format: OutputFormat) -> Result<()> {
        let fmt = get_formatter(format == OutputFormat::Json);
        match self {
            AuthCommand::Login { email, password } => {
                self.execute_login(config, email, password, &*fmt).await
            }
            AuthCommand::Register {
                name,
                email,
                password,
            } => {
                self.execute_register(config, name, email, password, &*fmt)
                    .await
            }
            AuthCommand::Logout => self.execute_logout(config, &*fmt).await,
            AuthCommand::Status => self.execute_status(config, &*fmt, format),
        }
    }

    async fn execute_login(
        &self,
        config: &Config,
        email: &str,
        password: &str,
        fmt: &dyn OutputFormatter,
    ) -> Result<()> {
        let email = Email::new(email).context("Invalid email address")?;
        let (client, _) = build_client(config)?;
        let auth = AuthApi::new(client);

        info!(email = %email, "Starting login");
        let session = auth
            .login(&Credentials::new(email.clone(), password))
            .await
            .context("Login failed")?;

        fmt.success(&format!("Logged in as {}", email));
        if let Some(name) = session
            .user
            .as_ref()
            .and_then(|user| user.get("name"))
            .and_then(|name| name.as_str())
        {
            fmt.field("Name", name);
        }
        Ok(())
    }

    async fn execute_register(
        &self,
        config: &Config,
        name: &str,
        email: &str,
        password: &str,
        fmt: &dyn OutputFormatter,
    ) -> Result<()> {
        let email = Email::new(email).context("Invalid email address")?;
        let (client, _) = build_client(config)?;
        let auth = AuthApi::new(client);

        let registration = Registration {
            name: name.to_string(),
            email: email.clone(),
            password: password.to_string(),
        };
        let session = auth
            .register(&registration)
            .await
            .context("Registration failed")?;

        info!(email = %email, has_profile = session.user.is_some(), "Registered");
        fmt.success(&format!("Registered and logged in as {}", email));
        Ok(())
    }

    async fn execute_logout(&self, config: &Config, fmt: &dyn OutputFormatter) -> Result<()> {
        let (client, _) = build_client(config)?;
        if client.token().is_none() {
            fmt.info("Not logged in. Nothing to log out.");
            return Ok(());
        }

        AuthApi::new(client).logout().await;
        fmt.success("Logged out successfully");
        fmt.info("Stored token removed");
        Ok(())
    }

    fn execute_status(
        &self,
        config: &Config,
        fmt: &dyn OutputFormatter,
        format: OutputFormat,
    ) -> Result<()> {
        let (client, _) = build_client(config)?;
        let authenticated = client.token().is_some();
        let storage = format!("{:?}", config.auth.token_storage).to_lowercase();

        if format == OutputFormat::Json {
            fmt.print_json(&serde_json::json!({
                "authenticated": authenticated,
                "base_url": client.base_url(),
                "token_storage": storage,
            }));
            return Ok(());
        }

        if authenticated {
            fmt.success("Authenticated");
        } else {
            fmt.info("Authentication status: Not logged in");
            fmt.info("Run 'dashkit auth login' to authenticate");
        }
        fmt.field("API", client.base_url());
        fmt.field("Token storage", &storage);
        Ok(())
    }
}
