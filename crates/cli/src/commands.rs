//! CLI commands

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use clap::Subcommand;
use std::sync::Arc;
use tracing::{info, warn};
use tradeline_core::{
    FileSessionStore, InvalidationReason, RouteDecision, SessionRecord, route_guard,
};
use tradeline_http::{AdminClient, AdminClientBuilder, ClientError};

use crate::config::Settings;

#[derive(Subcommand)]
pub enum Commands {
    /// Sign in and store the session
    Login {
        /// Administrator email
        #[arg(long)]
        email: String,

        /// Password (prefer the environment variable)
        #[arg(long, env = "TRADELINE_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Show the stored session, refreshing the access token if it is due
    Status,

    /// Authenticated GET against the backend, printing the JSON body
    Get {
        /// API path, e.g. /api/v1/admin/users
        path: String,
    },

    /// Check whether an admin console route is reachable with the current session
    Route {
        /// Console path, optionally with a query string
        path: String,
    },

    /// Sign out and clear the stored session
    Logout,
}

impl Commands {
    pub async fn execute(self, settings: &Settings) -> Result<()> {
        let client = build_client(settings)?;

        match self {
            Commands::Login { email, password } => login(&client, &email, &password).await,
            Commands::Status => status(&client).await,
            Commands::Get { path } => get(&client, &path).await,
            Commands::Route { path } => route(&client, &path).await,
            Commands::Logout => {
                client.logout().await;
                println!("Signed out");
                Ok(())
            }
        }
    }
}

fn build_client(settings: &Settings) -> Result<AdminClient> {
    let session_file = settings.session_file();
    info!(path = %session_file.display(), "Using session file");

    let mut builder = AdminClientBuilder::new()
        .base_url(settings.api.base_url.clone())
        .refresh_margin(settings.refresh_margin());
    if let Some(timeout) = settings.timeout() {
        builder = builder.timeout(timeout);
    }

    let client = builder
        .build(Arc::new(FileSessionStore::new(session_file)))
        .context("Failed to create API client")?;

    client
        .manager()
        .set_invalidation_handler(Arc::new(|reason: InvalidationReason| {
            warn!(?reason, "Session ended, run `tradeline-admin login` to sign in again");
        }));

    Ok(client)
}

async fn login(client: &AdminClient, email: &str, password: &str) -> Result<()> {
    let session = client.login(email, password).await?;
    println!("Signed in as {}", describe_user(&session));
    println!("Access token expires: {}", describe_expiry(&session));
    Ok(())
}

async fn status(client: &AdminClient) -> Result<()> {
    let Some(session) = client.manager().valid_session().await else {
        println!("Not signed in");
        return Ok(());
    };

    println!("User:    {}", describe_user(&session));
    println!(
        "Role:    {}",
        session.user.role.as_deref().unwrap_or("(none)")
    );
    println!("Expires: {}", describe_expiry(&session));

    if let Some(error) = &session.error {
        println!("Error:   {error}");
        client
            .manager()
            .invalidate(InvalidationReason::RefreshFailed)
            .await;
        bail!("Session could not be refreshed");
    }

    Ok(())
}

async fn get(client: &AdminClient, path: &str) -> Result<()> {
    let path = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    };

    let body: serde_json::Value = match client.get(&path).await {
        Ok(body) => body,
        Err(e) if e.is_auth_expired() => {
            bail!("{e}; run `tradeline-admin login` to sign in again")
        }
        Err(ClientError::NotFound(message)) => bail!("{path} not found: {message}"),
        Err(e) => return Err(e.into()),
    };

    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}

async fn route(client: &AdminClient, path: &str) -> Result<()> {
    let (path, query) = path.split_at(path.find('?').unwrap_or(path.len()));
    let authenticated = client.active_session().await.is_some();

    match route_guard(path, query, authenticated) {
        RouteDecision::Allow => println!("allow"),
        RouteDecision::RedirectToLogin(location) => println!("redirect {location}"),
    }
    Ok(())
}

fn describe_user(session: &SessionRecord) -> String {
    match &session.user.name {
        Some(name) => format!("{name} <{}>", session.user.email),
        None => session.user.email.clone(),
    }
}

fn describe_expiry(session: &SessionRecord) -> String {
    session
        .tokens
        .access_token_expires_at
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .map(|at| at.to_rfc3339())
        .unwrap_or_else(|| "unknown".to_string())
}
