//! Tradeline backend HTTP client
//!
//! [`PublicClient`] talks to the unauthenticated auth endpoints.
//! [`AdminClient`] wraps it with a [`TokenManager`] so every request carries
//! a valid bearer token and any 401 tears the session down.

pub mod admin;
pub mod auth;
pub mod error;

pub use admin::AdminClient;
use error::ClientError;

use crate::types::ApiMessage;
use reqwest::{Client, ClientBuilder};
use std::sync::Arc;
use std::time::Duration;
use tradeline_core::{Clock, SessionStore, TokenManager};

/// Backend used when nothing else is configured
pub const DEFAULT_BASE_URL: &str = "http://localhost:5006";

const USER_AGENT: &str = concat!("tradeline-admin/", env!("CARGO_PKG_VERSION"));

/// Client for endpoints that don't require authentication
#[derive(Clone)]
pub struct PublicClient {
    client: Client,
    base_url: String,
}

impl PublicClient {
    /// Create a new public client
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        AdminClientBuilder::new().base_url(base_url).build_public()
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Create a request builder without authentication
    pub fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        self.client.request(method, url)
    }

    /// Execute a request and handle common errors
    pub async fn execute<T: serde::de::DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ClientError> {
        let response = request.send().await?;
        let status = response.status();

        if status.is_success() {
            let body = response.text().await?;
            // 204 and other empty successes decode as JSON `null`
            if body.trim().is_empty() {
                Ok(serde_json::from_value(serde_json::Value::Null)?)
            } else {
                Ok(serde_json::from_str(&body)?)
            }
        } else {
            let body = response.text().await.unwrap_or_default();
            let message = ApiMessage::from_body(&body)
                .or_else(|| (!body.is_empty()).then_some(body))
                .unwrap_or_else(|| status.to_string());
            Err(ClientError::from_status(status, message))
        }
    }
}

/// Builder for the public and admin clients
pub struct AdminClientBuilder {
    base_url: Option<String>,
    timeout: Option<Duration>,
    user_agent: Option<String>,
    refresh_margin: Option<Duration>,
    clock: Option<Arc<dyn Clock>>,
}

impl AdminClientBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self {
            base_url: None,
            timeout: None,
            user_agent: None,
            refresh_margin: None,
            clock: None,
        }
    }

    /// Set the base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Set how long before expiry the access token is refreshed
    pub fn refresh_margin(mut self, margin: Duration) -> Self {
        self.refresh_margin = Some(margin);
        self
    }

    /// Use a custom clock for expiry checks
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Build a public client
    pub fn build_public(&self) -> Result<PublicClient, ClientError> {
        let base_url = self
            .base_url
            .as_deref()
            .ok_or_else(|| ClientError::Configuration("base_url is required".into()))?;

        // Ensure base_url ends without a trailing slash
        let base_url = base_url.trim_end_matches('/').to_string();

        let mut builder = ClientBuilder::new()
            .cookie_store(true)
            .user_agent(self.user_agent.as_deref().unwrap_or(USER_AGENT));
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(PublicClient {
            client: builder.build()?,
            base_url,
        })
    }

    /// Build an admin client whose session lives in `store`
    pub fn build(self, store: Arc<dyn SessionStore>) -> Result<AdminClient, ClientError> {
        let public = self.build_public()?;

        let mut manager = TokenManager::new(store, Arc::new(public.clone()));
        if let Some(margin) = self.refresh_margin {
            manager = manager.with_refresh_margin(margin);
        }
        if let Some(clock) = self.clock {
            manager = manager.with_clock(clock);
        }

        Ok(AdminClient::new(public, Arc::new(manager)))
    }
}

impl Default for AdminClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
