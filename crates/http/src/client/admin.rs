//! Authenticated client that keeps the session valid and handles auth errors

use super::auth::LOGOUT_PATH;
use super::{ClientError, PublicClient};
use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, warn};
use tradeline_core::{InvalidationReason, SessionRecord, TokenManager};

/// Client for endpoints that require the administrator's session.
///
/// Tokens are resolved through the [`TokenManager`] on every request, so
/// callers never handle refresh themselves. A 401 from any endpoint, or a
/// session whose refresh failed, invalidates the session.
#[derive(Clone)]
pub struct AdminClient {
    public: PublicClient,
    manager: Arc<TokenManager>,
}

impl AdminClient {
    /// Create a new admin client
    pub fn new(public: PublicClient, manager: Arc<TokenManager>) -> Self {
        Self { public, manager }
    }

    /// Session lifecycle manager backing this client
    pub fn manager(&self) -> &Arc<TokenManager> {
        &self.manager
    }

    /// Client for the unauthenticated endpoints
    pub fn public(&self) -> &PublicClient {
        &self.public
    }

    /// Sign in and make the resulting session current
    pub async fn login(&self, email: &str, password: &str) -> Result<SessionRecord, ClientError> {
        let session = self.public.login(email, password).await?;
        self.manager.sign_in(session.clone()).await;
        Ok(session)
    }

    /// End the session. The backend call is best effort; the local session
    /// is cleared whatever it answers.
    pub async fn logout(&self) {
        let mut request = self.public.request(Method::POST, LOGOUT_PATH);
        if let Some(session) = self.manager.current().await {
            request = request.bearer_auth(session.access_token());
        }

        match request.send().await {
            Ok(response) if response.status().is_success() => debug!("Backend session closed"),
            Ok(response) => warn!(status = %response.status(), "Logout rejected, ignoring"),
            Err(e) => warn!(error = %e, "Logout request failed, ignoring"),
        }

        self.manager.sign_out().await;
    }

    /// Session that can still authenticate requests.
    ///
    /// A session whose refresh failed is invalidated and reported as `None`.
    pub async fn active_session(&self) -> Option<SessionRecord> {
        let session = self.manager.valid_session().await?;
        if session.is_errored() {
            self.manager
                .invalidate(InvalidationReason::RefreshFailed)
                .await;
            return None;
        }
        Some(session)
    }

    /// Create a request builder carrying the current access token.
    ///
    /// Without a session the request goes out unauthenticated and the
    /// backend's 401 ends up in [`Self::execute`].
    pub async fn request(
        &self,
        method: Method,
        path: &str,
    ) -> Result<reqwest::RequestBuilder, ClientError> {
        let request = self.public.request(method, path);

        match self.manager.valid_session().await {
            Some(session) if session.is_errored() => {
                self.manager
                    .invalidate(InvalidationReason::RefreshFailed)
                    .await;
                Err(ClientError::SessionExpired)
            }
            Some(session) => Ok(request.bearer_auth(session.access_token())),
            None => Ok(request),
        }
    }

    /// Execute a request and handle auth errors
    pub async fn execute<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ClientError> {
        match self.public.execute(request).await {
            Ok(result) => Ok(result),
            Err(error) => {
                if matches!(error, ClientError::AuthenticationFailed(_)) {
                    self.manager
                        .invalidate(InvalidationReason::Unauthorized)
                        .await;
                }
                Err(error)
            }
        }
    }

    /// Authenticated GET
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let request = self.request(Method::GET, path).await?;
        self.execute(request).await
    }

    /// Authenticated request with a JSON body
    pub async fn send_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        let request = self.request(method, path).await?.json(body);
        self.execute(request).await
    }
}
