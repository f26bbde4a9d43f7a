//! Authentication API client methods

use super::{ClientError, PublicClient};
use crate::types::{
    ApiMessage, Envelope, LoginPayload, LoginRequest, RefreshPayload, RefreshTokenRequest,
};
use async_trait::async_trait;
use reqwest::Method;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use tradeline_core::{RefreshError, SessionRecord, TokenPair, TokenRefresher};

pub const LOGIN_PATH: &str = "/api/v1/auth/login";
pub const REFRESH_TOKEN_PATH: &str = "/api/v1/auth/refresh-token";
pub const LOGOUT_PATH: &str = "/api/v1/auth/logout";

impl PublicClient {
    /// Exchange credentials for a new session
    #[instrument(skip(self, password), fields(base_url = %self.base_url))]
    pub async fn login(&self, email: &str, password: &str) -> Result<SessionRecord, ClientError> {
        if email.is_empty() || password.is_empty() {
            return Err(ClientError::BadRequest(
                "Email and password are required".to_string(),
            ));
        }

        let request = self
            .request(Method::POST, LOGIN_PATH)
            .json(&LoginRequest { email, password });
        let envelope: Envelope<LoginPayload> =
            self.send_enveloped(request, "Unable to login").await?;
        let message = envelope.message;

        envelope
            .data
            .and_then(|payload| payload.into_session(email))
            .ok_or_else(|| {
                ClientError::InvalidResponse(
                    message.unwrap_or_else(|| "Invalid login response".to_string()),
                )
            })
    }

    /// Exchange a refresh token for a new token pair.
    ///
    /// The returned pair has no refresh token when the backend did not
    /// rotate it.
    #[instrument(skip_all, fields(base_url = %self.base_url))]
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<TokenPair, ClientError> {
        let request = self
            .request(Method::POST, REFRESH_TOKEN_PATH)
            .json(&RefreshTokenRequest { refresh_token });
        let envelope: Envelope<RefreshPayload> = self
            .send_enveloped(request, "Unable to refresh token")
            .await?;

        envelope
            .data
            .and_then(RefreshPayload::into_pair)
            .ok_or_else(|| {
                ClientError::InvalidResponse("refresh response carried no accessToken".to_string())
            })
    }

    /// Send a request whose success body is a `{data}` envelope, using
    /// `fallback` when an error response carries no message
    async fn send_enveloped<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        fallback: &str,
    ) -> Result<Envelope<T>, ClientError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        debug!(%status, "Auth endpoint responded");

        if !status.is_success() {
            let message = ApiMessage::from_body(&body).unwrap_or_else(|| fallback.to_string());
            return Err(ClientError::from_status(status, message));
        }

        serde_json::from_str(&body).map_err(|e| ClientError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl TokenRefresher for PublicClient {
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, RefreshError> {
        self.refresh_token(refresh_token)
            .await
            .map_err(|e| RefreshError(e.to_string()))
    }
}
