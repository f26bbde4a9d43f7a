//! Wire types for the backend auth endpoints
//!
//! The backend wraps successful payloads in `{ "data": ... }` and reports
//! failures as `{ "message": ... }`.

use serde::{Deserialize, Serialize};
use tradeline_core::{SessionRecord, TokenPair, UserSnapshot};

/// Response envelope
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Error body returned with non-2xx statuses
#[derive(Debug, Default, Deserialize)]
pub struct ApiMessage {
    #[serde(default)]
    pub message: Option<String>,
}

impl ApiMessage {
    /// Extract a non-empty `message` from a raw response body
    pub fn from_body(body: &str) -> Option<String> {
        serde_json::from_str::<Self>(body)
            .ok()
            .and_then(|parsed| parsed.message)
            .filter(|message| !message.is_empty())
    }
}

/// Login request body
#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// Refresh request body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenRequest<'a> {
    pub refresh_token: &'a str,
}

/// User object nested in the login payload
#[derive(Debug, Default, Clone, Deserialize)]
pub struct LoginUser {
    #[serde(rename = "_id", default)]
    pub object_id: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

/// `data` of a login response.
///
/// The identity may arrive nested under `user`, flat on the payload, or as a
/// mix of both.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginPayload {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(rename = "_id", default)]
    pub object_id: Option<String>,
    #[serde(default)]
    pub user: Option<LoginUser>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl LoginPayload {
    /// Build the session for this payload, or `None` when either token is
    /// missing. `login_email` backs up a payload that carries no email.
    pub fn into_session(self, login_email: &str) -> Option<SessionRecord> {
        let access_token = self.access_token.filter(|t| !t.is_empty())?;
        let refresh_token = self.refresh_token.filter(|t| !t.is_empty())?;
        let user = self.user.unwrap_or_default();

        let snapshot = UserSnapshot {
            id: self
                .object_id
                .or(user.object_id)
                .or(user.id)
                .unwrap_or_default(),
            name: user.name.or(self.name),
            email: user
                .email
                .or(self.email)
                .unwrap_or_else(|| login_email.to_string()),
            role: self.role.or(user.role),
        };

        Some(SessionRecord::new(
            TokenPair::new(access_token, Some(refresh_token)),
            snapshot,
        ))
    }
}

/// `data` of a refresh response
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshPayload {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

impl RefreshPayload {
    /// The refreshed pair, or `None` when no access token came back
    pub fn into_pair(self) -> Option<TokenPair> {
        let access_token = self.access_token.filter(|t| !t.is_empty())?;
        let refresh_token = self.refresh_token.filter(|t| !t.is_empty());
        Some(TokenPair::new(access_token, refresh_token))
    }
}
