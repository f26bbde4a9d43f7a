//! Session record and token pair types

use crate::token::decode_expiry;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity snapshot cached next to the tokens so profile data is not
/// fetched on every request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSnapshot {
    pub id: String,
    pub name: Option<String>,
    pub email: String,
    pub role: Option<String>,
}

/// Access/refresh token pair as issued by the backend
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    /// Absent when the backend chose not to rotate the refresh token
    pub refresh_token: Option<String>,
    /// Epoch milliseconds, `None` when the access token could not be decoded
    pub access_token_expires_at: Option<i64>,
}

impl TokenPair {
    /// Build a pair, deriving the expiry from the access token payload
    pub fn new(access_token: impl Into<String>, refresh_token: Option<String>) -> Self {
        let access_token = access_token.into();
        let access_token_expires_at = decode_expiry(&access_token);
        Self {
            access_token,
            refresh_token,
            access_token_expires_at,
        }
    }
}

// Tokens stay out of logs
impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &"<redacted>")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "<redacted>"),
            )
            .field("access_token_expires_at", &self.access_token_expires_at)
            .finish()
    }
}

/// Flag set on a session whose refresh failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionError {
    RefreshAccessTokenError,
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RefreshAccessTokenError => f.write_str("RefreshAccessTokenError"),
        }
    }
}

/// The single session held for the signed-in administrator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub tokens: TokenPair,
    pub user: UserSnapshot,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<SessionError>,
}

impl SessionRecord {
    pub fn new(tokens: TokenPair, user: UserSnapshot) -> Self {
        Self {
            tokens,
            user,
            error: None,
        }
    }

    /// Current access token
    pub fn access_token(&self) -> &str {
        &self.tokens.access_token
    }

    /// Whether the access token can be used without refreshing.
    ///
    /// A token is fresh only when it exists, its expiry is known and `now`
    /// is more than `margin_ms` before that expiry.
    pub fn is_fresh(&self, now_ms: i64, margin_ms: i64) -> bool {
        if self.tokens.access_token.is_empty() {
            return false;
        }
        match self.tokens.access_token_expires_at {
            Some(expires_at) => now_ms < expires_at.saturating_sub(margin_ms),
            None => false,
        }
    }

    pub fn is_errored(&self) -> bool {
        self.error.is_some()
    }

    /// Replace the tokens with a refreshed pair.
    ///
    /// The previous refresh token is kept when the backend did not rotate it.
    pub fn apply_refresh(&mut self, refreshed: TokenPair) {
        let refresh_token = refreshed
            .refresh_token
            .or_else(|| self.tokens.refresh_token.take());
        self.tokens = TokenPair {
            access_token: refreshed.access_token,
            refresh_token,
            access_token_expires_at: refreshed.access_token_expires_at,
        };
        self.error = None;
    }

    /// Flag the session as failed to refresh, leaving the tokens untouched
    pub fn mark_refresh_failed(&mut self) {
        self.error = Some(SessionError::RefreshAccessTokenError);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::token_with_exp;

    fn session(exp_seconds: i64) -> SessionRecord {
        SessionRecord::new(
            TokenPair::new(token_with_exp(exp_seconds), Some("refresh-1".to_string())),
            UserSnapshot {
                id: "u1".to_string(),
                email: "admin@example.com".to_string(),
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_pair_derives_expiry() {
        let pair = TokenPair::new(token_with_exp(1_700_000_000), None);
        assert_eq!(pair.access_token_expires_at, Some(1_700_000_000_000));

        let opaque = TokenPair::new("opaque", None);
        assert_eq!(opaque.access_token_expires_at, None);
    }

    #[test]
    fn test_freshness_respects_margin() {
        let s = session(1_000);
        let expires = 1_000_000;
        assert!(s.is_fresh(expires - 60_001, 60_000));
        assert!(!s.is_fresh(expires - 60_000, 60_000));
        assert!(!s.is_fresh(expires + 1, 60_000));
    }

    #[test]
    fn test_unknown_expiry_is_never_fresh() {
        let s = SessionRecord::new(TokenPair::new("opaque", None), UserSnapshot::default());
        assert!(!s.is_fresh(0, 0));
    }

    #[test]
    fn test_apply_refresh_keeps_unrotated_refresh_token() {
        let mut s = session(1_000);
        s.mark_refresh_failed();
        s.apply_refresh(TokenPair::new(token_with_exp(2_000), None));

        assert_eq!(s.tokens.refresh_token.as_deref(), Some("refresh-1"));
        assert_eq!(s.tokens.access_token_expires_at, Some(2_000_000));
        assert!(!s.is_errored());
    }

    #[test]
    fn test_apply_refresh_takes_rotated_refresh_token() {
        let mut s = session(1_000);
        s.apply_refresh(TokenPair::new(token_with_exp(2_000), Some("refresh-2".into())));
        assert_eq!(s.tokens.refresh_token.as_deref(), Some("refresh-2"));
    }

    #[test]
    fn test_mark_refresh_failed_keeps_tokens() {
        let mut s = session(1_000);
        let before = s.tokens.clone();
        s.mark_refresh_failed();
        assert_eq!(s.tokens, before);
        assert_eq!(s.error, Some(SessionError::RefreshAccessTokenError));
    }

    #[test]
    fn test_error_flag_wire_name() {
        let mut s = session(1_000);
        s.mark_refresh_failed();
        let value = serde_json::to_value(&s).unwrap();
        assert_eq!(value["error"], "RefreshAccessTokenError");

        let clean = serde_json::to_value(session(1_000)).unwrap();
        assert!(clean.get("error").is_none());
    }

    #[test]
    fn test_debug_redacts_tokens() {
        let rendered = format!("{:?}", session(1_000).tokens);
        assert!(rendered.contains("<redacted>"));
        assert!(!rendered.contains("refresh-1"));
    }
}
