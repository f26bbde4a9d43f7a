//! Test harness for SessionStore implementations
//!
//! Any store implementation can be run through this suite to check it keeps
//! exactly one current session and round-trips every field.

use crate::{CoreResult, SessionError, SessionRecord, SessionStore, TokenPair, UserSnapshot};

/// Test suite for SessionStore implementations
pub struct SessionStoreTestSuite<S: SessionStore> {
    store: S,
}

impl<S: SessionStore> SessionStoreTestSuite<S> {
    /// Create a new test suite with the given store
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// A session with every optional field populated
    pub fn sample_session(tag: &str) -> SessionRecord {
        SessionRecord::new(
            TokenPair {
                access_token: format!("access-{tag}"),
                refresh_token: Some(format!("refresh-{tag}")),
                access_token_expires_at: Some(1_700_000_000_000),
            },
            UserSnapshot {
                id: format!("user-{tag}"),
                name: Some("Ada Admin".to_string()),
                email: "ada@example.com".to_string(),
                role: Some("admin".to_string()),
            },
        )
    }

    /// Run all tests
    pub async fn run_all_tests(&self) -> CoreResult<()> {
        self.test_empty_store().await?;
        self.test_set_and_get().await?;
        self.test_set_replaces().await?;
        self.test_error_flag_round_trip().await?;
        self.test_clear().await?;
        Ok(())
    }

    pub async fn test_empty_store(&self) -> CoreResult<()> {
        self.store.clear().await?;
        assert!(self.store.get().await?.is_none(), "Fresh store should be empty");
        Ok(())
    }

    pub async fn test_set_and_get(&self) -> CoreResult<()> {
        let session = Self::sample_session("first");
        self.store.set(session.clone()).await?;
        assert_eq!(self.store.get().await?, Some(session));
        Ok(())
    }

    pub async fn test_set_replaces(&self) -> CoreResult<()> {
        self.store.set(Self::sample_session("old")).await?;
        let newer = Self::sample_session("new");
        self.store.set(newer.clone()).await?;
        assert_eq!(
            self.store.get().await?,
            Some(newer),
            "Only the latest session should be current"
        );
        Ok(())
    }

    pub async fn test_error_flag_round_trip(&self) -> CoreResult<()> {
        let mut session = Self::sample_session("errored");
        session.tokens.refresh_token = None;
        session.tokens.access_token_expires_at = None;
        session.error = Some(SessionError::RefreshAccessTokenError);
        self.store.set(session.clone()).await?;
        assert_eq!(self.store.get().await?, Some(session));
        Ok(())
    }

    pub async fn test_clear(&self) -> CoreResult<()> {
        self.store.set(Self::sample_session("cleared")).await?;
        self.store.clear().await?;
        assert!(self.store.get().await?.is_none());
        // Clearing twice is not an error
        self.store.clear().await?;
        Ok(())
    }
}
