//! Session token lifecycle
//!
//! [`TokenManager`] hands out access tokens that are valid for at least the
//! configured safety margin, refreshing them lazily through a
//! [`TokenRefresher`] when they are about to expire.
//!
//! Refreshes are single-flight: the first caller that sees a stale token
//! performs the refresh while holding `refresh_lock`; callers that queued up
//! behind it notice the refresh generation moved on and reuse the stored
//! outcome instead of spending the refresh token a second time.
//!
//! Store writes go through `store_lock`. A refresh that finishes after the
//! session was signed in, signed out or invalidated is discarded.

use crate::clock::{Clock, SystemClock};
use crate::session::{SessionRecord, TokenPair};
use crate::store::SessionStore;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Default margin before expiry at which a token is treated as stale
pub const DEFAULT_REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Error returned by a refresh attempt
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct RefreshError(pub String);

/// Exchanges a refresh token for a new token pair
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, RefreshError>;
}

/// Why a session was torn down
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidationReason {
    /// The refresh token could not be exchanged
    RefreshFailed,
    /// The backend answered 401 to an authenticated request
    Unauthorized,
}

/// Callback fired after a session is invalidated
pub type InvalidationHandler = Arc<dyn Fn(InvalidationReason) + Send + Sync>;

/// Owns the session lifecycle for one signed-in administrator
pub struct TokenManager {
    store: Arc<dyn SessionStore>,
    refresher: Arc<dyn TokenRefresher>,
    clock: Arc<dyn Clock>,
    refresh_margin_ms: i64,
    refresh_lock: Mutex<()>,
    // Held across a store write and the generation bump that publishes it
    store_lock: Mutex<()>,
    generation: AtomicU64,
    on_invalidated: RwLock<Option<InvalidationHandler>>,
}

impl TokenManager {
    pub fn new(store: Arc<dyn SessionStore>, refresher: Arc<dyn TokenRefresher>) -> Self {
        Self {
            store,
            refresher,
            clock: Arc::new(SystemClock),
            refresh_margin_ms: margin_millis(DEFAULT_REFRESH_MARGIN),
            refresh_lock: Mutex::new(()),
            store_lock: Mutex::new(()),
            generation: AtomicU64::new(0),
            on_invalidated: RwLock::new(None),
        }
    }

    /// Replace the clock used for expiry checks
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Set how long before expiry a token is considered stale
    #[must_use]
    pub fn with_refresh_margin(mut self, margin: Duration) -> Self {
        self.refresh_margin_ms = margin_millis(margin);
        self
    }

    /// Register the callback fired when a session is invalidated
    pub fn set_invalidation_handler(&self, handler: InvalidationHandler) {
        *self
            .on_invalidated
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(handler);
    }

    /// Remove the invalidation callback
    pub fn clear_invalidation_handler(&self) {
        *self
            .on_invalidated
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Read the stored session without refreshing it
    pub async fn current(&self) -> Option<SessionRecord> {
        match self.store.get().await {
            Ok(session) => session,
            Err(e) => {
                warn!(error = %e, "Failed to read session store, treating as signed out");
                None
            }
        }
    }

    /// Make `session` the current session
    pub async fn sign_in(&self, session: SessionRecord) {
        info!(
            user_id = %session.user.id,
            expires_at = ?session.tokens.access_token_expires_at,
            "Session started"
        );
        let _write = self.store_lock.lock().await;
        self.persist(&session).await;
        self.generation.fetch_add(1, Ordering::AcqRel);
    }

    /// Drop the current session
    pub async fn sign_out(&self) {
        let _write = self.store_lock.lock().await;
        if let Err(e) = self.store.clear().await {
            error!(error = %e, "Failed to clear session store");
        }
        self.generation.fetch_add(1, Ordering::AcqRel);
        debug!("Session cleared");
    }

    /// Drop the current session and notify the invalidation handler
    pub async fn invalidate(&self, reason: InvalidationReason) {
        warn!(?reason, "Session invalidated");
        self.sign_out().await;

        let handler = self
            .on_invalidated
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(handler) = handler {
            handler(reason);
        }
    }

    /// Return the current session, refreshing its tokens first if the access
    /// token is missing, undecodable or within the margin of expiring.
    ///
    /// Sessions without a refresh token are returned unchanged; the backend
    /// will reject the stale token and the 401 path takes over. A failed
    /// refresh yields the session with its error flag set and its tokens
    /// untouched. Errored sessions are terminal and are not refreshed again.
    pub async fn valid_session(&self) -> Option<SessionRecord> {
        // Sampled before the read so a refresh landing in between is noticed
        let observed = self.generation.load(Ordering::Acquire);
        let session = self.current().await?;
        if session.is_errored() || self.is_fresh(&session) {
            return Some(session);
        }
        if session.tokens.refresh_token.is_none() {
            debug!("Access token stale and no refresh token present");
            return Some(session);
        }

        let _flight = self.refresh_lock.lock().await;
        if self.generation.load(Ordering::Acquire) != observed {
            debug!("Session changed while waiting, reusing its outcome");
            return self.current().await;
        }

        let refreshed = self.refresh_session(session).await;

        let _write = self.store_lock.lock().await;
        if self.generation.load(Ordering::Acquire) != observed {
            debug!("Session replaced during refresh, discarding refreshed tokens");
            return self.current().await;
        }
        self.persist(&refreshed).await;
        self.generation.fetch_add(1, Ordering::AcqRel);
        Some(refreshed)
    }

    /// Access token to attach to the next request.
    ///
    /// `None` when there is no session or its refresh failed.
    pub async fn get_valid_access_token(&self) -> Option<String> {
        self.valid_session()
            .await
            .filter(|session| !session.is_errored())
            .map(|session| session.tokens.access_token)
    }

    async fn refresh_session(&self, mut session: SessionRecord) -> SessionRecord {
        let Some(refresh_token) = session.tokens.refresh_token.clone() else {
            return session;
        };

        match self.refresher.refresh(&refresh_token).await {
            Ok(pair) => {
                info!(
                    user_id = %session.user.id,
                    rotated = pair.refresh_token.is_some(),
                    expires_at = ?pair.access_token_expires_at,
                    "Access token refreshed"
                );
                session.apply_refresh(pair);
            }
            Err(e) => {
                warn!(user_id = %session.user.id, error = %e, "Access token refresh failed");
                session.mark_refresh_failed();
            }
        }
        session
    }

    fn is_fresh(&self, session: &SessionRecord) -> bool {
        session.is_fresh(self.clock.now_millis(), self.refresh_margin_ms)
    }

    async fn persist(&self, session: &SessionRecord) {
        if let Err(e) = self.store.set(session.clone()).await {
            error!(error = %e, "Failed to persist session");
        }
    }
}

fn margin_millis(margin: Duration) -> i64 {
    i64::try_from(margin.as_millis()).unwrap_or(i64::MAX)
}
