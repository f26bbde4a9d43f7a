//! Tradeline admin session core
//!
//! Session model, access token decoding, session storage and the token
//! lifecycle manager shared by the HTTP client and the admin CLI.

pub mod clock;
pub mod error;
pub mod guard;
pub mod manager;
pub mod session;
pub mod store;
pub mod token;

#[cfg(any(test, feature = "tests"))]
pub mod testing;
#[cfg(any(test, feature = "tests"))]
pub mod tests;

pub use clock::{Clock, SystemClock};
pub use error::{CoreError, CoreResult};
pub use guard::{RouteDecision, login_redirect, route_guard};
pub use manager::{
    DEFAULT_REFRESH_MARGIN, InvalidationHandler, InvalidationReason, RefreshError, TokenManager,
    TokenRefresher,
};
pub use session::{SessionError, SessionRecord, TokenPair, UserSnapshot};
pub use store::{FileSessionStore, MemorySessionStore, SessionStore};
pub use token::{decode_expiry, decode_payload};
