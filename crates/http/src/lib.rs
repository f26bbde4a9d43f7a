//! Tradeline backend client
//!
//! Typed access to the auth endpoints plus an authenticated client that
//! keeps the administrator's session valid.

pub mod client;
pub mod types;

pub use client::{AdminClient, AdminClientBuilder, DEFAULT_BASE_URL, PublicClient};
pub use client::error::ClientError;
