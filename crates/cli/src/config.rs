//! CLI configuration
//!
//! Layered as built-in defaults, then the optional config file, then
//! `TRADELINE_` environment variables (`TRADELINE_API__BASE_URL`,
//! `TRADELINE_SESSION__FILE`, ...).

use anyhow::Result;
use directories::ProjectDirs;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;
use tradeline_core::DEFAULT_REFRESH_MARGIN;
use tradeline_http::DEFAULT_BASE_URL;

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const SESSION_FILE_NAME: &str = "session.json";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub api: ApiSettings,
    pub session: SessionSettings,
}

/// Backend connection settings
#[derive(Debug, Clone, Deserialize)]
pub struct ApiSettings {
    pub base_url: String,
    /// Request timeout in seconds (0 = no timeout)
    pub timeout_secs: u64,
}

/// Session persistence and refresh settings
#[derive(Debug, Clone, Deserialize)]
pub struct SessionSettings {
    /// Where the session is stored; the platform data directory by default
    #[serde(default)]
    pub file: Option<PathBuf>,
    pub refresh_margin_secs: u64,
}

impl Settings {
    /// Load settings, reading `path` when given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder()
            .set_default("api.base_url", DEFAULT_BASE_URL)?
            .set_default("api.timeout_secs", DEFAULT_TIMEOUT_SECS.to_string())?
            .set_default(
                "session.refresh_margin_secs",
                DEFAULT_REFRESH_MARGIN.as_secs().to_string(),
            )?;

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix("TRADELINE")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Configured request timeout, if any
    pub fn timeout(&self) -> Option<Duration> {
        (self.api.timeout_secs > 0).then(|| Duration::from_secs(self.api.timeout_secs))
    }

    pub fn refresh_margin(&self) -> Duration {
        Duration::from_secs(self.session.refresh_margin_secs)
    }

    /// Resolved location of the session file
    pub fn session_file(&self) -> PathBuf {
        self.session
            .file
            .clone()
            .unwrap_or_else(default_session_file)
    }
}

fn default_session_file() -> PathBuf {
    match ProjectDirs::from("com", "Tradeline", "tradeline-admin") {
        Some(dirs) => dirs.data_dir().join(SESSION_FILE_NAME),
        None => {
            warn!("Failed to determine platform-specific directories, will use fallback");
            PathBuf::from("./.tradeline").join(SESSION_FILE_NAME)
        }
    }
}
