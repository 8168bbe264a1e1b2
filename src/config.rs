// src/config.rs

//! Client configuration: API endpoint, HTTP behavior, session persistence.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ApiError, Result};

/// Environment variable overriding the API base URL.
pub const ENV_BASE_URL: &str = "SCMS_API_BASE_URL";
/// Environment variable overriding the request timeout (seconds).
pub const ENV_TIMEOUT_SECS: &str = "SCMS_TIMEOUT_SECS";
/// Environment variable overriding the session file path.
pub const ENV_SESSION_FILE: &str = "SCMS_SESSION_FILE";

/// Root client configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientConfig {
    /// API endpoint and HTTP behavior settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Session persistence settings
    #[serde(default)]
    pub session: SessionConfig,
}

impl ClientConfig {
    /// Load configuration from a TOML file, then apply environment overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration or return default (plus env overrides) if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            if path.as_ref().exists() {
                log::warn!(
                    "Config load failed from {:?}: {}. Using defaults.",
                    path.as_ref(),
                    e
                );
            }
            let mut config = Self::default();
            config.apply_env_overrides();
            config
        })
    }

    /// Apply `SCMS_*` environment variables on top of file/default values.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(base_url) = std::env::var(ENV_BASE_URL) {
            if !base_url.trim().is_empty() {
                self.api.base_url = base_url;
            }
        }
        if let Ok(timeout) = std::env::var(ENV_TIMEOUT_SECS) {
            if let Ok(secs) = timeout.trim().parse::<u64>() {
                self.api.timeout_secs = secs;
            }
        }
        if let Ok(file) = std::env::var(ENV_SESSION_FILE) {
            if !file.trim().is_empty() {
                self.session.file = PathBuf::from(file);
            }
        }
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        let base = self.api.base_url.trim();
        if base.is_empty() {
            return Err(ApiError::validation("api.base_url is empty"));
        }
        if !base.starts_with("http://") && !base.starts_with("https://") {
            return Err(ApiError::validation(
                "api.base_url must start with http:// or https://",
            ));
        }
        url::Url::parse(base)?;
        if self.api.timeout_secs == 0 {
            return Err(ApiError::validation("api.timeout_secs must be > 0"));
        }
        if self.api.user_agent.trim().is_empty() {
            return Err(ApiError::validation("api.user_agent is empty"));
        }
        if self.session.file.as_os_str().is_empty() {
            return Err(ApiError::validation("session.file is empty"));
        }
        Ok(())
    }
}

/// API endpoint and HTTP behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Backend base URL; a trailing slash is ignored
    #[serde(default = "defaults::base_url")]
    pub base_url: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,
}

impl ApiConfig {
    /// Base URL with any trailing slash stripped.
    pub fn root(&self) -> &str {
        self.base_url.trim().trim_end_matches('/')
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::base_url(),
            timeout_secs: defaults::timeout(),
            user_agent: defaults::user_agent(),
        }
    }
}

/// Session persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// File the authenticated session is persisted to
    #[serde(default = "defaults::session_file")]
    pub file: PathBuf,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            file: defaults::session_file(),
        }
    }
}

mod defaults {
    use std::path::PathBuf;

    pub fn base_url() -> String {
        "http://localhost:8080".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn user_agent() -> String {
        concat!("scms-client/", env!("CARGO_PKG_VERSION")).into()
    }
    pub fn session_file() -> PathBuf {
        PathBuf::from("scms_session.json")
    }
}
