//! Client configuration
//!
//! Settings are read from `SESSION_CLIENT_*` environment variables through the
//! `config` crate. Every field has a default, so an empty environment yields a
//! client pointed at a local backend.

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{ConfigError, ConfigResult};

/// Environment variable prefix for every client setting
pub const ENV_PREFIX: &str = "SESSION_CLIENT";

/// Backend endpoint paths, relative to [`ClientConfig::base_url`]
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Endpoints {
    pub login: String,
    pub refresh: String,
    pub logout: String,
    pub validate: String,
    pub upload: String,
    /// Prefix of the status endpoint; the job id is appended
    pub upload_status: String,
    /// Prefix of the retry endpoint; the job id is appended
    pub retry_processing: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            login: "/auth/login".to_string(),
            refresh: "/auth/refresh".to_string(),
            logout: "/auth/logout".to_string(),
            validate: "/auth/validate-token".to_string(),
            upload: "/audio-async/upload-audio/".to_string(),
            upload_status: "/audio-async/upload-status/".to_string(),
            retry_processing: "/audio-async/retry-processing/".to_string(),
        }
    }
}

/// Client configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Backend base URL (default: "http://localhost:8000")
    pub base_url: String,
    /// Per-request timeout in seconds (default: 30)
    pub request_timeout_secs: u64,
    /// Interval of the background token check in seconds (default: 300)
    pub token_check_interval_secs: u64,
    /// Job status polling interval in milliseconds (default: 3000)
    pub poll_interval_ms: u64,
    /// Upper bound of the poll delay after repeated transport failures (default: 30000)
    pub poll_max_backoff_ms: u64,
    /// Credential file location; `None` keeps credentials in memory only
    pub storage_path: Option<PathBuf>,
    pub endpoints: Endpoints,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            request_timeout_secs: 30,
            token_check_interval_secs: 300, // 5 minutes
            poll_interval_ms: 3000,
            poll_max_backoff_ms: 30_000,
            storage_path: None,
            endpoints: Endpoints::default(),
        }
    }
}

impl ClientConfig {
    /// Create a new ClientConfig from environment variables
    ///
    /// # Environment Variables
    /// - `SESSION_CLIENT_BASE_URL`: backend base URL (default: "http://localhost:8000")
    /// - `SESSION_CLIENT_REQUEST_TIMEOUT_SECS`: request timeout (default: 30)
    /// - `SESSION_CLIENT_TOKEN_CHECK_INTERVAL_SECS`: background token check (default: 300)
    /// - `SESSION_CLIENT_POLL_INTERVAL_MS`: job polling interval (default: 3000)
    /// - `SESSION_CLIENT_POLL_MAX_BACKOFF_MS`: poll backoff cap (default: 30000)
    /// - `SESSION_CLIENT_STORAGE_PATH`: credential file path (default: unset)
    pub fn from_env() -> ConfigResult<Self> {
        let settings = config::Config::builder()
            .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?;

        let config: ClientConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Point the client at another backend.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Reject values that would make the client unusable
    pub fn validate(&self) -> ConfigResult<()> {
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ConfigError::Invalid(format!(
                "base_url must be an http(s) URL, got '{}'",
                self.base_url
            )));
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "poll_interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.token_check_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "token_check_interval_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn token_check_interval(&self) -> Duration {
        Duration::from_secs(self.token_check_interval_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn poll_max_backoff(&self) -> Duration {
        Duration::from_millis(self.poll_max_backoff_ms.max(self.poll_interval_ms))
    }

    /// Build a full URL from an endpoint path
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    pub fn login_url(&self) -> String {
        self.url(&self.endpoints.login)
    }

    pub fn refresh_url(&self) -> String {
        self.url(&self.endpoints.refresh)
    }

    pub fn logout_url(&self) -> String {
        self.url(&self.endpoints.logout)
    }

    pub fn validate_url(&self) -> String {
        self.url(&self.endpoints.validate)
    }

    pub fn upload_url(&self) -> String {
        self.url(&self.endpoints.upload)
    }

    pub fn upload_status_url(&self, job_id: &str) -> String {
        format!("{}{}", self.url(&self.endpoints.upload_status), job_id)
    }

    pub fn retry_processing_url(&self, job_id: &str) -> String {
        format!("{}{}", self.url(&self.endpoints.retry_processing), job_id)
    }
}
