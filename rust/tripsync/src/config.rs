//! Client configuration.

use std::env;
use std::time::Duration;

use log::{info, warn};

/// Environment variable overriding [`ClientConfig::base_url`].
pub const ENV_API_URL: &str = "TRIPSYNC_API_URL";
/// Environment variable overriding [`ClientConfig::timeout`], in seconds.
pub const ENV_TIMEOUT_SECS: &str = "TRIPSYNC_TIMEOUT_SECS";

/// Settings for the HTTP trip store.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Backend origin, without a trailing slash. Paths such as
    /// `/api/trips` are appended to it.
    pub base_url: String,
    /// Whole-request timeout.
    pub timeout: Duration,
    /// Time allowed to establish a connection.
    pub connect_timeout: Duration,
    /// How long idle pooled connections are kept.
    pub pool_idle_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            pool_idle_timeout: Duration::from_secs(60),
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::default().with_base_url(base_url)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = normalize_base_url(base_url.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Defaults overridden by `TRIPSYNC_API_URL` and `TRIPSYNC_TIMEOUT_SECS`.
    /// Unusable values are logged and ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        match lookup(ENV_API_URL) {
            Some(url) if !url.trim().is_empty() => {
                config = config.with_base_url(url.trim());
            }
            Some(_) => warn!("[ClientConfig] {ENV_API_URL} is empty, using default"),
            None => info!(
                "[ClientConfig] {ENV_API_URL} not set, using default: {}",
                config.base_url
            ),
        }

        if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => config.timeout = Duration::from_secs(secs),
                Ok(_) => warn!("[ClientConfig] {ENV_TIMEOUT_SECS} must be positive, ignoring"),
                Err(e) => warn!("[ClientConfig] Invalid {ENV_TIMEOUT_SECS} value '{raw}': {e}"),
            }
        }

        config
    }
}

fn normalize_base_url(url: String) -> String {
    url.trim_end_matches('/').to_string()
}
