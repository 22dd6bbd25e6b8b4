//! Client configuration.
//!
//! The API key is wrapped with the `secrecy` crate so it never shows up in
//! logs, debug output, or error messages.

use secrecy::{ExposeSecret, SecretBox};
use std::fmt;
use std::time::Duration;

use crate::error::{Result, WebCrawlerError};

pub const DEFAULT_BASE_URL: &str = "https://api.webcrawlerapi.com";
pub const DEFAULT_VERSION: &str = "v1";
pub const DEFAULT_MAX_POLLS: u32 = 100;
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

const ENV_API_KEY: &str = "WEBCRAWLERAPI_API_KEY";
const ENV_BASE_URL: &str = "WEBCRAWLERAPI_BASE_URL";
const ENV_VERSION: &str = "WEBCRAWLERAPI_VERSION";
const ENV_MAX_POLLS: &str = "WEBCRAWLERAPI_MAX_POLLS";

/// An API key that won't be logged or displayed.
pub struct ApiKey(SecretBox<str>);

impl ApiKey {
    pub fn new(value: impl Into<String>) -> Self {
        Self(SecretBox::new(Box::from(value.into().as_str())))
    }

    /// Expose the key. Only call this when building a request.
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl Clone for ApiKey {
    fn clone(&self) -> Self {
        Self::new(self.expose())
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl fmt::Display for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl From<String> for ApiKey {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for ApiKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Connection settings for [`WebCrawlerClient`](crate::WebCrawlerClient).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_key: ApiKey,
    pub base_url: String,
    pub version: String,
    /// Poll budget used by `crawl` and `scrape` when none is given per call
    pub max_polls: u32,
    pub request_timeout: Duration,
}

impl ClientConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: ApiKey::new(api_key),
            base_url: DEFAULT_BASE_URL.to_string(),
            version: DEFAULT_VERSION.to_string(),
            max_polls: DEFAULT_MAX_POLLS,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Load configuration from `WEBCRAWLERAPI_*` environment variables.
    ///
    /// Only `WEBCRAWLERAPI_API_KEY` is required.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_key = lookup(ENV_API_KEY)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| WebCrawlerError::Config(format!("{} not set", ENV_API_KEY)))?;

        let mut config = Self::new(api_key);
        if let Some(base_url) = lookup(ENV_BASE_URL) {
            config = config.with_base_url(base_url);
        }
        if let Some(version) = lookup(ENV_VERSION) {
            config.version = version;
        }
        if let Some(raw) = lookup(ENV_MAX_POLLS) {
            config.max_polls = raw.trim().parse().map_err(|_| {
                WebCrawlerError::Config(format!("{} must be a valid number, got {:?}", ENV_MAX_POLLS, raw))
            })?;
        }
        Ok(config)
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_max_polls(mut self, max_polls: u32) -> Self {
        self.max_polls = max_polls;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Absolute URL for an API path, e.g. `endpoint("/crawl")`.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}{}", self.base_url, self.version, path)
    }
}
