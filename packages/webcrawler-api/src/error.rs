//! Error types for the WebCrawler API client.

use thiserror::Error;

/// Result type for WebCrawler API client operations.
pub type Result<T> = std::result::Result<T, WebCrawlerError>;

/// WebCrawler API client errors.
#[derive(Debug, Error)]
pub enum WebCrawlerError {
    /// Configuration error (missing API key, invalid settings)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network error (connection failed, timeout, body read)
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Non-2xx response from the service
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Response body could not be deserialized into the expected model
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// A scrape reported the `error` status
    #[error("Scraping failed: {0}")]
    ScrapeFailed(String),

    /// A scrape did not reach a terminal status within the poll budget
    #[error("Maximum number of polls reached without completion")]
    MaxPollsReached { polls: u32 },
}

impl WebCrawlerError {
    /// HTTP status code for `Api` errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            WebCrawlerError::Api { status, .. } => Some(*status),
            WebCrawlerError::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// True when the service answered 404 (unknown job or scrape id).
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}
