//! Pure WebCrawler API REST client.
//!
//! Starts crawl jobs and custom scraper runs on the remote service, polls
//! them until they finish, and parses the responses into typed models. The
//! crawling itself happens server-side.
//!
//! # Example
//!
//! ```rust,ignore
//! use webcrawler_api::{CrawlRequest, ScrapeType, WebCrawlerClient};
//!
//! let client = WebCrawlerClient::from_env()?;
//!
//! let job = client
//!     .crawl(
//!         &CrawlRequest::new("https://books.toscrape.com")
//!             .scrape_type(ScrapeType::Markdown)
//!             .items_limit(20),
//!     )
//!     .await?;
//!
//! for item in &job.job_items {
//!     println!("{} {}", item.page_status_code, item.original_url);
//! }
//! ```
//!
//! # Custom scrapers
//!
//! ```rust,ignore
//! use serde_json::json;
//! use webcrawler_api::ScrapeRequest;
//!
//! let data = client
//!     .scrape(&ScrapeRequest::new("webcrawler/url-to-md", json!({"url": "https://example.com"})))
//!     .await?;
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod polling;
pub mod types;

pub use client::WebCrawlerClient;
pub use config::{ApiKey, ClientConfig};
pub use error::{Result, WebCrawlerError};
pub use polling::{poll_delay, PollOutcome, Sleeper, TokioSleeper, DEFAULT_POLL_DELAY};
pub use types::*;
