//! HTTP client for the WebCrawler API.

use reqwest::{header, Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::error::{Result, WebCrawlerError};
use crate::polling::{poll_until_terminal, PollOutcome, Sleeper, TokioSleeper};
use crate::types::{
    CancelResponse, CrawlRequest, CrawlResponse, Job, JobItem, ScrapeRequest, ScrapeResponse,
    ScrapeResult, ScrapeStatus, ScrapeType,
};

/// WebCrawler API client.
///
/// Holds one connection pool for its lifetime. Each call awaits one request
/// at a time; the blocking `crawl`/`scrape` flows poll sequentially.
#[derive(Clone)]
pub struct WebCrawlerClient {
    http_client: Client,
    config: ClientConfig,
    sleeper: Arc<dyn Sleeper>,
}

impl WebCrawlerClient {
    /// Create a client for the public API with the given key.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::from_config(ClientConfig::new(api_key))
    }

    /// Create from `WEBCRAWLERAPI_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_config(ClientConfig::from_env()?)
    }

    pub fn from_config(config: ClientConfig) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        let http_client = Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            http_client,
            config,
            sleeper: Arc::new(TokioSleeper),
        })
    }

    /// Set a custom base URL (self-hosted deployments, proxies, tests).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.config = self.config.with_base_url(url);
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.config = self.config.with_version(version);
        self
    }

    /// Default poll budget for `crawl` and `scrape`.
    pub fn with_max_polls(mut self, max_polls: u32) -> Self {
        self.config = self.config.with_max_polls(max_polls);
        self
    }

    /// Replace how the poll loop waits between status checks.
    pub fn with_sleeper(mut self, sleeper: impl Sleeper + 'static) -> Self {
        self.sleeper = Arc::new(sleeper);
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    // =========================================================================
    // Crawl jobs
    // =========================================================================

    /// Start a crawl job. Returns as soon as the server has accepted it.
    pub async fn start_crawl(&self, request: &CrawlRequest) -> Result<CrawlResponse> {
        let response: CrawlResponse = self
            .send(self.http_client.post(self.config.endpoint("/crawl")).json(request))
            .await?;

        info!(
            job_id = %response.id,
            url = %request.url,
            scrape_type = %request.scrape_type,
            items_limit = request.items_limit,
            "Crawl job started"
        );
        Ok(response)
    }

    /// Fetch the current snapshot of a job, including its items.
    pub async fn get_job(&self, job_id: &str) -> Result<Job> {
        self.send(
            self.http_client
                .get(self.config.endpoint(&format!("/job/{}", job_id))),
        )
        .await
    }

    /// Cancel a job.
    ///
    /// Items not yet started or finished are marked cancelled and not billed.
    /// Cancelling a job that already finished is left to the server to decide.
    pub async fn cancel_job(&self, job_id: &str) -> Result<CancelResponse> {
        let response: CancelResponse = self
            .send(
                self.http_client
                    .put(self.config.endpoint(&format!("/job/{}/cancel", job_id))),
            )
            .await?;

        info!(job_id, message = ?response.message, "Job cancellation requested");
        Ok(response)
    }

    /// Start a crawl and wait for it using the configured poll budget.
    ///
    /// See [`crawl_with_max_polls`](Self::crawl_with_max_polls).
    pub async fn crawl(&self, request: &CrawlRequest) -> Result<Job> {
        self.crawl_with_max_polls(request, self.config.max_polls).await
    }

    /// Start a crawl and poll until the job is done, errored or cancelled.
    ///
    /// Running out of polls is not an error here: the last snapshot is
    /// returned and the caller decides what a non-terminal job means. A budget
    /// of zero still fetches the job once so there is a snapshot to return.
    pub async fn crawl_with_max_polls(&self, request: &CrawlRequest, max_polls: u32) -> Result<Job> {
        let started = self.start_crawl(request).await?;
        let job_id = started.id.as_str();

        let outcome = poll_until_terminal(self.sleeper.as_ref(), max_polls, move || {
            self.get_job(job_id)
        })
        .await?;

        match &outcome {
            PollOutcome::Terminal { snapshot, polls } => info!(
                job_id,
                status = %snapshot.status,
                items = snapshot.job_items.len(),
                polls,
                "Crawl job finished"
            ),
            PollOutcome::Exhausted { snapshot, polls } => warn!(
                job_id,
                status = %snapshot.status,
                polls,
                "Poll budget exhausted, returning last job snapshot"
            ),
        }

        Ok(outcome.into_snapshot())
    }

    /// Download the stored content of a crawled page.
    ///
    /// Returns `None` when the item has no content for `scrape_type`. Content
    /// locations are pre-signed, so no authorization header is sent.
    pub async fn get_item_content(
        &self,
        item: &JobItem,
        scrape_type: ScrapeType,
    ) -> Result<Option<String>> {
        let Some(url) = item.content_url(scrape_type) else {
            debug!(item_id = %item.id, %scrape_type, "Item has no content for scrape type");
            return Ok(None);
        };

        let response = self.http_client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!(item_id = %item.id, status = %status, "Item content download failed");
            return Err(WebCrawlerError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(Some(response.text().await?))
    }

    // =========================================================================
    // Custom scrapers
    // =========================================================================

    /// Start a custom scraper run. Returns as soon as the server has accepted it.
    pub async fn start_scrape(&self, request: &ScrapeRequest) -> Result<ScrapeResponse> {
        let response: ScrapeResponse = self
            .send(self.http_client.post(self.config.endpoint("/scrape")).json(request))
            .await?;

        info!(scrape_id = %response.id, crawler_id = %request.crawler_id, "Scrape started");
        Ok(response)
    }

    /// Fetch the current snapshot of a scraper run.
    pub async fn get_scrape(&self, scrape_id: &str) -> Result<ScrapeResult> {
        self.send(
            self.http_client
                .get(self.config.endpoint(&format!("/scrape/{}", scrape_id))),
        )
        .await
    }

    /// Run a scraper and wait for its structured data using the configured poll budget.
    pub async fn scrape(&self, request: &ScrapeRequest) -> Result<Value> {
        self.scrape_with_max_polls(request, self.config.max_polls).await
    }

    /// Run a scraper and poll until it is done, returning only its structured data.
    ///
    /// Fails with [`WebCrawlerError::ScrapeFailed`] when the run reports an
    /// error and with [`WebCrawlerError::MaxPollsReached`] when the budget runs
    /// out first. A budget of zero starts the run but never checks its status.
    pub async fn scrape_with_max_polls(&self, request: &ScrapeRequest, max_polls: u32) -> Result<Value> {
        let started = self.start_scrape(request).await?;
        let scrape_id = started.id.as_str();

        if max_polls == 0 {
            warn!(scrape_id, "Scrape poll budget is zero, not polling");
            return Err(WebCrawlerError::MaxPollsReached { polls: 0 });
        }

        let outcome = poll_until_terminal(self.sleeper.as_ref(), max_polls, move || {
            self.get_scrape(scrape_id)
        })
        .await?;

        match outcome {
            PollOutcome::Terminal { snapshot, polls } => match snapshot.status {
                ScrapeStatus::Done => {
                    info!(scrape_id, polls, "Scrape finished");
                    Ok(snapshot.structured_data.unwrap_or(Value::Null))
                }
                _ => {
                    let message = snapshot
                        .error
                        .unwrap_or_else(|| "Unknown error".to_string());
                    warn!(scrape_id, polls, error = %message, "Scrape failed");
                    Err(WebCrawlerError::ScrapeFailed(message))
                }
            },
            PollOutcome::Exhausted { snapshot, polls } => {
                warn!(scrape_id, status = %snapshot.status, polls, "Scrape poll budget exhausted");
                Err(WebCrawlerError::MaxPollsReached { polls })
            }
        }
    }

    // =========================================================================
    // Transport
    // =========================================================================

    async fn send<R: DeserializeOwned>(&self, request: RequestBuilder) -> Result<R> {
        let response = request
            .bearer_auth(self.config.api_key.expose())
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "WebCrawler API request failed");
                WebCrawlerError::Network(e)
            })?;

        let status = response.status();
        let url = response.url().path().to_string();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!(status = %status, path = %url, error = %message, "WebCrawler API error");
            return Err(WebCrawlerError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await?;
        debug!(status = %status, path = %url, bytes = body.len(), "WebCrawler API response");
        Ok(serde_json::from_str(&body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_builder() {
        let client = WebCrawlerClient::new("wc-test")
            .unwrap()
            .with_base_url("https://custom.api.com/")
            .with_version("v2")
            .with_max_polls(3);

        assert_eq!(client.config().api_key.expose(), "wc-test");
        assert_eq!(client.config().base_url, "https://custom.api.com");
        assert_eq!(client.config().max_polls, 3);
        assert_eq!(
            client.config().endpoint("/job/abc/cancel"),
            "https://custom.api.com/v2/job/abc/cancel"
        );
    }
}
