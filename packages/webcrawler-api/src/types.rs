//! WebCrawler API request and response types.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

// =============================================================================
// Enumerations
// =============================================================================

/// Content format the crawler stores for each page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrapeType {
    /// Raw HTML as fetched
    #[default]
    Html,
    /// HTML with boilerplate removed
    Cleaned,
    /// Markdown rendition
    Markdown,
}

impl ScrapeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScrapeType::Html => "html",
            ScrapeType::Cleaned => "cleaned",
            ScrapeType::Markdown => "markdown",
        }
    }
}

impl fmt::Display for ScrapeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScrapeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "html" => Ok(ScrapeType::Html),
            "cleaned" => Ok(ScrapeType::Cleaned),
            "markdown" => Ok(ScrapeType::Markdown),
            other => Err(format!(
                "unknown scrape type '{}' (expected html, cleaned or markdown)",
                other
            )),
        }
    }
}

/// Status of a crawl job or of one of its items.
///
/// Unrecognised values are kept verbatim in `Other` so a new server-side
/// status never breaks deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum JobStatus {
    New,
    InProgress,
    Done,
    Error,
    Cancelled,
    Other(String),
}

impl JobStatus {
    /// Done, error and cancelled are final; nothing changes afterwards.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Error | JobStatus::Cancelled)
    }

    pub fn as_str(&self) -> &str {
        match self {
            JobStatus::New => "new",
            JobStatus::InProgress => "in_progress",
            JobStatus::Done => "done",
            JobStatus::Error => "error",
            JobStatus::Cancelled => "cancelled",
            JobStatus::Other(s) => s,
        }
    }
}

impl From<String> for JobStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "new" => JobStatus::New,
            "in_progress" => JobStatus::InProgress,
            "done" => JobStatus::Done,
            "error" => JobStatus::Error,
            "cancelled" | "canceled" => JobStatus::Cancelled,
            _ => JobStatus::Other(s),
        }
    }
}

impl From<JobStatus> for String {
    fn from(status: JobStatus) -> Self {
        match status {
            JobStatus::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of a custom scraper run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ScrapeStatus {
    New,
    InProgress,
    Done,
    Error,
    Other(String),
}

impl ScrapeStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ScrapeStatus::Done | ScrapeStatus::Error)
    }

    pub fn as_str(&self) -> &str {
        match self {
            ScrapeStatus::New => "new",
            ScrapeStatus::InProgress => "in_progress",
            ScrapeStatus::Done => "done",
            ScrapeStatus::Error => "error",
            ScrapeStatus::Other(s) => s,
        }
    }
}

impl From<String> for ScrapeStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "new" => ScrapeStatus::New,
            "in_progress" => ScrapeStatus::InProgress,
            "done" => ScrapeStatus::Done,
            "error" => ScrapeStatus::Error,
            _ => ScrapeStatus::Other(s),
        }
    }
}

impl From<ScrapeStatus> for String {
    fn from(status: ScrapeStatus) -> Self {
        match status {
            ScrapeStatus::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for ScrapeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Crawl
// =============================================================================

/// Body of `POST /{version}/crawl`.
///
/// Optional fields left unset (or set to an empty string) are omitted from
/// the payload so the server applies its own defaults.
#[derive(Debug, Clone, Serialize)]
pub struct CrawlRequest {
    /// Seed URL where the crawler starts
    pub url: String,

    pub scrape_type: ScrapeType,

    /// Maximum number of pages to crawl
    pub items_limit: u32,

    pub allow_subdomains: bool,

    #[serde(skip_serializing_if = "is_blank")]
    pub webhook_url: Option<String>,

    #[serde(skip_serializing_if = "is_blank")]
    pub whitelist_regexp: Option<String>,

    #[serde(skip_serializing_if = "is_blank")]
    pub blacklist_regexp: Option<String>,
}

impl CrawlRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            scrape_type: ScrapeType::Html,
            items_limit: 10,
            allow_subdomains: false,
            webhook_url: None,
            whitelist_regexp: None,
            blacklist_regexp: None,
        }
    }

    pub fn scrape_type(mut self, scrape_type: ScrapeType) -> Self {
        self.scrape_type = scrape_type;
        self
    }

    pub fn items_limit(mut self, items_limit: u32) -> Self {
        self.items_limit = items_limit;
        self
    }

    pub fn allow_subdomains(mut self, allow: bool) -> Self {
        self.allow_subdomains = allow;
        self
    }

    /// URL that receives a POST when the job finishes.
    pub fn webhook_url(mut self, url: impl Into<String>) -> Self {
        self.webhook_url = Some(url.into());
        self
    }

    /// Only URLs matching this regex are crawled.
    pub fn whitelist_regexp(mut self, regexp: impl Into<String>) -> Self {
        self.whitelist_regexp = Some(regexp.into());
        self
    }

    /// URLs matching this regex are skipped.
    pub fn blacklist_regexp(mut self, regexp: impl Into<String>) -> Self {
        self.blacklist_regexp = Some(regexp.into());
        self
    }
}

/// Response of `POST /{version}/crawl`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CrawlResponse {
    #[serde(rename = "job_id")]
    pub id: String,
}

/// Snapshot of a crawl job as returned by `GET /{version}/job/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub org_id: String,
    /// Seed URL
    pub url: String,
    pub status: JobStatus,
    pub scrape_type: ScrapeType,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub whitelist_regexp: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub blacklist_regexp: Option<String>,
    pub allow_subdomains: bool,
    pub items_limit: u32,
    #[serde(deserialize_with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(deserialize_with = "timestamp")]
    pub updated_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "optional_timestamp")]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub webhook_url: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub webhook_status: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub webhook_error: Option<String>,
    /// Server hint for how long to wait before the next status check
    #[serde(default)]
    pub recommended_pull_delay_ms: Option<u64>,
    /// Items in discovery order
    #[serde(default)]
    pub job_items: Vec<JobItem>,
}

impl Job {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Items with the given status, in crawl order.
    pub fn items_with_status<'a>(
        &'a self,
        status: &'a JobStatus,
    ) -> impl Iterator<Item = &'a JobItem> + 'a {
        self.job_items.iter().filter(move |item| &item.status == status)
    }
}

/// One crawled page within a [`Job`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobItem {
    pub id: String,
    pub job_id: String,
    pub original_url: String,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub referred_url: Option<String>,
    /// HTTP status the page answered with
    pub page_status_code: u16,
    pub status: JobStatus,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub title: Option<String>,
    /// Billing units charged for this page
    pub cost: f64,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub last_error: Option<String>,
    #[serde(deserialize_with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(deserialize_with = "timestamp")]
    pub updated_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub raw_content_url: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub cleaned_content_url: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub markdown_content_url: Option<String>,
}

impl JobItem {
    /// Location of the stored content for a scrape type, if the server produced one.
    pub fn content_url(&self, scrape_type: ScrapeType) -> Option<&str> {
        match scrape_type {
            ScrapeType::Html => self.raw_content_url.as_deref(),
            ScrapeType::Cleaned => self.cleaned_content_url.as_deref(),
            ScrapeType::Markdown => self.markdown_content_url.as_deref(),
        }
    }
}

/// Response of `PUT /{version}/job/{id}/cancel`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CancelResponse {
    #[serde(default)]
    pub message: Option<String>,
}

// =============================================================================
// Scrape
// =============================================================================

/// Body of `POST /{version}/scrape`.
#[derive(Debug, Clone, Serialize)]
pub struct ScrapeRequest {
    /// Name of the custom scraper to run
    pub crawler_id: String,

    /// Free-form input handed to the scraper
    pub input: Value,

    #[serde(skip_serializing_if = "is_blank")]
    pub webhook_url: Option<String>,
}

impl ScrapeRequest {
    pub fn new(crawler_id: impl Into<String>, input: Value) -> Self {
        Self {
            crawler_id: crawler_id.into(),
            input,
            webhook_url: None,
        }
    }

    pub fn webhook_url(mut self, url: impl Into<String>) -> Self {
        self.webhook_url = Some(url.into());
        self
    }
}

/// Response of `POST /{version}/scrape`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScrapeResponse {
    pub id: String,
}

/// Snapshot of a scraper run as returned by `GET /{version}/scrape/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapeResult {
    pub id: String,
    pub status: ScrapeStatus,
    /// Whatever the scraper produced; absent until the run is done
    #[serde(default)]
    pub structured_data: Option<Value>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub recommended_pull_delay_ms: Option<u64>,
}

// =============================================================================
// Field helpers
// =============================================================================

/// Parse an ISO-8601 timestamp into a UTC instant.
///
/// A trailing `Z` is rewritten to `+00:00` before parsing. Timestamps without
/// any offset are taken to be UTC.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    let raw = raw.trim();
    let normalized = match raw.strip_suffix('Z').or_else(|| raw.strip_suffix('z')) {
        Some(prefix) => Cow::Owned(format!("{}+00:00", prefix)),
        None => Cow::Borrowed(raw),
    };

    match DateTime::parse_from_rfc3339(&normalized) {
        Ok(dt) => Ok(dt.with_timezone(&Utc)),
        Err(err) => NaiveDateTime::parse_from_str(&normalized, "%Y-%m-%dT%H:%M:%S%.f")
            .map(|naive| naive.and_utc())
            .map_err(|_| err),
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, str::is_empty)
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()))
}

fn timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).map_err(serde::de::Error::custom)
}

fn optional_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    match empty_as_none(deserializer)? {
        Some(raw) => parse_timestamp(&raw)
            .map(Some)
            .map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn minimal_job() -> Value {
        json!({
            "id": "job-1",
            "org_id": "org-1",
            "url": "https://example.com",
            "status": "in_progress",
            "scrape_type": "markdown",
            "whitelist_regexp": null,
            "blacklist_regexp": "",
            "allow_subdomains": false,
            "items_limit": 10,
            "created_at": "2024-05-01T10:00:00Z",
            "updated_at": "2024-05-01T10:00:05.123Z",
            "webhook_url": null
        })
    }

    fn item(id: &str, status: &str) -> Value {
        json!({
            "id": id,
            "job_id": "job-1",
            "original_url": format!("https://example.com/{}", id),
            "referred_url": "https://example.com",
            "page_status_code": 200,
            "status": status,
            "title": "Page",
            "cost": 1,
            "last_error": null,
            "created_at": "2024-05-01T10:00:00Z",
            "updated_at": "2024-05-01T10:00:01Z",
            "markdown_content_url": format!("https://cdn.example.com/{}.md", id)
        })
    }

    #[test]
    fn test_job_with_optional_fields_absent() {
        let job: Job = serde_json::from_value(minimal_job()).unwrap();

        assert_eq!(job.status, JobStatus::InProgress);
        assert_eq!(job.scrape_type, ScrapeType::Markdown);
        assert!(job.finished_at.is_none());
        assert!(job.webhook_url.is_none());
        assert!(job.webhook_status.is_none());
        assert!(job.webhook_error.is_none());
        assert!(job.recommended_pull_delay_ms.is_none());
        assert!(job.whitelist_regexp.is_none());
        assert!(job.blacklist_regexp.is_none());
        assert!(job.job_items.is_empty());
        assert!(!job.is_terminal());
    }

    #[test]
    fn test_job_with_optional_keys_omitted() {
        let mut raw = minimal_job();
        let fields = raw.as_object_mut().unwrap();
        for key in ["whitelist_regexp", "blacklist_regexp", "webhook_url"] {
            fields.remove(key);
        }

        let job: Job = serde_json::from_value(raw).unwrap();
        assert!(job.whitelist_regexp.is_none());
        assert!(job.blacklist_regexp.is_none());
        assert!(job.webhook_url.is_none());
    }

    #[test]
    fn test_job_item_with_optional_keys_omitted() {
        let mut raw = item("a", "done");
        let fields = raw.as_object_mut().unwrap();
        for key in ["referred_url", "title", "last_error", "markdown_content_url"] {
            fields.remove(key);
        }

        let item: JobItem = serde_json::from_value(raw).unwrap();
        assert!(item.referred_url.is_none());
        assert!(item.title.is_none());
        assert!(item.last_error.is_none());
        assert_eq!(item.content_url(ScrapeType::Markdown), None);
    }

    #[test]
    fn test_job_missing_required_field_fails() {
        let mut raw = minimal_job();
        raw.as_object_mut().unwrap().remove("org_id");
        let err = serde_json::from_value::<Job>(raw).unwrap_err();
        assert!(err.to_string().contains("org_id"));
    }

    #[test]
    fn test_job_items_keep_server_order() {
        let mut raw = minimal_job();
        raw["status"] = json!("done");
        raw["finished_at"] = json!("2024-05-01T10:01:00Z");
        raw["recommended_pull_delay_ms"] = json!(2500);
        raw["job_items"] = json!([item("c", "done"), item("a", "error"), item("b", "done")]);

        let job: Job = serde_json::from_value(raw).unwrap();

        let ids: Vec<&str> = job.job_items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
        assert!(job.is_terminal());
        assert_eq!(job.recommended_pull_delay_ms, Some(2500));

        let done: Vec<&str> = job
            .items_with_status(&JobStatus::Done)
            .map(|i| i.id.as_str())
            .collect();
        assert_eq!(done, vec!["c", "b"]);
    }

    #[test]
    fn test_job_item_content_url() {
        let item: JobItem = serde_json::from_value(item("a", "done")).unwrap();
        assert_eq!(
            item.content_url(ScrapeType::Markdown),
            Some("https://cdn.example.com/a.md")
        );
        assert_eq!(item.content_url(ScrapeType::Html), None);
        assert_eq!(item.title.as_deref(), Some("Page"));
        assert!(item.last_error.is_none());
    }

    #[test]
    fn test_job_status_terminal_set() {
        for status in ["done", "error", "cancelled", "canceled"] {
            assert!(JobStatus::from(status.to_string()).is_terminal(), "{}", status);
        }
        for status in ["new", "in_progress", "queued"] {
            assert!(!JobStatus::from(status.to_string()).is_terminal(), "{}", status);
        }
        assert_eq!(
            JobStatus::from("queued".to_string()),
            JobStatus::Other("queued".into())
        );
    }

    #[test]
    fn test_scrape_result_optional_fields() {
        let result: ScrapeResult =
            serde_json::from_value(json!({"id": "s-1", "status": "new"})).unwrap();
        assert_eq!(result.status, ScrapeStatus::New);
        assert!(result.structured_data.is_none());
        assert!(result.error.is_none());
        assert!(result.recommended_pull_delay_ms.is_none());
    }

    #[test]
    fn test_timestamp_z_matches_explicit_offset() {
        let zulu = parse_timestamp("2024-05-01T10:00:00Z").unwrap();
        let explicit = parse_timestamp("2024-05-01T10:00:00+00:00").unwrap();
        assert_eq!(zulu, explicit);
        assert_eq!(zulu, Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap());
    }

    #[test]
    fn test_timestamp_offsets_and_naive() {
        let shifted = parse_timestamp("2024-05-01T12:00:00+02:00").unwrap();
        assert_eq!(shifted, Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap());

        let naive = parse_timestamp("2024-05-01T10:00:00.250").unwrap();
        assert_eq!(naive.timestamp_millis() % 1000, 250);

        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn test_crawl_request_omits_unset_fields() {
        let body = serde_json::to_value(CrawlRequest::new("https://example.com")).unwrap();
        assert_eq!(
            body,
            json!({
                "url": "https://example.com",
                "scrape_type": "html",
                "items_limit": 10,
                "allow_subdomains": false
            })
        );
    }

    #[test]
    fn test_crawl_request_empty_strings_omitted() {
        let request = CrawlRequest::new("https://example.com")
            .scrape_type(ScrapeType::Cleaned)
            .webhook_url("")
            .whitelist_regexp("/blog/.*");
        let body = serde_json::to_value(request).unwrap();

        assert!(body.get("webhook_url").is_none());
        assert!(body.get("blacklist_regexp").is_none());
        assert_eq!(body["whitelist_regexp"], "/blog/.*");
        assert_eq!(body["scrape_type"], "cleaned");
    }

    #[test]
    fn test_scrape_type_from_str() {
        assert_eq!("Markdown".parse::<ScrapeType>(), Ok(ScrapeType::Markdown));
        assert!("pdf".parse::<ScrapeType>().is_err());
    }
}
