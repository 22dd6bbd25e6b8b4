//! Fixed-cadence status polling.
//!
//! Both blocking flows (`crawl` and `scrape`) share one loop: fetch a
//! snapshot, stop if it is terminal, otherwise sleep for the server-hinted
//! delay (or [`DEFAULT_POLL_DELAY`]) and fetch again until the poll budget
//! runs out. There is no backoff and no retry of failed fetches.

use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;

use crate::error::Result;
use crate::types::{Job, ScrapeResult};

/// Delay between polls when the server gives no hint.
pub const DEFAULT_POLL_DELAY: Duration = Duration::from_secs(5);

/// Suspends the poll loop between status checks.
///
/// Injected into the client so tests can drive poll loops without real delays.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeps on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// A status snapshot the poll loop can inspect.
pub trait PollSnapshot {
    fn is_terminal(&self) -> bool;
    fn recommended_pull_delay_ms(&self) -> Option<u64>;
    fn status_label(&self) -> String;
}

impl PollSnapshot for Job {
    fn is_terminal(&self) -> bool {
        Job::is_terminal(self)
    }

    fn recommended_pull_delay_ms(&self) -> Option<u64> {
        self.recommended_pull_delay_ms
    }

    fn status_label(&self) -> String {
        self.status.to_string()
    }
}

impl PollSnapshot for ScrapeResult {
    fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    fn recommended_pull_delay_ms(&self) -> Option<u64> {
        self.recommended_pull_delay_ms
    }

    fn status_label(&self) -> String {
        self.status.to_string()
    }
}

/// How a poll loop ended.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome<T> {
    /// The snapshot reached a terminal status after `polls` fetches.
    Terminal { snapshot: T, polls: u32 },
    /// The budget ran out; `snapshot` is the last one fetched.
    Exhausted { snapshot: T, polls: u32 },
}

impl<T> PollOutcome<T> {
    pub fn polls(&self) -> u32 {
        match self {
            PollOutcome::Terminal { polls, .. } | PollOutcome::Exhausted { polls, .. } => *polls,
        }
    }

    pub fn into_snapshot(self) -> T {
        match self {
            PollOutcome::Terminal { snapshot, .. } | PollOutcome::Exhausted { snapshot, .. } => {
                snapshot
            }
        }
    }
}

/// Wait time before the next poll: the server hint when present and nonzero,
/// otherwise [`DEFAULT_POLL_DELAY`].
pub fn poll_delay(recommended_pull_delay_ms: Option<u64>) -> Duration {
    match recommended_pull_delay_ms {
        Some(ms) if ms > 0 => Duration::from_millis(ms),
        _ => DEFAULT_POLL_DELAY,
    }
}

/// Fetch snapshots until one is terminal or `max_polls` fetches were made.
///
/// At least one fetch is always made, so a budget of zero behaves like one.
/// Callers that must honour a zero budget check it before calling. No sleep happens after the final fetch. Fetch errors abort the
/// loop immediately.
pub async fn poll_until_terminal<T, F, Fut>(
    sleeper: &dyn Sleeper,
    max_polls: u32,
    mut fetch: F,
) -> Result<PollOutcome<T>>
where
    T: PollSnapshot,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let budget = max_polls.max(1);
    let mut polls = 0;

    loop {
        let snapshot = fetch().await?;
        polls += 1;

        if snapshot.is_terminal() {
            return Ok(PollOutcome::Terminal { snapshot, polls });
        }
        if polls >= budget {
            return Ok(PollOutcome::Exhausted { snapshot, polls });
        }

        let delay = poll_delay(snapshot.recommended_pull_delay_ms());
        tracing::debug!(
            poll = polls,
            max_polls = budget,
            status = %snapshot.status_label(),
            delay = ?delay,
            "Not finished yet, waiting before next poll"
        );
        sleeper.sleep(delay).await;
    }
}
