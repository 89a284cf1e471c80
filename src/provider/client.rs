//! Paginated, rate-limited, retrying access to a [`StatsSource`].

use super::types::{parse_game, RawPage, SourceError, StatsSource};
use crate::cli::types::{DateRange, TeamCode};
use crate::error::{PitchError, Result};
use crate::storage::GameRecord;
use serde_json::Value;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, sleep_until, Instant};
use tracing::{debug, warn};

/// Exponential backoff for transient provider failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per page, including the first.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(1000),
            max_backoff: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Delay before retrying after failed attempt `attempt` (1-based):
    /// `min(initial * 2^(attempt-1), max)`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 1_u32
            .checked_shl(attempt.saturating_sub(1))
            .unwrap_or(u32::MAX);
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

/// Enforces a minimum interval between consecutive requests.
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_request: Mutex::new(None),
        }
    }

    /// Wait until a request may be issued, then record it.
    pub async fn acquire(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let ready_at = previous + self.min_interval;
            if ready_at > Instant::now() {
                sleep_until(ready_at).await;
            }
        }
        *last = Some(Instant::now());
    }
}

/// Client over a [`StatsSource`] that owns pacing and retry.
pub struct ProviderClient<S> {
    source: S,
    retry: RetryPolicy,
    limiter: RateLimiter,
}

impl<S: StatsSource> ProviderClient<S> {
    pub fn new(source: S, retry: RetryPolicy, min_interval: Duration) -> Self {
        Self {
            source,
            retry,
            limiter: RateLimiter::new(min_interval),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Lazily fetch the games `team` played within `range`.
    pub fn fetch(&self, team: &TeamCode, range: DateRange) -> GameFeed<'_, S> {
        GameFeed {
            client: self,
            team: team.clone(),
            range,
            next_page: Some(0),
            buffer: VecDeque::new(),
        }
    }

    /// Fetch one page, retrying transient failures. `Ok(None)` means the
    /// provider has no data for the range.
    async fn fetch_page_with_retry(
        &self,
        team: &TeamCode,
        range: &DateRange,
        page: u32,
    ) -> Result<Option<RawPage>> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            self.limiter.acquire().await;

            match self.source.fetch_page(team, range, page).await {
                Ok(raw) => {
                    debug!(%team, %range, page, games = raw.games.len(), "fetched page");
                    return Ok(Some(raw));
                }
                Err(SourceError::NoData) => {
                    debug!(%team, %range, page, "provider has no data");
                    return Ok(None);
                }
                Err(err) if err.is_retryable() && attempt < self.retry.max_attempts => {
                    let delay = self.retry.delay_for_attempt(attempt);
                    warn!(
                        %team,
                        page,
                        attempt,
                        max_attempts = self.retry.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "retrying provider request"
                    );
                    sleep(delay).await;
                }
                Err(err) => {
                    return Err(PitchError::ProviderUnavailable {
                        team: team.to_string(),
                        attempts: attempt,
                        reason: err.to_string(),
                    });
                }
            }
        }
    }
}

/// Ordered, restartable sequence of validated games for one team and range.
///
/// Pages are requested only once the buffered page is drained. A malformed
/// game yields a `DataIntegrity` item and the feed continues; a provider
/// failure yields `ProviderUnavailable` and ends the feed.
pub struct GameFeed<'a, S> {
    client: &'a ProviderClient<S>,
    team: TeamCode,
    range: DateRange,
    next_page: Option<u32>,
    buffer: VecDeque<Value>,
}

impl<S: StatsSource> GameFeed<'_, S> {
    pub async fn next_game(&mut self) -> Option<Result<GameRecord>> {
        loop {
            if let Some(raw) = self.buffer.pop_front() {
                return Some(parse_game(&raw));
            }

            let page = self.next_page?;
            match self
                .client
                .fetch_page_with_retry(&self.team, &self.range, page)
                .await
            {
                Ok(Some(raw)) => {
                    self.buffer.extend(raw.games);
                    self.next_page = match raw.next_page {
                        Some(next) if next > page => Some(next),
                        Some(next) => {
                            warn!(
                                team = %self.team,
                                page,
                                next,
                                "ignoring non-advancing next_page"
                            );
                            None
                        }
                        None => None,
                    };
                }
                Ok(None) => self.next_page = None,
                Err(err) => {
                    self.next_page = None;
                    self.buffer.clear();
                    return Some(Err(err));
                }
            }
        }
    }

    /// Rewind to the first page.
    pub fn restart(&mut self) {
        self.buffer.clear();
        self.next_page = Some(0);
    }

    pub fn range(&self) -> &DateRange {
        &self.range
    }
}
