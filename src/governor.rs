//! Rate/failure governor.
//!
//! Every remote call the fetcher makes goes through [`Governor::get`]. A call
//! either comes back as a successful response or as a [`FetchError`] that
//! already says whether the run can go on.

use crate::error::FetchError;
use crate::github::{HttpResponse, MediaType, RateLimit, Transport};
use crate::models::Config;
use chrono::{DateTime, Utc};
use std::time::Duration;
use tracing::{debug, warn};

const MAX_BACKOFF_EXPONENT: u32 = 16;

/// Pause GitHub asks for after a secondary rate limit without `retry-after`
const SECONDARY_RATE_LIMIT_DELAY: Duration = Duration::from_secs(60);

/// Shortest wait for a quota whose advertised reset has already passed
const MIN_QUOTA_WAIT: Duration = Duration::from_secs(1);

/// Source of wall-clock time and the only place the run ever blocks.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
    fn sleep(&self, duration: Duration);
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }

    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration)
    }
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration)
    }
}

/// Retry and waiting limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts for a call failing with recoverable errors
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
        }
    }
}

/// Exponential backoff before retry number `attempt` (0-based)
pub fn backoff_delay(policy: &RetryPolicy, attempt: u32) -> Duration {
    let factor = 1u32 << attempt.min(MAX_BACKOFF_EXPONENT);
    policy
        .base_delay
        .saturating_mul(factor)
        .min(policy.max_delay)
}

/// What a response means for the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Success,
    /// Quota exhausted; wait until the reset time and ask again
    RateLimited(RateLimit),
    /// Worth retrying, optionally not before the given delay
    Recoverable(Option<Duration>),
    Unauthorized,
    NotFound,
    Rejected,
}

pub fn classify(response: &HttpResponse) -> Verdict {
    if response.is_success() {
        return Verdict::Success;
    }

    match response.status {
        401 => Verdict::Unauthorized,
        403 | 429 => match response.rate_limit() {
            Some(limit) if limit.remaining == 0 => Verdict::RateLimited(limit),
            _ => match response.retry_after() {
                Some(delay) => Verdict::Recoverable(Some(delay)),
                None if response.status == 429 => Verdict::Recoverable(None),
                None if mentions_rate_limit(&response.body) => {
                    Verdict::Recoverable(Some(SECONDARY_RATE_LIMIT_DELAY))
                }
                None => Verdict::Rejected,
            },
        },
        404 => Verdict::NotFound,
        500..=599 => Verdict::Recoverable(None),
        _ => Verdict::Rejected,
    }
}

fn mentions_rate_limit(body: &str) -> bool {
    body.to_ascii_lowercase().contains("rate limit")
}

/// Wraps a [`Transport`] with retries, backoff and quota waits.
pub struct Governor<T, C> {
    transport: T,
    clock: C,
    policy: RetryPolicy,
    quota: Option<RateLimit>,
}

impl<T: Transport, C: Clock> Governor<T, C> {
    pub fn new(transport: T, clock: C, policy: RetryPolicy) -> Self {
        Self {
            transport,
            clock,
            policy,
            quota: None,
        }
    }

    /// Quota reported by the most recent response
    pub fn quota(&self) -> Option<RateLimit> {
        self.quota
    }

    /// Issue a GET, retrying recoverable failures and waiting out the quota.
    pub fn get(&mut self, url: &str, media: MediaType) -> Result<HttpResponse, FetchError> {
        let mut failures = 0;
        let mut stale_waits = 0;

        loop {
            // A previous response used up the quota
            if let Some(limit) = self.quota.filter(|q| q.remaining == 0) {
                self.quota = None;
                self.suspend_until(limit.reset, Duration::ZERO);
            }

            let (reason, not_before) = match self.transport.get(url, media) {
                Err(e) => (e.to_string(), None),
                Ok(response) => {
                    if let Some(limit) = response.rate_limit() {
                        self.quota = Some(limit);
                    }

                    match classify(&response) {
                        Verdict::Success => return Ok(response),
                        Verdict::RateLimited(limit) => {
                            self.quota = None;
                            // Reset already passed by our clock: GitHub's is behind
                            let min = if self.reset_passed(limit.reset) {
                                stale_waits += 1;
                                backoff_delay(&self.policy, stale_waits - 1).max(MIN_QUOTA_WAIT)
                            } else {
                                MIN_QUOTA_WAIT
                            };
                            self.suspend_until(limit.reset, min);
                            continue;
                        }
                        Verdict::Recoverable(not_before) => {
                            (format!("HTTP {}", response.status), not_before)
                        }
                        Verdict::Unauthorized => {
                            return Err(FetchError::Unauthorized(format!(
                                "HTTP {} from {}",
                                response.status, url
                            )));
                        }
                        Verdict::NotFound => {
                            return Err(FetchError::NotFound {
                                url: url.to_string(),
                            });
                        }
                        Verdict::Rejected => {
                            return Err(FetchError::Rejected {
                                status: response.status,
                                url: url.to_string(),
                            });
                        }
                    }
                }
            };

            failures += 1;
            if failures >= self.policy.max_attempts {
                return Err(FetchError::Exhausted {
                    url: url.to_string(),
                    attempts: failures,
                    reason,
                });
            }

            let delay = backoff_delay(&self.policy, failures - 1).max(not_before.unwrap_or_default());
            debug!(
                url,
                attempt = failures,
                %reason,
                delay = %humantime::format_duration(delay),
                "retrying after recoverable failure"
            );
            self.clock.sleep(delay);
        }
    }

    fn reset_passed(&self, reset: i64) -> bool {
        DateTime::from_timestamp(reset, 0).is_none_or(|reset_at| reset_at <= self.clock.now())
    }

    /// Block until the quota window resets, waiting at least `min`.
    fn suspend_until(&self, reset: i64, min: Duration) {
        let now = self.clock.now();
        let remaining = DateTime::from_timestamp(reset, 0)
            .and_then(|reset_at| (reset_at - now).to_std().ok())
            .unwrap_or_default();
        let wait = remaining.max(min);

        if wait.is_zero() {
            return;
        }

        warn!(
            wait = %humantime::format_duration(wait),
            reset,
            "GitHub rate limit exhausted, pausing until the quota resets"
        );
        self.clock.sleep(wait);
    }
}
