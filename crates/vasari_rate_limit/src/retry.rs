//! Classification-aware retry.
//!
//! A [`RetryPolicy`] declares which [`RetryClass`]es it waits out and how long
//! it waits between attempts. Errors outside its table propagate on the first
//! failure. Both presets are expressed with the same type so the executor can
//! be configured with either one.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::Display;
use std::future::Future;
use std::sync::LazyLock;
use std::time::Duration;
use tokio_retry2::strategy::{ExponentialBackoff, FixedInterval};
use tokio_retry2::RetryError;
use tracing::{debug, info, warn};
use vasari_error::{RetryClass, RetryableError};

static RETRY_AFTER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)retry after (\d+) seconds?").expect("Valid retry-after regex")
});

/// Extract the wait hint from a provider message such as
/// `"Please retry after 20 seconds."`.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use vasari_rate_limit::parse_retry_after;
///
/// assert_eq!(
///     parse_retry_after("Rate limit reached. Please retry after 20 seconds."),
///     Some(Duration::from_secs(20))
/// );
/// assert_eq!(parse_retry_after("Too many requests"), None);
/// ```
pub fn parse_retry_after(message: &str) -> Option<Duration> {
    RETRY_AFTER
        .captures(message)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// Delay schedule between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Start at `initial`, double each time, never exceed `cap`
    Exponential {
        /// First delay
        initial: Duration,
        /// Largest delay
        cap: Duration,
    },
    /// Same delay every time
    Fixed(Duration),
}

/// Named retry presets, selectable from configuration.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RetryPreset {
    /// [`RetryPolicy::transient_network`]
    TransientNetwork,
    /// [`RetryPolicy::provider_rate_limit`]
    #[default]
    ProviderRateLimit,
}

impl RetryPreset {
    /// The policy this preset names.
    pub fn policy(self) -> RetryPolicy {
        match self {
            RetryPreset::TransientNetwork => RetryPolicy::transient_network(),
            RetryPreset::ProviderRateLimit => RetryPolicy::provider_rate_limit(),
        }
    }
}

/// Retry policy: which error classes to retry, how long to wait, how often.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use vasari_rate_limit::RetryPolicy;
///
/// let delays: Vec<_> = RetryPolicy::transient_network().delays().collect();
/// assert_eq!(
///     delays,
///     vec![
///         Duration::from_secs(4),
///         Duration::from_secs(8),
///         Duration::from_secs(10),
///         Duration::from_secs(10),
///     ]
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    name: &'static str,
    retry_on: BTreeSet<RetryClass>,
    backoff: Backoff,
    honor_retry_after: bool,
    max_attempts: Option<usize>,
}

impl RetryPolicy {
    /// Retry read timeouts only: five attempts, waiting 4 s, 8 s, then 10 s.
    pub fn transient_network() -> Self {
        Self {
            name: "transient_network",
            retry_on: BTreeSet::from([RetryClass::Timeout]),
            backoff: Backoff::Exponential {
                initial: Duration::from_secs(4),
                cap: Duration::from_secs(10),
            },
            honor_retry_after: false,
            max_attempts: Some(5),
        }
    }

    /// Wait out provider rate limits, timeouts and dropped connections.
    ///
    /// A rate-limit rejection sleeps for the provider's "retry after" hint,
    /// or 10 s when no hint can be parsed. Timeouts and connection errors
    /// sleep 10 s.
    ///
    /// Unlike [`transient_network`](Self::transient_network) this preset has
    /// no attempt cap: it keeps retrying until the call succeeds or fails
    /// with an unclassified error. Bound it with
    /// [`with_max_attempts`](Self::with_max_attempts) when that is not wanted.
    pub fn provider_rate_limit() -> Self {
        Self {
            name: "provider_rate_limit",
            retry_on: BTreeSet::from([
                RetryClass::RateLimit,
                RetryClass::Timeout,
                RetryClass::Connection,
            ]),
            backoff: Backoff::Fixed(Duration::from_secs(10)),
            honor_retry_after: true,
            max_attempts: None,
        }
    }

    /// Build a custom policy.
    pub fn new(
        name: &'static str,
        retry_on: impl IntoIterator<Item = RetryClass>,
        backoff: Backoff,
    ) -> Self {
        Self {
            name,
            retry_on: retry_on.into_iter().collect(),
            backoff,
            honor_retry_after: false,
            max_attempts: None,
        }
    }

    /// Cap the total number of attempts, including the first.
    pub fn with_max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = Some(attempts.max(1));
        self
    }

    /// Remove the attempt cap.
    pub fn unbounded(mut self) -> Self {
        self.max_attempts = None;
        self
    }

    /// Sleep for the provider's hint on rate-limit errors.
    pub fn honoring_retry_after(mut self, honor: bool) -> Self {
        self.honor_retry_after = honor;
        self
    }

    /// Preset name, for logs.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether errors of this class are retried.
    pub fn retries(&self, class: RetryClass) -> bool {
        self.retry_on.contains(&class)
    }

    /// Delay schedule.
    pub fn backoff(&self) -> Backoff {
        self.backoff
    }

    /// Attempt cap, if any.
    pub fn max_attempts(&self) -> Option<usize> {
        self.max_attempts
    }

    /// Delays between attempts, before any provider hint is applied.
    ///
    /// Infinite when the policy is unbounded.
    pub fn delays(&self) -> Box<dyn Iterator<Item = Duration> + Send> {
        let schedule: Box<dyn Iterator<Item = Duration> + Send> = match self.backoff {
            Backoff::Exponential { initial, cap } => {
                let factor = (initial.as_millis() as u64 / 2).max(1);
                Box::new(
                    ExponentialBackoff::from_millis(2)
                        .factor(factor)
                        .max_delay(cap),
                )
            }
            Backoff::Fixed(delay) => Box::new(FixedInterval::new(delay)),
        };
        match self.max_attempts {
            Some(attempts) => Box::new(schedule.take(attempts.saturating_sub(1))),
            None => schedule,
        }
    }

    /// Run `operation` until it succeeds, fails terminally, or the policy
    /// runs out of attempts.
    ///
    /// Each wait is the next entry of [`delays`](Self::delays), replaced by
    /// the provider's hint when the failure is a rate limit and the policy
    /// honors hints. The last error is returned when attempts run out.
    pub async fn run<F, Fut, T, E>(&self, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: RetryableError + Display,
    {
        let mut delays = self.delays();
        let mut attempt = 0usize;
        loop {
            attempt += 1;
            let err = match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        info!(policy = self.name, attempt, "Succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) => e,
            };

            let (err, hint) = match self.classify(err, attempt) {
                RetryError::Permanent(err) => return Err(err),
                RetryError::Transient { err, retry_after } => (err, retry_after),
            };

            let Some(next) = delays.next() else {
                warn!(policy = self.name, attempt, error = %err, "Retry attempts exhausted");
                return Err(err);
            };
            let wait = hint.unwrap_or(next);
            debug!(
                policy = self.name,
                attempt,
                wait_ms = wait.as_millis() as u64,
                "Sleeping before retry"
            );
            tokio::time::sleep(wait).await;
        }
    }

    fn classify<E>(&self, err: E, attempt: usize) -> RetryError<E>
    where
        E: RetryableError + Display,
    {
        let Some(class) = err.retry_class().filter(|c| self.retries(*c)) else {
            debug!(policy = self.name, attempt, error = %err, "Error is not retryable");
            return RetryError::Permanent(err);
        };

        let retry_after = if class == RetryClass::RateLimit && self.honor_retry_after {
            match err.retry_after() {
                Some(hint) => {
                    info!(
                        policy = self.name,
                        attempt,
                        wait_secs = hint.as_secs(),
                        "Provider asked us to wait"
                    );
                    Some(hint)
                }
                None => {
                    warn!(
                        policy = self.name,
                        attempt,
                        error = %err,
                        "Could not parse a retry hint, using the fallback delay"
                    );
                    None
                }
            }
        } else {
            None
        };

        warn!(policy = self.name, attempt, %class, error = %err, "Retryable failure");
        RetryError::Transient { err, retry_after }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPreset::default().policy()
    }
}
