//! Sliding-window bucket.
//!
//! Each bucket remembers the calls it admitted during the trailing window
//! together with the tokens each call was estimated to use. A call is admitted
//! when both the remaining token budget and the remaining call count allow it,
//! and the admission is recorded under the same lock as the check.
//!
//! Waiters poll once per second. There is no queue, so a small request can
//! overtake a large one that has been waiting longer.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, instrument, trace};
use vasari_error::{RateLimitError, RateLimitErrorKind, VasariResult};

/// How long a blocked caller sleeps before checking again.
const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// One admitted call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_getters::Getters)]
pub struct UsageEntry {
    id: u64,
    timestamp: Instant,
    tokens: u64,
}

/// Handle to the usage recorded for an admitted call.
///
/// Pass it back to [`RateLimitManager::release`] to refund a call that never
/// reached the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_getters::Getters)]
pub struct Reservation {
    id: u64,
    tokens: u64,
}

/// Sliding-window rate limiter for one model under one account.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use vasari_rate_limit::RateLimitManager;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> vasari_error::VasariResult<()> {
/// let bucket = RateLimitManager::new("gpt-4", 1_000, 10, Duration::from_secs(60))?;
/// let reservation = bucket.acquire(400).await?;
/// assert_eq!(bucket.remaining_tokens().await, 600);
/// assert_eq!(bucket.remaining_calls().await, 9);
///
/// bucket.release(reservation).await;
/// assert_eq!(bucket.remaining_tokens().await, 1_000);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct RateLimitManager {
    name: String,
    max_tokens: u64,
    max_calls: u64,
    window: Duration,
    next_id: AtomicU64,
    history: Mutex<VecDeque<UsageEntry>>,
}

impl RateLimitManager {
    /// Create a bucket.
    ///
    /// # Errors
    ///
    /// Returns an error when `max_calls` is zero or the window is empty,
    /// since such a bucket could never admit anything.
    pub fn new(
        name: impl Into<String>,
        max_tokens: u64,
        max_calls: u64,
        window: Duration,
    ) -> VasariResult<Self> {
        let name = name.into();
        if max_calls == 0 || window.is_zero() {
            return Err(RateLimitError::new(RateLimitErrorKind::InvalidLimits(format!(
                "{} allows {} calls per {:?}",
                name, max_calls, window
            )))
            .into());
        }
        debug!(
            name,
            max_tokens,
            max_calls,
            window_secs = window.as_secs_f64(),
            "Created rate limit bucket"
        );
        Ok(Self {
            name,
            max_tokens,
            max_calls,
            window,
            next_id: AtomicU64::new(0),
            history: Mutex::new(VecDeque::new()),
        })
    }

    /// Bucket name, usually the model id.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Token budget per window.
    pub fn max_tokens(&self) -> u64 {
        self.max_tokens
    }

    /// Call budget per window.
    pub fn max_calls(&self) -> u64 {
        self.max_calls
    }

    /// Window length.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Wait until the bucket admits `tokens`, then record the call.
    ///
    /// # Errors
    ///
    /// Fails immediately when `tokens` exceeds the bucket's token budget,
    /// since such a request would wait forever.
    #[instrument(skip(self), fields(bucket = %self.name))]
    pub async fn acquire(&self, tokens: u64) -> VasariResult<Reservation> {
        if tokens > self.max_tokens {
            return Err(RateLimitError::new(RateLimitErrorKind::Starvation {
                model: self.name.clone(),
                requested: tokens,
                capacity: self.max_tokens,
            })
            .into());
        }

        if let Some(reservation) = self.try_reserve(tokens).await {
            return Ok(reservation);
        }

        info!(tokens, "Rate limit reached, waiting for capacity");
        let started = Instant::now();
        loop {
            tokio::time::sleep(POLL_INTERVAL).await;
            if let Some(reservation) = self.try_reserve(tokens).await {
                debug!(
                    waited_secs = started.elapsed().as_secs_f64(),
                    "Rate limit capacity available"
                );
                return Ok(reservation);
            }
            trace!("Still waiting for rate limit capacity");
        }
    }

    /// Check for capacity and record the call if there is some.
    ///
    /// Returns `true` when the call was admitted.
    pub async fn ready(&self, tokens: u64) -> bool {
        self.try_reserve(tokens).await.is_some()
    }

    /// Like [`ready`](Self::ready), but returns the reservation.
    pub async fn try_reserve(&self, tokens: u64) -> Option<Reservation> {
        let mut history = self.history.lock().await;
        let now = Instant::now();
        self.prune(&mut history, now);

        let used: u64 = history.iter().map(|e| e.tokens).sum();
        let remaining = self.max_tokens.saturating_sub(used);
        let admitted = remaining >= tokens && (history.len() as u64) < self.max_calls;
        if !admitted {
            return None;
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        history.push_back(UsageEntry {
            id,
            timestamp: now,
            tokens,
        });
        trace!(bucket = %self.name, tokens, remaining = remaining - tokens, "Admitted call");
        Some(Reservation { id, tokens })
    }

    /// Refund a reservation.
    ///
    /// Only meant for calls that never reached the provider. Releasing a
    /// reservation that already aged out of the window is a no-op.
    pub async fn release(&self, reservation: Reservation) {
        let mut history = self.history.lock().await;
        let before = history.len();
        history.retain(|e| e.id != reservation.id);
        if history.len() < before {
            debug!(bucket = %self.name, tokens = reservation.tokens, "Released reservation");
        }
    }

    /// Tokens left in the current window.
    pub async fn remaining_tokens(&self) -> u64 {
        let mut history = self.history.lock().await;
        self.prune(&mut history, Instant::now());
        let used: u64 = history.iter().map(|e| e.tokens).sum();
        self.max_tokens.saturating_sub(used)
    }

    /// Calls left in the current window.
    pub async fn remaining_calls(&self) -> u64 {
        let mut history = self.history.lock().await;
        self.prune(&mut history, Instant::now());
        self.max_calls.saturating_sub(history.len() as u64)
    }

    fn prune(&self, history: &mut VecDeque<UsageEntry>, now: Instant) {
        history.retain(|e| now.duration_since(e.timestamp) < self.window);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_window() {
        let bucket = RateLimitManager::new("m", 100, 10, Duration::from_secs(60)).unwrap();
        assert!(bucket.ready(100).await);
        assert_eq!(bucket.remaining_tokens().await, 0);

        tokio::time::advance(Duration::from_secs(59)).await;
        assert_eq!(bucket.remaining_tokens().await, 0);

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(bucket.remaining_tokens().await, 100);
        assert_eq!(bucket.remaining_calls().await, 10);
    }

    #[tokio::test]
    async fn zero_calls_is_rejected() {
        assert!(RateLimitManager::new("m", 100, 0, Duration::from_secs(60)).is_err());
        assert!(RateLimitManager::new("m", 100, 1, Duration::ZERO).is_err());
    }

    #[tokio::test]
    async fn release_of_unknown_reservation_is_noop() {
        let bucket = RateLimitManager::new("m", 100, 10, Duration::from_secs(60)).unwrap();
        let reservation = bucket.try_reserve(10).await.unwrap();
        bucket.release(reservation).await;
        bucket.release(reservation).await;
        assert_eq!(bucket.remaining_tokens().await, 100);
    }
}
