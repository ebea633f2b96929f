//! Sliding-window admission tests, run on tokio's paused clock.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use vasari_error::{RateLimitErrorKind, VasariErrorKind};
use vasari_rate_limit::{
    ModelLimits, ProviderLimits, RateLimitKey, RateLimitManager, RateLimitRegistry,
};

const WINDOW: Duration = Duration::from_secs(60);

#[tokio::test(start_paused = true)]
async fn admits_within_budget_without_waiting() -> anyhow::Result<()> {
    let bucket = RateLimitManager::new("gpt-4", 1_000, 3, WINDOW)?;
    let start = Instant::now();

    bucket.acquire(1_000).await?;

    assert_eq!(start.elapsed(), Duration::ZERO);
    assert_eq!(bucket.remaining_tokens().await, 0);
    assert_eq!(bucket.remaining_calls().await, 2);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn ready_records_usage_on_admission() -> anyhow::Result<()> {
    let bucket = RateLimitManager::new("gpt-4", 100, 10, WINDOW)?;

    assert!(bucket.ready(60).await);
    assert!(!bucket.ready(60).await);
    assert!(bucket.ready(40).await);
    assert_eq!(bucket.remaining_tokens().await, 0);
    assert_eq!(bucket.remaining_calls().await, 8);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn call_count_limit_applies_independently_of_tokens() -> anyhow::Result<()> {
    let bucket = RateLimitManager::new("gpt-4", 1_000_000, 2, WINDOW)?;

    assert!(bucket.ready(1).await);
    assert!(bucket.ready(1).await);
    assert!(!bucket.ready(1).await);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn oversized_request_is_refused_immediately() -> anyhow::Result<()> {
    let bucket = RateLimitManager::new("gpt-4", 1_000, 10, WINDOW)?;

    let err = bucket.acquire(1_001).await.expect_err("should starve");
    match err.kind() {
        VasariErrorKind::RateLimit(e) => match e.kind() {
            RateLimitErrorKind::Starvation {
                requested,
                capacity,
                ..
            } => {
                assert_eq!(*requested, 1_001);
                assert_eq!(*capacity, 1_000);
            }
            other => panic!("unexpected kind: {other}"),
        },
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(bucket.remaining_calls().await, 10);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn blocked_request_waits_for_window_to_slide() -> anyhow::Result<()> {
    let bucket = Arc::new(RateLimitManager::new("gpt-4", 100, 10, WINDOW)?);
    bucket.acquire(100).await?;

    let waiting = {
        let bucket = Arc::clone(&bucket);
        tokio::spawn(async move { bucket.acquire(50).await })
    };

    // Still blocked just before the first entry ages out.
    tokio::time::sleep(Duration::from_secs(59)).await;
    assert!(!waiting.is_finished());

    let start = Instant::now();
    waiting.await??;
    assert!(start.elapsed() <= Duration::from_secs(2));
    assert_eq!(bucket.remaining_tokens().await, 50);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn blocked_request_does_not_complete_before_deadline() -> anyhow::Result<()> {
    let bucket = RateLimitManager::new("gpt-4", 100, 1, WINDOW)?;
    bucket.acquire(10).await?;

    let result = tokio::time::timeout(Duration::from_secs(30), bucket.acquire(10)).await;
    assert!(result.is_err());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn concurrent_callers_never_overshoot() -> anyhow::Result<()> {
    let bucket = Arc::new(RateLimitManager::new("gpt-4", 1_000, 100, WINDOW)?);

    let mut handles = Vec::new();
    for _ in 0..20 {
        let bucket = Arc::clone(&bucket);
        handles.push(tokio::spawn(async move { bucket.ready(100).await }));
    }

    let mut admitted = 0;
    for handle in handles {
        if handle.await? {
            admitted += 1;
        }
    }
    assert_eq!(admitted, 10);
    assert_eq!(bucket.remaining_tokens().await, 0);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn released_reservation_frees_capacity() -> anyhow::Result<()> {
    let bucket = RateLimitManager::new("gpt-4", 100, 1, WINDOW)?;
    let reservation = bucket.acquire(80).await?;
    assert!(!bucket.ready(10).await);

    bucket.release(reservation).await;
    assert!(bucket.ready(10).await);
    Ok(())
}

#[test]
fn registry_is_keyed_by_account_and_model() -> anyhow::Result<()> {
    let mut limits = ProviderLimits::default();
    limits.models.insert(
        "gpt-4".to_string(),
        ModelLimits {
            max_tokens: 10_000,
            max_calls: 10,
            window_secs: 60,
        },
    );

    let registry = RateLimitRegistry::from_limits(&limits, "sk-a", "org")?;
    let key = RateLimitKey::new("sk-a", "org", "gpt-4", "completion");

    assert_eq!(registry.len(), 1);
    let bucket = registry.get(&key).expect("configured bucket");
    assert_eq!(bucket.max_tokens(), 10_000);
    assert!(registry.get(&key.for_model("gpt-4o")).is_none());
    assert!(
        registry
            .get(&RateLimitKey::new("sk-b", "org", "gpt-4", "completion"))
            .is_none()
    );
    Ok(())
}
