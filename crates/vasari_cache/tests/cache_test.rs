use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use vasari_cache::{CompletionCache, CompletionCacheConfig};
use vasari_error::{HttpError, HttpErrorKind, VasariError, VasariResult};

fn memory_cache() -> VasariResult<CompletionCache<String>> {
    CompletionCache::new(&CompletionCacheConfig::default())
}

fn refused(reason: &str) -> HttpError {
    HttpError::new(HttpErrorKind::InvalidRequest(reason.to_string()))
}

#[tokio::test]
async fn concurrent_callers_share_one_computation() -> anyhow::Result<()> {
    let cache = memory_cache()?;
    let computations = Arc::new(AtomicUsize::new(0));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let cache = cache.clone();
        let computations = Arc::clone(&computations);
        handles.push(tokio::spawn(async move {
            cache
                .get_or_try_insert_with("capital", async move {
                    computations.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    Ok::<_, VasariError>("Tokyo".to_string())
                })
                .await
        }));
    }

    for handle in handles {
        assert_eq!(handle.await??, "Tokyo");
    }
    assert_eq!(computations.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test]
async fn failures_are_not_cached() -> anyhow::Result<()> {
    let cache = memory_cache()?;

    let first = cache
        .get_or_try_insert_with("flaky", async {
            Err::<String, VasariError>(refused("boom").into())
        })
        .await;
    assert!(first.is_err());

    let second = cache
        .get_or_try_insert_with("flaky", async { Ok::<_, VasariError>("recovered".to_string()) })
        .await?;
    assert_eq!(second, "recovered");
    Ok(())
}

#[tokio::test]
async fn persisted_entries_survive_a_new_cache() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let config = CompletionCacheConfig::default()
        .with_namespace("schema_examples".to_string())
        .with_root(Some(dir.path().to_path_buf()));

    let first: CompletionCache<String> = CompletionCache::new(&config)?;
    first
        .get_or_try_insert_with("k", async { Ok::<_, VasariError>("stored".to_string()) })
        .await?;

    let second: CompletionCache<String> = CompletionCache::new(&config)?;
    let value = second
        .get_or_try_insert_with("k", async {
            Err::<String, VasariError>(refused("unreachable").into())
        })
        .await?;
    assert_eq!(value, "stored");
    assert!(dir.path().join("schema_examples").is_dir());
    Ok(())
}

#[tokio::test]
async fn invalidate_removes_memory_and_disk() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let config = CompletionCacheConfig::default().with_root(Some(dir.path().to_path_buf()));
    let cache: CompletionCache<String> = CompletionCache::new(&config)?;

    cache.insert("k", "v".to_string()).await?;
    assert_eq!(cache.get("k").await.as_deref(), Some("v"));

    cache.invalidate("k").await;
    assert_eq!(cache.get("k").await, None);

    let fresh: CompletionCache<String> = CompletionCache::new(&config)?;
    assert_eq!(fresh.get("k").await, None);
    Ok(())
}

#[test]
fn builder_applies_defaults() -> anyhow::Result<()> {
    let config = vasari_cache::CompletionCacheConfigBuilder::default()
        .namespace("examples")
        .build()?;
    assert_eq!(config.namespace(), "examples");
    assert_eq!(*config.max_capacity(), 10_000);
    assert!(config.root().is_none());
    Ok(())
}
