//! Tests for the configuration system.

use std::io::Write;
use std::time::Duration;
use tempfile::Builder;
use vasari_error::{ConfigErrorKind, VasariErrorKind};
use vasari_rate_limit::{RateLimitKey, RetryPreset, VasariConfig};

#[test]
fn bundled_defaults_carry_openai_limits() -> anyhow::Result<()> {
    let config = VasariConfig::bundled()?;

    let openai = config.provider("openai").expect("openai limits");
    assert_eq!(openai.request_type, "completion");

    let gpt4 = &openai.models["gpt-4"];
    assert_eq!(gpt4.max_tokens, 10_000_000);
    assert_eq!(gpt4.max_calls, 10_000);
    assert_eq!(gpt4.window_secs, 60);

    let turbo = &openai.models["gpt-3.5-turbo"];
    assert_eq!(turbo.max_tokens, 2_000_000);
    Ok(())
}

#[test]
fn bundled_defaults_configure_client() -> anyhow::Result<()> {
    let config = VasariConfig::bundled()?;

    assert_eq!(config.client.base_url, "https://openrouter.ai/api/v1");
    assert_eq!(config.client.timeout(), Duration::from_secs(120));
    assert_eq!(config.client.retry, RetryPreset::ProviderRateLimit);
    assert_eq!(config.images.max_bytes, 5 * 1024 * 1024);
    assert!(config.cache.root.is_none());
    Ok(())
}

#[test]
fn config_from_file_fills_defaults() -> anyhow::Result<()> {
    let mut temp_file = Builder::new().suffix(".toml").tempfile()?;
    writeln!(
        temp_file,
        r#"
[client]
retry = "transient_network"

[cache]
root = "/tmp/vasari-cache"

[providers.acme.models."acme/large"]
max_tokens = 500
max_calls = 5
"#
    )?;

    let config = VasariConfig::from_file(temp_file.path())?;

    assert_eq!(config.client.retry, RetryPreset::TransientNetwork);
    assert_eq!(config.client.timeout_secs, 120);
    assert_eq!(
        config.cache.root.as_deref(),
        Some(std::path::Path::new("/tmp/vasari-cache"))
    );

    let acme = config.provider("acme").expect("acme limits");
    assert_eq!(acme.request_type, "completion");
    assert_eq!(acme.models["acme/large"].window_secs, 60);
    assert_eq!(config.structured.fix_model, "openai/gpt-4o-mini");
    Ok(())
}

#[test]
fn config_from_missing_file_fails() {
    let err = VasariConfig::from_file("/nonexistent/vasari.toml").expect_err("missing file");
    match err.kind() {
        VasariErrorKind::Config(e) => match &e.kind {
            ConfigErrorKind::Read { path, .. } => assert_eq!(path, "/nonexistent/vasari.toml"),
            other => panic!("unexpected config error: {other}"),
        },
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn openai_names_bare_structured_models() -> anyhow::Result<()> {
    let config = VasariConfig::bundled()?;

    let openai = config.structured_for("openai");
    assert_eq!(openai.example_model, "gpt-4o");
    assert_eq!(openai.fix_model, "gpt-4o-mini");

    // Providers without an override use the top-level table.
    assert_eq!(config.structured_for("openrouter"), &config.structured);
    assert_eq!(config.structured.example_model, "openai/gpt-4o");
    Ok(())
}

#[test]
fn registry_builds_buckets_for_configured_models() -> anyhow::Result<()> {
    let config = VasariConfig::bundled()?;
    let registry = config.registry("openai", "sk-test", "org-test")?;

    assert_eq!(registry.len(), 4);
    let key = RateLimitKey::new("sk-test", "org-test", "gpt-4-turbo", "completion");
    let bucket = registry.get(&key).expect("gpt-4-turbo bucket");
    assert_eq!(bucket.max_tokens(), 2_000_000);
    assert_eq!(bucket.window(), Duration::from_secs(60));
    Ok(())
}

#[test]
fn unknown_provider_is_unlimited() -> anyhow::Result<()> {
    let config = VasariConfig::bundled()?;
    let registry = config.registry("nobody", "sk-test", "org")?;
    assert!(registry.is_empty());
    Ok(())
}
