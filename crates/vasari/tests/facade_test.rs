//! The facade wires a working executor from configuration alone.

use std::sync::Arc;
use vasari::{
    CompletionExecutor, CostAccountant, CostAccumulator, PricingTable, RetryPreset,
    StaticPricingTable, VasariConfig,
};

#[test]
fn bundled_config_builds_an_executor() -> anyhow::Result<()> {
    let config = VasariConfig::bundled()?;
    let total = Arc::new(CostAccumulator::new());

    let executor = CompletionExecutor::from_config(
        &config,
        "openai",
        "sk-test",
        "org-test",
        Arc::new(StaticPricingTable::openai()),
        CostAccountant::new().with_sink(total),
    )?;

    assert_eq!(executor.retry_policy().name(), "provider_rate_limit");
    assert_eq!(executor.accountant().sink_count(), 1);
    Ok(())
}

#[test]
fn transient_preset_and_disk_cache_come_from_config() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let mut config = VasariConfig::bundled()?;
    config.client.retry = RetryPreset::TransientNetwork;
    config.cache.root = Some(dir.path().to_path_buf());

    let executor = CompletionExecutor::from_config(
        &config,
        "openrouter",
        "sk-test",
        "",
        Arc::new(StaticPricingTable::openai()),
        CostAccountant::new(),
    )?;

    assert_eq!(executor.retry_policy().name(), "transient_network");
    assert_eq!(executor.retry_policy().max_attempts(), Some(5));
    Ok(())
}

#[test]
fn static_prices_are_per_token() -> anyhow::Result<()> {
    let pricing = StaticPricingTable::openai().pricing("gpt-4o")?;
    assert!((pricing.prompt() - 0.0000025).abs() < 1e-15);
    assert!((pricing.completion() - 0.000015).abs() < 1e-15);
    Ok(())
}
