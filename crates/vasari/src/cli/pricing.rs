//! Pricing lookup command handler.

use super::Provider;
use std::sync::Arc;
use tracing::{debug, instrument};
use vasari::{OpenRouterModelTable, PricingTable, StaticPricingTable, VasariConfig, VasariResult};

/// Layered configuration with the provider's base URL applied.
pub(crate) fn load_config(provider: Provider) -> VasariResult<VasariConfig> {
    let mut config = VasariConfig::load()?;
    if let Some(url) = provider.base_url_override() {
        debug!(url, "Using provider base URL");
        config.client.base_url = url.to_string();
    }
    Ok(config)
}

/// Prices for `provider`: fetched for OpenRouter, built in for OpenAI.
pub(crate) async fn pricing_table(
    provider: Provider,
    config: &VasariConfig,
) -> VasariResult<Arc<dyn PricingTable>> {
    match provider {
        Provider::OpenRouter => {
            let table =
                OpenRouterModelTable::fetch(&config.client.base_url, config.client.timeout())
                    .await?;
            Ok(Arc::new(table))
        }
        Provider::OpenAi => Ok(Arc::new(StaticPricingTable::openai())),
    }
}

/// Print the per-token and per-million-token price of `model`.
#[instrument(skip(provider))]
pub async fn show_pricing(model: &str, provider: Provider) -> VasariResult<()> {
    let config = load_config(provider)?;
    let pricing = pricing_table(provider, &config).await?.pricing(model)?;

    println!("{}", model);
    println!(
        "  prompt:     ${:.10} per token (${:.4} per 1M)",
        pricing.prompt(),
        pricing.prompt() * 1_000_000.0
    );
    println!(
        "  completion: ${:.10} per token (${:.4} per 1M)",
        pricing.completion(),
        pricing.completion() * 1_000_000.0
    );
    Ok(())
}
