//! Pricing lookup.

use std::collections::HashMap;
use std::sync::Arc;
use vasari_core::ModelPricing;
use vasari_error::{PricingError, PricingErrorKind, VasariResult};

/// Resolves the price of a model id.
pub trait PricingTable: Send + Sync {
    /// Pricing for `model`.
    ///
    /// # Errors
    ///
    /// Returns a pricing error when the model is not in the table.
    fn pricing(&self, model: &str) -> VasariResult<ModelPricing>;
}

impl<T: PricingTable + ?Sized> PricingTable for Arc<T> {
    fn pricing(&self, model: &str) -> VasariResult<ModelPricing> {
        (**self).pricing(model)
    }
}

/// OpenAI list prices, USD per thousand tokens (input, output).
const OPENAI_PRICES_PER_1K: &[(&str, f64, f64)] = &[
    ("gpt-4-turbo", 0.01, 0.03),
    ("gpt-4-turbo-2024-04-09", 0.01, 0.03),
    ("gpt-4", 0.03, 0.06),
    ("gpt-4-32k", 0.06, 0.12),
    ("gpt-4-0125-preview", 0.01, 0.03),
    ("gpt-4-1106-preview", 0.01, 0.03),
    ("gpt-4-vision-preview", 0.01, 0.03),
    ("gpt-3.5-turbo", 0.0005, 0.0015),
    ("gpt-3.5-turbo-0125", 0.0005, 0.0015),
    ("gpt-3.5-turbo-1106", 0.001, 0.002),
    ("gpt-3.5-turbo-0613", 0.0015, 0.002),
    ("gpt-3.5-turbo-16k-0613", 0.003, 0.004),
    ("gpt-3.5-turbo-0301", 0.0015, 0.002),
    ("davinci-002", 0.002, 0.002),
    ("babbage-002", 0.0004, 0.0004),
    ("gpt-4o", 0.0025, 0.015),
    ("gpt-4o-2024-05-13", 0.0025, 0.015),
    ("gpt-4o-2024-08-06", 0.0025, 0.015),
    ("gpt-4o-mini", 0.00015, 0.0006),
    ("gpt-4o-mini-2024-07-18", 0.00015, 0.0006),
];

/// A fixed in-memory price list.
///
/// An id with a vendor prefix that is not listed falls back to the part after
/// the last `/`, so `openai/gpt-4o` finds the `gpt-4o` price.
///
/// # Examples
///
/// ```
/// use vasari_core::ModelPricing;
/// use vasari_models::{PricingTable, StaticPricingTable};
///
/// let table = StaticPricingTable::new().with_model("local/echo", ModelPricing::new(0.0, 0.0));
/// assert_eq!(table.pricing("local/echo").unwrap(), ModelPricing::new(0.0, 0.0));
///
/// let openai = StaticPricingTable::openai();
/// let gpt4 = openai.pricing("gpt-4").unwrap();
/// assert!((gpt4.prompt() - 0.00003).abs() < 1e-12);
/// assert_eq!(openai.pricing("openai/gpt-4").unwrap(), gpt4);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StaticPricingTable {
    prices: HashMap<String, ModelPricing>,
}

impl StaticPricingTable {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// OpenAI list prices, converted to per-token.
    pub fn openai() -> Self {
        OPENAI_PRICES_PER_1K
            .iter()
            .fold(Self::new(), |table, (model, input, output)| {
                table.with_model(*model, ModelPricing::per_thousand(*input, *output))
            })
    }

    /// Add or replace one entry.
    pub fn with_model(mut self, model: impl Into<String>, pricing: ModelPricing) -> Self {
        self.prices.insert(model.into(), pricing);
        self
    }

    /// Number of priced models.
    pub fn len(&self) -> usize {
        self.prices.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}

impl PricingTable for StaticPricingTable {
    fn pricing(&self, model: &str) -> VasariResult<ModelPricing> {
        self.prices
            .get(model)
            .or_else(|| model.rsplit_once('/').and_then(|(_, bare)| self.prices.get(bare)))
            .copied()
            .ok_or_else(|| {
                PricingError::new(PricingErrorKind::UnknownModel(model.to_string())).into()
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vasari_error::VasariErrorKind;

    #[test]
    fn openai_table_is_per_token() {
        let table = StaticPricingTable::openai();
        assert_eq!(table.len(), OPENAI_PRICES_PER_1K.len());

        let gpt4o = table.pricing("gpt-4o").unwrap();
        assert!((gpt4o.prompt() - 0.0000025).abs() < 1e-15);
        assert!((gpt4o.completion() - 0.000015).abs() < 1e-15);
    }

    #[test]
    fn openai_table_prices_configured_models() {
        let table = StaticPricingTable::openai();

        let mini = table.pricing("gpt-4o-mini").unwrap();
        assert!((mini.prompt() - 0.00000015).abs() < 1e-15);
        assert!((mini.completion() - 0.0000006).abs() < 1e-15);
        assert!(table.pricing("gpt-3.5-turbo").is_ok());
    }

    #[test]
    fn vendor_prefix_falls_back_to_the_bare_id() {
        let table = StaticPricingTable::openai();
        assert_eq!(
            table.pricing("openai/gpt-4o-mini").unwrap(),
            table.pricing("gpt-4o-mini").unwrap()
        );

        let exact = StaticPricingTable::new()
            .with_model("gpt-4o", ModelPricing::new(1.0, 1.0))
            .with_model("azure/gpt-4o", ModelPricing::new(2.0, 2.0));
        assert_eq!(exact.pricing("azure/gpt-4o").unwrap(), ModelPricing::new(2.0, 2.0));
    }

    #[test]
    fn unknown_model_is_a_pricing_error() {
        let err = StaticPricingTable::openai()
            .pricing("gpt-5-nonexistent")
            .unwrap_err();
        assert!(matches!(err.kind(), VasariErrorKind::Pricing(_)));
    }
}
