//! Publishing completion costs.
//!
//! The executor hands every [`CostRecord`] to a [`CostAccountant`], which
//! forwards it to each registered [`CostSink`]. Sinks are supplied by the
//! caller; nothing here is global.

use crate::LlmMetrics;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use tracing::{debug, info};
use vasari_core::CostRecord;

/// Receives the cost of each finished completion.
pub trait CostSink: Send + Sync {
    /// Called once per completion, after pricing.
    fn on_cost(&self, record: &CostRecord);
}

/// Fans cost records out to sinks.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use vasari_core::{CostRecord, ModelPricing, Usage};
/// use vasari_models::{CostAccountant, CostAccumulator};
///
/// let total = Arc::new(CostAccumulator::new());
/// let accountant = CostAccountant::new().with_sink(total.clone());
///
/// let pricing = ModelPricing::new(0.001, 0.002);
/// let record = CostRecord::new("gpt-4", None, None, Usage::new(10, 1), &pricing);
/// accountant.publish(&record);
/// accountant.publish(&record);
///
/// assert!((total.total() - 0.024).abs() < 1e-12);
/// ```
#[derive(Clone, Default)]
pub struct CostAccountant {
    sinks: Vec<Arc<dyn CostSink>>,
}

impl std::fmt::Debug for CostAccountant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CostAccountant")
            .field("sinks", &self.sinks.len())
            .finish()
    }
}

impl CostAccountant {
    /// An accountant with no sinks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a sink.
    pub fn with_sink(mut self, sink: Arc<dyn CostSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Register a sink in place.
    pub fn add_sink(&mut self, sink: Arc<dyn CostSink>) {
        self.sinks.push(sink);
    }

    /// Number of registered sinks.
    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }

    /// Hand a record to every sink, in registration order.
    pub fn publish(&self, record: &CostRecord) {
        debug!(
            model = %record.model(),
            total_cost = record.total_cost(),
            sinks = self.sinks.len(),
            "Publishing completion cost"
        );
        for sink in &self.sinks {
            sink.on_cost(record);
        }
    }
}

/// Running total of spend for a session.
///
/// Additions are serialized, so concurrent completions never lose an update.
/// There is no reset; start a new accumulator instead.
#[derive(Debug, Default)]
pub struct CostAccumulator {
    total: Mutex<f64>,
}

impl CostAccumulator {
    /// A zero total.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `amount` and return the new total.
    pub fn add(&self, amount: f64) -> f64 {
        match self.total.lock() {
            Ok(mut total) => {
                *total += amount;
                *total
            }
            Err(poisoned) => {
                let mut total = poisoned.into_inner();
                *total += amount;
                *total
            }
        }
    }

    /// Spend so far, in USD.
    pub fn total(&self) -> f64 {
        match self.total.lock() {
            Ok(total) => *total,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

impl CostSink for CostAccumulator {
    fn on_cost(&self, record: &CostRecord) {
        let cumulative = self.add(record.total_cost());
        info!(
            model = %record.model(),
            provider = record.provider().as_deref().unwrap_or("unknown"),
            prompt_cost = *record.cost().prompt_cost(),
            completion_cost = *record.cost().completion_cost(),
            total_cost = record.total_cost(),
            cumulative_cost = cumulative,
            "Cost of completion"
        );
    }
}

/// Forwards cost records to async subscribers over a broadcast channel.
///
/// Records published while nobody is subscribed are dropped.
#[derive(Debug, Clone)]
pub struct BroadcastCostSink {
    sender: broadcast::Sender<CostRecord>,
}

impl BroadcastCostSink {
    /// A channel buffering up to `capacity` records per lagging subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Subscribe to records published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<CostRecord> {
        self.sender.subscribe()
    }
}

impl CostSink for BroadcastCostSink {
    fn on_cost(&self, record: &CostRecord) {
        if self.sender.send(record.clone()).is_err() {
            debug!("No cost subscribers");
        }
    }
}

/// Records spend and token counts as OpenTelemetry metrics.
#[derive(Clone, Default)]
pub struct MetricsCostSink {
    metrics: LlmMetrics,
}

impl MetricsCostSink {
    /// Sink backed by the global [`LlmMetrics`].
    pub fn new() -> Self {
        Self::default()
    }
}

impl CostSink for MetricsCostSink {
    fn on_cost(&self, record: &CostRecord) {
        let usage = record.usage();
        let provider = record.provider().as_deref().unwrap_or("unknown");
        self.metrics.record_tokens(
            record.model(),
            *usage.prompt_tokens(),
            *usage.completion_tokens(),
            usage.total(),
        );
        self.metrics.record_cost(provider, record.model(), record.total_cost());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vasari_core::{ModelPricing, Usage};

    fn record(prompt: u64, completion: u64) -> CostRecord {
        CostRecord::new(
            "openai/gpt-4o",
            Some("OpenAI".to_string()),
            Some("gen-1".to_string()),
            Usage::new(prompt, completion),
            &ModelPricing::new(0.001, 0.002),
        )
    }

    #[test]
    fn accumulator_sums_records() {
        let total = CostAccumulator::new();
        total.on_cost(&record(10, 1));
        total.on_cost(&record(0, 5));
        assert!((total.total() - 0.022).abs() < 1e-12);
    }

    #[tokio::test]
    async fn broadcast_delivers_to_subscribers() {
        let sink = BroadcastCostSink::new(4);
        let mut rx = sink.subscribe();
        let accountant = CostAccountant::new().with_sink(Arc::new(sink));

        accountant.publish(&record(10, 1));

        let received = rx.recv().await.unwrap();
        assert_eq!(received.completion_id().as_deref(), Some("gen-1"));
        assert!((received.total_cost() - 0.012).abs() < 1e-12);
    }

    #[test]
    fn publishing_without_subscribers_is_harmless() {
        let accountant = CostAccountant::new()
            .with_sink(Arc::new(BroadcastCostSink::new(1)))
            .with_sink(Arc::new(MetricsCostSink::new()));
        accountant.publish(&record(1, 1));
        assert_eq!(accountant.sink_count(), 2);
    }

    #[test]
    fn concurrent_additions_are_not_lost() {
        let total = Arc::new(CostAccumulator::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let total = Arc::clone(&total);
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        total.add(0.5);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(total.total(), 4000.0);
    }
}
