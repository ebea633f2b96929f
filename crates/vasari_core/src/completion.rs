//! Full outcome of one executed completion.

use crate::{CostRecord, StructuredResult};

/// The resolved answer and what it cost.
#[derive(Debug, Clone, PartialEq, derive_getters::Getters)]
pub struct Completion {
    /// Text or validated structured value
    result: StructuredResult,
    /// Cost and usage of the call
    cost: CostRecord,
}

impl Completion {
    /// Pair a result with its cost record.
    pub fn new(result: StructuredResult, cost: CostRecord) -> Self {
        Self { result, cost }
    }

    /// Consume the completion, keeping only the result.
    pub fn into_result(self) -> StructuredResult {
        self.result
    }
}
