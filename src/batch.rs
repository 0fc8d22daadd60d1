use crate::compare::{savings, ComparisonResult};
use crate::error::HarnessError;
use crate::model::CostSample;

/// Total gas of a run of individual calls.
pub fn aggregate_individual(samples: &[CostSample]) -> Result<u64, HarnessError> {
    if samples.is_empty() {
        return Err(HarnessError::EmptyBatch);
    }
    samples.iter().try_fold(0u64, |acc, s| {
        acc.checked_add(s.gas_used).ok_or(HarnessError::GasSumOverflow {
            total: acc,
            addend: s.gas_used,
        })
    })
}

/// Individual total as the baseline, the batched call as the optimized side.
pub fn compare_to_batch(
    individual_total: u64,
    batch: &CostSample,
) -> Result<ComparisonResult, HarnessError> {
    savings(
        batch.operation,
        batch.input.clone(),
        individual_total,
        batch.gas_used,
    )
}
