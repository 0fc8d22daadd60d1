use crate::error::HarnessError;
use crate::model::{CostSample, InputDescriptor};
use crate::OperationKind;
use serde::{Deserialize, Serialize};

/// Savings of the optimized side over the baseline side.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub operation: OperationKind,
    pub input: InputDescriptor,
    pub baseline_gas: u64,
    pub optimized_gas: u64,
    /// Negative when the optimized side costs more.
    pub saved_absolute: i128,
    pub saved_percent: f64,
}

/// Absolute and percentage saving of `optimized_gas` over `baseline_gas`. Fails on a zero baseline.
pub(crate) fn saved(baseline_gas: u64, optimized_gas: u64) -> Result<(i128, f64), HarnessError> {
    if baseline_gas == 0 {
        return Err(HarnessError::ZeroBaseline);
    }
    let saved_absolute = i128::from(baseline_gas) - i128::from(optimized_gas);
    Ok((saved_absolute, saved_absolute as f64 / baseline_gas as f64 * 100.0))
}

/// Savings arithmetic shared with batch comparison.
pub(crate) fn savings(
    operation: OperationKind,
    input: InputDescriptor,
    baseline_gas: u64,
    optimized_gas: u64,
) -> Result<ComparisonResult, HarnessError> {
    let (saved_absolute, saved_percent) = saved(baseline_gas, optimized_gas)?;
    Ok(ComparisonResult {
        operation,
        input,
        baseline_gas,
        optimized_gas,
        saved_absolute,
        saved_percent,
    })
}

/// Compare two samples of the same logical operation on equivalent inputs.
pub fn compare(baseline: &CostSample, optimized: &CostSample) -> Result<ComparisonResult, HarnessError> {
    if baseline.operation != optimized.operation || !baseline.input.equivalent(&optimized.input) {
        return Err(HarnessError::MismatchedComparison {
            left: format!("{} {}", baseline.operation, baseline.input),
            right: format!("{} {}", optimized.operation, optimized.input),
        });
    }
    savings(
        baseline.operation,
        baseline.input.clone(),
        baseline.gas_used,
        optimized.gas_used,
    )
}
