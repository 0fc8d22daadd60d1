use crate::model::{CostSample, InputDescriptor};
use crate::{OperationKind, Variant};

/// Append-only store of cost samples for one run.
#[derive(Clone, Debug, Default)]
pub struct CostRecorder {
    samples: Vec<CostSample>,
}

impl CostRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, sample: CostSample) {
        self.samples.push(sample);
    }

    /// Samples matching the key, oldest first. `input: None` matches any input.
    pub fn query(
        &self,
        variant: Variant,
        operation: OperationKind,
        input: Option<&InputDescriptor>,
    ) -> Vec<&CostSample> {
        self.samples
            .iter()
            .filter(|s| s.variant == variant && s.operation == operation)
            .filter(|s| input.map_or(true, |i| &s.input == i))
            .collect()
    }

    /// Most recent sample whose input carries `label`.
    pub fn latest_by_label(
        &self,
        variant: Variant,
        operation: OperationKind,
        label: &str,
    ) -> Option<&CostSample> {
        self.samples.iter().rev().find(|s| {
            s.variant == variant && s.operation == operation && s.input.label == label
        })
    }

    pub fn samples(&self) -> &[CostSample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
