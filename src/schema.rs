use crate::compare::ComparisonResult;
use crate::executor::Execution;
use crate::harness::{DeploymentCost, StepFailure};
use crate::model::{CostSample, EmittedRecord};
use crate::scenario::{ScenarioComparison, ScenarioEstimate};
use serde::{Deserialize, Serialize};

pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMeta {
    pub schema_version: u32,
    pub bench_version: String,
    pub profile: String,
    pub seed: u64,
    pub timestamp_utc: String,
    pub git_sha: Option<String>,
    pub ledger: String,
}

/// Estimate vs actual for one analyzed call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionSummary {
    pub sample: CostSample,
    pub counter_before: u64,
    pub counter_after: u64,
    pub records: Vec<EmittedRecord>,
}

impl From<&Execution> for ExecutionSummary {
    fn from(e: &Execution) -> Self {
        Self {
            sample: e.sample.clone(),
            counter_before: e.counter_before,
            counter_after: e.counter_after,
            records: e.records.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GasReport {
    pub run: RunMeta,
    /// False when a fatal error cut the run short.
    pub complete: bool,
    pub deployments: Vec<DeploymentCost>,
    pub samples: Vec<CostSample>,
    pub comparisons: Vec<ComparisonResult>,
    pub batch_comparisons: Vec<ComparisonResult>,
    pub scenarios: Vec<ScenarioEstimate>,
    pub scenario_comparisons: Vec<ScenarioComparison>,
    pub executions: Vec<ExecutionSummary>,
    pub records: Vec<EmittedRecord>,
    pub failures: Vec<StepFailure>,
}

impl GasReport {
    pub fn new(run: RunMeta) -> Self {
        Self {
            run,
            complete: true,
            deployments: Vec::new(),
            samples: Vec::new(),
            comparisons: Vec::new(),
            batch_comparisons: Vec::new(),
            scenarios: Vec::new(),
            scenario_comparisons: Vec::new(),
            executions: Vec::new(),
            records: Vec::new(),
            failures: Vec::new(),
        }
    }
}
