//! Run configuration, loadable from a JSON file. Every field has a default.

use crate::scenario::{PairedScenarioSpec, PriceAssumptions, ScenarioBasis, ScenarioSpec};
use crate::{OperationKind, Variant};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("reading config: {0}")]
    Io(#[from] io::Error),
    #[error("parsing config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// A payload with a human label; the label names the input bucket in reports.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedInput {
    pub label: String,
    pub payload: String,
}

impl NamedInput {
    pub fn new(label: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            payload: payload.into(),
        }
    }
}

/// Individual calls on one variant against a single batched call on another.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchPlan {
    pub label: String,
    pub payloads: Vec<String>,
    pub greeting: bool,
    #[serde(default = "default_individual")]
    pub individual: Variant,
    #[serde(default = "default_batched")]
    pub batched: Variant,
}

fn default_individual() -> Variant {
    Variant::Baseline
}

fn default_batched() -> Variant {
    Variant::Optimized
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Account index the calls are sent from. Index 0 is the owner.
    pub caller_index: usize,
    pub inputs: Vec<NamedInput>,
    pub batches: Vec<BatchPlan>,
    pub prices: PriceAssumptions,
    pub scenarios: Vec<ScenarioSpec>,
    /// Scenarios priced on both variants side by side.
    pub paired_scenarios: Vec<PairedScenarioSpec>,
}

fn batch_payloads() -> Vec<String> {
    (1..=5).map(|i| format!("消息{i}")).collect()
}

fn basis(variant: Variant, operation: OperationKind, input: &str, repeat: u64) -> ScenarioBasis {
    ScenarioBasis::Measured {
        variant,
        operation,
        input: input.to_string(),
        repeat,
    }
}

fn measured(
    name: &str,
    variant: Variant,
    operation: OperationKind,
    input: &str,
    repeat: u64,
) -> ScenarioSpec {
    ScenarioSpec {
        name: name.to_string(),
        basis: basis(variant, operation, input, repeat),
    }
}

fn paired(name: &str, operation: OperationKind, input: &str, repeat: u64) -> PairedScenarioSpec {
    PairedScenarioSpec {
        name: name.to_string(),
        baseline: basis(Variant::Baseline, operation, input, repeat),
        optimized: basis(Variant::Optimized, operation, input, repeat),
    }
}

impl Default for HarnessConfig {
    fn default() -> Self {
        use OperationKind::{BatchEmit, EmitGreeting, EmitMessage};
        use Variant::{Baseline, Optimized};

        Self {
            caller_index: 1,
            inputs: vec![
                NamedInput::new("empty", ""),
                NamedInput::new("short", "Hello"),
                NamedInput::new("medium", "Hello World!"),
                NamedInput::new("cjk", "你好，区块链！"),
                NamedInput::new(
                    "long",
                    "This is a long message for testing gas consumption with many characters",
                ),
            ],
            batches: vec![
                BatchPlan {
                    label: "batch-hello-5".to_string(),
                    payloads: batch_payloads(),
                    greeting: false,
                    individual: Baseline,
                    batched: Optimized,
                },
                BatchPlan {
                    label: "batch-greeting-5".to_string(),
                    payloads: batch_payloads(),
                    greeting: true,
                    individual: Baseline,
                    batched: Optimized,
                },
            ],
            prices: PriceAssumptions::default(),
            scenarios: vec![
                measured("single hello (baseline)", Baseline, EmitMessage, "short", 1),
                measured("single hello (optimized)", Optimized, EmitMessage, "short", 1),
                measured("single greeting (baseline)", Baseline, EmitGreeting, "short", 1),
                measured("single greeting (optimized)", Optimized, EmitGreeting, "short", 1),
                measured("10 hellos (baseline)", Baseline, EmitMessage, "short", 10),
                measured("10 greetings (baseline)", Baseline, EmitGreeting, "short", 10),
                measured("batch of 5 hellos", Optimized, BatchEmit, "batch-hello-5", 1),
                measured("batch of 5 greetings", Optimized, BatchEmit, "batch-greeting-5", 1),
            ],
            paired_scenarios: vec![
                paired("single hello", EmitMessage, "short", 1),
                paired("single greeting", EmitGreeting, "short", 1),
                paired("10 hellos", EmitMessage, "short", 10),
                paired("10 greetings", EmitGreeting, "short", 10),
                PairedScenarioSpec {
                    name: "5 greetings, one by one vs batched".to_string(),
                    baseline: basis(Baseline, EmitGreeting, "batch-greeting-5#1", 5),
                    optimized: basis(Optimized, BatchEmit, "batch-greeting-5", 1),
                },
            ],
        }
    }
}

impl HarnessConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        let cfg: HarnessConfig = serde_json::from_str(&text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.prices
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        let mut seen = std::collections::HashSet::new();
        for input in &self.inputs {
            if !seen.insert(input.label.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate input label {:?}",
                    input.label
                )));
            }
        }
        Ok(())
    }
}
