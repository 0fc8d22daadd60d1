use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod batch;
pub mod compare;
pub mod config;
pub mod error;
pub mod executor;
pub mod harness;
pub mod ledger;
pub mod model;
pub mod recorder;
pub mod render;
pub mod scenario;
pub mod schema;
pub mod sim;

pub use error::HarnessError;

/// Greeter contract implementation under cost comparison.
#[derive(Clone, Copy, Debug, ValueEnum, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    /// Straightforward contract: checked arithmetic, one event per element.
    Baseline,
    /// Gas-tuned contract: unchecked arithmetic, aggregate batch event, length limit.
    Optimized,
}

impl Variant {
    pub const ALL: [Variant; 2] = [Variant::Baseline, Variant::Optimized];

    pub fn as_str(&self) -> &'static str {
        match self {
            Variant::Baseline => "baseline",
            Variant::Optimized => "optimized",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Logical action, independent of which variant performs it.
#[derive(Clone, Copy, Debug, ValueEnum, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// `sayHello`: emits a hello event, leaves the counter alone.
    EmitMessage,
    /// `sendGreeting`: emits a greeting event and bumps the counter.
    EmitGreeting,
    /// `sendBatchMessages`: several payloads in one call.
    BatchEmit,
}

impl OperationKind {
    pub const ALL: [OperationKind; 3] = [
        OperationKind::EmitMessage,
        OperationKind::EmitGreeting,
        OperationKind::BatchEmit,
    ];

    /// Contract function name on the ledger.
    pub fn function_name(&self) -> &'static str {
        match self {
            OperationKind::EmitMessage => "sayHello",
            OperationKind::EmitGreeting => "sendGreeting",
            OperationKind::BatchEmit => "sendBatchMessages",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::EmitMessage => "emit_message",
            OperationKind::EmitGreeting => "emit_greeting",
            OperationKind::BatchEmit => "batch_emit",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}
