//! Seams to the ledger the contracts live on.
//!
//! The harness only ever talks to these traits. [`crate::sim::SimulatedLedger`] is the
//! in-process implementation; a node-backed one would implement the same calls.

use crate::error::HarnessError;
use crate::model::{Identity, Operation};
use crate::Variant;
use serde::{Deserialize, Serialize};

/// Name of the counter field for [`Ledger::read_state`].
pub const COUNTER_FIELD: &str = "counter";

/// View function returning the counter.
pub const COUNTER_VIEW: &str = "getCounter";

/// Opaque handle to a deployed contract instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstanceHandle(pub u32);

/// A deployed instance together with the variant it runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Deployment {
    pub handle: InstanceHandle,
    pub variant: Variant,
}

/// ABI-level call arguments.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CallArgs {
    /// No arguments, as for view calls.
    Empty,
    Text(String),
    Batch { payloads: Vec<String>, greeting: bool },
}

impl From<&Operation> for CallArgs {
    fn from(op: &Operation) -> Self {
        match op {
            Operation::EmitMessage(p) | Operation::EmitGreeting(p) => CallArgs::Text(p.clone()),
            Operation::BatchEmit { payloads, greeting } => CallArgs::Batch {
                payloads: payloads.clone(),
                greeting: *greeting,
            },
        }
    }
}

/// Event as the ledger reports it: a name plus named arguments.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawLog {
    pub event: String,
    pub args: serde_json::Value,
}

/// Outcome of a mined state-changing call.
#[derive(Clone, Debug, PartialEq)]
pub struct Receipt {
    pub gas_used: u64,
    pub logs: Vec<RawLog>,
}

/// Ledger access. Calls block until the outcome is known.
pub trait Ledger {
    fn deploy(&mut self, variant: Variant) -> Result<InstanceHandle, HarnessError>;

    fn call(
        &mut self,
        instance: InstanceHandle,
        function: &str,
        args: &CallArgs,
        caller: Identity,
    ) -> Result<Receipt, HarnessError>;

    /// Dry-run of [`Ledger::call`]; must not change any state.
    fn estimate_gas(
        &self,
        instance: InstanceHandle,
        function: &str,
        args: &CallArgs,
        caller: Identity,
    ) -> Result<u64, HarnessError>;

    fn read_state(&self, instance: InstanceHandle, field: &str) -> Result<u64, HarnessError>;

    /// Gas used by the transaction that created `instance`.
    fn deployment_gas(&self, instance: InstanceHandle) -> Result<u64, HarnessError>;
}

/// Supplies caller identities. Index 0 is the owner account.
pub trait AccountProvider {
    fn accounts(&self) -> Result<Vec<Identity>, HarnessError>;
}
