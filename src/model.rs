//! Value types shared by every stage of the harness.

use crate::{OperationKind, Variant};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 20-byte account address, serialized as `0x`-prefixed lowercase hex.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identity(pub [u8; 20]);

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for Identity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix("0x")
            .ok_or_else(|| format!("address {s:?} lacks 0x prefix"))?;
        let mut out = [0u8; 20];
        hex::decode_to_slice(digits, &mut out).map_err(|e| format!("address {s:?}: {e}"))?;
        Ok(Identity(out))
    }
}

impl TryFrom<String> for Identity {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Identity> for String {
    fn from(value: Identity) -> Self {
        value.to_string()
    }
}

/// Buckets samples by payload size instead of literal content.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InputDescriptor {
    pub label: String,
    pub byte_len: usize,
}

impl InputDescriptor {
    pub fn new(label: impl Into<String>, byte_len: usize) -> Self {
        Self {
            label: label.into(),
            byte_len,
        }
    }

    pub fn for_payload(label: impl Into<String>, payload: &str) -> Self {
        Self::new(label, payload.len())
    }

    /// Same payload-length bucket; labels are free to differ.
    pub fn equivalent(&self, other: &InputDescriptor) -> bool {
        self.byte_len == other.byte_len
    }
}

impl fmt::Display for InputDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} B)", self.label, self.byte_len)
    }
}

/// Cost of one successful invocation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostSample {
    pub variant: Variant,
    pub operation: OperationKind,
    pub input: InputDescriptor,
    pub gas_used: u64,
    /// `None` when the dry-run estimate could not be obtained.
    pub estimated_gas: Option<u64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Hello,
    Greeting,
}

/// One decoded event. Batches decode to one record per payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmittedRecord {
    pub kind: RecordKind,
    pub actor: Identity,
    pub payload: String,
    pub timestamp: u64,
}

/// A state-changing call together with its arguments.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Operation {
    EmitMessage(String),
    EmitGreeting(String),
    BatchEmit { payloads: Vec<String>, greeting: bool },
}

impl Operation {
    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::EmitMessage(_) => OperationKind::EmitMessage,
            Operation::EmitGreeting(_) => OperationKind::EmitGreeting,
            Operation::BatchEmit { .. } => OperationKind::BatchEmit,
        }
    }

    /// Build the single-payload operation for `kind`. Batches go through [`Operation::BatchEmit`].
    pub fn single(kind: OperationKind, payload: &str) -> Option<Self> {
        match kind {
            OperationKind::EmitMessage => Some(Operation::EmitMessage(payload.to_string())),
            OperationKind::EmitGreeting => Some(Operation::EmitGreeting(payload.to_string())),
            OperationKind::BatchEmit => None,
        }
    }

    pub fn payload_bytes(&self) -> usize {
        match self {
            Operation::EmitMessage(p) | Operation::EmitGreeting(p) => p.len(),
            Operation::BatchEmit { payloads, .. } => payloads.iter().map(String::len).sum(),
        }
    }

    pub fn expected_counter_delta(&self) -> u64 {
        match self {
            Operation::EmitMessage(_) => 0,
            Operation::EmitGreeting(_) => 1,
            Operation::BatchEmit { payloads, greeting } => {
                if *greeting {
                    payloads.len() as u64
                } else {
                    0
                }
            }
        }
    }

    /// Kind every emitted record must carry.
    pub fn expected_record_kind(&self) -> RecordKind {
        match self {
            Operation::EmitMessage(_) => RecordKind::Hello,
            Operation::EmitGreeting(_) => RecordKind::Greeting,
            Operation::BatchEmit { greeting: true, .. } => RecordKind::Greeting,
            Operation::BatchEmit { greeting: false, .. } => RecordKind::Hello,
        }
    }

    /// Submitted payloads, in submission order.
    pub fn payloads(&self) -> Vec<&str> {
        match self {
            Operation::EmitMessage(p) | Operation::EmitGreeting(p) => vec![p.as_str()],
            Operation::BatchEmit { payloads, .. } => payloads.iter().map(String::as_str).collect(),
        }
    }

    pub fn expected_records(&self) -> usize {
        match self {
            Operation::EmitMessage(_) | Operation::EmitGreeting(_) => 1,
            Operation::BatchEmit { payloads, .. } => payloads.len(),
        }
    }
}
