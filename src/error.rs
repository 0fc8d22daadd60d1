use thiserror::Error;

/// Everything that can go wrong between submitting an operation and pricing a scenario.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HarnessError {
    #[error("call {function} reverted: {reason}")]
    CallReverted { function: String, reason: String },

    #[error("gas estimation for {function} failed: {reason}")]
    EstimationFailed { function: String, reason: String },

    #[error("cannot compare {left} with {right}")]
    MismatchedComparison { left: String, right: String },

    #[error("batch aggregation needs at least one sample")]
    EmptyBatch,

    #[error("baseline cost is zero, savings percentage is not applicable")]
    ZeroBaseline,

    #[error("ledger connection lost: {0}")]
    LedgerConnectionLost(String),

    #[error("unknown contract instance #{0}")]
    UnknownInstance(u32),

    #[error("unknown state field {0:?}")]
    UnknownStateField(String),

    #[error("undecodable {event} log: {reason}")]
    MalformedLog { event: String, reason: String },

    #[error("{function} emitted {observed} records, expected {expected}")]
    UnexpectedRecords {
        function: String,
        expected: usize,
        observed: usize,
    },

    #[error("{function} record #{index} does not belong to the call: {reason}")]
    RecordMismatch {
        function: String,
        index: usize,
        reason: String,
    },

    #[error("counter moved from {before} to {after}, expected +{expected}")]
    CounterInvariant { before: u64, after: u64, expected: u64 },

    #[error("gas overflow while scaling {gas} by {factor}")]
    GasOverflow { gas: u64, factor: u64 },

    #[error("gas overflow while adding {addend} to {total}")]
    GasSumOverflow { total: u64, addend: u64 },

    #[error("no account at index {0}")]
    MissingIdentity(usize),

    #[error("no recorded sample for {0}")]
    MissingMeasurement(String),

    #[error("invalid rate: {0}")]
    InvalidRate(String),
}

impl HarnessError {
    /// Whether the whole run has to stop. Everything else only fails the current step.
    pub fn is_fatal(&self) -> bool {
        matches!(self, HarnessError::LedgerConnectionLost(_))
    }

    /// Short machine-readable tag used in reports.
    pub fn kind(&self) -> &'static str {
        match self {
            HarnessError::CallReverted { .. } => "call_reverted",
            HarnessError::EstimationFailed { .. } => "estimation_failed",
            HarnessError::MismatchedComparison { .. } => "mismatched_comparison",
            HarnessError::EmptyBatch => "empty_batch",
            HarnessError::ZeroBaseline => "not_applicable",
            HarnessError::LedgerConnectionLost(_) => "ledger_connection_lost",
            HarnessError::UnknownInstance(_) => "unknown_instance",
            HarnessError::UnknownStateField(_) => "unknown_state_field",
            HarnessError::MalformedLog { .. } => "malformed_log",
            HarnessError::UnexpectedRecords { .. } => "unexpected_records",
            HarnessError::RecordMismatch { .. } => "record_mismatch",
            HarnessError::CounterInvariant { .. } => "counter_invariant",
            HarnessError::GasOverflow { .. } | HarnessError::GasSumOverflow { .. } => "gas_overflow",
            HarnessError::MissingIdentity(_) => "missing_identity",
            HarnessError::MissingMeasurement(_) => "missing_measurement",
            HarnessError::InvalidRate(_) => "invalid_rate",
        }
    }
}
