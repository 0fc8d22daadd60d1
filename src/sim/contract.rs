//! The greeter contract, in both variants, against the simulated gas schedule.

use super::abi;
use super::gas::{self, GasMeter, OutOfGas};
use crate::ledger::RawLog;
use crate::model::Identity;
use crate::Variant;
use serde_json::json;

/// Longest payload the optimized variant accepts, in bytes.
pub const MAX_PAYLOAD_LEN: usize = 256;

/// Most payloads the optimized variant accepts in one batch.
pub const MAX_BATCH_LEN: usize = 50;

// Topics: event signature + indexed sender.
const EVENT_TOPICS: u64 = 2;

const VIEW_DISPATCH_GAS: u64 = 110;

/// Storage owned by one deployed instance.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ContractStorage {
    pub counter: u64,
}

/// Per-call environment.
#[derive(Clone, Copy, Debug)]
pub struct CallContext {
    pub caller: Identity,
    pub timestamp: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Revert {
    OutOfGas(OutOfGas),
    Require(&'static str),
    Overflow,
}

impl From<OutOfGas> for Revert {
    fn from(e: OutOfGas) -> Self {
        Revert::OutOfGas(e)
    }
}

impl std::fmt::Display for Revert {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Revert::OutOfGas(e) => write!(f, "out of gas (needed {}, {} left)", e.needed, e.remaining),
            Revert::Require(msg) => f.write_str(msg),
            Revert::Overflow => f.write_str("arithmetic overflow"),
        }
    }
}

/// Capability shared by both variants. Contracts are stateless code; state lives in
/// [`ContractStorage`] so a dry run can execute against a copy.
pub trait Greeter: Send + Sync {
    /// Runtime bytecode length, which prices the creation transaction.
    fn code_size(&self) -> usize;

    /// Four-byte dispatch selector for `function`, if the contract exposes it.
    fn selector(&self, function: &str) -> Option<[u8; 4]> {
        abi::selector(function)
    }

    fn emit_message(
        &self,
        storage: &mut ContractStorage,
        meter: &mut GasMeter,
        ctx: &CallContext,
        message: &str,
    ) -> Result<Vec<RawLog>, Revert>;

    fn emit_greeting(
        &self,
        storage: &mut ContractStorage,
        meter: &mut GasMeter,
        ctx: &CallContext,
        greeting: &str,
    ) -> Result<Vec<RawLog>, Revert>;

    fn batch_emit(
        &self,
        storage: &mut ContractStorage,
        meter: &mut GasMeter,
        ctx: &CallContext,
        payloads: &[String],
        greeting: bool,
    ) -> Result<Vec<RawLog>, Revert>;

    fn read_counter(&self, storage: &ContractStorage) -> u64 {
        storage.counter
    }

    /// `getCounter` executed as a transaction: dispatch plus one cold load.
    fn view_counter(&self, storage: &ContractStorage, meter: &mut GasMeter) -> Result<u64, Revert> {
        meter.charge(VIEW_DISPATCH_GAS + gas::GAS_PER_COLD_STORAGE_ACCESS)?;
        Ok(self.read_counter(storage))
    }
}

/// Picks the implementation for a variant.
pub fn greeter_for(variant: Variant) -> Box<dyn Greeter> {
    match variant {
        Variant::Baseline => Box::new(BaselineGreeter),
        Variant::Optimized => Box::new(OptimizedGreeter),
    }
}

fn hello_log(meter: &mut GasMeter, ctx: &CallContext, message: &str) -> Result<RawLog, Revert> {
    let data = abi::text_event_data(message, ctx.timestamp);
    meter.charge(2 * gas::GAS_PER_ENV_READ + gas::log_gas(EVENT_TOPICS, data.len()))?;
    Ok(RawLog {
        event: "HelloEvent".to_string(),
        args: json!({
            "sender": ctx.caller,
            "message": message,
            "timestamp": ctx.timestamp,
        }),
    })
}

fn greeting_log(meter: &mut GasMeter, ctx: &CallContext, greeting: &str) -> Result<RawLog, Revert> {
    let data = abi::text_event_data(greeting, ctx.timestamp);
    meter.charge(2 * gas::GAS_PER_ENV_READ + gas::log_gas(EVENT_TOPICS, data.len()))?;
    Ok(RawLog {
        event: "GreetingEvent".to_string(),
        args: json!({
            "from": ctx.caller,
            "greeting": greeting,
            "timestamp": ctx.timestamp,
        }),
    })
}

fn store_counter(
    meter: &mut GasMeter,
    storage: &mut ContractStorage,
    value: u64,
    dirty: bool,
) -> Result<(), Revert> {
    let cost = if dirty {
        gas::GAS_PER_WARM_STORAGE_ACCESS
    } else if storage.counter == 0 && value != 0 {
        gas::GAS_PER_ZERO_TO_NONZERO_STORAGE_SET
    } else {
        gas::GAS_PER_NONZERO_STORAGE_SET
    };
    meter.charge(cost)?;
    storage.counter = value;
    Ok(())
}

/// Straightforward implementation: every greeting loads, checks and stores the counter.
pub struct BaselineGreeter;

impl BaselineGreeter {
    const DISPATCH_GAS: u64 = 220;
    const CHECKED_ADD_GAS: u64 = 60;
    const LOOP_STEP_GAS: u64 = 90;
}

impl Greeter for BaselineGreeter {
    fn code_size(&self) -> usize {
        1_184
    }

    fn emit_message(
        &self,
        _storage: &mut ContractStorage,
        meter: &mut GasMeter,
        ctx: &CallContext,
        message: &str,
    ) -> Result<Vec<RawLog>, Revert> {
        meter.charge(Self::DISPATCH_GAS + gas::memory_copy_gas(message.len()))?;
        Ok(vec![hello_log(meter, ctx, message)?])
    }

    fn emit_greeting(
        &self,
        storage: &mut ContractStorage,
        meter: &mut GasMeter,
        ctx: &CallContext,
        greeting: &str,
    ) -> Result<Vec<RawLog>, Revert> {
        meter.charge(Self::DISPATCH_GAS + gas::memory_copy_gas(greeting.len()))?;
        meter.charge(gas::GAS_PER_COLD_STORAGE_ACCESS + Self::CHECKED_ADD_GAS)?;
        let next = storage.counter.checked_add(1).ok_or(Revert::Overflow)?;
        store_counter(meter, storage, next, false)?;
        Ok(vec![greeting_log(meter, ctx, greeting)?])
    }

    fn batch_emit(
        &self,
        storage: &mut ContractStorage,
        meter: &mut GasMeter,
        ctx: &CallContext,
        payloads: &[String],
        greeting: bool,
    ) -> Result<Vec<RawLog>, Revert> {
        meter.charge(Self::DISPATCH_GAS)?;
        let mut logs = Vec::with_capacity(payloads.len());
        for (i, payload) in payloads.iter().enumerate() {
            meter.charge(Self::LOOP_STEP_GAS + gas::memory_copy_gas(payload.len()))?;
            if greeting {
                let access = if i == 0 {
                    gas::GAS_PER_COLD_STORAGE_ACCESS
                } else {
                    gas::GAS_PER_WARM_STORAGE_ACCESS
                };
                meter.charge(access + Self::CHECKED_ADD_GAS)?;
                let next = storage.counter.checked_add(1).ok_or(Revert::Overflow)?;
                store_counter(meter, storage, next, i > 0)?;
                logs.push(greeting_log(meter, ctx, payload)?);
            } else {
                logs.push(hello_log(meter, ctx, payload)?);
            }
        }
        Ok(logs)
    }
}

/// Gas-tuned implementation: bounded payloads, unchecked increments, one
/// aggregate event and one store per batch.
pub struct OptimizedGreeter;

impl OptimizedGreeter {
    const DISPATCH_GAS: u64 = 150;
    const LENGTH_CHECK_GAS: u64 = 40;
    const UNCHECKED_ADD_GAS: u64 = 20;
    const LOOP_STEP_GAS: u64 = 45;

    fn check_len(meter: &mut GasMeter, payload: &str) -> Result<(), Revert> {
        meter.charge(Self::LENGTH_CHECK_GAS)?;
        if payload.len() > MAX_PAYLOAD_LEN {
            return Err(Revert::Require("payload too long"));
        }
        Ok(())
    }
}

impl Greeter for OptimizedGreeter {
    fn code_size(&self) -> usize {
        1_036
    }

    fn emit_message(
        &self,
        _storage: &mut ContractStorage,
        meter: &mut GasMeter,
        ctx: &CallContext,
        message: &str,
    ) -> Result<Vec<RawLog>, Revert> {
        meter.charge(Self::DISPATCH_GAS)?;
        Self::check_len(meter, message)?;
        meter.charge(gas::memory_copy_gas(message.len()))?;
        Ok(vec![hello_log(meter, ctx, message)?])
    }

    fn emit_greeting(
        &self,
        storage: &mut ContractStorage,
        meter: &mut GasMeter,
        ctx: &CallContext,
        greeting: &str,
    ) -> Result<Vec<RawLog>, Revert> {
        meter.charge(Self::DISPATCH_GAS)?;
        Self::check_len(meter, greeting)?;
        meter.charge(gas::memory_copy_gas(greeting.len()))?;
        meter.charge(gas::GAS_PER_COLD_STORAGE_ACCESS + Self::UNCHECKED_ADD_GAS)?;
        // Overflow is out of reach in practice; the wrap mirrors an unchecked block.
        let next = storage.counter.wrapping_add(1);
        store_counter(meter, storage, next, false)?;
        Ok(vec![greeting_log(meter, ctx, greeting)?])
    }

    fn batch_emit(
        &self,
        storage: &mut ContractStorage,
        meter: &mut GasMeter,
        ctx: &CallContext,
        payloads: &[String],
        greeting: bool,
    ) -> Result<Vec<RawLog>, Revert> {
        meter.charge(Self::DISPATCH_GAS + Self::LENGTH_CHECK_GAS)?;
        if payloads.is_empty() {
            return Err(Revert::Require("empty batch"));
        }
        if payloads.len() > MAX_BATCH_LEN {
            return Err(Revert::Require("batch too large"));
        }
        for payload in payloads {
            meter.charge(Self::LOOP_STEP_GAS)?;
            Self::check_len(meter, payload)?;
            meter.charge(gas::memory_copy_gas(payload.len()))?;
        }

        if greeting {
            meter.charge(gas::GAS_PER_COLD_STORAGE_ACCESS + Self::UNCHECKED_ADD_GAS)?;
            let next = storage.counter.wrapping_add(payloads.len() as u64);
            store_counter(meter, storage, next, false)?;
        }

        let data = abi::batch_event_data(payloads, greeting, ctx.timestamp);
        meter.charge(2 * gas::GAS_PER_ENV_READ + gas::log_gas(EVENT_TOPICS, data.len()))?;
        Ok(vec![RawLog {
            event: "BatchMessagesEvent".to_string(),
            args: json!({
                "sender": ctx.caller,
                "messages": payloads,
                "isGreeting": greeting,
                "timestamp": ctx.timestamp,
            }),
        }])
    }
}
