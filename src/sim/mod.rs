//! In-process ledger: deterministic accounts, a block clock and the greeter contracts.

pub mod abi;
pub mod contract;
pub mod gas;

use crate::error::HarnessError;
use crate::ledger::{
    AccountProvider, CallArgs, InstanceHandle, Ledger, Receipt, COUNTER_FIELD, COUNTER_VIEW,
};
use crate::model::Identity;
use crate::Variant;
use contract::{greeter_for, CallContext, ContractStorage, Greeter};
use gas::GasMeter;
use rand::RngCore;
use rand_chacha::rand_core::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::debug;

#[derive(Clone, Debug)]
pub struct SimConfig {
    pub seed: u64,
    pub accounts: usize,
    pub genesis_timestamp: u64,
    pub block_time: u64,
    pub block_gas_limit: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            accounts: 10,
            genesis_timestamp: 1_700_000_000,
            block_time: 1,
            block_gas_limit: gas::DEFAULT_BLOCK_GAS_LIMIT,
        }
    }
}

struct Instance {
    contract: Box<dyn Greeter>,
    storage: ContractStorage,
    deploy_gas: u64,
}

/// Ledger that mines every call into its own block.
pub struct SimulatedLedger {
    cfg: SimConfig,
    accounts: Vec<Identity>,
    instances: Vec<Instance>,
    timestamp: u64,
    connected: bool,
    /// Remaining ledger requests before the connection drops.
    drop_after: Option<usize>,
    estimates_enabled: bool,
}

impl SimulatedLedger {
    pub fn new(cfg: SimConfig) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(cfg.seed);
        let accounts = (0..cfg.accounts)
            .map(|_| {
                let mut addr = [0u8; 20];
                rng.fill_bytes(&mut addr);
                Identity(addr)
            })
            .collect();
        let timestamp = cfg.genesis_timestamp;
        Self {
            cfg,
            accounts,
            instances: Vec::new(),
            timestamp,
            connected: true,
            drop_after: None,
            estimates_enabled: true,
        }
    }

    /// Timestamp of the most recently mined block.
    pub fn block_timestamp(&self) -> u64 {
        self.timestamp
    }

    /// Let `requests` more state-changing or deploy requests through, then drop the connection.
    pub fn disconnect_after(&mut self, requests: usize) {
        self.drop_after = Some(requests);
    }

    /// Make every dry run fail, as a node without `eth_estimateGas` would.
    pub fn set_estimates_enabled(&mut self, enabled: bool) {
        self.estimates_enabled = enabled;
    }

    fn check_connected(&self) -> Result<(), HarnessError> {
        if self.connected {
            Ok(())
        } else {
            Err(HarnessError::LedgerConnectionLost(
                "simulated ledger disconnected".to_string(),
            ))
        }
    }

    fn consume_request(&mut self) -> Result<(), HarnessError> {
        if let Some(left) = self.drop_after.as_mut() {
            if *left == 0 {
                self.connected = false;
            } else {
                *left -= 1;
            }
        }
        self.check_connected()
    }

    fn instance(&self, handle: InstanceHandle) -> Result<&Instance, HarnessError> {
        self.instances
            .get(handle.0 as usize)
            .ok_or(HarnessError::UnknownInstance(handle.0))
    }

    /// Run `function` against a copy of the instance storage. Nothing is committed.
    fn execute(
        &self,
        handle: InstanceHandle,
        function: &str,
        args: &CallArgs,
        caller: Identity,
        timestamp: u64,
    ) -> Result<(ContractStorage, Receipt), HarnessError> {
        let instance = self.instance(handle)?;
        let greeter = instance.contract.as_ref();
        let reverted = |reason: String| HarnessError::CallReverted {
            function: function.to_string(),
            reason,
        };

        let selector = greeter
            .selector(function)
            .ok_or_else(|| reverted("unknown function".to_string()))?;
        let calldata = abi::encode_call(selector, args);

        let mut meter = GasMeter::new(self.cfg.block_gas_limit);
        meter
            .charge(gas::TX_BASE_GAS + gas::calldata_gas(&calldata))
            .map_err(|e| reverted(contract::Revert::from(e).to_string()))?;

        let mut storage = instance.storage.clone();
        let ctx = CallContext { caller, timestamp };
        let logs = match (function, args) {
            ("sayHello", CallArgs::Text(msg)) => {
                greeter.emit_message(&mut storage, &mut meter, &ctx, msg)
            }
            ("sendGreeting", CallArgs::Text(msg)) => {
                greeter.emit_greeting(&mut storage, &mut meter, &ctx, msg)
            }
            ("sendBatchMessages", CallArgs::Batch { payloads, greeting }) => {
                greeter.batch_emit(&mut storage, &mut meter, &ctx, payloads, *greeting)
            }
            (COUNTER_VIEW, CallArgs::Empty) => {
                greeter.view_counter(&storage, &mut meter).map(|_| Vec::new())
            }
            _ => return Err(reverted("argument mismatch".to_string())),
        }
        .map_err(|r| reverted(r.to_string()))?;

        Ok((
            storage,
            Receipt {
                gas_used: meter.used(),
                logs,
            },
        ))
    }
}

impl Ledger for SimulatedLedger {
    fn deploy(&mut self, variant: Variant) -> Result<InstanceHandle, HarnessError> {
        self.consume_request()?;
        let handle = InstanceHandle(self.instances.len() as u32);
        let contract = greeter_for(variant);
        let deploy_gas = gas::create_gas(contract.code_size());
        self.instances.push(Instance {
            contract,
            storage: ContractStorage::default(),
            deploy_gas,
        });
        self.timestamp += self.cfg.block_time;
        debug!(instance = handle.0, %variant, deploy_gas, "deployed greeter");
        Ok(handle)
    }

    fn call(
        &mut self,
        instance: InstanceHandle,
        function: &str,
        args: &CallArgs,
        caller: Identity,
    ) -> Result<Receipt, HarnessError> {
        self.consume_request()?;
        let timestamp = self.timestamp + self.cfg.block_time;
        // Reverted transactions are still mined.
        self.timestamp = timestamp;
        let (storage, receipt) = self.execute(instance, function, args, caller, timestamp)?;
        self.instances[instance.0 as usize].storage = storage;
        debug!(
            instance = instance.0,
            function,
            gas_used = receipt.gas_used,
            "mined call"
        );
        Ok(receipt)
    }

    fn estimate_gas(
        &self,
        instance: InstanceHandle,
        function: &str,
        args: &CallArgs,
        caller: Identity,
    ) -> Result<u64, HarnessError> {
        self.check_connected()?;
        if !self.estimates_enabled {
            return Err(HarnessError::EstimationFailed {
                function: function.to_string(),
                reason: "estimation disabled".to_string(),
            });
        }
        let pending = self.timestamp + self.cfg.block_time;
        let (_, receipt) = self.execute(instance, function, args, caller, pending)?;
        Ok(receipt.gas_used)
    }

    fn read_state(&self, instance: InstanceHandle, field: &str) -> Result<u64, HarnessError> {
        self.check_connected()?;
        let instance = self.instance(instance)?;
        match field {
            COUNTER_FIELD => Ok(instance.contract.read_counter(&instance.storage)),
            other => Err(HarnessError::UnknownStateField(other.to_string())),
        }
    }

    fn deployment_gas(&self, instance: InstanceHandle) -> Result<u64, HarnessError> {
        self.check_connected()?;
        Ok(self.instance(instance)?.deploy_gas)
    }
}

impl AccountProvider for SimulatedLedger {
    fn accounts(&self) -> Result<Vec<Identity>, HarnessError> {
        self.check_connected()?;
        Ok(self.accounts.clone())
    }
}
