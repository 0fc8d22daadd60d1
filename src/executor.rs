//! Runs one operation against one deployed instance and turns the receipt into a
//! [`CostSample`] plus decoded records.

use crate::error::HarnessError;
use crate::ledger::{CallArgs, Deployment, Ledger, RawLog, COUNTER_FIELD};
use crate::model::{CostSample, EmittedRecord, Identity, InputDescriptor, Operation, RecordKind};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

#[derive(Deserialize)]
struct HelloEvent {
    sender: Identity,
    message: String,
    timestamp: u64,
}

#[derive(Deserialize)]
struct GreetingEvent {
    from: Identity,
    greeting: String,
    timestamp: u64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatchMessagesEvent {
    sender: Identity,
    messages: Vec<String>,
    is_greeting: bool,
    timestamp: u64,
}

fn decode_args<T: DeserializeOwned>(log: &RawLog) -> Result<T, HarnessError> {
    serde_json::from_value(log.args.clone()).map_err(|e| HarnessError::MalformedLog {
        event: log.event.clone(),
        reason: e.to_string(),
    })
}

/// Decode ledger logs into records, expanding aggregate batch events to one record per payload.
pub fn decode_logs(logs: &[RawLog]) -> Result<Vec<EmittedRecord>, HarnessError> {
    let mut records = Vec::with_capacity(logs.len());
    for log in logs {
        match log.event.as_str() {
            "HelloEvent" => {
                let ev: HelloEvent = decode_args(log)?;
                records.push(EmittedRecord {
                    kind: RecordKind::Hello,
                    actor: ev.sender,
                    payload: ev.message,
                    timestamp: ev.timestamp,
                });
            }
            "GreetingEvent" => {
                let ev: GreetingEvent = decode_args(log)?;
                records.push(EmittedRecord {
                    kind: RecordKind::Greeting,
                    actor: ev.from,
                    payload: ev.greeting,
                    timestamp: ev.timestamp,
                });
            }
            "BatchMessagesEvent" => {
                let ev: BatchMessagesEvent = decode_args(log)?;
                let kind = if ev.is_greeting {
                    RecordKind::Greeting
                } else {
                    RecordKind::Hello
                };
                records.extend(ev.messages.into_iter().map(|payload| EmittedRecord {
                    kind,
                    actor: ev.sender,
                    payload,
                    timestamp: ev.timestamp,
                }));
            }
            other => {
                return Err(HarnessError::MalformedLog {
                    event: other.to_string(),
                    reason: "unknown event".to_string(),
                })
            }
        }
    }
    Ok(records)
}

/// Each record must carry the operation's kind, the submitted payload at its position
/// and the caller as actor. Anything else came from some other call.
fn check_records(
    function: &str,
    operation: &Operation,
    caller: Identity,
    records: &[EmittedRecord],
) -> Result<(), HarnessError> {
    if records.len() != operation.expected_records() {
        return Err(HarnessError::UnexpectedRecords {
            function: function.to_string(),
            expected: operation.expected_records(),
            observed: records.len(),
        });
    }
    let kind = operation.expected_record_kind();
    for (index, (record, sent)) in records.iter().zip(operation.payloads()).enumerate() {
        let mismatch = |reason: String| HarnessError::RecordMismatch {
            function: function.to_string(),
            index,
            reason,
        };
        if record.kind != kind {
            return Err(mismatch(format!("kind {:?}, expected {:?}", record.kind, kind)));
        }
        if record.payload != sent {
            return Err(mismatch(format!("payload {:?}, sent {:?}", record.payload, sent)));
        }
        if record.actor != caller {
            return Err(mismatch(format!("actor {}, caller {}", record.actor, caller)));
        }
    }
    Ok(())
}

/// Everything observed about one successful invocation.
#[derive(Clone, Debug)]
pub struct Execution {
    pub sample: CostSample,
    pub records: Vec<EmittedRecord>,
    pub counter_before: u64,
    pub counter_after: u64,
    /// Why `sample.estimated_gas` is missing, if it is.
    pub estimate_error: Option<HarnessError>,
}

/// Borrows the ledger for the span of one call.
pub struct Executor<'l, L: Ledger> {
    ledger: &'l mut L,
}

impl<'l, L: Ledger> Executor<'l, L> {
    pub fn new(ledger: &'l mut L) -> Self {
        Self { ledger }
    }

    pub fn execute(
        &mut self,
        target: &Deployment,
        operation: &Operation,
        label: &str,
        caller: Identity,
    ) -> Result<Execution, HarnessError> {
        let kind = operation.kind();
        let function = kind.function_name();
        let args = CallArgs::from(operation);

        let counter_before = self.ledger.read_state(target.handle, COUNTER_FIELD)?;

        let (estimated_gas, estimate_error) =
            match self.ledger.estimate_gas(target.handle, function, &args, caller) {
                Ok(gas) => (Some(gas), None),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    let e = match e {
                        e @ HarnessError::EstimationFailed { .. } => e,
                        other => HarnessError::EstimationFailed {
                            function: function.to_string(),
                            reason: other.to_string(),
                        },
                    };
                    warn!(variant = %target.variant, function, error = %e, "estimate unavailable");
                    (None, Some(e))
                }
            };

        let receipt = self.ledger.call(target.handle, function, &args, caller)?;
        let records = decode_logs(&receipt.logs)?;
        check_records(function, operation, caller, &records)?;

        let counter_after = self.ledger.read_state(target.handle, COUNTER_FIELD)?;
        let expected = operation.expected_counter_delta();
        if counter_after.checked_sub(counter_before) != Some(expected) {
            return Err(HarnessError::CounterInvariant {
                before: counter_before,
                after: counter_after,
                expected,
            });
        }

        debug!(
            variant = %target.variant,
            function,
            label,
            gas_used = receipt.gas_used,
            ?estimated_gas,
            "executed"
        );

        Ok(Execution {
            sample: CostSample {
                variant: target.variant,
                operation: kind,
                input: InputDescriptor::new(label, operation.payload_bytes()),
                gas_used: receipt.gas_used,
                estimated_gas,
            },
            records,
            counter_before,
            counter_after,
            estimate_error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{AccountProvider, InstanceHandle, Receipt};
    use crate::sim::{SimConfig, SimulatedLedger};
    use crate::{OperationKind, Variant};
    use serde_json::json;

    fn setup(variant: Variant) -> (SimulatedLedger, Deployment, Identity) {
        let mut ledger = SimulatedLedger::new(SimConfig::default());
        let handle = ledger.deploy(variant).unwrap();
        let caller = ledger.accounts().unwrap()[1];
        (ledger, Deployment { handle, variant }, caller)
    }

    #[test]
    fn greetings_add_one_each_regardless_of_caller() {
        let (mut ledger, target, _) = setup(Variant::Baseline);
        let accounts = ledger.accounts().unwrap();
        let mut exec = Executor::new(&mut ledger);
        for (i, caller) in accounts.iter().take(4).enumerate() {
            let out = exec
                .execute(&target, &Operation::EmitGreeting(format!("g{i}")), "g", *caller)
                .unwrap();
            assert_eq!(out.counter_after, out.counter_before + 1);
            assert_eq!(out.records[0].actor, *caller);
        }
        assert_eq!(ledger.read_state(target.handle, COUNTER_FIELD).unwrap(), 4);
    }

    #[test]
    fn messages_never_move_the_counter() {
        for variant in Variant::ALL {
            let (mut ledger, target, caller) = setup(variant);
            let mut exec = Executor::new(&mut ledger);
            let long = "这是一个很长的消息，用来测试合约是否能正确处理长字符串。".repeat(2);
            for payload in ["", "Hello", long.as_str()] {
                let out = exec
                    .execute(&target, &Operation::EmitMessage(payload.into()), "m", caller)
                    .unwrap();
                assert_eq!(out.counter_before, out.counter_after);
                assert_eq!(out.records[0].payload.as_bytes(), payload.as_bytes());
                assert_eq!(out.records[0].kind, RecordKind::Hello);
            }
        }
    }

    #[test]
    fn sample_carries_estimate_and_payload_size() {
        let (mut ledger, target, caller) = setup(Variant::Optimized);
        let out = Executor::new(&mut ledger)
            .execute(&target, &Operation::EmitMessage("Hello".into()), "short", caller)
            .unwrap();
        assert_eq!(out.sample.operation, OperationKind::EmitMessage);
        assert_eq!(out.sample.variant, Variant::Optimized);
        assert_eq!(out.sample.input, InputDescriptor::new("short", 5));
        assert_eq!(out.sample.estimated_gas, Some(out.sample.gas_used));
        assert!(out.estimate_error.is_none());
    }

    #[test]
    fn failed_estimate_is_not_fatal() {
        let (mut ledger, target, caller) = setup(Variant::Baseline);
        ledger.set_estimates_enabled(false);
        let out = Executor::new(&mut ledger)
            .execute(&target, &Operation::EmitGreeting("Hi".into()), "short", caller)
            .unwrap();
        assert_eq!(out.sample.estimated_gas, None);
        assert!(matches!(
            out.estimate_error,
            Some(HarnessError::EstimationFailed { .. })
        ));
    }

    #[test]
    fn revert_produces_no_sample() {
        let (mut ledger, target, caller) = setup(Variant::Optimized);
        let too_long = "x".repeat(crate::sim::contract::MAX_PAYLOAD_LEN + 1);
        let err = Executor::new(&mut ledger)
            .execute(&target, &Operation::EmitMessage(too_long), "long", caller)
            .unwrap_err();
        assert!(matches!(err, HarnessError::CallReverted { .. }));
    }

    #[test]
    fn batch_layouts_decode_to_one_record_per_payload() {
        let payloads: Vec<String> = (1..=5).map(|i| format!("消息{i}")).collect();
        for variant in Variant::ALL {
            let (mut ledger, target, caller) = setup(variant);
            let op = Operation::BatchEmit {
                payloads: payloads.clone(),
                greeting: true,
            };
            let out = Executor::new(&mut ledger)
                .execute(&target, &op, "batch", caller)
                .unwrap();
            assert_eq!(out.counter_after - out.counter_before, 5);
            let got: Vec<&str> = out.records.iter().map(|r| r.payload.as_str()).collect();
            assert_eq!(got, payloads.iter().map(String::as_str).collect::<Vec<_>>());
            assert!(out.records.iter().all(|r| r.kind == RecordKind::Greeting));
        }
    }

    #[test]
    fn sender_and_from_are_not_interchangeable() {
        let caller = Identity([1; 20]);
        let wrong = RawLog {
            event: "GreetingEvent".into(),
            args: json!({"sender": caller, "greeting": "hi", "timestamp": 1}),
        };
        assert!(matches!(
            decode_logs(&[wrong]),
            Err(HarnessError::MalformedLog { .. })
        ));

        let right = RawLog {
            event: "GreetingEvent".into(),
            args: json!({"from": caller, "greeting": "hi", "timestamp": 1}),
        };
        let records = decode_logs(&[right]).unwrap();
        assert_eq!(records[0].actor, caller);
    }

    #[test]
    fn unknown_event_is_rejected() {
        let log = RawLog {
            event: "Transfer".into(),
            args: json!({}),
        };
        assert!(decode_logs(&[log]).is_err());
    }

    /// Ledger whose contract forgets to bump the counter.
    struct BrokenCounter;

    impl Ledger for BrokenCounter {
        fn deploy(&mut self, _: Variant) -> Result<InstanceHandle, HarnessError> {
            Ok(InstanceHandle(0))
        }

        fn call(
            &mut self,
            _: InstanceHandle,
            _: &str,
            args: &CallArgs,
            caller: Identity,
        ) -> Result<Receipt, HarnessError> {
            let greeting = match args {
                CallArgs::Text(t) => t.clone(),
                CallArgs::Empty | CallArgs::Batch { .. } => String::new(),
            };
            Ok(Receipt {
                gas_used: 30_000,
                logs: vec![RawLog {
                    event: "GreetingEvent".into(),
                    args: json!({"from": caller, "greeting": greeting, "timestamp": 5}),
                }],
            })
        }

        fn estimate_gas(
            &self,
            _: InstanceHandle,
            _: &str,
            _: &CallArgs,
            _: Identity,
        ) -> Result<u64, HarnessError> {
            Ok(30_000)
        }

        fn read_state(&self, _: InstanceHandle, _: &str) -> Result<u64, HarnessError> {
            Ok(0)
        }

        fn deployment_gas(&self, _: InstanceHandle) -> Result<u64, HarnessError> {
            Ok(300_000)
        }
    }

    #[test]
    fn counter_invariant_is_checked_after_the_call() {
        let mut ledger = BrokenCounter;
        let target = Deployment {
            handle: InstanceHandle(0),
            variant: Variant::Baseline,
        };
        let err = Executor::new(&mut ledger)
            .execute(&target, &Operation::EmitGreeting("x".into()), "x", Identity([0; 20]))
            .unwrap_err();
        assert_eq!(
            err,
            HarnessError::CounterInvariant {
                before: 0,
                after: 0,
                expected: 1
            }
        );
    }

    /// Ledger that answers every call with a fixed receipt and a fixed counter.
    struct CannedReceipt {
        logs: Vec<RawLog>,
    }

    impl Ledger for CannedReceipt {
        fn deploy(&mut self, _: Variant) -> Result<InstanceHandle, HarnessError> {
            Ok(InstanceHandle(0))
        }

        fn call(
            &mut self,
            _: InstanceHandle,
            _: &str,
            _: &CallArgs,
            _: Identity,
        ) -> Result<Receipt, HarnessError> {
            Ok(Receipt {
                gas_used: 25_000,
                logs: self.logs.clone(),
            })
        }

        fn estimate_gas(
            &self,
            _: InstanceHandle,
            _: &str,
            _: &CallArgs,
            _: Identity,
        ) -> Result<u64, HarnessError> {
            Ok(25_000)
        }

        fn read_state(&self, _: InstanceHandle, _: &str) -> Result<u64, HarnessError> {
            Ok(0)
        }

        fn deployment_gas(&self, _: InstanceHandle) -> Result<u64, HarnessError> {
            Ok(300_000)
        }
    }

    fn canned(logs: Vec<RawLog>, op: &Operation, caller: Identity) -> Result<Execution, HarnessError> {
        let target = Deployment {
            handle: InstanceHandle(0),
            variant: Variant::Baseline,
        };
        Executor::new(&mut CannedReceipt { logs }).execute(&target, op, "x", caller)
    }

    #[test]
    fn records_of_another_call_are_rejected() {
        let caller = Identity([1; 20]);
        let hello = Operation::EmitMessage("Hello".into());

        let wrong_kind = RawLog {
            event: "GreetingEvent".into(),
            args: json!({"from": caller, "greeting": "Hello", "timestamp": 5}),
        };
        let wrong_payload = RawLog {
            event: "HelloEvent".into(),
            args: json!({"sender": caller, "message": "not what was sent", "timestamp": 5}),
        };
        let wrong_actor = RawLog {
            event: "HelloEvent".into(),
            args: json!({"sender": Identity([2; 20]), "message": "Hello", "timestamp": 5}),
        };
        for log in [wrong_kind, wrong_payload, wrong_actor] {
            let err = canned(vec![log], &hello, caller).unwrap_err();
            assert!(matches!(err, HarnessError::RecordMismatch { index: 0, .. }), "{err}");
        }

        let right = RawLog {
            event: "HelloEvent".into(),
            args: json!({"sender": caller, "message": "Hello", "timestamp": 5}),
        };
        assert!(canned(vec![right], &hello, caller).is_ok());
    }

    #[test]
    fn batch_records_must_keep_submission_order() {
        let caller = Identity([1; 20]);
        let op = Operation::BatchEmit {
            payloads: vec!["a".into(), "b".into()],
            greeting: false,
        };
        let swapped = RawLog {
            event: "BatchMessagesEvent".into(),
            args: json!({"sender": caller, "messages": ["b", "a"], "isGreeting": false, "timestamp": 5}),
        };
        assert!(matches!(
            canned(vec![swapped], &op, caller),
            Err(HarnessError::RecordMismatch { index: 0, .. })
        ));

        let flagged = RawLog {
            event: "BatchMessagesEvent".into(),
            args: json!({"sender": caller, "messages": ["a", "b"], "isGreeting": true, "timestamp": 5}),
        };
        assert!(matches!(
            canned(vec![flagged], &op, caller),
            Err(HarnessError::RecordMismatch { .. })
        ));
    }

    #[test]
    fn longest_accepted_payload_round_trips() {
        let exact: String = "数据".repeat(crate::sim::contract::MAX_PAYLOAD_LEN / 6)
            + &"x".repeat(crate::sim::contract::MAX_PAYLOAD_LEN % 6);
        assert_eq!(exact.len(), crate::sim::contract::MAX_PAYLOAD_LEN);
        for variant in Variant::ALL {
            let (mut ledger, target, caller) = setup(variant);
            for op in [
                Operation::EmitMessage(exact.clone()),
                Operation::EmitGreeting(exact.clone()),
            ] {
                let out = Executor::new(&mut ledger)
                    .execute(&target, &op, "max", caller)
                    .unwrap();
                assert_eq!(out.records[0].payload.as_bytes(), exact.as_bytes());
                assert_eq!(out.sample.input.byte_len, crate::sim::contract::MAX_PAYLOAD_LEN);
            }
        }
    }

    #[test]
    fn records_are_stamped_no_earlier_than_their_block() {
        let (mut ledger, target, caller) = setup(Variant::Baseline);
        let deployed_at = ledger.block_timestamp();
        let ops = [
            Operation::EmitMessage("Hello".into()),
            Operation::EmitGreeting("Hi".into()),
            Operation::BatchEmit {
                payloads: vec!["a".into(), "b".into()],
                greeting: true,
            },
        ];
        let mut last = deployed_at;
        for op in &ops {
            let out = Executor::new(&mut ledger)
                .execute(&target, op, "t", caller)
                .unwrap();
            let mined = ledger.block_timestamp();
            assert!(mined > last);
            for r in &out.records {
                assert!(r.timestamp >= mined, "{} < {}", r.timestamp, mined);
                assert!(r.timestamp > deployed_at);
            }
            last = mined;
        }
    }
}
