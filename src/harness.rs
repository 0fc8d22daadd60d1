use crate::batch::{aggregate_individual, compare_to_batch};
use crate::compare::{compare, ComparisonResult};
use crate::config::{BatchPlan, HarnessConfig, NamedInput};
use crate::error::HarnessError;
use crate::executor::{Execution, Executor};
use crate::ledger::{AccountProvider, CallArgs, Deployment, Ledger, COUNTER_VIEW};
use crate::model::{EmittedRecord, Identity, Operation};
use crate::recorder::CostRecorder;
use crate::scenario::{
    compare_scenario, project, scale_gas, GasSource, PairedScenarioSpec, PriceAssumptions,
    ScenarioBasis, ScenarioComparison, ScenarioEstimate, ScenarioSpec,
};
use crate::{OperationKind, Variant};
use rand::distributions::Alphanumeric;
use rand::Rng;
use rand_chacha::rand_core::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Clone, Copy, Debug)]
pub enum Profile {
    Quick,
    Full,
}

impl Profile {
    pub fn as_str(&self) -> &'static str {
        match self {
            Profile::Quick => "quick",
            Profile::Full => "full",
        }
    }
}

#[derive(Clone, Debug)]
pub struct BenchConfig {
    pub profile: Profile,
    pub seed: u64,
}

impl BenchConfig {
    pub fn rng(&self) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(self.seed)
    }

    /// Payload lengths (bytes) of the seeded size sweep.
    pub fn sweep_lengths(&self) -> &'static [usize] {
        match self.profile {
            Profile::Quick => &[],
            Profile::Full => &[32, 64, 128, 256],
        }
    }

    /// Configured inputs followed by the profile's random ASCII sweep.
    pub fn inputs(&self, configured: &[NamedInput]) -> Vec<NamedInput> {
        let mut rng = self.rng();
        let mut out = configured.to_vec();
        for &len in self.sweep_lengths() {
            let payload: String = (&mut rng)
                .sample_iter(&Alphanumeric)
                .take(len)
                .map(char::from)
                .collect();
            out.push(NamedInput::new(format!("sweep-{len}"), payload));
        }
        out
    }
}

/// A measurement that is missing from the report, and why.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StepFailure {
    pub step: String,
    pub kind: String,
    pub message: String,
}

/// Creation cost of one variant, plus `getCounter` priced as if sent as a transaction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeploymentCost {
    pub variant: Variant,
    pub deploy_gas: u64,
    /// View calls cost nothing when read locally; `None` if the estimate failed.
    pub counter_view_estimate: Option<u64>,
}

#[derive(Clone, Debug, Default)]
pub struct SuiteOutcome {
    pub deployments: Vec<DeploymentCost>,
    pub comparisons: Vec<ComparisonResult>,
    pub batch_comparisons: Vec<ComparisonResult>,
    pub scenarios: Vec<ScenarioEstimate>,
    pub scenario_comparisons: Vec<ScenarioComparison>,
}

/// Owns the ledger and both deployments; submits one call at a time.
pub struct Harness<L> {
    ledger: L,
    baseline: Deployment,
    optimized: Deployment,
    caller: Identity,
    recorder: CostRecorder,
    records: Vec<EmittedRecord>,
    failures: Vec<StepFailure>,
    aborted: bool,
}

impl<L: Ledger + AccountProvider> Harness<L> {
    /// Deploy both variants and pick the caller account.
    pub fn new(mut ledger: L, caller_index: usize) -> Result<Self, HarnessError> {
        let accounts = ledger.accounts()?;
        let caller = *accounts
            .get(caller_index)
            .ok_or(HarnessError::MissingIdentity(caller_index))?;

        let baseline = Deployment {
            handle: ledger.deploy(Variant::Baseline)?,
            variant: Variant::Baseline,
        };
        let optimized = Deployment {
            handle: ledger.deploy(Variant::Optimized)?,
            variant: Variant::Optimized,
        };
        info!(
            %caller,
            baseline = baseline.handle.0,
            optimized = optimized.handle.0,
            "deployed both variants"
        );

        Ok(Self {
            ledger,
            baseline,
            optimized,
            caller,
            recorder: CostRecorder::new(),
            records: Vec::new(),
            failures: Vec::new(),
            aborted: false,
        })
    }
}

impl<L: Ledger> Harness<L> {
    pub fn deployment(&self, variant: Variant) -> Deployment {
        match variant {
            Variant::Baseline => self.baseline,
            Variant::Optimized => self.optimized,
        }
    }

    pub fn recorder(&self) -> &CostRecorder {
        &self.recorder
    }

    pub fn records(&self) -> &[EmittedRecord] {
        &self.records
    }

    pub fn failures(&self) -> &[StepFailure] {
        &self.failures
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// False once a fatal error was noted; the report must not claim completeness then.
    pub fn is_complete(&self) -> bool {
        !self.aborted
    }

    fn note(&mut self, step: &str, err: &HarnessError) {
        warn!(step, kind = err.kind(), error = %err, "step failed");
        if err.is_fatal() {
            self.aborted = true;
        }
        self.failures.push(StepFailure {
            step: step.to_string(),
            kind: err.kind().to_string(),
            message: err.to_string(),
        });
    }

    /// Note a non-fatal failure and carry on; fatal ones propagate.
    fn attempt<T>(&mut self, step: &str, res: Result<T, HarnessError>) -> Result<Option<T>, HarnessError> {
        match res {
            Ok(v) => Ok(Some(v)),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                self.note(step, &e);
                Ok(None)
            }
        }
    }

    /// Unwrap a top-level step, noting the error (fatal or not) and falling back to the default.
    pub fn finish<T: Default>(&mut self, step: &str, res: Result<T, HarnessError>) -> T {
        match res {
            Ok(v) => v,
            Err(e) => {
                self.note(step, &e);
                T::default()
            }
        }
    }

    /// Execute one operation and record its sample and records.
    pub fn execute(
        &mut self,
        variant: Variant,
        operation: &Operation,
        label: &str,
    ) -> Result<Execution, HarnessError> {
        let target = self.deployment(variant);
        let execution = Executor::new(&mut self.ledger).execute(&target, operation, label, self.caller)?;
        if let Some(e) = &execution.estimate_error {
            let step = format!("{variant} {} {label}", operation.kind());
            self.note(&step, e);
        }
        self.recorder.record(execution.sample.clone());
        self.records.extend(execution.records.iter().cloned());
        Ok(execution)
    }

    /// Deployment gas of `variant` and the estimate of a `getCounter` call on it.
    pub fn inspect_deployment(&mut self, variant: Variant) -> Result<DeploymentCost, HarnessError> {
        let target = self.deployment(variant);
        let deploy_gas = self.ledger.deployment_gas(target.handle)?;
        let res = self
            .ledger
            .estimate_gas(target.handle, COUNTER_VIEW, &CallArgs::Empty, self.caller);
        let counter_view_estimate = self.attempt(&format!("{variant} {COUNTER_VIEW}"), res)?;
        info!(%variant, deploy_gas, ?counter_view_estimate, "inspected deployment");
        Ok(DeploymentCost {
            variant,
            deploy_gas,
            counter_view_estimate,
        })
    }

    /// Run every input on both variants and compare. Batch kind sends one-payload batches.
    pub fn run_comparison(
        &mut self,
        kind: OperationKind,
        inputs: &[NamedInput],
    ) -> Result<Vec<ComparisonResult>, HarnessError> {
        let mut out = Vec::with_capacity(inputs.len());
        for input in inputs {
            let operation = operation_for(kind, &input.payload);
            let step = format!("{kind} {}", input.label);

            let res = self.execute(Variant::Baseline, &operation, &input.label);
            let baseline = self.attempt(&format!("baseline {step}"), res)?;
            let res = self.execute(Variant::Optimized, &operation, &input.label);
            let optimized = self.attempt(&format!("optimized {step}"), res)?;

            if let (Some(b), Some(o)) = (baseline, optimized) {
                let res = compare(&b.sample, &o.sample);
                if let Some(result) = self.attempt(&format!("compare {step}"), res)? {
                    out.push(result);
                }
            }
        }
        Ok(out)
    }

    /// Individual calls on `plan.individual` against one batched call on `plan.batched`.
    pub fn run_batch_comparison(
        &mut self,
        plan: &BatchPlan,
    ) -> Result<Option<ComparisonResult>, HarnessError> {
        let kind = if plan.greeting {
            OperationKind::EmitGreeting
        } else {
            OperationKind::EmitMessage
        };

        let mut individual = Vec::with_capacity(plan.payloads.len());
        for (i, payload) in plan.payloads.iter().enumerate() {
            let label = format!("{}#{}", plan.label, i + 1);
            let res = self.execute(plan.individual, &operation_for(kind, payload), &label);
            match self.attempt(&format!("{} {kind} {label}", plan.individual), res)? {
                Some(e) => individual.push(e.sample),
                None => return Ok(None),
            }
        }

        let res = aggregate_individual(&individual);
        let Some(total) = self.attempt(&format!("aggregate {}", plan.label), res)? else {
            return Ok(None);
        };

        let operation = Operation::BatchEmit {
            payloads: plan.payloads.clone(),
            greeting: plan.greeting,
        };
        let res = self.execute(plan.batched, &operation, &plan.label);
        let Some(batch) = self.attempt(&format!("{} batch {}", plan.batched, plan.label), res)? else {
            return Ok(None);
        };

        let res = compare_to_batch(total, &batch.sample);
        self.attempt(&format!("compare {}", plan.label), res)
    }

    /// Single-variant pass keeping estimate vs actual and counter movement per input.
    pub fn run_analysis(
        &mut self,
        variant: Variant,
        kind: OperationKind,
        inputs: &[NamedInput],
    ) -> Result<Vec<Execution>, HarnessError> {
        let mut out = Vec::with_capacity(inputs.len());
        for input in inputs {
            let res = self.execute(variant, &operation_for(kind, &input.payload), &input.label);
            if let Some(e) = self.attempt(&format!("{variant} {kind} {}", input.label), res)? {
                out.push(e);
            }
        }
        Ok(out)
    }

    /// Price each scenario. Measured bases read the latest recorded sample.
    pub fn project_scenarios(
        &mut self,
        specs: &[ScenarioSpec],
        prices: &PriceAssumptions,
    ) -> Vec<ScenarioEstimate> {
        let mut out = Vec::with_capacity(specs.len());
        for spec in specs {
            let step = format!("scenario {}", spec.name);
            let res = self
                .scenario_gas(&spec.basis)
                .and_then(|(gas, source)| project(&spec.name, gas, source, prices));
            match res {
                Ok(est) => out.push(est),
                Err(e) => self.note(&step, &e),
            }
        }
        out
    }

    /// Resolve both sides of each paired scenario and compute the savings.
    pub fn compare_scenarios(&mut self, specs: &[PairedScenarioSpec]) -> Vec<ScenarioComparison> {
        let mut out = Vec::with_capacity(specs.len());
        for spec in specs {
            let res = self.scenario_gas(&spec.baseline).and_then(|baseline| {
                let optimized = self.scenario_gas(&spec.optimized)?;
                compare_scenario(&spec.name, baseline, optimized)
            });
            match res {
                Ok(cmp) => out.push(cmp),
                Err(e) => self.note(&format!("paired scenario {}", spec.name), &e),
            }
        }
        out
    }

    fn scenario_gas(&self, basis: &ScenarioBasis) -> Result<(u64, GasSource), HarnessError> {
        match basis {
            ScenarioBasis::Assumed { gas } => Ok((*gas, GasSource::Assumed)),
            ScenarioBasis::Measured {
                variant,
                operation,
                input,
                repeat,
            } => {
                let sample = self
                    .recorder
                    .latest_by_label(*variant, *operation, input)
                    .ok_or_else(|| HarnessError::MissingMeasurement(format!("{variant} {operation} {input}")))?;
                let gas = scale_gas(sample.gas_used, *repeat)?;
                Ok((
                    gas,
                    GasSource::Measured {
                        variant: *variant,
                        operation: *operation,
                        input: input.clone(),
                        per_call_gas: sample.gas_used,
                        repeat: *repeat,
                    },
                ))
            }
        }
    }

    /// Message and greeting comparisons, every batch plan, then scenario pricing.
    /// Stops at the first fatal error; [`Harness::is_complete`] reports it.
    pub fn run_suite(&mut self, cfg: &HarnessConfig, inputs: &[NamedInput]) -> SuiteOutcome {
        let mut outcome = SuiteOutcome::default();
        if let Err(e) = self.run_suite_steps(cfg, inputs, &mut outcome) {
            self.note("suite", &e);
            return outcome;
        }
        outcome.scenarios = self.project_scenarios(&cfg.scenarios, &cfg.prices);
        outcome.scenario_comparisons = self.compare_scenarios(&cfg.paired_scenarios);
        outcome
    }

    fn run_suite_steps(
        &mut self,
        cfg: &HarnessConfig,
        inputs: &[NamedInput],
        outcome: &mut SuiteOutcome,
    ) -> Result<(), HarnessError> {
        for variant in Variant::ALL {
            outcome.deployments.push(self.inspect_deployment(variant)?);
        }
        for kind in [OperationKind::EmitMessage, OperationKind::EmitGreeting] {
            info!(%kind, inputs = inputs.len(), "comparing variants");
            let results = self.run_comparison(kind, inputs)?;
            outcome.comparisons.extend(results);
        }
        for plan in &cfg.batches {
            info!(batch = %plan.label, size = plan.payloads.len(), "comparing batch");
            if let Some(result) = self.run_batch_comparison(plan)? {
                outcome.batch_comparisons.push(result);
            }
        }
        Ok(())
    }
}

fn operation_for(kind: OperationKind, payload: &str) -> Operation {
    Operation::single(kind, payload).unwrap_or_else(|| Operation::BatchEmit {
        payloads: vec![payload.to_string()],
        greeting: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::COUNTER_FIELD;
    use crate::sim::contract::MAX_PAYLOAD_LEN;
    use crate::sim::{SimConfig, SimulatedLedger};

    fn harness() -> Harness<SimulatedLedger> {
        Harness::new(SimulatedLedger::new(SimConfig::default()), 1).unwrap()
    }

    fn counter(h: &Harness<SimulatedLedger>, variant: Variant) -> u64 {
        h.ledger()
            .read_state(h.deployment(variant).handle, COUNTER_FIELD)
            .unwrap()
    }

    #[test]
    fn comparison_covers_every_input() {
        let mut h = harness();
        let inputs = HarnessConfig::default().inputs;
        let results = h.run_comparison(OperationKind::EmitMessage, &inputs).unwrap();
        assert_eq!(results.len(), inputs.len());
        for (r, input) in results.iter().zip(&inputs) {
            assert_eq!(r.input.label, input.label);
            assert_eq!(r.input.byte_len, input.payload.len());
            assert!(r.saved_absolute > 0, "optimized should win on {}", input.label);
        }
        assert_eq!(h.recorder().len(), inputs.len() * 2);
        assert!(h.failures().is_empty());
    }

    #[test]
    fn greeting_comparison_advances_both_counters() {
        let mut h = harness();
        let inputs = HarnessConfig::default().inputs;
        h.run_comparison(OperationKind::EmitGreeting, &inputs).unwrap();
        assert_eq!(counter(&h, Variant::Baseline), inputs.len() as u64);
        assert_eq!(counter(&h, Variant::Optimized), inputs.len() as u64);
    }

    #[test]
    fn reverted_input_is_reported_and_skipped() {
        let mut h = harness();
        let inputs = vec![
            NamedInput::new("ok", "Hello"),
            NamedInput::new("too-long", "x".repeat(MAX_PAYLOAD_LEN + 1)),
            NamedInput::new("after", "World"),
        ];
        let results = h.run_comparison(OperationKind::EmitMessage, &inputs).unwrap();
        let labels: Vec<&str> = results.iter().map(|r| r.input.label.as_str()).collect();
        assert_eq!(labels, vec!["ok", "after"]);
        assert_eq!(h.failures().len(), 1);
        assert_eq!(h.failures()[0].kind, "call_reverted");
        assert!(h.failures()[0].step.contains("too-long"));
        assert!(h.is_complete());
    }

    #[test]
    fn batch_plan_compares_individual_total_with_batch() {
        let mut h = harness();
        let plan = HarnessConfig::default().batches[1].clone();
        let r = h.run_batch_comparison(&plan).unwrap().unwrap();

        let individual: u64 = h
            .recorder()
            .query(Variant::Baseline, OperationKind::EmitGreeting, None)
            .iter()
            .map(|s| s.gas_used)
            .sum();
        assert_eq!(r.baseline_gas, individual);
        assert_eq!(r.operation, OperationKind::BatchEmit);
        assert!(r.saved_percent > 0.0);
        assert_eq!(counter(&h, Variant::Baseline), 5);
        assert_eq!(counter(&h, Variant::Optimized), 5);
    }

    #[test]
    fn empty_batch_plan_fails_only_that_step() {
        let mut h = harness();
        let plan = BatchPlan {
            label: "nothing".into(),
            payloads: vec![],
            greeting: true,
            individual: Variant::Baseline,
            batched: Variant::Optimized,
        };
        assert_eq!(h.run_batch_comparison(&plan).unwrap(), None);
        assert_eq!(h.failures()[0].kind, "empty_batch");
        assert!(h.is_complete());
    }

    #[test]
    fn scenarios_scale_measured_samples_explicitly() {
        let mut h = harness();
        h.run_comparison(OperationKind::EmitMessage, &[NamedInput::new("short", "Hello")])
            .unwrap();
        let per_call = h
            .recorder()
            .latest_by_label(Variant::Baseline, OperationKind::EmitMessage, "short")
            .unwrap()
            .gas_used;

        let specs = vec![
            ScenarioSpec {
                name: "10 hellos".into(),
                basis: ScenarioBasis::Measured {
                    variant: Variant::Baseline,
                    operation: OperationKind::EmitMessage,
                    input: "short".into(),
                    repeat: 10,
                },
            },
            ScenarioSpec {
                name: "assumed".into(),
                basis: ScenarioBasis::Assumed { gas: 25_223 },
            },
            ScenarioSpec {
                name: "never measured".into(),
                basis: ScenarioBasis::Measured {
                    variant: Variant::Optimized,
                    operation: OperationKind::BatchEmit,
                    input: "batch".into(),
                    repeat: 1,
                },
            },
        ];
        let est = h.project_scenarios(&specs, &PriceAssumptions::default());
        assert_eq!(est.len(), 2);
        assert_eq!(est[0].gas, per_call * 10);
        assert!(matches!(est[0].source, GasSource::Measured { repeat: 10, .. }));
        assert_eq!(est[1].gas, 25_223);
        assert_eq!(h.failures().last().unwrap().kind, "missing_measurement");
    }

    #[test]
    fn paired_scenarios_reuse_measured_samples() {
        let mut h = harness();
        h.run_comparison(OperationKind::EmitGreeting, &[NamedInput::new("short", "Hello")])
            .unwrap();
        let single = h
            .run_comparison(OperationKind::EmitGreeting, &[NamedInput::new("short", "Hello")])
            .unwrap()
            .remove(0);

        let specs = vec![
            PairedScenarioSpec {
                name: "10 greetings".into(),
                baseline: ScenarioBasis::Measured {
                    variant: Variant::Baseline,
                    operation: OperationKind::EmitGreeting,
                    input: "short".into(),
                    repeat: 10,
                },
                optimized: ScenarioBasis::Measured {
                    variant: Variant::Optimized,
                    operation: OperationKind::EmitGreeting,
                    input: "short".into(),
                    repeat: 10,
                },
            },
            PairedScenarioSpec {
                name: "free baseline".into(),
                baseline: ScenarioBasis::Assumed { gas: 0 },
                optimized: ScenarioBasis::Assumed { gas: 1 },
            },
        ];
        let out = h.compare_scenarios(&specs);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].baseline_gas, single.baseline_gas * 10);
        assert_eq!(out[0].optimized_gas, single.optimized_gas * 10);
        assert_eq!(out[0].saved_absolute, single.saved_absolute * 10);
        let f = h.failures().last().unwrap();
        assert_eq!(f.kind, "not_applicable");
        assert!(f.step.contains("free baseline"));
    }

    #[test]
    fn deployment_inspection_prices_creation_and_counter_view() {
        let mut h = harness();
        let base = h.inspect_deployment(Variant::Baseline).unwrap();
        let opt = h.inspect_deployment(Variant::Optimized).unwrap();
        assert!(opt.deploy_gas < base.deploy_gas);
        assert!(base.counter_view_estimate.is_some());
        assert_eq!(counter(&h, Variant::Baseline), 0);

        let mut ledger = SimulatedLedger::new(SimConfig::default());
        ledger.set_estimates_enabled(false);
        let mut h = Harness::new(ledger, 1).unwrap();
        let cost = h.inspect_deployment(Variant::Baseline).unwrap();
        assert_eq!(cost.counter_view_estimate, None);
        assert_eq!(h.failures()[0].kind, "estimation_failed");
    }

    #[test]
    fn full_suite_fills_every_section() {
        let mut h = harness();
        let cfg = HarnessConfig::default();
        let outcome = h.run_suite(&cfg, &cfg.inputs);
        assert_eq!(outcome.comparisons.len(), cfg.inputs.len() * 2);
        assert_eq!(outcome.batch_comparisons.len(), cfg.batches.len());
        assert_eq!(outcome.scenarios.len(), cfg.scenarios.len());
        assert_eq!(outcome.scenario_comparisons.len(), cfg.paired_scenarios.len());
        assert_eq!(outcome.deployments.len(), 2);
        assert!(h.failures().is_empty(), "{:?}", h.failures());
        assert!(h.is_complete());
    }

    #[test]
    fn lost_connection_aborts_the_suite() {
        let mut ledger = SimulatedLedger::new(SimConfig::default());
        // two deploys plus three calls
        ledger.disconnect_after(5);
        let mut h = Harness::new(ledger, 1).unwrap();
        let cfg = HarnessConfig::default();
        let outcome = h.run_suite(&cfg, &cfg.inputs);
        assert!(!h.is_complete());
        assert!(outcome.scenarios.is_empty());
        assert_eq!(h.failures().last().unwrap().kind, "ledger_connection_lost");
    }

    #[test]
    fn disabled_estimates_still_measure() {
        let mut ledger = SimulatedLedger::new(SimConfig::default());
        ledger.set_estimates_enabled(false);
        let mut h = Harness::new(ledger, 1).unwrap();
        let results = h
            .run_comparison(OperationKind::EmitGreeting, &[NamedInput::new("short", "Hi")])
            .unwrap();
        assert_eq!(results.len(), 1);
        assert!(h.recorder().samples().iter().all(|s| s.estimated_gas.is_none()));
        assert_eq!(h.failures().len(), 2);
        assert!(h.failures().iter().all(|f| f.kind == "estimation_failed"));
    }

    #[test]
    fn analysis_tracks_counter_per_call() {
        let mut h = harness();
        let inputs = vec![NamedInput::new("a", ""), NamedInput::new("b", "Hi")];
        let runs = h
            .run_analysis(Variant::Baseline, OperationKind::EmitGreeting, &inputs)
            .unwrap();
        assert_eq!(runs.len(), 2);
        assert_eq!((runs[0].counter_before, runs[0].counter_after), (0, 1));
        assert_eq!((runs[1].counter_before, runs[1].counter_after), (1, 2));
        assert_eq!(h.records().len(), 2);
    }

    #[test]
    fn missing_caller_is_rejected() {
        let err = Harness::new(SimulatedLedger::new(SimConfig::default()), 99)
            .err()
            .unwrap();
        assert_eq!(err, HarnessError::MissingIdentity(99));
    }

    #[test]
    fn full_profile_appends_seeded_sweep() {
        let cfg = BenchConfig {
            profile: Profile::Full,
            seed: 3,
        };
        let a = cfg.inputs(&[]);
        let b = cfg.inputs(&[]);
        assert_eq!(a, b);
        assert_eq!(
            a.iter().map(|i| i.payload.len()).collect::<Vec<_>>(),
            vec![32, 64, 128, 256]
        );
        let quick = BenchConfig {
            profile: Profile::Quick,
            seed: 3,
        };
        assert!(quick.inputs(&[]).is_empty());
    }
}
