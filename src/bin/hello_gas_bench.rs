use clap::{Parser, Subcommand, ValueEnum};
use hello_gas_bench::config::HarnessConfig;
use hello_gas_bench::harness::{BenchConfig, Harness, Profile};
use hello_gas_bench::render::render_text;
use hello_gas_bench::scenario::{project, scale_gas, GasSource};
use hello_gas_bench::schema::{ExecutionSummary, GasReport, RunMeta, SCHEMA_VERSION};
use hello_gas_bench::sim::{SimConfig, SimulatedLedger};
use hello_gas_bench::{OperationKind, Variant};
use std::fs;
use std::io;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ProfileArg {
    Quick,
    Full,
}

impl From<ProfileArg> for Profile {
    fn from(v: ProfileArg) -> Self {
        match v {
            ProfileArg::Quick => Profile::Quick,
            ProfileArg::Full => Profile::Full,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
    Json,
    Text,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Same inputs on both variants, one comparison per input.
    Compare {
        /// Only this operation; defaults to messages and greetings.
        #[arg(long, value_enum)]
        operation: Option<OperationKind>,
    },

    /// Individual calls against one batched call, for every configured batch plan.
    Batch,

    /// Deployment cost, `getCounter` estimate, and estimate vs actual gas per input on one variant.
    Analyze {
        #[arg(long, value_enum, default_value_t = Variant::Baseline)]
        variant: Variant,

        /// Only this operation; defaults to messages and greetings.
        #[arg(long, value_enum)]
        operation: Option<OperationKind>,
    },

    /// Price an assumed gas figure under the configured rates.
    Project {
        #[arg(long)]
        gas: u64,

        /// Explicit multiplier applied to `--gas` before pricing.
        #[arg(long, default_value_t = 1)]
        repeat: u64,

        #[arg(long, default_value = "assumed")]
        name: String,
    },

    /// Deployments, comparisons, batch plans and both scenario tables in one run.
    Suite,
}

#[derive(Parser, Debug)]
#[command(name = "hello-gas-bench")]
#[command(about = "Gas cost comparison of baseline vs optimized greeter contracts")]
struct Args {
    #[arg(long, value_enum, default_value_t = ProfileArg::Quick, global = true)]
    profile: ProfileArg,

    #[arg(long, default_value_t = 0, global = true)]
    seed: u64,

    /// Harness configuration (JSON). Built-in defaults when omitted.
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Override the gas price (smallest price units per gas).
    #[arg(long, global = true)]
    gas_price_rate: Option<f64>,

    /// Override the base currency price (currency per base unit).
    #[arg(long, global = true)]
    base_price_rate: Option<f64>,

    /// Override the smallest-unit-to-base-unit conversion.
    #[arg(long, global = true)]
    conversion_constant: Option<f64>,

    #[arg(long, value_enum, default_value_t = Format::Json, global = true)]
    format: Format,

    /// Where to write the report. If omitted, prints to stdout.
    #[arg(long, global = true)]
    out: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

fn now_utc() -> String {
    // No calendar dependency; seconds since the epoch are enough to order reports.
    use std::time::{SystemTime, UNIX_EPOCH};
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    format!("unix:{secs}")
}

fn git_sha_short() -> Option<String> {
    std::env::var("GIT_SHA")
        .ok()
        .or_else(|| std::env::var("GITHUB_SHA").ok())
        .map(|s| s.chars().take(12).collect())
}

fn kinds(operation: Option<OperationKind>) -> Vec<OperationKind> {
    match operation {
        Some(k) => vec![k],
        None => vec![OperationKind::EmitMessage, OperationKind::EmitGreeting],
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => HarnessConfig::load(path)?,
        None => HarnessConfig::default(),
    };
    if let Some(v) = args.gas_price_rate {
        config.prices.gas_price_rate = v;
    }
    if let Some(v) = args.base_price_rate {
        config.prices.base_price_rate = v;
    }
    if let Some(v) = args.conversion_constant {
        config.prices.conversion_constant = v;
    }
    config.validate()?;

    let cfg = BenchConfig {
        profile: args.profile.into(),
        seed: args.seed,
    };
    let inputs = cfg.inputs(&config.inputs);

    let ledger = SimulatedLedger::new(SimConfig {
        seed: cfg.seed,
        ..Default::default()
    });
    let mut harness = Harness::new(ledger, config.caller_index)?;

    let mut report = GasReport::new(RunMeta {
        schema_version: SCHEMA_VERSION,
        bench_version: env!("CARGO_PKG_VERSION").to_string(),
        profile: cfg.profile.as_str().to_string(),
        seed: cfg.seed,
        timestamp_utc: now_utc(),
        git_sha: git_sha_short(),
        ledger: "simulated".to_string(),
    });

    match &args.cmd {
        Command::Compare { operation } => {
            for kind in kinds(*operation) {
                if !harness.is_complete() {
                    break;
                }
                let res = harness.run_comparison(kind, &inputs);
                report
                    .comparisons
                    .extend(harness.finish(&format!("compare {kind}"), res));
            }
        }
        Command::Batch => {
            for plan in &config.batches {
                if !harness.is_complete() {
                    break;
                }
                let res = harness.run_batch_comparison(plan);
                report
                    .batch_comparisons
                    .extend(harness.finish(&format!("batch {}", plan.label), res));
            }
        }
        Command::Analyze { variant, operation } => {
            let res = harness.inspect_deployment(*variant).map(Some);
            report
                .deployments
                .extend(harness.finish(&format!("deployment {variant}"), res));
            for kind in kinds(*operation) {
                if !harness.is_complete() {
                    break;
                }
                let res = harness.run_analysis(*variant, kind, &inputs);
                let runs = harness.finish(&format!("analyze {variant} {kind}"), res);
                report
                    .executions
                    .extend(runs.iter().map(ExecutionSummary::from));
            }
        }
        Command::Project { gas, repeat, name } => {
            let res = scale_gas(*gas, *repeat)
                .and_then(|total| project(name, total, GasSource::Assumed, &config.prices))
                .map(Some);
            report.scenarios.extend(harness.finish("project", res));
        }
        Command::Suite => {
            let outcome = harness.run_suite(&config, &inputs);
            report.deployments = outcome.deployments;
            report.comparisons = outcome.comparisons;
            report.batch_comparisons = outcome.batch_comparisons;
            report.scenarios = outcome.scenarios;
            report.scenario_comparisons = outcome.scenario_comparisons;
        }
    }

    report.complete = harness.is_complete();
    report.samples = harness.recorder().samples().to_vec();
    report.records = harness.records().to_vec();
    report.failures = harness.failures().to_vec();
    info!(
        samples = report.samples.len(),
        failures = report.failures.len(),
        complete = report.complete,
        "run finished"
    );

    let rendered = match args.format {
        Format::Json => serde_json::to_string_pretty(&report)?,
        Format::Text => render_text(&report),
    };
    if let Some(out) = args.out {
        fs::write(out, rendered)?;
    } else {
        println!("{rendered}");
    }

    if !report.complete {
        return Err(io::Error::other("run aborted before completion").into());
    }
    Ok(())
}
