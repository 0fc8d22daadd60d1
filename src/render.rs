//! Plain-text view of a [`GasReport`]. Payloads are truncated here and only here.

use crate::compare::ComparisonResult;
use crate::scenario::GasSource;
use crate::OperationKind;
use crate::schema::GasReport;
use std::fmt::Write;

/// Characters of payload shown before truncating.
pub const PREVIEW_CHARS: usize = 50;

/// First `max` characters of `text`, with `...` appended when anything was cut.
pub fn preview(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

fn rule(out: &mut String) {
    out.push_str(&"-".repeat(80));
    out.push('\n');
}

fn comparison_rows(out: &mut String, rows: &[ComparisonResult]) {
    let _ = writeln!(
        out,
        "{:<24} {:>7} {:>12} {:>12} {:>10} {:>8}",
        "input", "bytes", "baseline", "optimized", "saved", "saved %"
    );
    rule(out);
    for r in rows {
        let _ = writeln!(
            out,
            "{:<24} {:>7} {:>12} {:>12} {:>10} {:>7.1}%",
            preview(&r.input.label, 24),
            r.input.byte_len,
            r.baseline_gas,
            r.optimized_gas,
            r.saved_absolute,
            r.saved_percent
        );
    }
}

pub fn render_text(report: &GasReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "hello-gas-bench {} (profile {}, seed {}, ledger {})",
        report.run.bench_version, report.run.profile, report.run.seed, report.run.ledger
    );
    if !report.complete {
        out.push_str("INCOMPLETE: the run was aborted, see failures below\n");
    }

    if !report.deployments.is_empty() {
        out.push_str("\ndeployment\n");
        let _ = writeln!(out, "{:<10} {:>12} {:>18}", "variant", "deploy gas", "getCounter estimate");
        rule(&mut out);
        for d in &report.deployments {
            let view = d
                .counter_view_estimate
                .map_or_else(|| "n/a".to_string(), |g| g.to_string());
            let _ = writeln!(out, "{:<10} {:>12} {:>18}", d.variant, d.deploy_gas, view);
        }
    }

    for op in OperationKind::ALL {
        let rows: Vec<ComparisonResult> = report
            .comparisons
            .iter()
            .filter(|r| r.operation == op)
            .cloned()
            .collect();
        if rows.is_empty() {
            continue;
        }
        let _ = writeln!(out, "\n{op}: baseline vs optimized");
        comparison_rows(&mut out, &rows);
    }

    if !report.batch_comparisons.is_empty() {
        out.push_str("\nindividual calls vs one batch\n");
        comparison_rows(&mut out, &report.batch_comparisons);
    }

    if !report.scenarios.is_empty() {
        out.push_str("\nscenarios\n");
        let _ = writeln!(out, "{:<32} {:>12} {:>18} {:>12}", "scenario", "gas", "basis", "cost");
        rule(&mut out);
        for s in &report.scenarios {
            let basis = match &s.source {
                GasSource::Measured {
                    per_call_gas,
                    repeat,
                    ..
                } => format!("{per_call_gas} x {repeat}"),
                GasSource::Assumed => "assumed".to_string(),
            };
            let _ = writeln!(
                out,
                "{:<32} {:>12} {:>18} {:>12.4}",
                preview(&s.name, 32),
                s.gas,
                basis,
                s.derived_cost
            );
        }
    }

    if !report.scenario_comparisons.is_empty() {
        out.push_str("\nscenarios, baseline vs optimized\n");
        let _ = writeln!(
            out,
            "{:<36} {:>12} {:>12} {:>10} {:>8}",
            "scenario", "baseline", "optimized", "saved", "saved %"
        );
        rule(&mut out);
        for c in &report.scenario_comparisons {
            let _ = writeln!(
                out,
                "{:<36} {:>12} {:>12} {:>10} {:>7.1}%",
                preview(&c.name, 36),
                c.baseline_gas,
                c.optimized_gas,
                c.saved_absolute,
                c.saved_percent
            );
        }
    }

    if !report.executions.is_empty() {
        out.push_str("\nexecutions\n");
        let _ = writeln!(
            out,
            "{:<10} {:<14} {:<12} {:>10} {:>10} {:>9}  preview",
            "variant", "operation", "input", "estimate", "actual", "counter"
        );
        rule(&mut out);
        for e in &report.executions {
            let estimate = e
                .sample
                .estimated_gas
                .map_or_else(|| "n/a".to_string(), |g| g.to_string());
            let shown = e
                .records
                .first()
                .map(|r| preview(&r.payload, PREVIEW_CHARS))
                .unwrap_or_default();
            let _ = writeln!(
                out,
                "{:<10} {:<14} {:<12} {:>10} {:>10} {:>4}->{:<4}  {}",
                e.sample.variant,
                e.sample.operation,
                preview(&e.sample.input.label, 12),
                estimate,
                e.sample.gas_used,
                e.counter_before,
                e.counter_after,
                shown
            );
        }
    }

    if !report.records.is_empty() {
        let _ = writeln!(out, "\nemitted records: {}", report.records.len());
    }

    if !report.failures.is_empty() {
        out.push_str("\nmissing measurements\n");
        rule(&mut out);
        for f in &report.failures {
            let tag = if f.kind == "not_applicable" { "N/A" } else { f.kind.as_str() };
            let _ = writeln!(out, "{}: {} ({})", f.step, tag, f.message);
        }
    }

    out
}
