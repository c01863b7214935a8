//! Report Aggregator.

use schemagate_core::models::{
    report::{GateKind, GateResult, GateStatus, Mode, RemediationItem, ValidationReport},
    snapshot::ParseNote,
};

use crate::policy;

/// Fold gate results into one report.
///
/// Results come out in gate declaration order with violations stably sorted
/// by path then line, so the report does not depend on the order gates
/// finished in.
pub fn aggregate(mode: Mode, mut results: Vec<GateResult>, parse_notes: Vec<ParseNote>) -> ValidationReport {
    results.sort_by_key(|r| r.gate);
    for result in &mut results {
        result
            .violations
            .sort_by(|a, b| (&a.artifact_path, a.line).cmp(&(&b.artifact_path, b.line)));
    }

    let overall_status = if results.iter().any(|r| r.status == GateStatus::Fail) {
        GateStatus::Fail
    } else {
        GateStatus::Pass
    };
    let remediation = if overall_status == GateStatus::Fail {
        remediation_plan(&results)
    } else {
        Vec::new()
    };

    ValidationReport {
        mode,
        results,
        overall_status,
        exit_code: policy::exit_code(overall_status),
        remediation,
        parse_notes,
    }
}

/// Every violation, highest risk first.
fn remediation_plan(results: &[GateResult]) -> Vec<RemediationItem> {
    let mut items: Vec<RemediationItem> = results
        .iter()
        .flat_map(|r| {
            r.violations.iter().map(move |v| RemediationItem {
                gate: r.gate,
                severity: v.severity,
                path: v.artifact_path.clone(),
                line: v.line,
                message: v.message.clone(),
                suggestion: v.suggestion.clone(),
            })
        })
        .collect();
    items.sort_by(|a, b| {
        (a.severity, &a.path, a.line, a.gate).cmp(&(b.severity, &b.path, b.line, b.gate))
    });
    items
}

/// Per-gate counts for the summary line of a rendered report.
pub fn summary(report: &ValidationReport) -> Vec<(GateKind, GateStatus, usize)> {
    report
        .results
        .iter()
        .map(|r| (r.gate, r.status, r.violations.len()))
        .collect()
}
