use std::fmt::Write as _;

use schemagate_lib::{
    models::report::{GateStatus, Mode, ValidationReport},
    report::summary,
    GateError,
};
use serde::Serialize;

use super::cli::Format;

pub fn render(report: &ValidationReport, format: Format) -> Result<String, GateError> {
    match format {
        Format::Text => Ok(render_text(report)),
        Format::Json => {
            let mut json = serde_json::to_string_pretty(report)?;
            json.push('\n');
            Ok(json)
        }
        Format::Csv => render_csv(report),
    }
}

fn render_text(report: &ValidationReport) -> String {
    let mut out = String::new();
    let mode = match report.mode {
        Mode::Full => "full",
        Mode::Quick => "quick",
    };
    let _ = writeln!(out, "schemagate report ({} mode)\n", mode);

    for result in &report.results {
        match result.status {
            GateStatus::Skip => {
                let _ = writeln!(
                    out,
                    "[SKIP] {}: {}",
                    result.gate,
                    result.skip_reason.as_deref().unwrap_or("skipped")
                );
            }
            status => {
                let _ = writeln!(
                    out,
                    "[{}] {}: {} violation(s)",
                    status,
                    result.gate,
                    result.violations.len()
                );
            }
        }
        for violation in &result.violations {
            let _ = writeln!(
                out,
                "  {}  [{}] {}",
                violation.location(),
                violation.severity.label(),
                violation.message
            );
            if let Some(suggestion) = &violation.suggestion {
                let _ = writeln!(out, "      suggestion: {}", suggestion);
            }
        }
        for note in &result.notes {
            let _ = writeln!(out, "  note: {}", note);
        }
    }

    if !report.parse_notes.is_empty() {
        let _ = writeln!(out, "\nSkipped statements ({}):", report.parse_notes.len());
        for note in &report.parse_notes {
            let location = match note.line {
                Some(line) => format!("{}:{}", note.artifact.display(), line),
                None => note.artifact.display().to_string(),
            };
            let _ = writeln!(out, "  {}  {}", location, note.message);
        }
    }

    if !report.remediation.is_empty() {
        let _ = writeln!(out, "\nRemediation (highest risk first):");
        for (i, item) in report.remediation.iter().enumerate() {
            let location = match item.line {
                Some(line) => format!("{}:{}", item.path.display(), line),
                None => item.path.display().to_string(),
            };
            let _ = write!(
                out,
                "  {}. [{}] {} {}: {}",
                i + 1,
                item.severity.label(),
                item.gate,
                location,
                item.message
            );
            match &item.suggestion {
                Some(suggestion) => {
                    let _ = writeln!(out, " -> {}", suggestion);
                }
                None => out.push('\n'),
            }
        }
    }

    let counts: Vec<String> = summary(report)
        .iter()
        .map(|(gate, status, count)| format!("{} {} ({})", gate, status, count))
        .collect();
    let _ = writeln!(out, "\nSummary: {}", counts.join(", "));
    let _ = writeln!(
        out,
        "Overall: {} (exit code {})",
        report.overall_status, report.exit_code
    );
    out
}

const CSV_HEADER: [&str; 8] = [
    "gate", "status", "severity", "rule", "path", "line", "message", "suggestion",
];

#[derive(Serialize)]
struct CsvRow<'a> {
    gate: &'a str,
    status: String,
    severity: &'a str,
    rule: &'a str,
    path: String,
    line: Option<usize>,
    message: &'a str,
    suggestion: Option<&'a str>,
}

fn render_csv(report: &ValidationReport) -> Result<String, GateError> {
    // Header written by hand so a clean report still yields one.
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    wtr.write_record(CSV_HEADER)
        .map_err(|e| GateError::Render(e.to_string()))?;
    for result in &report.results {
        for violation in &result.violations {
            wtr.serialize(CsvRow {
                gate: result.gate.name(),
                status: result.status.to_string(),
                severity: violation.severity.label(),
                rule: &violation.rule,
                path: violation.artifact_path.display().to_string(),
                line: violation.line,
                message: &violation.message,
                suggestion: violation.suggestion.as_deref(),
            })
            .map_err(|e| GateError::Render(e.to_string()))?;
        }
    }
    let bytes = wtr
        .into_inner()
        .map_err(|e| GateError::Render(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| GateError::Render(e.to_string()))
}
