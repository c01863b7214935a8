use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::snapshot::ParseNote;

/// The four gates, in declaration order.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GateKind {
    #[serde(rename = "schema-naming")]
    Naming,
    #[serde(rename = "engine-charset")]
    EngineCharset,
    #[serde(rename = "antipatterns")]
    Antipattern,
    #[serde(rename = "migration-hygiene")]
    MigrationHygiene,
}

impl GateKind {
    pub const ALL: [GateKind; 4] = [
        GateKind::Naming,
        GateKind::EngineCharset,
        GateKind::Antipattern,
        GateKind::MigrationHygiene,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            GateKind::Naming => "schema-naming",
            GateKind::EngineCharset => "engine-charset",
            GateKind::Antipattern => "antipatterns",
            GateKind::MigrationHygiene => "migration-hygiene",
        }
    }

    /// Gates executed in quick mode.
    pub fn runs_in(&self, mode: Mode) -> bool {
        match mode {
            Mode::Full => true,
            Mode::Quick => matches!(self, GateKind::Naming | GateKind::EngineCharset),
        }
    }
}

impl fmt::Display for GateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Full,
    Quick,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum GateStatus {
    Pass,
    Fail,
    Skip,
}

impl fmt::Display for GateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            GateStatus::Pass => "PASS",
            GateStatus::Fail => "FAIL",
            GateStatus::Skip => "SKIP",
        };
        f.write_str(label)
    }
}

/// Lifecycle of one gate within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    NotRun,
    Running,
    Finished(GateStatus),
}

impl GateState {
    /// Advance the state, refusing transitions the lifecycle does not allow.
    pub fn advance(self, next: GateState) -> Result<GateState, String> {
        match (self, next) {
            (GateState::NotRun, GateState::Running)
            | (GateState::Running, GateState::Finished(_)) => Ok(next),
            // Gates never invoked in quick mode are reported Skip without running.
            (GateState::NotRun, GateState::Finished(GateStatus::Skip)) => Ok(next),
            _ => Err(format!("invalid gate transition {:?} -> {:?}", self, next)),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, GateState::Finished(_))
    }
}

/// Remediation priority, highest risk first.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "kebab-case")]
pub enum Severity {
    DataLoss,
    Correctness,
    Style,
}

impl Severity {
    pub fn label(&self) -> &'static str {
        match self {
            Severity::DataLoss => "data-loss",
            Severity::Correctness => "correctness",
            Severity::Style => "style",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Violation {
    #[serde(rename = "path")]
    pub artifact_path: PathBuf,
    pub line: Option<usize>,
    pub message: String,
    pub suggestion: Option<String>,
    pub rule: String,
    pub severity: Severity,
}

impl Violation {
    pub fn new(
        rule: &str,
        severity: Severity,
        artifact_path: impl Into<PathBuf>,
        line: Option<usize>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            artifact_path: artifact_path.into(),
            line,
            message: message.into(),
            suggestion: None,
            rule: rule.to_string(),
            severity,
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn location(&self) -> String {
        match self.line {
            Some(line) => format!("{}:{}", self.artifact_path.display(), line),
            None => self.artifact_path.display().to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GateResult {
    pub gate: GateKind,
    pub status: GateStatus,
    pub violations: Vec<Violation>,
    pub skip_reason: Option<String>,
    /// Disclosures that qualify the result, e.g. a non-exhaustive word list.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

impl GateResult {
    /// Pass when empty, Fail otherwise.
    pub fn from_violations(gate: GateKind, violations: Vec<Violation>) -> Self {
        let status = if violations.is_empty() {
            GateStatus::Pass
        } else {
            GateStatus::Fail
        };
        Self {
            gate,
            status,
            violations,
            skip_reason: None,
            notes: Vec::new(),
        }
    }

    pub fn skipped(gate: GateKind, reason: impl Into<String>) -> Self {
        Self {
            gate,
            status: GateStatus::Skip,
            violations: Vec::new(),
            skip_reason: Some(reason.into()),
            notes: Vec::new(),
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RemediationItem {
    pub gate: GateKind,
    pub severity: Severity,
    pub path: PathBuf,
    pub line: Option<usize>,
    pub message: String,
    pub suggestion: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub mode: Mode,
    #[serde(rename = "gates")]
    pub results: Vec<GateResult>,
    pub overall_status: GateStatus,
    pub exit_code: i32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub remediation: Vec<RemediationItem>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parse_notes: Vec<ParseNote>,
}

impl ValidationReport {
    pub fn result(&self, gate: GateKind) -> Option<&GateResult> {
        self.results.iter().find(|r| r.gate == gate)
    }

    pub fn violation_count(&self) -> usize {
        self.results.iter().map(|r| r.violations.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quick_mode_runs_first_two_gates() {
        let quick: Vec<_> = GateKind::ALL
            .iter()
            .filter(|g| g.runs_in(Mode::Quick))
            .collect();
        assert_eq!(quick, vec![&GateKind::Naming, &GateKind::EngineCharset]);
        assert!(GateKind::ALL.iter().all(|g| g.runs_in(Mode::Full)));
    }

    #[test]
    fn gate_state_transitions() {
        let running = GateState::NotRun.advance(GateState::Running).unwrap();
        let done = running
            .advance(GateState::Finished(GateStatus::Fail))
            .unwrap();
        assert!(done.is_terminal());
        assert!(done.advance(GateState::Running).is_err());
        assert!(GateState::NotRun
            .advance(GateState::Finished(GateStatus::Pass))
            .is_err());
        assert!(GateState::NotRun
            .advance(GateState::Finished(GateStatus::Skip))
            .is_ok());
    }

    #[test]
    fn severity_orders_highest_risk_first() {
        let mut severities = vec![Severity::Style, Severity::DataLoss, Severity::Correctness];
        severities.sort();
        assert_eq!(
            severities,
            vec![Severity::DataLoss, Severity::Correctness, Severity::Style]
        );
    }

    #[test]
    fn violation_serializes_with_path_key() {
        let v = Violation::new("naming.case", Severity::Style, "db/schema.sql", Some(3), "bad")
            .with_suggestion("good");
        let json = serde_json::to_value(&v).unwrap();
        assert_eq!(json["path"], "db/schema.sql");
        assert_eq!(json["line"], 3);
        assert_eq!(json["suggestion"], "good");
        assert_eq!(json["severity"], "style");
    }
}
