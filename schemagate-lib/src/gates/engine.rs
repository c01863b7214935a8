use schemagate_core::models::{
    report::{GateKind, GateResult, Severity, Violation},
    schema::TableDefinition,
};

use super::{Gate, GateContext};

pub const RULE_ENGINE: &str = "engine.non-innodb";
pub const RULE_ENGINE_DEFAULT: &str = "engine.server-default";
pub const RULE_CHARSET: &str = "charset.non-utf8mb4";
pub const RULE_COLLATION: &str = "charset.general-collation";

pub struct EngineCharsetGate;

impl Gate for EngineCharsetGate {
    fn kind(&self) -> GateKind {
        GateKind::EngineCharset
    }

    fn evaluate(&self, ctx: &GateContext) -> GateResult {
        let violations = ctx.model.tables.iter().flat_map(check_table).collect();
        GateResult::from_violations(GateKind::EngineCharset, violations)
    }
}

fn check_table(table: &TableDefinition) -> Vec<Violation> {
    let mut violations = Vec::new();
    let at = |rule: &str, severity: Severity, message: String| {
        Violation::new(rule, severity, &table.source_artifact, table.source_line, message)
    };

    match table.engine.as_deref() {
        Some(engine) if !engine.eq_ignore_ascii_case("InnoDB") => violations.push(
            at(
                RULE_ENGINE,
                Severity::Correctness,
                format!(
                    "table `{}` uses ENGINE={}; only InnoDB is transactional and crash-safe",
                    table.name, engine
                ),
            )
            .with_suggestion("ENGINE=InnoDB"),
        ),
        Some(_) => {}
        None => violations.push(
            at(
                RULE_ENGINE_DEFAULT,
                Severity::Style,
                format!(
                    "table `{}` declares no ENGINE and relies on server default",
                    table.name
                ),
            )
            .with_suggestion("ENGINE=InnoDB"),
        ),
    }

    if let Some(charset) = table.charset.as_deref() {
        let lowered = charset.to_ascii_lowercase();
        if lowered != "utf8mb4" {
            let message = if lowered == "utf8" || lowered == "utf8mb3" {
                format!(
                    "table `{}` uses CHARSET={}, the legacy 3-byte alias; convert to utf8mb4",
                    table.name, charset
                )
            } else {
                format!("table `{}` uses CHARSET={}, not utf8mb4", table.name, charset)
            };
            violations.push(
                at(RULE_CHARSET, Severity::Correctness, message)
                    .with_suggestion("DEFAULT CHARSET=utf8mb4"),
            );
        }
    }

    if let Some(collation) = table.collation.as_deref() {
        if collation.eq_ignore_ascii_case("utf8mb4_general_ci") {
            violations.push(
                at(
                    RULE_COLLATION,
                    Severity::Style,
                    format!(
                        "table `{}` uses COLLATE={}, which sorts and compares less accurately; utf8mb4_unicode_ci also works on older servers",
                        table.name, collation
                    ),
                )
                .with_suggestion("COLLATE=utf8mb4_0900_ai_ci"),
            );
        }
    }
    violations
}
