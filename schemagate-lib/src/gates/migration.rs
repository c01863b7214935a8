use std::collections::HashSet;

use schemagate_core::models::{
    migration::{MigrationFile, Operation, StatementClass},
    report::{GateKind, GateResult, Severity, Violation},
};

use super::{Gate, GateContext};

pub const RULE_UNGUARDED: &str = "migration.unguarded-destructive";
pub const RULE_ROLLBACK: &str = "migration.missing-rollback";
pub const RULE_MIXED: &str = "migration.mixed-ddl-dml";
pub const RULE_LOCK: &str = "migration.table-lock";

pub struct MigrationHygieneGate;

impl Gate for MigrationHygieneGate {
    fn kind(&self) -> GateKind {
        GateKind::MigrationHygiene
    }

    fn evaluate(&self, ctx: &GateContext) -> GateResult {
        let violations = ctx.model.migrations.iter().flat_map(check_migration).collect();
        GateResult::from_violations(GateKind::MigrationHygiene, violations)
    }
}

fn check_migration(file: &MigrationFile) -> Vec<Violation> {
    let path = &file.up_artifact;
    let mut violations = Vec::new();

    for statement in &file.statements {
        if statement.class == StatementClass::Destructive {
            violations.push(
                Violation::new(
                    RULE_UNGUARDED,
                    Severity::DataLoss,
                    path,
                    Some(statement.line),
                    format!(
                        "destructive statement `{}` has no safety annotation",
                        statement.summary
                    ),
                )
                .with_suggestion(
                    "back up or backfill first, then annotate with `-- schemagate:guarded <justification>`",
                ),
            );
        }
    }

    if file.is_schema_mutating() && file.down_artifact.is_none() && file.irreversible.is_none() {
        violations.push(
            Violation::new(
                RULE_ROLLBACK,
                Severity::Correctness,
                path,
                None,
                "migration changes the schema but has no down/undo migration",
            )
            .with_suggestion(
                "add the down migration for this framework, or mark the file `-- schemagate:irreversible <justification>`",
            ),
        );
    }

    let first_dml = file.statements.iter().find(|s| s.class == StatementClass::Dml);
    if let Some(dml) = first_dml {
        if file.is_schema_mutating() {
            violations.push(
                Violation::new(
                    RULE_MIXED,
                    Severity::Style,
                    path,
                    Some(dml.line),
                    "migration mixes schema changes (DDL) with data changes (DML)",
                )
                .with_suggestion("split the data change into its own migration"),
            );
        }
    }

    // Tables created in this file are empty, so locking them is harmless.
    let mut created = HashSet::new();
    for statement in &file.statements {
        let target = statement.target.as_deref().map(str::to_lowercase);
        if statement.operation == Operation::CreateTable {
            created.extend(target);
            continue;
        }
        let fresh = target.as_ref().is_some_and(|t| created.contains(t));
        // Unguarded destructive statements are already reported above.
        let lockable = matches!(statement.class, StatementClass::Ddl | StatementClass::Guarded);
        if lockable
            && statement.operation.may_lock_table()
            && !statement.online
            && !fresh
        {
            violations.push(
                Violation::new(
                    RULE_LOCK,
                    Severity::Correctness,
                    path,
                    Some(statement.line),
                    format!(
                        "`{}` may lock the table while it runs",
                        statement.summary
                    ),
                )
                .with_suggestion("append `ALGORITHM=INPLACE, LOCK=NONE` (or `ALGORITHM=INSTANT`)"),
            );
        }
    }
    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Lexicons;
    use crate::extractor;
    use crate::reserved::ReservedWords;
    use schemagate_core::models::{
        artifact::{MigrationConvention, SchemaArtifact},
        report::GateStatus,
        snapshot::SchemaModel,
    };

    fn run(text: &str, rollback: Option<&str>) -> GateResult {
        let model = extractor::extract(&SchemaArtifact::migration(
            "db/migrations/20240101000000_change.up.sql",
            text,
            MigrationConvention::TimestampedPair,
            rollback.map(Into::into),
        ));
        let ctx = GateContext {
            model,
            reserved: Ok(ReservedWords::built_in()),
            lexicons: Lexicons::default(),
        };
        MigrationHygieneGate.evaluate(&ctx)
    }

    fn rules(result: &GateResult) -> Vec<&str> {
        result.violations.iter().map(|v| v.rule.as_str()).collect()
    }

    #[test]
    fn drop_column_without_rollback_fails_twice() {
        let result = run("ALTER TABLE orders DROP COLUMN legacy_notes;", None);
        assert_eq!(result.status, GateStatus::Fail);
        assert_eq!(rules(&result), vec![RULE_UNGUARDED, RULE_ROLLBACK]);
        assert_eq!(result.violations[0].severity, Severity::DataLoss);
        assert_eq!(result.violations[1].line, None);
    }

    #[test]
    fn guarded_and_reversible_migration_passes() {
        let result = run(
            "-- schemagate:guarded column unused since v2\nALTER TABLE orders DROP COLUMN legacy_notes, ALGORITHM=INPLACE, LOCK=NONE;",
            Some("db/migrations/20240101000000_change.down.sql"),
        );
        assert_eq!(result.status, GateStatus::Pass, "{:?}", result.violations);
    }

    #[test]
    fn guarded_alter_still_needs_an_online_algorithm() {
        let result = run(
            "-- schemagate:guarded column unused since v2\nALTER TABLE orders DROP COLUMN legacy_notes;",
            Some("db/migrations/20240101000000_change.down.sql"),
        );
        assert_eq!(rules(&result), vec![RULE_LOCK]);
    }

    #[test]
    fn irreversible_marker_replaces_rollback() {
        let result = run(
            "-- schemagate:irreversible lookup data is regenerated\nCREATE TABLE t (id INT PRIMARY KEY);",
            None,
        );
        assert_eq!(result.status, GateStatus::Pass);
    }

    #[test]
    fn flags_mixed_concerns_and_locks() {
        let result = run(
            "ALTER TABLE users ADD COLUMN nickname VARCHAR(50);\nUPDATE users SET nickname = name;\nCREATE INDEX idx_nick ON users (nickname);",
            Some("down.sql"),
        );
        assert_eq!(rules(&result), vec![RULE_MIXED, RULE_LOCK, RULE_LOCK]);
        assert_eq!(result.violations[0].line, Some(2));
    }

    #[test]
    fn new_tables_do_not_need_online_changes() {
        let result = run(
            "CREATE TABLE t (id INT PRIMARY KEY, a INT);\nCREATE INDEX idx_a ON t (a);",
            Some("down.sql"),
        );
        assert_eq!(result.status, GateStatus::Pass);
    }

    #[test]
    fn data_only_migration_needs_no_rollback() {
        let result = run("INSERT INTO settings VALUES ('a', 1);", None);
        assert_eq!(result.status, GateStatus::Pass);
    }
}
