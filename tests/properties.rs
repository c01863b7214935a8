mod common;

use common::*;
use schemagate_lib::models::report::{GateKind, GateStatus, Mode, ValidationReport, Violation};

fn count(report: &ValidationReport, gate: GateKind) -> usize {
    report.result(gate).unwrap().violations.len()
}

fn mixed_repository() -> tempfile::TempDir {
    repo(&[
        ("db/schema.sql", SCENARIO_A.as_bytes()),
        (
            "db/migrations/20240101000000_add_index.up.sql",
            b"CREATE INDEX idxStatus ON UserOrders (status);\nUPDATE UserOrders SET status = 'a';\n",
        ),
        (
            "db/migrations/20240102000000_drop.up.sql",
            b"DROP TABLE legacy;\n",
        ),
        ("prisma/schema.prisma", b"model Product {\n  id    Int    @id\n  price Float\n}\n"),
    ])
}

#[tokio::test]
async fn runs_are_byte_identical() {
    let dir = mixed_repository();
    let root = dir.path().to_str().unwrap();
    for format in ["json", "text", "csv"] {
        let first = cli(&[root, "--format", format]).await;
        let second = cli(&[root, "--format", format, "--workers", "1"]).await;
        assert_eq!(first, second, "{} output differs", format);
    }
}

#[tokio::test]
async fn quick_mode_is_a_subset_of_full_mode() {
    let dir = mixed_repository();
    let full = validate(dir.path(), Mode::Full).await;
    let quick = validate(dir.path(), Mode::Quick).await;

    for gate in [GateKind::Naming, GateKind::EngineCharset] {
        assert_eq!(full.result(gate), quick.result(gate));
    }
    for gate in [GateKind::Antipattern, GateKind::MigrationHygiene] {
        let skipped = quick.result(gate).unwrap();
        assert_eq!(skipped.status, GateStatus::Skip);
        assert_eq!(skipped.skip_reason.as_deref(), Some("quick mode"));
        assert!(skipped.violations.is_empty());
    }
}

#[tokio::test]
async fn one_new_naming_violation_flips_the_result() {
    let dir = repo(&[("db/schema.sql", SCENARIO_D.as_bytes())]);
    let before = validate(dir.path(), Mode::Full).await;
    assert_eq!(before.overall_status, GateStatus::Pass);

    write(
        dir.path(),
        "db/schema/audit.sql",
        b"CREATE TABLE AuditEntries (id BIGINT PRIMARY KEY) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4 COLLATE=utf8mb4_0900_ai_ci;\n",
    );
    let after = validate(dir.path(), Mode::Full).await;
    assert_eq!(after.overall_status, GateStatus::Fail);
    assert_eq!(count(&after, GateKind::Naming), count(&before, GateKind::Naming) + 1);
    for gate in [GateKind::EngineCharset, GateKind::Antipattern, GateKind::MigrationHygiene] {
        assert_eq!(count(&after, gate), count(&before, gate));
        assert_eq!(after.result(gate).unwrap().status, GateStatus::Pass);
    }
}

#[tokio::test]
async fn broken_override_leaves_other_gates_alone() {
    let dir = mixed_repository();
    let healthy = validate(dir.path(), Mode::Full).await;

    write(dir.path(), ".mysql/reserved-words.txt", b"select\n\xff\xfe\n");
    let broken = validate(dir.path(), Mode::Full).await;

    let naming = broken.result(GateKind::Naming).unwrap();
    assert_eq!(naming.status, GateStatus::Skip);
    assert!(naming.skip_reason.is_some());
    for gate in [GateKind::EngineCharset, GateKind::Antipattern, GateKind::MigrationHygiene] {
        assert_eq!(count(&broken, gate), count(&healthy, gate), "{}", gate);
    }
}

/// Text between the first pair of backticks in a message.
fn quoted(message: &str) -> &str {
    message.split('`').nth(1).unwrap()
}

/// `ENGINE=MyISAM` out of "... uses ENGINE=MyISAM; ..."
fn current_setting(violation: &Violation) -> String {
    let after = violation.message.split("uses ").nth(1).unwrap();
    after
        .split(|c: char| c == ',' || c == ';' || c.is_whitespace())
        .next()
        .unwrap()
        .to_string()
}

#[tokio::test]
async fn applying_suggestions_clears_naming_and_engine_gates() {
    let dir = repo(&[("db/schema.sql", SCENARIO_A.as_bytes())]);
    let report = validate(dir.path(), Mode::Full).await;
    let mut sql = SCENARIO_A.to_string();

    for violation in &report.result(GateKind::Naming).unwrap().violations {
        let name = quoted(&violation.message).to_string();
        sql = sql.replace(&name, violation.suggestion.as_deref().unwrap());
    }
    for violation in &report.result(GateKind::EngineCharset).unwrap().violations {
        let current = current_setting(violation);
        let key = current.split('=').next().unwrap();
        let suggestion = violation.suggestion.as_deref().unwrap();
        let replacement = &suggestion[suggestion.find(key).unwrap()..];
        sql = sql.replacen(&current, replacement, 1);
    }
    write(dir.path(), "db/schema.sql", sql.as_bytes());

    let rerun = validate(dir.path(), Mode::Full).await;
    assert_eq!(count(&rerun, GateKind::Naming), 0, "{}", sql);
    assert_eq!(count(&rerun, GateKind::EngineCharset), 0, "{}", sql);
}
