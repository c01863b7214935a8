mod common;

use async_trait::async_trait;
use common::*;
use mockall::mock;
use schemagate_lib::{
    db::SnapshotSource,
    extractor,
    gates::{antipattern, engine, migration, naming},
    models::{
        report::{GateKind, GateStatus, Mode},
        snapshot::SchemaModel,
    },
    GateError, SchemaGate, ValidationConfig,
};
use std::path::Path;

mock! {
    pub Snapshot {}

    #[async_trait]
    impl SnapshotSource for Snapshot {
        fn describe(&self) -> String;
        async fn fetch_snapshot(&self) -> Result<SchemaModel, GateError>;
    }
}

fn rules(report: &schemagate_lib::models::report::ValidationReport, gate: GateKind) -> Vec<String> {
    report
        .result(gate)
        .unwrap()
        .violations
        .iter()
        .map(|v| v.rule.clone())
        .collect()
}

#[tokio::test]
async fn scenario_a_legacy_table_fails_three_gates() {
    let dir = repo(&[("db/schema.sql", SCENARIO_A.as_bytes())]);
    let report = validate(dir.path(), Mode::Full).await;

    let naming_result = report.result(GateKind::Naming).unwrap();
    assert_eq!(naming_result.status, GateStatus::Fail);
    let suggestions: Vec<_> = naming_result
        .violations
        .iter()
        .filter_map(|v| v.suggestion.as_deref())
        .collect();
    assert_eq!(suggestions, vec!["user_orders", "order_id"]);

    assert_eq!(
        rules(&report, GateKind::EngineCharset),
        vec![engine::RULE_ENGINE, engine::RULE_CHARSET]
    );
    assert_eq!(
        rules(&report, GateKind::Antipattern),
        vec![antipattern::RULE_MISSING_PK, antipattern::RULE_ENUM]
    );
    assert_eq!(report.result(GateKind::MigrationHygiene).unwrap().status, GateStatus::Pass);
    assert_eq!(report.overall_status, GateStatus::Fail);
    assert_eq!(report.exit_code, 1);

    let (code, text) = cli(&[dir.path().to_str().unwrap()]).await;
    assert_eq!(code, 1);
    assert!(text.contains("Overall: FAIL (exit code 1)"));
}

#[tokio::test]
async fn scenario_b_empty_repository_exits_with_guidance() {
    let dir = repo(&[("README.md", b"docs only")]);
    let engine = SchemaGate::new(ValidationConfig::default());
    let err = engine.validate_repository(dir.path(), None).await.unwrap_err();
    let guidance = err.guidance().unwrap();
    assert!(guidance.contains("**/schema.sql"));
    assert!(guidance.contains("**/schema.prisma"));

    let (code, out) = cli(&[dir.path().to_str().unwrap()]).await;
    assert_eq!(code, 2);
    assert!(out.is_empty());
}

#[tokio::test]
async fn scenario_b_with_fallback_validates_the_snapshot() {
    let dir = repo(&[]);
    let mut snapshot = MockSnapshot::new();
    snapshot.expect_describe().returning(|| "mock database".to_string());
    snapshot
        .expect_fetch_snapshot()
        .times(1)
        .returning(|| Ok(extractor::extract_sql(Path::new("live:t"), SCENARIO_D)));

    let report = SchemaGate::new(ValidationConfig::default())
        .validate_repository(dir.path(), Some(&snapshot))
        .await
        .unwrap();
    assert_eq!(report.exit_code, 0);
}

#[tokio::test]
async fn scenario_c_unguarded_drop_without_rollback() {
    let dir = repo(&[(
        "db/migrations/20240301120000_drop_legacy_notes.up.sql",
        b"ALTER TABLE orders DROP COLUMN legacy_notes;\n",
    )]);
    let report = validate(dir.path(), Mode::Full).await;
    let hygiene = report.result(GateKind::MigrationHygiene).unwrap();
    assert_eq!(hygiene.status, GateStatus::Fail);
    assert_eq!(
        rules(&report, GateKind::MigrationHygiene),
        vec![migration::RULE_UNGUARDED, migration::RULE_ROLLBACK]
    );
    assert_eq!(report.remediation[0].severity.label(), "data-loss");
}

#[tokio::test]
async fn scenario_c_is_clean_once_guarded_and_reversible() {
    let dir = repo(&[
        (
            "db/migrations/20240301120000_drop_legacy_notes.up.sql",
            b"-- schemagate:guarded notes were archived to cold storage\nALTER TABLE orders DROP COLUMN legacy_notes, ALGORITHM=INPLACE, LOCK=NONE;\n",
        ),
        (
            "db/migrations/20240301120000_drop_legacy_notes.down.sql",
            b"ALTER TABLE orders ADD COLUMN legacy_notes TEXT;\n",
        ),
    ]);
    let report = validate(dir.path(), Mode::Full).await;
    assert_eq!(
        report.result(GateKind::MigrationHygiene).unwrap().status,
        GateStatus::Pass
    );
}

#[tokio::test]
async fn guarded_drop_without_online_algorithm_may_lock() {
    let dir = repo(&[
        (
            "db/migrations/20240301120000_drop_legacy_notes.up.sql",
            b"-- schemagate:guarded notes were archived to cold storage\nALTER TABLE orders DROP COLUMN legacy_notes;\n",
        ),
        (
            "db/migrations/20240301120000_drop_legacy_notes.down.sql",
            b"ALTER TABLE orders ADD COLUMN legacy_notes TEXT;\n",
        ),
    ]);
    let report = validate(dir.path(), Mode::Full).await;
    assert_eq!(
        rules(&report, GateKind::MigrationHygiene),
        vec![migration::RULE_LOCK]
    );
    assert_eq!(report.exit_code, 1);
}

#[tokio::test]
async fn truncated_trailing_alter_keeps_earlier_statements() {
    let dir = repo(&[(
        "db/migrations/20240301120000_drop_legacy_notes.up.sql",
        b"ALTER TABLE orders DROP COLUMN legacy_notes;\nALTER TABLE orders ADD (",
    )]);
    let report = validate(dir.path(), Mode::Full).await;
    let hygiene = report.result(GateKind::MigrationHygiene).unwrap();
    assert_eq!(hygiene.status, GateStatus::Fail);
    assert_eq!(hygiene.violations[0].rule, migration::RULE_UNGUARDED);
    assert!(report
        .parse_notes
        .iter()
        .all(|note| !note.message.starts_with("extraction failed")));
    assert_eq!(report.exit_code, 1);
}

#[tokio::test]
async fn scenario_d_compliant_table_passes_everything() {
    let dir = repo(&[("schema.sql", SCENARIO_D.as_bytes())]);
    let report = validate(dir.path(), Mode::Full).await;
    for result in &report.results {
        assert_eq!(result.status, GateStatus::Pass, "{}", result.gate);
    }
    assert_eq!(report.exit_code, 0);

    let (code, _) = cli(&[dir.path().to_str().unwrap(), "--format", "csv"]).await;
    assert_eq!(code, 0);
}

#[tokio::test]
async fn flyway_and_prisma_repository() {
    let dir = repo(&[
        (
            "src/main/resources/db/migration/V1__init.sql",
            b"CREATE TABLE accounts (id BIGINT PRIMARY KEY, balance DOUBLE) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4;\n",
        ),
        (
            "src/main/resources/db/migration/U1__init.sql",
            b"DROP TABLE accounts;\n",
        ),
        (
            "prisma/schema.prisma",
            b"model Ticket {\n  id    Int    @id\n  Title String\n}\n",
        ),
    ]);
    let report = validate(dir.path(), Mode::Full).await;
    assert_eq!(rules(&report, GateKind::Antipattern), vec![antipattern::RULE_FLOAT_MONEY]);
    // Prisma keeps the model and field names unless @@map/@map say otherwise.
    assert_eq!(
        rules(&report, GateKind::Naming),
        vec![naming::RULE_CASE, naming::RULE_CASE]
    );
    assert_eq!(
        report.result(GateKind::MigrationHygiene).unwrap().status,
        GateStatus::Pass
    );
}
