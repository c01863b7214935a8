use schemagate_core::models::{
    report::{GateKind, GateResult, Severity, Violation},
    schema::TableDefinition,
};

use super::naming::snake_case;
use super::{Gate, GateContext};
use crate::config::Lexicons;
use crate::extractor::types::parse_type;

pub const RULE_MISSING_PK: &str = "antipattern.missing-primary-key";
pub const RULE_ENUM: &str = "antipattern.enum-on-entity";
pub const RULE_FLOAT_MONEY: &str = "antipattern.float-money";
pub const RULE_TEXT_INDEX: &str = "antipattern.text-prefix-index";
pub const RULE_STRING_ID: &str = "antipattern.string-identifier";

/// ENUMs with more values than this on a business entity should be a lookup table.
pub const ENUM_VALUE_LIMIT: usize = 5;

pub struct AntipatternGate;

impl Gate for AntipatternGate {
    fn kind(&self) -> GateKind {
        GateKind::Antipattern
    }

    fn evaluate(&self, ctx: &GateContext) -> GateResult {
        let mut violations = Vec::new();
        for table in &ctx.model.tables {
            violations.extend(missing_primary_key(table));
            violations.extend(enum_misuse(table, &ctx.lexicons));
            violations.extend(float_money(table, &ctx.lexicons));
            violations.extend(text_prefix_index(table));
            violations.extend(string_identifiers(table, &ctx.lexicons));
        }
        GateResult::from_violations(GateKind::Antipattern, violations)
    }
}

fn missing_primary_key(table: &TableDefinition) -> Option<Violation> {
    (!table.has_primary_key).then(|| {
        Violation::new(
            RULE_MISSING_PK,
            Severity::Correctness,
            &table.source_artifact,
            table.source_line,
            format!("table `{}` has no primary key", table.name),
        )
        .with_suggestion("add `id BIGINT UNSIGNED NOT NULL AUTO_INCREMENT PRIMARY KEY`")
    })
}

fn enum_misuse(table: &TableDefinition, lexicons: &Lexicons) -> Vec<Violation> {
    if !lexicons.is_business_entity(&table.name) {
        return Vec::new();
    }
    table
        .columns
        .iter()
        .filter(|c| c.is_enum && c.enum_value_count > ENUM_VALUE_LIMIT)
        .map(|c| {
            Violation::new(
                RULE_ENUM,
                Severity::Style,
                &table.source_artifact,
                c.line.or(table.source_line),
                format!(
                    "ENUM column `{}.{}` has {} values on a mutable business entity",
                    table.name, c.name, c.enum_value_count
                ),
            )
            .with_suggestion(format!(
                "move the values into a `{}_{}` lookup table referenced by a foreign key",
                snake_case(&table.name),
                snake_case(&c.name)
            ))
        })
        .collect()
}

fn float_money(table: &TableDefinition, lexicons: &Lexicons) -> Vec<Violation> {
    table
        .columns
        .iter()
        .filter(|c| c.is_floating_point && lexicons.is_monetary(&c.name))
        .map(|c| {
            Violation::new(
                RULE_FLOAT_MONEY,
                Severity::Correctness,
                &table.source_artifact,
                c.line.or(table.source_line),
                format!(
                    "monetary column `{}.{}` is {}, which cannot represent cents exactly",
                    table.name, c.name, c.declared_type
                ),
            )
            .with_suggestion("DECIMAL(19,4)")
        })
        .collect()
}

fn text_prefix_index(table: &TableDefinition) -> Vec<Violation> {
    let mut violations = Vec::new();
    for index in table.indexes.iter().filter(|i| !i.is_fulltext) {
        for part in &index.columns {
            let Some(column) = table.column(&part.name) else {
                continue;
            };
            if !parse_type(&column.declared_type).is_text_or_blob() {
                continue;
            }
            let index_name = index.name.as_deref().unwrap_or("(unnamed)");
            let detail = match part.prefix_length {
                Some(length) => format!("a {}-byte prefix of", length),
                None => "the whole of".to_string(),
            };
            violations.push(
                Violation::new(
                    RULE_TEXT_INDEX,
                    Severity::Style,
                    &table.source_artifact,
                    index.line.or(table.source_line),
                    format!(
                        "index {} on `{}` covers {} {} column `{}`",
                        index_name, table.name, detail, column.declared_type, column.name
                    ),
                )
                .with_suggestion(
                    "index a generated hash or VARCHAR column instead, or use a FULLTEXT index",
                ),
            );
        }
    }
    violations
}

fn string_identifiers(table: &TableDefinition, lexicons: &Lexicons) -> Vec<Violation> {
    table
        .columns
        .iter()
        .filter(|c| lexicons.is_identifier_like(&c.name))
        .filter(|c| parse_type(&c.declared_type).is_character_string())
        .map(|c| {
            Violation::new(
                RULE_STRING_ID,
                Severity::Correctness,
                &table.source_artifact,
                c.line.or(table.source_line),
                format!(
                    "identifier column `{}.{}` is {}; joins against integer keys convert implicitly",
                    table.name, c.name, c.declared_type
                ),
            )
            .with_suggestion("BIGINT UNSIGNED (or BINARY(16) for UUIDs)")
        })
        .collect()
}
