use std::path::Path;

use schemagate_core::models::{
    report::{GateKind, GateResult, Severity, Violation},
    schema::IdentifierKind,
};

use super::{Gate, GateContext};
use crate::extractor::types::parse_type;
use crate::reserved::ReservedWords;

pub const RULE_CASE: &str = "naming.snake-case";
pub const RULE_RESERVED: &str = "naming.reserved-word";

pub struct NamingGate;

impl Gate for NamingGate {
    fn kind(&self) -> GateKind {
        GateKind::Naming
    }

    fn evaluate(&self, ctx: &GateContext) -> GateResult {
        let reserved = match &ctx.reserved {
            Ok(reserved) => reserved,
            Err(reason) => return GateResult::skipped(GateKind::Naming, reason.clone()),
        };
        let mut violations = Vec::new();
        for named in collect_names(ctx) {
            violations.extend(check_name(&named, reserved));
        }
        GateResult::from_violations(GateKind::Naming, violations).with_note(reserved.disclosure())
    }
}

struct Named<'a> {
    name: &'a str,
    kind: IdentifierKind,
    path: &'a Path,
    line: Option<usize>,
    integer: bool,
}

fn collect_names(ctx: &GateContext) -> Vec<Named<'_>> {
    let mut names = Vec::new();
    for table in &ctx.model.tables {
        let path = table.source_artifact.as_path();
        names.push(Named {
            name: &table.name,
            kind: IdentifierKind::Table,
            path,
            line: table.source_line,
            integer: false,
        });
        for column in &table.columns {
            names.push(Named {
                name: &column.name,
                kind: IdentifierKind::Column,
                path,
                line: column.line,
                integer: parse_type(&column.declared_type).is_integer(),
            });
        }
        for index in &table.indexes {
            if let Some(name) = &index.name {
                names.push(Named {
                    name,
                    kind: IdentifierKind::Index,
                    path,
                    line: index.line,
                    integer: false,
                });
            }
        }
        for constraint in &table.constraints {
            // Named UNIQUE constraints also appear as indexes.
            if table.indexes.iter().any(|i| i.name.as_deref() == Some(constraint.name.as_str())) {
                continue;
            }
            names.push(Named {
                name: &constraint.name,
                kind: IdentifierKind::Constraint,
                path,
                line: constraint.line,
                integer: false,
            });
        }
    }
    for identifier in &ctx.model.identifiers {
        names.push(Named {
            name: &identifier.name,
            kind: identifier.kind,
            path: &identifier.source_artifact,
            line: identifier.source_line,
            integer: false,
        });
    }
    names
}

fn check_name(named: &Named<'_>, reserved: &ReservedWords) -> Vec<Violation> {
    let mut violations = Vec::new();
    let label = named.kind.label();
    if !is_snake_case(named.name) {
        violations.push(
            Violation::new(
                RULE_CASE,
                Severity::Style,
                named.path,
                named.line,
                format!("{} `{}` is not snake_case", label, named.name),
            )
            .with_suggestion(remediated_name(named.name, named.kind, named.integer, reserved)),
        );
    }
    if reserved.lookup(named.name) {
        violations.push(
            Violation::new(
                RULE_RESERVED,
                Severity::Correctness,
                named.path,
                named.line,
                format!("{} `{}` is a reserved word", label, named.name),
            )
            .with_suggestion(reserved_alternative(
                &snake_case(named.name),
                named.kind,
                named.integer,
                reserved,
            )),
        );
    }
    violations
}

pub fn is_snake_case(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

/// Lower-case with `_` at case boundaries: `OrderID` -> `order_id`,
/// `HTMLParser` -> `html_parser`. Other characters become `_`.
pub fn snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut raw = String::with_capacity(name.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_ascii_uppercase() {
            let prev = if i > 0 { Some(chars[i - 1]) } else { None };
            let next = chars.get(i + 1).copied();
            let boundary = match prev {
                Some(p) if p.is_ascii_lowercase() || p.is_ascii_digit() => true,
                Some(p) if p.is_ascii_uppercase() => next.is_some_and(|n| n.is_ascii_lowercase()),
                _ => false,
            };
            if boundary {
                raw.push('_');
            }
            raw.push(c.to_ascii_lowercase());
        } else if c.is_ascii_lowercase() || c.is_ascii_digit() {
            raw.push(c);
        } else {
            raw.push('_');
        }
    }
    let collapsed = raw
        .split('_')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_");
    if collapsed.is_empty() {
        "unnamed".to_string()
    } else {
        collapsed
    }
}

/// The name after every naming rule has been applied.
pub fn remediated_name(
    name: &str,
    kind: IdentifierKind,
    integer: bool,
    reserved: &ReservedWords,
) -> String {
    let snake = snake_case(name);
    if reserved.lookup(&snake) {
        reserved_alternative(&snake, kind, integer, reserved)
    } else {
        snake
    }
}

fn reserved_alternative(
    snake: &str,
    kind: IdentifierKind,
    integer: bool,
    reserved: &ReservedWords,
) -> String {
    let candidates = match kind {
        IdentifierKind::Table => vec![pluralize(snake), format!("app_{}", snake)],
        IdentifierKind::Column if integer => vec![format!("{}_id", snake), format!("{}_value", snake)],
        IdentifierKind::Column => vec![format!("{}_name", snake), format!("{}_value", snake)],
        IdentifierKind::Index => vec![format!("idx_{}", snake)],
        IdentifierKind::Constraint => vec![format!("con_{}", snake)],
    };
    candidates
        .into_iter()
        .find(|candidate| !reserved.lookup(candidate))
        .unwrap_or_else(|| format!("{}_{}", kind.label(), snake))
}

fn pluralize(word: &str) -> String {
    if let Some(stem) = word.strip_suffix('y') {
        if !stem.ends_with(['a', 'e', 'i', 'o', 'u']) && !stem.is_empty() {
            return format!("{}ies", stem);
        }
    }
    if word.ends_with(['s', 'x', 'z']) || word.ends_with("ch") || word.ends_with("sh") {
        format!("{}es", word)
    } else {
        format!("{}s", word)
    }
}
