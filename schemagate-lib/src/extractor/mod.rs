//! Tolerant, pattern-level extraction of the schema model from artifacts.
//!
//! Nothing here aborts on input it does not understand: unrecognized
//! statements become parse notes and are left out of gate evaluation.

mod lexer;
mod orm;
pub mod sql;
mod statements;
mod table;
pub mod types;

use std::path::Path;

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use schemagate_core::models::{
    artifact::{ArtifactKind, MigrationConvention, SchemaArtifact},
    migration::MigrationFile,
    snapshot::{ParseNote, SchemaModel},
};

use statements::{has_marker, marker_argument};

pub const IRREVERSIBLE_MARKER: &str = "schemagate:irreversible";

static SECTION_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*--\s*(?:migrate:(up|down)|\+migrate\s+(up|down)|\+goose\s+(up|down))\b")
        .unwrap()
});
static LIQUIBASE_DIRECTIVE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*--\s*(\w+)\b:?(.*)$").unwrap());
const LIQUIBASE_KEYWORDS: &[&str] = &[
    "liquibase", "changeset", "rollback", "comment", "precondition", "preconditions",
    "validchecksum", "ignorelines", "property",
];

/// Whether `text` contains in-file up/down section markers.
pub fn has_section_markers(text: &str) -> bool {
    text.lines().any(|line| SECTION_MARKER.is_match(line))
}

/// Extract tables, identifiers and (for migrations) the migration file from
/// one artifact.
pub fn extract(artifact: &SchemaArtifact) -> SchemaModel {
    let path = artifact.path.as_path();
    let mut model = SchemaModel::default();

    match artifact.kind {
        ArtifactKind::OrmSchema => {
            let out = orm::extract(path, &artifact.raw_text);
            model.tables = out.tables;
            model.identifiers = out.identifiers;
            model.parse_notes = out.notes;
        }
        ArtifactKind::SchemaDump => {
            let lexed = lexer::lex(&artifact.raw_text);
            let out = statements::analyze(path, &lexed.statements);
            model.tables = out.tables;
            model.identifiers = out.identifiers;
            model.parse_notes = out.notes;
        }
        ArtifactKind::Migration => {
            let sections = split_sections(&artifact.raw_text, artifact.convention);
            let lexed = lexer::lex(&sections.up);
            let out = statements::analyze(path, &lexed.statements);
            let mut notes = out.notes;

            let mut irreversible = sections.irreversible;
            for comment in lexed.comments.iter().filter(|c| has_marker(c, IRREVERSIBLE_MARKER)) {
                let why = marker_argument(&comment.text, IRREVERSIBLE_MARKER);
                if why.is_empty() {
                    notes.push(ParseNote::new(
                        path,
                        Some(comment.line),
                        "irreversible marker without justification ignored",
                    ));
                } else if irreversible.is_none() {
                    irreversible = Some(why);
                }
            }

            let down_artifact = match artifact.convention {
                Some(convention) if convention.rollback_is_inline() => {
                    sections.has_down.then(|| artifact.path.clone())
                }
                _ => artifact.rollback.clone(),
            };
            debug!(
                "{}: {} statements, rollback {:?}",
                path.display(),
                out.statements.len(),
                down_artifact
            );

            model.tables = out.tables;
            model.identifiers = out.identifiers;
            model.parse_notes = notes;
            model.migrations.push(MigrationFile {
                up_artifact: artifact.path.clone(),
                down_artifact,
                statements: out.statements,
                irreversible,
            });
        }
    }
    model
}

/// Extract from SQL text that did not come from a discovered file, such as
/// `SHOW CREATE TABLE` output.
pub fn extract_sql(origin: &Path, sql: &str) -> SchemaModel {
    extract(&SchemaArtifact::new(origin, ArtifactKind::SchemaDump, sql))
}

#[derive(Debug, Default, PartialEq)]
struct Sections {
    /// Up side with every other line blanked so line numbers are preserved.
    up: String,
    has_down: bool,
    irreversible: Option<String>,
}

fn split_sections(text: &str, convention: Option<MigrationConvention>) -> Sections {
    match convention {
        Some(MigrationConvention::Sectioned) => split_marked(text),
        Some(MigrationConvention::Changelog) => split_changelog(text),
        _ => Sections {
            up: text.to_string(),
            ..Default::default()
        },
    }
}

fn split_marked(text: &str) -> Sections {
    let mut sections = Sections::default();
    let mut up = Vec::new();
    let mut in_down = false;
    for line in text.lines() {
        if let Some(caps) = SECTION_MARKER.captures(line) {
            let direction = caps
                .iter()
                .skip(1)
                .flatten()
                .next()
                .map(|m| m.as_str().to_ascii_lowercase());
            in_down = direction.as_deref() == Some("down");
            up.push("");
            continue;
        }
        if in_down {
            if is_sql_content(line) {
                sections.has_down = true;
            }
            up.push("");
        } else {
            up.push(line);
        }
    }
    sections.up = up.join("\n");
    sections
}

/// Liquibase formatted SQL: `--changeset`, `--rollback` and friends are
/// directives rather than comments (no space after `--`).
fn split_changelog(text: &str) -> Sections {
    let mut sections = Sections::default();
    let mut up = Vec::new();
    for line in text.lines() {
        let directive = LIQUIBASE_DIRECTIVE.captures(line).and_then(|caps| {
            let keyword = caps[1].to_ascii_lowercase();
            LIQUIBASE_KEYWORDS
                .contains(&keyword.as_str())
                .then(|| (keyword, caps[2].trim().to_string()))
        });
        match directive {
            Some((keyword, argument)) => {
                if keyword == "rollback" {
                    let lowered = argument.to_ascii_lowercase();
                    if lowered == "not required" || lowered == "empty" {
                        sections
                            .irreversible
                            .get_or_insert_with(|| format!("liquibase rollback {}", lowered));
                    } else if !argument.is_empty() {
                        sections.has_down = true;
                    }
                }
                up.push("");
            }
            None => up.push(line),
        }
    }
    sections.up = up.join("\n");
    sections
}

fn is_sql_content(line: &str) -> bool {
    let trimmed = line.trim();
    !(trimmed.is_empty() || trimmed.starts_with("--") || trimmed.starts_with('#'))
}
