//! Pattern-level analysis of individual SQL statements.

use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use schemagate_core::models::{
    migration::{ColumnEffect, Operation, Statement, StatementClass},
    schema::{
        ConstraintDefinition, ConstraintKind, Identifier, IdentifierKind, IndexColumn,
        IndexDefinition, TableDefinition,
    },
    snapshot::ParseNote,
};

use super::lexer::{Comment, RawStatement};
use super::sql::{
    blank_literals, leading_word, line_at, matching_paren, read_identifier, skip_whitespace,
    split_top_level, strip_keyword, summarize,
};
use super::table::{parse_element, parse_index_columns, parse_table_options, Element};

static CREATE_TABLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)^\s*CREATE\s+(?:OR\s+REPLACE\s+)?(?:TEMPORARY\s+)?TABLE\s+(?:IF\s+NOT\s+EXISTS\s+)?").unwrap()
});
static CREATE_INDEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)^\s*CREATE\s+(?:ONLINE\s+|OFFLINE\s+)?(?:(UNIQUE|FULLTEXT|SPATIAL)\s+)?INDEX\s+(?:IF\s+NOT\s+EXISTS\s+)?").unwrap()
});
static ALTER_TABLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)^\s*ALTER\s+(?:ONLINE\s+|OFFLINE\s+)?(?:IGNORE\s+)?TABLE\s+").unwrap()
});
static DROP_TABLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)^\s*DROP\s+(?:TEMPORARY\s+)?TABLES?\s+(?:IF\s+EXISTS\s+)?").unwrap()
});
static DROP_DATABASE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)^\s*DROP\s+(?:DATABASE|SCHEMA)\b").unwrap());
static DROP_INDEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)^\s*DROP\s+INDEX\b").unwrap());
static RENAME_TABLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)^\s*RENAME\s+TABLES?\s+").unwrap());
static TRUNCATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)^\s*TRUNCATE\s+(?:TABLE\s+)?").unwrap());
static ON_CLAUSE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\sON\s").unwrap());
static ONLINE_HINT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bALGORITHM\s*=?\s*(?:INPLACE|INSTANT)\b|\bLOCK\s*=?\s*NONE\b").unwrap()
});

pub const GUARD_MARKER: &str = "schemagate:guarded";
pub const ONLINE_MARKER: &str = "schemagate:online";

/// Session and read-only statements that carry no schema meaning.
const IGNORED_VERBS: &[&str] = &[
    "SET", "USE", "BEGIN", "START", "COMMIT", "ROLLBACK", "SAVEPOINT", "LOCK", "UNLOCK",
    "SELECT", "SHOW", "DESCRIBE", "EXPLAIN", "ANALYZE", "OPTIMIZE", "FLUSH", "DO", "PREPARE",
    "EXECUTE", "DEALLOCATE", "GRANT", "REVOKE", "CHECKSUM", "XA",
];

#[derive(Debug, Default)]
pub struct SqlAnalysis {
    pub tables: Vec<TableDefinition>,
    pub identifiers: Vec<Identifier>,
    pub statements: Vec<Statement>,
    pub notes: Vec<ParseNote>,
}

pub fn analyze(path: &Path, statements: &[RawStatement]) -> SqlAnalysis {
    let mut analyzer = Analyzer {
        path: path.to_path_buf(),
        out: SqlAnalysis::default(),
    };
    for raw in statements {
        analyzer.statement(raw);
    }
    analyzer.out
}

struct Analyzer {
    path: PathBuf,
    out: SqlAnalysis,
}

impl Analyzer {
    fn statement(&mut self, raw: &RawStatement) {
        let Some((verb, _)) = leading_word(&raw.text) else {
            self.note(raw.start_line, "statement does not start with a keyword; skipped");
            return;
        };
        match verb.as_str() {
            "CREATE" => self.create(raw),
            "ALTER" => self.alter(raw),
            "DROP" => self.drop(raw),
            "TRUNCATE" => {
                let target = TRUNCATE
                    .find(&raw.text)
                    .and_then(|m| read_identifier(&raw.text[m.end()..]))
                    .map(|(name, _)| name);
                self.push(raw, Operation::Truncate, true, target, Vec::new());
            }
            "RENAME" => self.rename(raw),
            "INSERT" => self.push(raw, Operation::Insert, false, None, Vec::new()),
            "UPDATE" => self.push(raw, Operation::Update, false, None, Vec::new()),
            "DELETE" => self.push(raw, Operation::Delete, false, None, Vec::new()),
            "REPLACE" => self.push(raw, Operation::Replace, false, None, Vec::new()),
            "LOAD" => self.push(raw, Operation::OtherDml, false, None, Vec::new()),
            verb if IGNORED_VERBS.contains(&verb) => {}
            verb => self.note(
                raw.start_line,
                format!("unrecognized `{}` statement excluded from analysis", verb),
            ),
        }
    }

    fn create(&mut self, raw: &RawStatement) {
        if let Some(m) = CREATE_TABLE.find(&raw.text) {
            return self.create_table(raw, m.end());
        }
        if let Some(caps) = CREATE_INDEX.captures(&raw.text) {
            let kind = caps.get(1).map(|k| k.as_str().to_uppercase());
            let end = caps.get(0).map(|m| m.end()).unwrap_or_default();
            return self.create_index(raw, end, kind.as_deref());
        }
        self.push(raw, Operation::OtherDdl, false, None, Vec::new());
    }

    fn create_table(&mut self, raw: &RawStatement, name_start: usize) {
        let text = &raw.text;
        let Some((name, name_end)) = read_identifier(&text[name_start..]) else {
            self.note(raw.start_line, "CREATE TABLE without a readable table name");
            return;
        };
        let body_start = skip_whitespace(text, name_start + name_end);
        if !text[body_start..].starts_with('(') {
            self.note(
                raw.start_line,
                format!("CREATE TABLE `{}` has no column list (LIKE/AS SELECT); skipped", name),
            );
            self.push(raw, Operation::CreateTable, false, Some(name), Vec::new());
            return;
        }
        let Some(body_end) = matching_paren(text, body_start) else {
            self.note(raw.start_line, format!("CREATE TABLE `{}` has an unterminated column list", name));
            return;
        };

        let mut table = TableDefinition::new(name.clone(), self.path.clone());
        table.source_line = Some(raw.start_line);
        let body = &text[body_start + 1..body_end];
        for (offset, element) in split_top_level(body) {
            let absolute = skip_whitespace(text, body_start + 1 + offset);
            let line = line_at(text, absolute, raw.start_line);
            match parse_element(element, line) {
                Element::Unknown(fragment) if fragment.is_empty() => {}
                Element::Unknown(fragment) => self.note(
                    line,
                    format!("unrecognized element `{}` in table `{}`", summarize(&fragment), name),
                ),
                other => apply_element(&mut table, other),
            }
        }
        let options = parse_table_options(&text[body_end + 1..]);
        table.engine = options.engine;
        table.charset = options.charset;
        table.collation = options.collation;

        let effects = table
            .columns
            .iter()
            .map(|c| ColumnEffect::Define {
                table: name.clone(),
                column: c.name.clone(),
                declared_type: c.declared_type.clone(),
            })
            .collect();
        self.out.tables.push(table);
        self.push(raw, Operation::CreateTable, false, Some(name), effects);
    }

    fn create_index(&mut self, raw: &RawStatement, name_start: usize, kind: Option<&str>) {
        let text = &raw.text;
        let Some((index_name, name_end)) = read_identifier(&text[name_start..]) else {
            self.note(raw.start_line, "CREATE INDEX without a readable index name");
            return;
        };
        let rest_start = name_start + name_end;
        let Some(on) = ON_CLAUSE.find(&text[rest_start..]) else {
            self.note(raw.start_line, format!("CREATE INDEX `{}` without ON clause", index_name));
            return;
        };
        let table_start = rest_start + on.end();
        let Some((table_name, table_end)) = read_identifier(&text[table_start..]) else {
            self.note(raw.start_line, format!("CREATE INDEX `{}` without target table", index_name));
            return;
        };
        let after = table_start + table_end;
        let columns = text[after..]
            .find('(')
            .and_then(|open| {
                let open = after + open;
                matching_paren(text, open).map(|close| parse_index_columns(&text[open + 1..close]))
            })
            .unwrap_or_default();
        let index = IndexDefinition {
            name: Some(index_name.clone()),
            columns,
            is_unique: kind == Some("UNIQUE"),
            is_fulltext: kind == Some("FULLTEXT"),
            line: Some(raw.start_line),
        };
        match self.local_table(&table_name) {
            Some(table) => table.indexes.push(index),
            None => self.identifier(index_name, IdentifierKind::Index, raw.start_line),
        }
        self.push(raw, Operation::CreateIndex, false, Some(table_name), Vec::new());
    }

    fn alter(&mut self, raw: &RawStatement) {
        let text = &raw.text;
        let Some(m) = ALTER_TABLE.find(text) else {
            self.push(raw, Operation::OtherDdl, false, None, Vec::new());
            return;
        };
        let Some((table_name, name_end)) = read_identifier(&text[m.end()..]) else {
            self.note(raw.start_line, "ALTER TABLE without a readable table name");
            return;
        };
        let specs_start = m.end() + name_end;
        let mut destructive = false;
        let mut effects = Vec::new();

        for (offset, spec) in split_top_level(&text[specs_start..]) {
            let absolute = skip_whitespace(text, specs_start + offset);
            let line = line_at(text, absolute, raw.start_line);
            let Some((word, after)) = leading_word(spec) else {
                continue;
            };
            let rest = &spec[after..];
            match word.as_str() {
                "ADD" => self.alter_add(&table_name, rest, line, &mut effects),
                "DROP" => {
                    if let Some(effect) = alter_drop(&table_name, rest) {
                        destructive = true;
                        if let (ColumnEffect::Drop { column, .. }, Some(table)) =
                            (&effect, self.local_table(&table_name))
                        {
                            table.columns.retain(|c| !c.name.eq_ignore_ascii_case(column));
                        }
                        effects.push(effect);
                    } else if matches!(leading_word(rest), Some((w, _)) if w == "PARTITION") {
                        destructive = true;
                    } else if matches!(leading_word(rest), Some((w, _)) if w == "PRIMARY") {
                        if let Some(table) = self.local_table(&table_name) {
                            table.has_primary_key = false;
                        }
                    }
                }
                "MODIFY" => {
                    let rest = strip_keyword(rest, "COLUMN").unwrap_or(rest);
                    self.alter_change(&table_name, None, rest, line, &mut effects);
                }
                "CHANGE" => {
                    let rest = strip_keyword(rest, "COLUMN").unwrap_or(rest);
                    if let Some((old, end)) = read_identifier(rest) {
                        self.alter_change(&table_name, Some(old), &rest[end..], line, &mut effects);
                    }
                }
                "RENAME" => self.alter_rename(&table_name, rest, line),
                "ENGINE" | "DEFAULT" | "CHARSET" | "CHARACTER" | "COLLATE" | "CONVERT" => {
                    let options = parse_table_options(spec);
                    if let Some(table) = self.local_table(&table_name) {
                        if options.engine.is_some() {
                            table.engine = options.engine;
                        }
                        if options.charset.is_some() {
                            table.charset = options.charset;
                        }
                        if options.collation.is_some() {
                            table.collation = options.collation;
                        }
                    }
                }
                _ => {}
            }
        }
        self.push(raw, Operation::AlterTable, destructive, Some(table_name), effects);
    }

    fn alter_add(&mut self, table_name: &str, rest: &str, line: usize, effects: &mut Vec<ColumnEffect>) {
        let rest = strip_keyword(rest, "COLUMN").unwrap_or(rest);
        let start = skip_whitespace(rest, 0);
        let elements: Vec<Element> = if rest[start..].starts_with('(') {
            let body = match matching_paren(rest, start) {
                Some(close) => &rest[start + 1..close],
                None => {
                    self.note(line, "unterminated ADD clause list");
                    &rest[start + 1..]
                }
            };
            split_top_level(body)
                .into_iter()
                .map(|(_, e)| parse_element(e, line))
                .collect()
        } else {
            vec![parse_element(rest, line)]
        };

        for element in elements {
            if let Element::Column { column, .. } = &element {
                effects.push(ColumnEffect::Define {
                    table: table_name.to_string(),
                    column: column.name.clone(),
                    declared_type: column.declared_type.clone(),
                });
            }
            if let Some(table) = self.local_table(table_name) {
                apply_element(table, element);
                continue;
            }
            match element {
                Element::Column { column, .. } => self.identifier(column.name, IdentifierKind::Column, line),
                Element::Index(index) | Element::PrimaryKey { index, constraint: None } => {
                    if let Some(name) = index.name {
                        self.identifier(name, IdentifierKind::Index, line);
                    }
                }
                Element::PrimaryKey {
                    constraint: Some(name),
                    ..
                } => self.identifier(name, IdentifierKind::Constraint, line),
                Element::Constraint { constraint, .. } => {
                    self.identifier(constraint.name, IdentifierKind::Constraint, line)
                }
                Element::Anonymous => {}
                Element::Unknown(fragment) => {
                    if !fragment.is_empty() {
                        self.note(line, format!("unrecognized ADD clause `{}`", summarize(&fragment)));
                    }
                }
            }
        }
    }

    fn alter_change(
        &mut self,
        table_name: &str,
        old_name: Option<String>,
        definition: &str,
        line: usize,
        effects: &mut Vec<ColumnEffect>,
    ) {
        let Element::Column { column, .. } = parse_element(definition, line) else {
            self.note(line, format!("unreadable column change on `{}`", table_name));
            return;
        };
        let renamed = old_name
            .as_ref()
            .is_some_and(|old| !old.eq_ignore_ascii_case(&column.name));
        effects.push(ColumnEffect::Change {
            table: table_name.to_string(),
            column: old_name.clone().unwrap_or_else(|| column.name.clone()),
            new_name: column.name.clone(),
            declared_type: column.declared_type.clone(),
        });
        let target = old_name.unwrap_or_else(|| column.name.clone());
        if let Some(table) = self.local_table(table_name) {
            if let Some(existing) = table
                .columns
                .iter_mut()
                .find(|c| c.name.eq_ignore_ascii_case(&target))
            {
                *existing = column;
            } else {
                table.columns.push(column);
            }
        } else if renamed {
            self.identifier(column.name, IdentifierKind::Column, line);
        }
    }

    fn alter_rename(&mut self, table_name: &str, rest: &str, line: usize) {
        let (kind, rest) = match leading_word(rest) {
            Some((w, end)) if w == "COLUMN" => (IdentifierKind::Column, &rest[end..]),
            Some((w, end)) if w == "INDEX" || w == "KEY" => (IdentifierKind::Index, &rest[end..]),
            Some((w, end)) if w == "TO" || w == "AS" => {
                if let Some((name, _)) = read_identifier(&rest[end..]) {
                    self.identifier(name, IdentifierKind::Table, line);
                }
                return;
            }
            _ => {
                if let Some((name, _)) = read_identifier(rest) {
                    self.identifier(name, IdentifierKind::Table, line);
                }
                return;
            }
        };
        let Some((old, end)) = read_identifier(rest) else {
            return;
        };
        let Some(after_to) = strip_keyword(&rest[end..], "TO") else {
            return;
        };
        let Some((new_name, _)) = read_identifier(after_to) else {
            return;
        };
        if kind == IdentifierKind::Column {
            if let Some(column) = self
                .local_table(table_name)
                .and_then(|t| t.columns.iter_mut().find(|c| c.name.eq_ignore_ascii_case(&old)))
            {
                column.name = new_name;
                return;
            }
        }
        self.identifier(new_name, kind, line);
    }

    fn drop(&mut self, raw: &RawStatement) {
        let text = &raw.text;
        if let Some(m) = DROP_TABLE.find(text) {
            let mut effects = Vec::new();
            let mut first = None;
            for (_, part) in split_top_level(&text[m.end()..]) {
                if let Some((name, _)) = read_identifier(part) {
                    first.get_or_insert_with(|| name.clone());
                    effects.push(ColumnEffect::DropTable { table: name });
                }
            }
            self.push(raw, Operation::DropTable, true, first, effects);
        } else if DROP_DATABASE.is_match(text) {
            self.push(raw, Operation::OtherDdl, true, None, Vec::new());
        } else if DROP_INDEX.is_match(text) {
            self.push(raw, Operation::DropIndex, false, None, Vec::new());
        } else {
            self.push(raw, Operation::OtherDdl, false, None, Vec::new());
        }
    }

    fn rename(&mut self, raw: &RawStatement) {
        let text = &raw.text;
        let Some(m) = RENAME_TABLE.find(text) else {
            self.note(raw.start_line, "unrecognized RENAME statement excluded from analysis");
            return;
        };
        for (offset, pair) in split_top_level(&text[m.end()..]) {
            let line = line_at(text, skip_whitespace(text, m.end() + offset), raw.start_line);
            let Some((_, end)) = read_identifier(pair) else {
                continue;
            };
            if let Some((new_name, _)) = strip_keyword(&pair[end..], "TO").and_then(read_identifier) {
                self.identifier(new_name, IdentifierKind::Table, line);
            }
        }
        self.push(raw, Operation::RenameTable, false, None, Vec::new());
    }

    fn push(
        &mut self,
        raw: &RawStatement,
        operation: Operation,
        destructive: bool,
        target: Option<String>,
        effects: Vec<ColumnEffect>,
    ) {
        let guard = self.guard(raw);
        let online = ONLINE_HINT.is_match(&blank_literals(&raw.text))
            || raw.comments.iter().any(|c| has_marker(c, ONLINE_MARKER));
        self.out.statements.push(Statement {
            class: StatementClass::from_parts(operation.is_dml(), destructive, guard.is_some()),
            operation,
            line: raw.start_line,
            summary: summarize(&raw.text),
            target,
            guard,
            online,
            effects,
        });
    }

    fn guard(&mut self, raw: &RawStatement) -> Option<String> {
        let comment = raw.comments.iter().find(|c| has_marker(c, GUARD_MARKER))?;
        let justification = marker_argument(&comment.text, GUARD_MARKER);
        if justification.is_empty() {
            self.note(comment.line, "guard marker without justification ignored");
            return None;
        }
        Some(justification)
    }

    fn local_table(&mut self, name: &str) -> Option<&mut TableDefinition> {
        self.out
            .tables
            .iter_mut()
            .rev()
            .find(|t| t.name.eq_ignore_ascii_case(name))
    }

    fn identifier(&mut self, name: String, kind: IdentifierKind, line: usize) {
        self.out.identifiers.push(Identifier {
            name,
            kind,
            source_artifact: self.path.clone(),
            source_line: Some(line),
        });
    }

    fn note(&mut self, line: usize, message: impl Into<String>) {
        self.out
            .notes
            .push(ParseNote::new(self.path.clone(), Some(line), message));
    }
}

/// `DROP [COLUMN] name`, excluding index/key/constraint drops.
fn alter_drop(table: &str, rest: &str) -> Option<ColumnEffect> {
    let rest = match leading_word(rest) {
        Some((w, end)) if w == "COLUMN" => &rest[end..],
        Some((w, _))
            if matches!(
                w.as_str(),
                "INDEX" | "KEY" | "PRIMARY" | "FOREIGN" | "CONSTRAINT" | "CHECK" | "PARTITION"
                    | "DEFAULT" | "SYSTEM"
            ) =>
        {
            return None
        }
        _ => rest,
    };
    let rest = strip_keyword(rest, "IF")
        .and_then(|r| strip_keyword(r, "EXISTS"))
        .unwrap_or(rest);
    read_identifier(rest).map(|(column, _)| ColumnEffect::Drop {
        table: table.to_string(),
        column,
    })
}

pub fn apply_element(table: &mut TableDefinition, element: Element) {
    match element {
        Element::Column {
            column,
            primary_key,
            unique,
        } => {
            if primary_key {
                table.has_primary_key = true;
            }
            if unique {
                table.indexes.push(IndexDefinition {
                    name: None,
                    columns: vec![IndexColumn {
                        name: column.name.clone(),
                        prefix_length: None,
                    }],
                    is_unique: true,
                    is_fulltext: false,
                    line: column.line,
                });
            }
            table.columns.push(column);
        }
        Element::PrimaryKey { mut index, constraint } => {
            table.has_primary_key = true;
            if let Some(name) = constraint {
                table.constraints.push(ConstraintDefinition {
                    name,
                    kind: ConstraintKind::PrimaryKey,
                    line: index.line,
                });
            }
            // MySQL always names the primary key `PRIMARY`.
            index.name = None;
            table.indexes.push(index);
        }
        Element::Index(index) => table.indexes.push(index),
        Element::Constraint { constraint, index } => {
            table.constraints.push(constraint);
            if let Some(index) = index {
                table.indexes.push(index);
            }
        }
        Element::Anonymous | Element::Unknown(_) => {}
    }
}

pub fn has_marker(comment: &Comment, marker: &str) -> bool {
    comment.text.to_ascii_lowercase().contains(marker)
}

/// Text following `marker` within a comment, trimmed.
pub fn marker_argument(text: &str, marker: &str) -> String {
    let lower = text.to_ascii_lowercase();
    match lower.find(marker) {
        Some(pos) => text[pos + marker.len()..]
            .trim_start_matches(|c: char| c == ':' || c == '-' || c.is_whitespace())
            .trim()
            .to_string(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::lexer::lex;

    fn run(sql: &str) -> SqlAnalysis {
        analyze(Path::new("db/schema.sql"), &lex(sql).statements)
    }

    #[test]
    fn builds_table_definitions() {
        let out = run(
            "CREATE TABLE IF NOT EXISTS `users` (\n  `id` BIGINT NOT NULL,\n  `email` VARCHAR(255),\n  PRIMARY KEY (`id`),\n  UNIQUE KEY `uq_email` (`email`)\n) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4;",
        );
        assert_eq!(out.tables.len(), 1);
        let table = &out.tables[0];
        assert_eq!(table.name, "users");
        assert!(table.has_primary_key);
        assert_eq!(table.engine.as_deref(), Some("InnoDB"));
        assert_eq!(table.charset.as_deref(), Some("utf8mb4"));
        assert_eq!(table.columns[1].line, Some(3));
        assert_eq!(table.indexes[1].name.as_deref(), Some("uq_email"));
        assert!(out.notes.is_empty());
    }

    #[test]
    fn merges_alters_into_local_tables() {
        let out = run(
            "CREATE TABLE t (a INT);\nALTER TABLE t ADD COLUMN b INT, ADD PRIMARY KEY (a), ENGINE=MyISAM;\nCREATE INDEX idx_b ON t (b);",
        );
        let table = &out.tables[0];
        assert_eq!(table.columns.len(), 2);
        assert!(table.has_primary_key);
        assert_eq!(table.engine.as_deref(), Some("MyISAM"));
        assert_eq!(table.indexes.last().unwrap().name.as_deref(), Some("idx_b"));
        assert!(out.identifiers.is_empty());
    }

    #[test]
    fn foreign_alters_become_identifiers() {
        let out = run("ALTER TABLE orders ADD INDEX idxCreated (created_at), ADD COLUMN NoteText TEXT;");
        let names: Vec<_> = out.identifiers.iter().map(|i| (i.name.as_str(), i.kind)).collect();
        assert_eq!(
            names,
            vec![("idxCreated", IdentifierKind::Index), ("NoteText", IdentifierKind::Column)]
        );
        assert_eq!(out.statements[0].class, StatementClass::Ddl);
    }

    #[test]
    fn classifies_destructive_statements() {
        let out = run(
            "ALTER TABLE orders DROP COLUMN legacy_notes;\nALTER TABLE orders DROP INDEX idx_a;\nTRUNCATE TABLE logs;\nDROP TABLE IF EXISTS a, b;\nDROP INDEX idx ON t;",
        );
        let classes: Vec<_> = out.statements.iter().map(|s| s.class).collect();
        assert_eq!(
            classes,
            vec![
                StatementClass::Destructive,
                StatementClass::Ddl,
                StatementClass::Destructive,
                StatementClass::Destructive,
                StatementClass::Ddl,
            ]
        );
        assert_eq!(out.statements[3].effects.len(), 2);
    }

    #[test]
    fn reads_guard_and_online_markers() {
        let out = run(
            "-- schemagate:guarded column emptied in 2023 backfill\nALTER TABLE t DROP COLUMN x;\nALTER TABLE t ADD COLUMN y INT, ALGORITHM=INSTANT;\nCREATE INDEX i ON t (y); -- schemagate:online\nALTER TABLE t DROP COLUMN z; -- schemagate:guarded\n",
        );
        assert_eq!(out.statements[0].class, StatementClass::Guarded);
        assert_eq!(
            out.statements[0].guard.as_deref(),
            Some("column emptied in 2023 backfill")
        );
        assert!(out.statements[1].online);
        assert!(out.statements[2].online);
        assert_eq!(out.statements[3].class, StatementClass::Destructive);
        assert_eq!(out.notes.len(), 1);
    }

    #[test]
    fn tolerates_unknown_statements() {
        let out = run("SET NAMES utf8mb4;\nFROBNICATE everything;\nINSERT INTO t VALUES (1);");
        assert_eq!(out.notes.len(), 1);
        assert_eq!(out.notes[0].line, Some(2));
        assert_eq!(out.statements.len(), 1);
        assert_eq!(out.statements[0].class, StatementClass::Dml);
    }

    #[test]
    fn unterminated_add_list_is_noted() {
        let out = run("ALTER TABLE orders DROP COLUMN legacy_notes;\nALTER TABLE orders ADD (");
        assert_eq!(out.statements.len(), 2);
        assert_eq!(out.statements[0].class, StatementClass::Destructive);
        assert_eq!(out.notes[0].line, Some(2));

        let out = run("ALTER TABLE t ADD (é");
        assert_eq!(out.statements.len(), 1);
        assert!(!out.notes.is_empty());
    }

    #[test]
    fn records_column_changes() {
        let out = run("ALTER TABLE t MODIFY COLUMN a VARCHAR(10) NOT NULL, CHANGE b c INT;");
        assert_eq!(
            out.statements[0].effects,
            vec![
                ColumnEffect::Change {
                    table: "t".into(),
                    column: "a".into(),
                    new_name: "a".into(),
                    declared_type: "VARCHAR(10)".into(),
                },
                ColumnEffect::Change {
                    table: "t".into(),
                    column: "b".into(),
                    new_name: "c".into(),
                    declared_type: "INT".into(),
                },
            ]
        );
        assert_eq!(out.identifiers[0].name, "c");
    }
}
