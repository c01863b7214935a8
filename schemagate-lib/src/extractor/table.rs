//! Parsing of the pieces inside `CREATE TABLE (...)` and `ALTER TABLE ... ADD`.

use once_cell::sync::Lazy;
use regex::Regex;
use schemagate_core::models::schema::{
    ColumnDefinition, ConstraintDefinition, ConstraintKind, IndexColumn, IndexDefinition,
};

use super::sql::{
    blank_literals, leading_word, matching_paren, read_identifier, skip_whitespace, split_top_level,
    strip_keyword,
};
use super::types::parse_type;

static TYPE_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(?:NATIONAL\s+)?[A-Z]+(?:\s+(?:PRECISION|VARYING)\b)?").unwrap()
});
static TYPE_MODIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*(?:UNSIGNED|SIGNED|ZEROFILL)\b").unwrap());
static INLINE_PRIMARY: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bPRIMARY\s+KEY\b").unwrap());
static INLINE_UNIQUE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bUNIQUE\b").unwrap());
static COMMENT_OPTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)\bCOMMENT\s*=?\s*(?:'(?:[^'\\]|\\.|'')*'|"(?:[^"\\]|\\.|"")*")"#).unwrap()
});
static ENGINE_OPTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)\bENGINE(?:\s*=\s*|\s+)['"`]?([A-Za-z0-9_]+)"#).unwrap());
static CHARSET_OPTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\b(?:CHARACTER\s+SET|CHARSET)(?:\s*=\s*|\s+)['"`]?([A-Za-z0-9_]+)"#).unwrap()
});
static COLLATE_OPTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)\bCOLLATE(?:\s*=\s*|\s+)['"`]?([A-Za-z0-9_]+)"#).unwrap());

/// One comma-separated element of a table body.
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Column {
        column: ColumnDefinition,
        primary_key: bool,
        unique: bool,
    },
    PrimaryKey {
        index: IndexDefinition,
        constraint: Option<String>,
    },
    Index(IndexDefinition),
    Constraint {
        constraint: ConstraintDefinition,
        index: Option<IndexDefinition>,
    },
    /// Unnamed FOREIGN KEY/CHECK clauses carry nothing the gates read.
    Anonymous,
    Unknown(String),
}

pub fn parse_element(text: &str, line: usize) -> Element {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Element::Unknown(String::new());
    }
    let Some((word, after)) = leading_word(trimmed) else {
        // Starts with a quote: always a column.
        return parse_column(trimmed, line);
    };
    let rest = &trimmed[after..];
    match word.as_str() {
        "PRIMARY" => {
            let rest = strip_keyword(rest, "KEY").unwrap_or(rest);
            Element::PrimaryKey {
                index: parse_index(rest, line, true, false, false),
                constraint: None,
            }
        }
        "UNIQUE" => Element::Index(parse_index(skip_index_keyword(rest), line, true, false, true)),
        "INDEX" | "KEY" => Element::Index(parse_index(rest, line, false, false, true)),
        "FULLTEXT" => Element::Index(parse_index(skip_index_keyword(rest), line, false, true, true)),
        "SPATIAL" => Element::Index(parse_index(skip_index_keyword(rest), line, false, false, true)),
        "CONSTRAINT" => parse_constraint(rest, line),
        "FOREIGN" | "CHECK" => Element::Anonymous,
        _ => parse_column(trimmed, line),
    }
}

fn skip_index_keyword(text: &str) -> &str {
    strip_keyword(text, "INDEX")
        .or_else(|| strip_keyword(text, "KEY"))
        .unwrap_or(text)
}

fn parse_constraint(text: &str, line: usize) -> Element {
    let named = match leading_word(text) {
        Some((word, _)) if matches!(word.as_str(), "PRIMARY" | "UNIQUE" | "FOREIGN" | "CHECK") => None,
        _ => read_identifier(text),
    };
    let (name, body) = match named {
        Some((name, end)) => (Some(name), &text[end..]),
        None => (None, text),
    };
    let Some((word, _)) = leading_word(body) else {
        return Element::Unknown(text.trim().to_string());
    };
    let kind = match word.as_str() {
        "PRIMARY" => ConstraintKind::PrimaryKey,
        "UNIQUE" => ConstraintKind::Unique,
        "FOREIGN" => ConstraintKind::ForeignKey,
        "CHECK" => ConstraintKind::Check,
        _ => return Element::Unknown(text.trim().to_string()),
    };
    let inner = parse_element(body, line);
    match (kind, inner, name) {
        (ConstraintKind::PrimaryKey, Element::PrimaryKey { index, .. }, name) => {
            Element::PrimaryKey {
                index,
                constraint: name,
            }
        }
        (ConstraintKind::Unique, Element::Index(mut index), Some(name)) => {
            if index.name.is_none() {
                index.name = Some(name.clone());
            }
            Element::Constraint {
                constraint: ConstraintDefinition {
                    name,
                    kind,
                    line: Some(line),
                },
                index: Some(index),
            }
        }
        (ConstraintKind::Unique, Element::Index(index), None) => Element::Index(index),
        (_, _, Some(name)) => Element::Constraint {
            constraint: ConstraintDefinition {
                name,
                kind,
                line: Some(line),
            },
            index: None,
        },
        _ => Element::Anonymous,
    }
}

/// `[name] [USING x] (col[(len)] [ASC|DESC], ...)`
fn parse_index(text: &str, line: usize, is_unique: bool, is_fulltext: bool, named: bool) -> IndexDefinition {
    let start = skip_whitespace(text, 0);
    let mut name = None;
    let mut cursor = start;
    if named && !text[start..].starts_with('(') {
        let is_using = matches!(leading_word(&text[start..]), Some((w, _)) if w == "USING");
        if !is_using {
            if let Some((ident, end)) = read_identifier(&text[start..]) {
                name = Some(ident);
                cursor = start + end;
            }
        }
    }
    let columns = text[cursor..]
        .find('(')
        .and_then(|open| {
            let open = cursor + open;
            matching_paren(text, open).map(|close| parse_index_columns(&text[open + 1..close]))
        })
        .unwrap_or_default();

    IndexDefinition {
        name,
        columns,
        is_unique,
        is_fulltext,
        line: Some(line),
    }
}

pub fn parse_index_columns(list: &str) -> Vec<IndexColumn> {
    split_top_level(list)
        .into_iter()
        .filter_map(|(_, part)| {
            let part = part.trim();
            if part.starts_with('(') {
                // Functional key part.
                return Some(IndexColumn {
                    name: part.to_string(),
                    prefix_length: None,
                });
            }
            let (name, end) = read_identifier(part)?;
            let after = skip_whitespace(part, end);
            let prefix_length = if part[after..].starts_with('(') {
                matching_paren(part, after).and_then(|close| part[after + 1..close].trim().parse().ok())
            } else {
                None
            };
            Some(IndexColumn {
                name,
                prefix_length,
            })
        })
        .collect()
}

fn parse_column(text: &str, line: usize) -> Element {
    let Some((name, end)) = read_identifier(text) else {
        return Element::Unknown(text.to_string());
    };
    let rest = &text[end..];
    let Some(head) = TYPE_TOKEN.find(rest) else {
        return Element::Unknown(text.to_string());
    };
    let mut type_end = head.end();
    let after = skip_whitespace(rest, type_end);
    if rest[after..].starts_with('(') {
        if let Some(close) = matching_paren(rest, after) {
            type_end = close + 1;
        }
    }
    while let Some(modifier) = TYPE_MODIFIER.find(&rest[type_end..]) {
        type_end += modifier.end();
    }
    let declared_type = rest[..type_end]
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let attributes = blank_literals(&rest[type_end..]);
    let sql_type = parse_type(&declared_type);

    Element::Column {
        column: ColumnDefinition {
            name,
            is_enum: sql_type.enum_value_count().is_some(),
            enum_value_count: sql_type.enum_value_count().unwrap_or(0),
            is_floating_point: sql_type.is_floating_point(),
            declared_type,
            line: Some(line),
        },
        primary_key: INLINE_PRIMARY.is_match(&attributes),
        unique: INLINE_UNIQUE.is_match(&attributes),
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct TableOptions {
    pub engine: Option<String>,
    pub charset: Option<String>,
    pub collation: Option<String>,
}

/// Read `ENGINE=`, `[DEFAULT] CHARSET=`/`CHARACTER SET` and `COLLATE=`.
pub fn parse_table_options(text: &str) -> TableOptions {
    let cleaned = COMMENT_OPTION.replace_all(text, " ");
    let capture = |re: &Regex| re.captures(&cleaned).map(|c| c[1].to_string());
    TableOptions {
        engine: capture(&*ENGINE_OPTION),
        charset: capture(&*CHARSET_OPTION),
        collation: capture(&*COLLATE_OPTION),
    }
}
