use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// One `CREATE TABLE` (or ORM model) worth of schema.
///
/// `engine`, `charset` and `collation` are `None` when the source leaves them
/// to the server default; gates report that separately from an explicit
/// non-compliant value.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TableDefinition {
    pub name: String,
    pub engine: Option<String>,
    pub charset: Option<String>,
    pub collation: Option<String>,
    pub columns: Vec<ColumnDefinition>,
    pub has_primary_key: bool,
    pub indexes: Vec<IndexDefinition>,
    #[serde(default)]
    pub constraints: Vec<ConstraintDefinition>,
    pub source_artifact: PathBuf,
    pub source_line: Option<usize>,
}

impl TableDefinition {
    pub fn new(name: impl Into<String>, source_artifact: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            engine: None,
            charset: None,
            collation: None,
            columns: Vec::new(),
            has_primary_key: false,
            indexes: Vec::new(),
            constraints: Vec::new(),
            source_artifact: source_artifact.into(),
            source_line: None,
        }
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDefinition> {
        self.columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ColumnDefinition {
    pub name: String,
    pub declared_type: String,
    pub is_enum: bool,
    pub enum_value_count: usize,
    pub is_floating_point: bool,
    pub line: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct IndexDefinition {
    /// `None` for unnamed keys, which MySQL names after the first column.
    pub name: Option<String>,
    pub columns: Vec<IndexColumn>,
    pub is_unique: bool,
    pub is_fulltext: bool,
    pub line: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct IndexColumn {
    pub name: String,
    pub prefix_length: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    PrimaryKey,
    Unique,
    ForeignKey,
    Check,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ConstraintDefinition {
    pub name: String,
    pub kind: ConstraintKind,
    pub line: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum IdentifierKind {
    Table,
    Column,
    Index,
    Constraint,
}

impl IdentifierKind {
    pub fn label(&self) -> &'static str {
        match self {
            IdentifierKind::Table => "table",
            IdentifierKind::Column => "column",
            IdentifierKind::Index => "index",
            IdentifierKind::Constraint => "constraint",
        }
    }
}

/// A name introduced outside a full table definition, e.g. by
/// `ALTER TABLE ... ADD INDEX` against a table defined elsewhere.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Identifier {
    pub name: String,
    pub kind: IdentifierKind,
    pub source_artifact: PathBuf,
    pub source_line: Option<usize>,
}
