use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::{migration::MigrationFile, schema::Identifier, schema::TableDefinition};

/// A statement the extractor could not classify; excluded from gate input.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ParseNote {
    pub artifact: PathBuf,
    pub line: Option<usize>,
    pub message: String,
}

impl ParseNote {
    pub fn new(artifact: impl Into<PathBuf>, line: Option<usize>, message: impl Into<String>) -> Self {
        Self {
            artifact: artifact.into(),
            line,
            message: message.into(),
        }
    }
}

/// Everything the gates read. Produced by the extractor for file inputs, or
/// handed over whole by a live/snapshot collaborator.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct SchemaModel {
    #[serde(default)]
    pub tables: Vec<TableDefinition>,
    #[serde(default)]
    pub identifiers: Vec<Identifier>,
    #[serde(default)]
    pub migrations: Vec<MigrationFile>,
    #[serde(default)]
    pub parse_notes: Vec<ParseNote>,
}

impl SchemaModel {
    pub fn merge(&mut self, other: SchemaModel) {
        self.tables.extend(other.tables);
        self.identifiers.extend(other.identifiers);
        self.migrations.extend(other.migrations);
        self.parse_notes.extend(other.parse_notes);
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty() && self.identifiers.is_empty() && self.migrations.is_empty()
    }
}
