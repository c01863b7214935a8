use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum StatementClass {
    Ddl,
    Dml,
    Destructive,
    /// Destructive, but carrying an explicit safety annotation.
    Guarded,
}

impl StatementClass {
    pub fn is_schema_mutating(&self) -> bool {
        !matches!(self, StatementClass::Dml)
    }

    pub fn from_parts(dml: bool, destructive: bool, guarded: bool) -> Self {
        match (dml, destructive, guarded) {
            (true, _, _) => StatementClass::Dml,
            (false, true, true) => StatementClass::Guarded,
            (false, true, false) => StatementClass::Destructive,
            (false, false, _) => StatementClass::Ddl,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    CreateTable,
    AlterTable,
    DropTable,
    RenameTable,
    Truncate,
    CreateIndex,
    DropIndex,
    OtherDdl,
    Insert,
    Update,
    Delete,
    Replace,
    OtherDml,
}

impl Operation {
    pub fn is_dml(&self) -> bool {
        matches!(
            self,
            Operation::Insert
                | Operation::Update
                | Operation::Delete
                | Operation::Replace
                | Operation::OtherDml
        )
    }

    /// Operations that rebuild or lock a table unless run online.
    pub fn may_lock_table(&self) -> bool {
        matches!(self, Operation::AlterTable | Operation::CreateIndex)
    }
}

/// Column-level schema effect a statement has, replayed to detect narrowing.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum ColumnEffect {
    Define {
        table: String,
        column: String,
        declared_type: String,
    },
    Change {
        table: String,
        column: String,
        new_name: String,
        declared_type: String,
    },
    Drop {
        table: String,
        column: String,
    },
    DropTable {
        table: String,
    },
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Statement {
    pub class: StatementClass,
    pub operation: Operation,
    pub line: usize,
    /// First line of the statement, whitespace-collapsed, for messages.
    pub summary: String,
    pub target: Option<String>,
    /// Justification from an adjacent `schemagate:guarded` marker.
    pub guard: Option<String>,
    /// Carries `ALGORITHM=INPLACE|INSTANT`, `LOCK=NONE` or an online marker.
    pub online: bool,
    #[serde(default)]
    pub effects: Vec<ColumnEffect>,
}

impl Statement {
    pub fn is_destructive(&self) -> bool {
        matches!(
            self.class,
            StatementClass::Destructive | StatementClass::Guarded
        )
    }

    /// Re-derive the class after the narrowing catalog flags a change.
    pub fn mark_destructive(&mut self) {
        self.class = StatementClass::from_parts(false, true, self.guard.is_some());
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct MigrationFile {
    pub up_artifact: PathBuf,
    /// Down/undo side resolved by the framework convention. For inline
    /// conventions this is the up file itself.
    pub down_artifact: Option<PathBuf>,
    pub statements: Vec<Statement>,
    /// Justification from a `schemagate:irreversible` marker.
    pub irreversible: Option<String>,
}

impl MigrationFile {
    pub fn is_schema_mutating(&self) -> bool {
        self.statements.iter().any(|s| s.class.is_schema_mutating())
    }
}
