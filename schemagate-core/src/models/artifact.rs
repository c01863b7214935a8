use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    SchemaDump,
    Migration,
    OrmSchema,
}

/// Migration framework naming convention an artifact was discovered under.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum MigrationConvention {
    /// `<version>_<name>.up.sql` with a sibling `.down.sql`.
    TimestampedPair,
    /// Flyway `V<version>__<desc>.sql` with an optional `U<version>__*.sql` undo.
    Versioned,
    /// Single file carrying in-file up/down markers (dbmate, sql-migrate, goose).
    Sectioned,
    /// SQL file included from a Liquibase changelog, `--rollback` lines inline.
    Changelog,
}

impl MigrationConvention {
    /// Whether the down side lives inside the up file itself.
    pub fn rollback_is_inline(&self) -> bool {
        matches!(
            self,
            MigrationConvention::Sectioned | MigrationConvention::Changelog
        )
    }
}

/// A file read from the repository. Never mutated after the Locator builds it.
#[derive(Debug, Clone)]
pub struct SchemaArtifact {
    pub path: PathBuf,
    pub kind: ArtifactKind,
    pub raw_text: String,
    pub convention: Option<MigrationConvention>,
    /// Down/undo file resolved by the convention, for file-pair conventions.
    pub rollback: Option<PathBuf>,
}

impl SchemaArtifact {
    pub fn new(path: impl Into<PathBuf>, kind: ArtifactKind, raw_text: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind,
            raw_text: raw_text.into(),
            convention: None,
            rollback: None,
        }
    }

    pub fn migration(
        path: impl Into<PathBuf>,
        raw_text: impl Into<String>,
        convention: MigrationConvention,
        rollback: Option<PathBuf>,
    ) -> Self {
        Self {
            path: path.into(),
            kind: ArtifactKind::Migration,
            raw_text: raw_text.into(),
            convention: Some(convention),
            rollback,
        }
    }
}
