//! Snapshot collaborators: sources that hand the gates a whole schema model
//! instead of the Locator/Extractor reading repository files.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use log::info;
use schemagate_core::{models::snapshot::SchemaModel, GateError};

pub mod mysql;

#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Where the snapshot comes from, for logs and reports. Never includes
    /// credentials.
    fn describe(&self) -> String;

    async fn fetch_snapshot(&self) -> Result<SchemaModel, GateError>;
}

/// A `SchemaModel` serialized as JSON, e.g. by an earlier introspection run.
pub struct JsonSnapshotFile {
    pub path: PathBuf,
}

impl JsonSnapshotFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SnapshotSource for JsonSnapshotFile {
    fn describe(&self) -> String {
        format!("snapshot file {}", self.path.display())
    }

    async fn fetch_snapshot(&self) -> Result<SchemaModel, GateError> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|e| GateError::io(&self.path, e))?;
        let model: SchemaModel = serde_json::from_slice(&bytes)?;
        info!(
            "Loaded {} tables and {} migrations from {}",
            model.tables.len(),
            model.migrations.len(),
            self.path.display()
        );
        Ok(model)
    }
}
