use std::path::PathBuf;

use thiserror::Error;

/// Error type shared by every stage of a validation run.
#[derive(Error, Debug)]
pub enum GateError {
    /// No discovery strategy produced a candidate artifact.
    #[error("No schema artifacts found (searched: {})", searched.join(", "))]
    DiscoveryEmpty { searched: Vec<String> },
    /// Conflicting or missing invocation arguments.
    #[error("Invocation error: {0}")]
    Invocation(String),
    /// A gate's structural input is unusable (e.g. malformed override file).
    #[error("Precondition failed: {0}")]
    Precondition(String),
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Discovery error: {0}")]
    Discovery(String),
    /// The snapshot collaborator could not produce a schema model.
    #[error("Snapshot error: {0}")]
    Snapshot(String),
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Render error: {0}")]
    Render(String),
}

impl GateError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        GateError::Io {
            path: path.into(),
            source,
        }
    }

    /// Guidance printed when discovery comes back empty.
    pub fn guidance(&self) -> Option<String> {
        match self {
            GateError::DiscoveryEmpty { searched } => {
                let mut text = String::from(
                    "No schema dumps, migrations or ORM schema files were found.\nSearched locations:\n",
                );
                for location in searched {
                    text.push_str("  - ");
                    text.push_str(location);
                    text.push('\n');
                }
                text.push_str(
                    "Commit a schema dump, point the tool at the repository root, or supply a snapshot with --fallback-snapshot/--fallback-live.",
                );
                Some(text)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discovery_empty_guidance_lists_locations() {
        let err = GateError::DiscoveryEmpty {
            searched: vec!["**/schema.sql".to_string(), "schema.prisma".to_string()],
        };
        let guidance = err.guidance().unwrap();
        assert!(guidance.contains("  - **/schema.sql"));
        assert!(guidance.contains("  - schema.prisma"));
        assert!(err.to_string().contains("**/schema.sql, schema.prisma"));
    }

    #[test]
    fn other_errors_have_no_guidance() {
        assert!(GateError::Invocation("bad flag".into()).guidance().is_none());
    }
}
