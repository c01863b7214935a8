//! Artifact Locator: finds schema dumps, migrations and ORM schema files
//! under a repository root and reads them into [`SchemaArtifact`]s.

pub mod strategies;

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, info, warn};
use schemagate_core::{models::artifact::SchemaArtifact, GateError};
use tokio::sync::Semaphore;
use tokio::task;

pub use strategies::{Candidate, DiscoveryStrategy, RepoFiles};

/// Every location the strategies search, for the empty-discovery guidance.
pub fn searched_locations() -> Vec<String> {
    DiscoveryStrategy::ALL
        .iter()
        .flat_map(|s| s.searched())
        .collect()
}

/// Run every strategy against `root` and read the claimed files.
///
/// Strategies run concurrently; their results are merged in declared order
/// and de-duplicated by canonical path, so the output does not depend on
/// scheduling. At most `workers` files are read at once.
pub async fn discover(root: &Path, workers: usize) -> Result<Vec<SchemaArtifact>, GateError> {
    if !root.is_dir() {
        return Err(GateError::Invocation(format!(
            "repository root {} is not a directory",
            root.display()
        )));
    }

    let scan_root = root.to_path_buf();
    let files = task::spawn_blocking(move || RepoFiles::scan(&scan_root))
        .await
        .map_err(|e| GateError::Discovery(e.to_string()))?;
    let files = Arc::new(files);

    let handles: Vec<_> = DiscoveryStrategy::ALL
        .iter()
        .map(|&strategy| {
            let files = Arc::clone(&files);
            task::spawn_blocking(move || strategy.discover(&files))
        })
        .collect();
    let mut per_strategy = Vec::with_capacity(handles.len());
    for handle in handles {
        per_strategy.push(
            handle
                .await
                .map_err(|e| GateError::Discovery(e.to_string()))?,
        );
    }

    let candidates = union(root, per_strategy);
    if candidates.is_empty() {
        return Err(GateError::DiscoveryEmpty {
            searched: searched_locations(),
        });
    }

    let artifacts = read_all(root, candidates, workers).await;
    if artifacts.is_empty() {
        return Err(GateError::DiscoveryEmpty {
            searched: searched_locations(),
        });
    }
    info!("Discovered {} schema artifacts under {}", artifacts.len(), root.display());
    Ok(artifacts)
}

/// Declared-order union; the first strategy to claim a file keeps it.
pub fn union(root: &Path, per_strategy: Vec<Vec<Candidate>>) -> Vec<Candidate> {
    let mut seen: HashSet<PathBuf> = HashSet::new();
    let mut out = Vec::new();
    for candidate in per_strategy.into_iter().flatten() {
        let full = root.join(&candidate.path);
        let key = full.canonicalize().unwrap_or(full);
        if seen.insert(key) {
            out.push(candidate);
        } else {
            debug!("{} already claimed", candidate.path.display());
        }
    }
    out
}

async fn read_all(root: &Path, candidates: Vec<Candidate>, workers: usize) -> Vec<SchemaArtifact> {
    let permits = Arc::new(Semaphore::new(workers.max(1)));
    let handles: Vec<_> = candidates
        .into_iter()
        .map(|candidate| {
            let permits = Arc::clone(&permits);
            let full = root.join(&candidate.path);
            tokio::spawn(async move {
                let _permit = permits.acquire_owned().await.ok()?;
                match tokio::fs::read(&full).await {
                    Ok(bytes) => Some(SchemaArtifact {
                        path: candidate.path,
                        kind: candidate.kind,
                        raw_text: String::from_utf8_lossy(&bytes).into_owned(),
                        convention: candidate.convention,
                        rollback: candidate.rollback,
                    }),
                    Err(e) => {
                        warn!("Skipping unreadable {}: {}", full.display(), e);
                        None
                    }
                }
            })
        })
        .collect();

    let mut artifacts = Vec::new();
    for handle in handles {
        match handle.await {
            Ok(Some(artifact)) => artifacts.push(artifact),
            Ok(None) => {}
            Err(e) => warn!("Reader task failed: {}", e),
        }
    }
    artifacts
}

#[cfg(test)]
mod tests {
    use super::*;
    use schemagate_core::models::artifact::{ArtifactKind, MigrationConvention};
    use std::fs;
    use tempfile::tempdir;

    fn write(root: &Path, path: &str, text: &str) {
        let full = root.join(path);
        fs::create_dir_all(full.parent().unwrap()).unwrap();
        fs::write(full, text).unwrap();
    }

    #[tokio::test]
    async fn discovers_in_strategy_order() {
        let dir = tempdir().unwrap();
        write(dir.path(), "db/schema.sql", "CREATE TABLE a (id INT PRIMARY KEY);");
        write(dir.path(), "db/migrations/1_init.up.sql", "CREATE TABLE a (id INT);");
        write(dir.path(), "db/migrations/1_init.down.sql", "DROP TABLE a;");
        write(dir.path(), "prisma/schema.prisma", "model A { id Int @id }");

        let artifacts = discover(dir.path(), 2).await.unwrap();
        let kinds: Vec<_> = artifacts.iter().map(|a| a.kind).collect();
        assert_eq!(
            kinds,
            vec![ArtifactKind::Migration, ArtifactKind::OrmSchema, ArtifactKind::SchemaDump]
        );
        assert_eq!(artifacts[0].convention, Some(MigrationConvention::TimestampedPair));
        assert_eq!(artifacts[0].path, PathBuf::from("db/migrations/1_init.up.sql"));
        assert!(artifacts.iter().all(|a| a.path.is_relative()));
    }

    #[tokio::test]
    async fn a_file_is_claimed_once() {
        // A sectioned migration whose name also matches a dump pattern.
        let dir = tempdir().unwrap();
        write(
            dir.path(),
            "db/20240101_schema.sql",
            "-- migrate:up\nCREATE TABLE a (id INT);\n-- migrate:down\nDROP TABLE a;\n",
        );
        let artifacts = discover(dir.path(), 4).await.unwrap();
        assert_eq!(artifacts.len(), 1);
        assert_eq!(artifacts[0].kind, ArtifactKind::Migration);
    }

    #[tokio::test]
    async fn empty_repository_lists_searched_locations() {
        let dir = tempdir().unwrap();
        write(dir.path(), "README.md", "nothing here");
        match discover(dir.path(), 1).await {
            Err(GateError::DiscoveryEmpty { searched }) => {
                assert!(searched.iter().any(|s| s.contains("schema.prisma")));
                assert!(searched.iter().any(|s| s == "**/schema.sql"));
            }
            other => panic!("expected DiscoveryEmpty, got {:?}", other.map(|a| a.len())),
        }
    }

    #[tokio::test]
    async fn missing_root_is_an_invocation_error() {
        let dir = tempdir().unwrap();
        let result = discover(&dir.path().join("nope"), 1).await;
        assert!(matches!(result, Err(GateError::Invocation(_))));
    }

    #[tokio::test]
    async fn invalid_utf8_is_read_lossily() {
        let dir = tempdir().unwrap();
        let full = dir.path().join("schema.sql");
        fs::write(&full, b"CREATE TABLE caf\xe9 (id INT);").unwrap();
        let artifacts = discover(dir.path(), 1).await.unwrap();
        assert!(artifacts[0].raw_text.contains('\u{fffd}'));
    }
}
