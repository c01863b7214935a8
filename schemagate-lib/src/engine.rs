//! Gate Engine: drives one validation run from input to report.

use std::any::Any;
use std::path::Path;
use std::sync::Arc;

use log::{debug, error, info, warn};
use schemagate_core::{
    models::{
        artifact::SchemaArtifact,
        report::{GateKind, GateResult, GateState, GateStatus, Severity, ValidationReport, Violation},
        snapshot::{ParseNote, SchemaModel},
    },
    GateError,
};
use tokio::sync::Semaphore;
use tokio::task;

use crate::catalog;
use crate::config::ValidationConfig;
use crate::db::SnapshotSource;
use crate::extractor;
use crate::gates::{standard_gates, Gate, GateContext};
use crate::locator;
use crate::report;
use crate::reserved::ReservedWords;

pub const RULE_GATE_PANIC: &str = "gate.internal-error";
pub const QUICK_MODE_REASON: &str = "quick mode";

pub struct SchemaGate {
    config: ValidationConfig,
    gates: Vec<Arc<dyn Gate>>,
}

impl SchemaGate {
    pub fn new(config: ValidationConfig) -> Self {
        Self::with_gates(config, standard_gates())
    }

    pub fn with_gates(config: ValidationConfig, gates: Vec<Arc<dyn Gate>>) -> Self {
        Self { config, gates }
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Validate the artifacts committed under `root`. When nothing is found
    /// and a `fallback` is given, its snapshot is validated instead.
    pub async fn validate_repository(
        &self,
        root: &Path,
        fallback: Option<&dyn SnapshotSource>,
    ) -> Result<ValidationReport, GateError> {
        let model = match locator::discover(root, self.config.workers).await {
            Ok(artifacts) => self.extract_all(artifacts).await,
            Err(GateError::DiscoveryEmpty { searched }) => match fallback {
                Some(source) => {
                    warn!(
                        "No schema artifacts under {}; falling back to {}",
                        root.display(),
                        source.describe()
                    );
                    source.fetch_snapshot().await?
                }
                None => return Err(GateError::DiscoveryEmpty { searched }),
            },
            Err(e) => return Err(e),
        };
        let reserved = self.load_reserved(root);
        Ok(self.validate_model(model, reserved).await)
    }

    /// Validate a snapshot handed over by a collaborator. `root` only
    /// supplies the reserved-word override.
    pub async fn validate_snapshot(
        &self,
        root: &Path,
        source: &dyn SnapshotSource,
    ) -> Result<ValidationReport, GateError> {
        info!("Validating {}", source.describe());
        let model = source.fetch_snapshot().await?;
        let reserved = self.load_reserved(root);
        Ok(self.validate_model(model, reserved).await)
    }

    /// Run the gates over an already-built model.
    pub async fn validate_model(
        &self,
        mut model: SchemaModel,
        reserved: Result<ReservedWords, String>,
    ) -> ValidationReport {
        let narrowed = catalog::flag_narrowing(&mut model);
        if narrowed > 0 {
            debug!("{} type-narrowing changes reclassified as destructive", narrowed);
        }
        let parse_notes = std::mem::take(&mut model.parse_notes);
        let ctx = Arc::new(GateContext {
            model,
            reserved,
            lexicons: self.config.lexicons.clone(),
        });
        let results = self.run_gates(ctx).await;
        report::aggregate(self.config.mode, results, parse_notes)
    }

    fn load_reserved(&self, root: &Path) -> Result<ReservedWords, String> {
        ReservedWords::load(root, &self.config.reserved_word_paths).map_err(|e| {
            warn!("Reserved-word registry unavailable: {}", e);
            e.to_string()
        })
    }

    /// Extract every artifact on a bounded pool, merging in input order.
    async fn extract_all(&self, artifacts: Vec<SchemaArtifact>) -> SchemaModel {
        let permits = Arc::new(Semaphore::new(self.config.workers.max(1)));
        let handles: Vec<_> = artifacts
            .into_iter()
            .map(|artifact| {
                let permits = Arc::clone(&permits);
                let path = artifact.path.clone();
                let handle = tokio::spawn(async move {
                    let _permit = permits.acquire_owned().await;
                    task::spawn_blocking(move || extractor::extract(&artifact)).await
                });
                (path, handle)
            })
            .collect();

        let mut model = SchemaModel::default();
        for (path, handle) in handles {
            match handle.await {
                Ok(Ok(extracted)) => model.merge(extracted),
                Ok(Err(e)) | Err(e) => {
                    error!("Extraction of {} failed: {}", path.display(), e);
                    model.parse_notes.push(ParseNote::new(
                        &path,
                        None,
                        format!("extraction failed: {}", e),
                    ));
                }
            }
        }
        info!(
            "Extracted {} tables, {} identifiers, {} migrations ({} parse notes)",
            model.tables.len(),
            model.identifiers.len(),
            model.migrations.len(),
            model.parse_notes.len()
        );
        model
    }

    async fn run_gates(&self, ctx: Arc<GateContext>) -> Vec<GateResult> {
        let mode = self.config.mode;
        let mut pending = Vec::with_capacity(self.gates.len());
        let mut results = Vec::with_capacity(self.gates.len());

        for gate in &self.gates {
            let kind = gate.kind();
            if !kind.runs_in(mode) {
                advance(kind, GateState::NotRun, GateState::Finished(GateStatus::Skip));
                results.push(GateResult::skipped(kind, QUICK_MODE_REASON));
                continue;
            }
            let state = advance(kind, GateState::NotRun, GateState::Running);
            let gate = Arc::clone(gate);
            let ctx = Arc::clone(&ctx);
            pending.push((kind, state, task::spawn_blocking(move || gate.evaluate(&ctx))));
        }

        for (kind, state, handle) in pending {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) if e.is_panic() => {
                    let message = panic_message(e.into_panic());
                    error!("Gate {} panicked: {}", kind, message);
                    GateResult::from_violations(
                        kind,
                        vec![Violation::new(
                            RULE_GATE_PANIC,
                            Severity::Correctness,
                            format!("<{}>", kind),
                            None,
                            format!("gate {} aborted with an internal error: {}", kind, message),
                        )],
                    )
                }
                Err(e) => GateResult::skipped(kind, format!("gate task cancelled: {}", e)),
            };
            advance(kind, state, GateState::Finished(result.status));
            results.push(result);
        }
        results
    }
}

fn advance(kind: GateKind, from: GateState, to: GateState) -> GateState {
    match from.advance(to) {
        Ok(next) => {
            debug!("Gate {}: {:?} -> {:?}", kind, from, next);
            next
        }
        Err(e) => {
            warn!("Gate {}: {}", kind, e);
            from
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        text.to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "unknown panic".to_string()
    }
}
