//! The four rule gates.
//!
//! A gate is a pure function of the shared, read-only [`GateContext`]. Gates
//! never see each other's results.

pub mod antipattern;
pub mod engine;
pub mod migration;
pub mod naming;

use std::sync::Arc;

use schemagate_core::models::{
    report::{GateKind, GateResult},
    snapshot::SchemaModel,
};

use crate::config::Lexicons;
use crate::reserved::ReservedWords;

/// Input shared read-only by every gate of a run.
#[derive(Debug)]
pub struct GateContext {
    pub model: SchemaModel,
    /// The reserved-word registry, or why it could not be loaded.
    pub reserved: Result<ReservedWords, String>,
    pub lexicons: Lexicons,
}

pub trait Gate: Send + Sync {
    fn kind(&self) -> GateKind;

    fn evaluate(&self, ctx: &GateContext) -> GateResult;
}

/// The built-in gates in declaration order.
pub fn standard_gates() -> Vec<Arc<dyn Gate>> {
    vec![
        Arc::new(naming::NamingGate),
        Arc::new(engine::EngineCharsetGate),
        Arc::new(antipattern::AntipatternGate),
        Arc::new(migration::MigrationHygieneGate),
    ]
}
