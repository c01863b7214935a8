pub mod catalog;
pub mod config;
pub mod db;
pub mod engine;
pub mod extractor;
pub mod gates;
pub mod locator;
pub mod policy;
pub mod report;
pub mod reserved;

pub use config::{Lexicons, ValidationConfig};
pub use engine::SchemaGate;
pub use schemagate_core::{models, GateError};
