pub mod artifact;
pub mod migration;
pub mod report;
pub mod schema;
pub mod snapshot;
