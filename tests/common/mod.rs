#![allow(dead_code)]

use std::fs;
use std::path::Path;

use schemagate::client;
use schemagate_lib::{
    models::report::{Mode, ValidationReport},
    SchemaGate, ValidationConfig,
};
use tempfile::TempDir;

pub const SCENARIO_A: &str = "CREATE TABLE UserOrders (OrderID INT, status ENUM('a','b','c','d','e','f','g')) ENGINE=MyISAM DEFAULT CHARSET=utf8;\n";
pub const SCENARIO_D: &str = "CREATE TABLE t (id BIGINT PRIMARY KEY) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4 COLLATE=utf8mb4_0900_ai_ci;\n";

pub fn repo(files: &[(&str, &[u8])]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (path, bytes) in files {
        write(dir.path(), path, bytes);
    }
    dir
}

pub fn write(root: &Path, path: &str, bytes: &[u8]) {
    let full = root.join(path);
    fs::create_dir_all(full.parent().unwrap()).unwrap();
    fs::write(full, bytes).unwrap();
}

pub async fn validate(root: &Path, mode: Mode) -> ValidationReport {
    SchemaGate::new(ValidationConfig::default().with_mode(mode))
        .validate_repository(root, None)
        .await
        .unwrap()
}

/// Run the CLI; returns the exit code and everything written to stdout.
pub async fn cli(args: &[&str]) -> (i32, String) {
    let mut out = Vec::new();
    let argv = std::iter::once("schemagate").chain(args.iter().copied());
    let code = client::run(argv, &mut out).await;
    (code, String::from_utf8(out).unwrap())
}
