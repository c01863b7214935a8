//! Replays migration column effects in discovery order so a `MODIFY` or
//! `CHANGE` can be compared with the type the column had before it.

use std::collections::HashMap;

use log::debug;
use schemagate_core::models::{migration::ColumnEffect, snapshot::SchemaModel};

use crate::extractor::types::parse_type;

#[derive(Debug, Default)]
pub struct Catalog {
    /// `(table, column)`, lower-cased, to the current declared type.
    columns: HashMap<(String, String), String>,
}

impl Catalog {
    /// Apply one effect; returns true when it narrows a known column.
    pub fn apply(&mut self, effect: &ColumnEffect) -> bool {
        match effect {
            ColumnEffect::Define {
                table,
                column,
                declared_type,
            } => {
                self.columns.insert(key(table, column), declared_type.clone());
                false
            }
            ColumnEffect::Change {
                table,
                column,
                new_name,
                declared_type,
            } => {
                let previous = self.columns.remove(&key(table, column));
                self.columns.insert(key(table, new_name), declared_type.clone());
                previous.is_some_and(|from| parse_type(&from).narrows_to(&parse_type(declared_type)))
            }
            ColumnEffect::Drop { table, column } => {
                self.columns.remove(&key(table, column));
                false
            }
            ColumnEffect::DropTable { table } => {
                let table = table.to_lowercase();
                self.columns.retain(|(t, _), _| *t != table);
                false
            }
        }
    }

    pub fn declared_type(&self, table: &str, column: &str) -> Option<&str> {
        self.columns.get(&key(table, column)).map(String::as_str)
    }
}

fn key(table: &str, column: &str) -> (String, String) {
    (table.to_lowercase(), column.to_lowercase())
}

/// Reclassify narrowing column changes as destructive. Migrations must be in
/// discovery order.
pub fn flag_narrowing(model: &mut SchemaModel) -> usize {
    let mut catalog = Catalog::default();
    let mut flagged = 0;
    for migration in &mut model.migrations {
        for statement in &mut migration.statements {
            let mut narrows = false;
            for effect in &statement.effects {
                narrows |= catalog.apply(effect);
            }
            if narrows && !statement.is_destructive() {
                debug!(
                    "{}:{} narrows a column type",
                    migration.up_artifact.display(),
                    statement.line
                );
                statement.mark_destructive();
                flagged += 1;
            }
        }
    }
    flagged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor;
    use schemagate_core::models::{
        artifact::{MigrationConvention, SchemaArtifact},
        migration::StatementClass,
    };

    fn model(files: &[(&str, &str)]) -> SchemaModel {
        let mut model = SchemaModel::default();
        for (path, text) in files {
            model.merge(extractor::extract(&SchemaArtifact::migration(
                *path,
                *text,
                MigrationConvention::Versioned,
                None,
            )));
        }
        model
    }

    #[test]
    fn flags_narrowing_across_files() {
        let mut model = model(&[
            ("V1__init.sql", "CREATE TABLE t (id BIGINT PRIMARY KEY, name VARCHAR(255));"),
            ("V2__widen.sql", "ALTER TABLE t MODIFY name VARCHAR(500);"),
            ("V3__shrink.sql", "ALTER TABLE t MODIFY COLUMN name VARCHAR(100);"),
            ("V4__guarded.sql", "-- schemagate:guarded ids fit in 32 bits\nALTER TABLE t CHANGE id id INT;"),
        ]);
        assert_eq!(flag_narrowing(&mut model), 2);
        assert_eq!(model.migrations[1].statements[0].class, StatementClass::Ddl);
        assert_eq!(model.migrations[2].statements[0].class, StatementClass::Destructive);
        assert_eq!(model.migrations[3].statements[0].class, StatementClass::Guarded);
    }

    #[test]
    fn unknown_prior_type_is_not_narrowing() {
        let mut model = model(&[("V1__x.sql", "ALTER TABLE legacy MODIFY name VARCHAR(10);")]);
        assert_eq!(flag_narrowing(&mut model), 0);
    }

    #[test]
    fn follows_renames_and_drops() {
        let mut catalog = Catalog::default();
        catalog.apply(&ColumnEffect::Define {
            table: "T".into(),
            column: "a".into(),
            declared_type: "INT".into(),
        });
        catalog.apply(&ColumnEffect::Change {
            table: "t".into(),
            column: "A".into(),
            new_name: "b".into(),
            declared_type: "BIGINT".into(),
        });
        assert_eq!(catalog.declared_type("t", "a"), None);
        assert_eq!(catalog.declared_type("t", "b"), Some("BIGINT"));
        catalog.apply(&ColumnEffect::DropTable { table: "t".into() });
        assert_eq!(catalog.declared_type("t", "b"), None);
    }
}
