//! Reserved-word registry used by the naming gate.
//!
//! The built-in list is a curated subset of MySQL 8 keywords that most often
//! collide with table and column names. It is never a complete list.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};
use schemagate_core::GateError;

const BUILT_IN: &[&str] = &[
    "add", "all", "alter", "analyze", "and", "as", "asc", "between", "both", "by", "cascade",
    "case", "change", "check", "collate", "column", "condition", "constraint", "create",
    "current_date", "current_time", "current_timestamp", "current_user", "database", "default",
    "delete", "desc", "distinct", "drop", "else", "exists", "false", "for", "foreign", "from",
    "fulltext", "function", "grant", "group", "having", "if", "ignore", "in", "index", "inner",
    "insert", "interval", "into", "is", "join", "key", "keys", "left", "like", "limit", "lock",
    "match", "not", "null", "of", "on", "option", "or", "order", "outer", "partition",
    "primary", "procedure", "range", "rank", "read", "references", "rename", "replace",
    "restrict", "right", "row", "rows", "schema", "select", "set", "show", "system", "table",
    "to", "trigger", "true", "union", "unique", "update", "use", "using", "values", "when",
    "where", "with",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WordSource {
    BuiltIn,
    Override(PathBuf),
}

#[derive(Debug, Clone)]
pub struct ReservedWords {
    words: BTreeSet<String>,
    source: WordSource,
}

impl ReservedWords {
    pub fn built_in() -> Self {
        Self {
            words: BUILT_IN.iter().map(|w| w.to_string()).collect(),
            source: WordSource::BuiltIn,
        }
    }

    /// Use the first override file that exists under `root`, or the built-in
    /// list when none does. An override that exists but cannot be used is a
    /// precondition failure for the naming gate only.
    pub fn load(root: &Path, override_paths: &[PathBuf]) -> Result<Self, GateError> {
        for relative in override_paths {
            let path = root.join(relative);
            if !path.is_file() {
                continue;
            }
            let bytes = fs::read(&path).map_err(|e| {
                GateError::Precondition(format!(
                    "reserved-word override {} is unreadable: {}",
                    relative.display(),
                    e
                ))
            })?;
            let words = Self::parse_override(relative, &bytes)?;
            info!(
                "Loaded {} reserved words from {}",
                words.len(),
                relative.display()
            );
            return Ok(words);
        }
        debug!("No reserved-word override found; using the built-in list");
        Ok(Self::built_in())
    }

    /// One word per line; blank lines and `#` comments are ignored.
    pub fn parse_override(path: &Path, bytes: &[u8]) -> Result<Self, GateError> {
        let text = std::str::from_utf8(bytes).map_err(|e| {
            GateError::Precondition(format!(
                "reserved-word override {} is not valid UTF-8: {}",
                path.display(),
                e
            ))
        })?;
        let mut words = BTreeSet::new();
        for (idx, line) in text.lines().enumerate() {
            let word = line.split('#').next().unwrap_or_default().trim();
            if word.is_empty() {
                continue;
            }
            if !is_word(word) {
                return Err(GateError::Precondition(format!(
                    "reserved-word override {} line {}: `{}` is not a keyword",
                    path.display(),
                    idx + 1,
                    word
                )));
            }
            words.insert(word.to_ascii_lowercase());
        }
        Ok(Self {
            words,
            source: WordSource::Override(path.to_path_buf()),
        })
    }

    /// Case-insensitive membership.
    pub fn lookup(&self, name: &str) -> bool {
        self.words.contains(&name.to_ascii_lowercase())
    }

    pub fn is_override(&self) -> bool {
        matches!(self.source, WordSource::Override(_))
    }

    pub fn source(&self) -> &WordSource {
        &self.source
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Disclosure attached to the naming gate result.
    pub fn disclosure(&self) -> String {
        match &self.source {
            WordSource::BuiltIn => format!(
                "reserved-word check used the built-in list ({} words); it is not exhaustive",
                self.len()
            ),
            WordSource::Override(path) => format!(
                "reserved-word check used {} ({} words); it is not exhaustive",
                path.display(),
                self.len()
            ),
        }
    }
}

fn is_word(word: &str) -> bool {
    let mut chars = word.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}
