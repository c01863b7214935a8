use std::path::PathBuf;

use schemagate_core::models::report::Mode;

use crate::gates::naming::snake_case;

pub const DEFAULT_OVERRIDE_PATHS: [&str; 2] =
    ["docs/db/mysql-reserved-words.txt", ".mysql/reserved-words.txt"];

/// Word lists behind the fuzzy antipattern heuristics.
#[derive(Debug, Clone, PartialEq)]
pub struct Lexicons {
    /// Table-name fragments marking a mutable business entity.
    pub business_entities: Vec<String>,
    /// Column-name tokens that hold money.
    pub monetary: Vec<String>,
    /// Column names that hold identifiers, matched exactly.
    pub identifier_names: Vec<String>,
    /// Column-name suffixes that hold identifiers.
    pub identifier_suffixes: Vec<String>,
}

impl Default for Lexicons {
    fn default() -> Self {
        fn words(list: &[&str]) -> Vec<String> {
            list.iter().map(|w| w.to_string()).collect()
        }
        Self {
            business_entities: words(&["order", "user", "product", "status", "ticket"]),
            monetary: words(&[
                "price", "cost", "amount", "balance", "fee", "tax", "total", "subtotal", "discount",
            ]),
            identifier_names: words(&["id"]),
            identifier_suffixes: words(&["_id"]),
        }
    }
}

impl Lexicons {
    pub fn extend_business_entities<I: IntoIterator<Item = String>>(&mut self, terms: I) {
        extend_unique(&mut self.business_entities, terms);
    }

    pub fn extend_monetary<I: IntoIterator<Item = String>>(&mut self, terms: I) {
        extend_unique(&mut self.monetary, terms);
    }

    /// Substring match on the lower-cased table name.
    pub fn is_business_entity(&self, table: &str) -> bool {
        let table = table.to_lowercase();
        self.business_entities.iter().any(|term| table.contains(term.as_str()))
    }

    /// Token match on the snake_case column name, allowing plurals.
    pub fn is_monetary(&self, column: &str) -> bool {
        let snake = snake_case(column);
        snake.split('_').any(|token| {
            self.monetary.iter().any(|term| {
                token == term
                    || token.strip_suffix('s') == Some(term.as_str())
                    || token.strip_suffix("es") == Some(term.as_str())
            })
        })
    }

    pub fn is_identifier_like(&self, column: &str) -> bool {
        let snake = snake_case(column);
        self.identifier_names.iter().any(|n| snake == *n)
            || self.identifier_suffixes.iter().any(|s| snake.ends_with(s.as_str()))
    }
}

fn extend_unique<I: IntoIterator<Item = String>>(list: &mut Vec<String>, terms: I) {
    for term in terms {
        let term = term.trim().to_lowercase();
        if !term.is_empty() && !list.contains(&term) {
            list.push(term);
        }
    }
}

/// Everything one validation run is parameterised by.
#[derive(Debug, Clone)]
pub struct ValidationConfig {
    pub mode: Mode,
    pub lexicons: Lexicons,
    /// Reserved-word override files, relative to the repository root, in
    /// priority order.
    pub reserved_word_paths: Vec<PathBuf>,
    /// Upper bound on concurrent discovery and extraction tasks.
    pub workers: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            mode: Mode::Full,
            lexicons: Lexicons::default(),
            reserved_word_paths: DEFAULT_OVERRIDE_PATHS.iter().map(PathBuf::from).collect(),
            workers: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
        }
    }
}

impl ValidationConfig {
    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }
}
