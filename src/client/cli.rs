use std::path::PathBuf;

use clap::{ArgAction, Parser, ValueEnum};
use log::LevelFilter;
use schemagate_lib::{models::report::Mode, ValidationConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Text,
    Json,
    Csv,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Full,
    Quick,
}

#[derive(Debug, Parser)]
#[command(name = "schemagate")]
#[command(about = "Static quality gates for MySQL schema dumps, migrations and ORM schemas")]
#[command(version)]
pub struct Cli {
    /// Repository root to scan
    #[arg(default_value = ".")]
    pub root: PathBuf,

    /// Run only the naming and engine/charset gates
    #[arg(long)]
    pub quick: bool,

    /// Validation mode; `--quick` takes precedence
    #[arg(long, value_enum, env = "SCHEMAGATE_MODE", default_value = "full")]
    pub mode: ModeArg,

    /// Report format
    #[arg(long, value_enum, env = "SCHEMAGATE_FORMAT", default_value = "text")]
    pub format: Format,

    /// Validate a JSON schema snapshot instead of repository files
    #[arg(long, value_name = "FILE", conflicts_with_all = ["live", "fallback_snapshot", "fallback_live"])]
    pub snapshot: Option<PathBuf>,

    /// Introspect the database at DATABASE_URL instead of repository files
    #[arg(long, conflicts_with_all = ["fallback_snapshot", "fallback_live"])]
    pub live: bool,

    /// Snapshot to validate when no artifacts are found
    #[arg(long, value_name = "FILE", conflicts_with = "fallback_live")]
    pub fallback_snapshot: Option<PathBuf>,

    /// Introspect DATABASE_URL when no artifacts are found
    #[arg(long)]
    pub fallback_live: bool,

    /// MySQL connection URL for --live/--fallback-live
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: Option<String>,

    /// Extra monetary column term (repeatable or comma separated)
    #[arg(long = "money-term", value_name = "WORD", env = "SCHEMAGATE_MONEY_TERMS", value_delimiter = ',')]
    pub money_terms: Vec<String>,

    /// Extra business-entity table term (repeatable or comma separated)
    #[arg(long = "entity-term", value_name = "WORD", env = "SCHEMAGATE_ENTITY_TERMS", value_delimiter = ',')]
    pub entity_terms: Vec<String>,

    /// Maximum concurrent discovery and extraction tasks
    #[arg(long)]
    pub workers: Option<usize>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    pub fn mode(&self) -> Mode {
        match (self.quick, self.mode) {
            (true, _) | (false, ModeArg::Quick) => Mode::Quick,
            (false, ModeArg::Full) => Mode::Full,
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        match self.verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }

    pub fn config(&self) -> ValidationConfig {
        let mut config = ValidationConfig::default().with_mode(self.mode());
        if let Some(workers) = self.workers {
            config = config.with_workers(workers);
        }
        config.lexicons.extend_monetary(self.money_terms.iter().cloned());
        config
            .lexicons
            .extend_business_entities(self.entity_terms.iter().cloned());
        config
    }
}
