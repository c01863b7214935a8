//! Command-line front end: argument parsing, source selection and report
//! rendering around the `schemagate-lib` entry points.

pub mod cli;
pub mod render;

use std::ffi::OsString;
use std::io::Write;

use clap::{error::ErrorKind, Parser};
use log::error;
use schemagate_lib::{
    db::{mysql::MySqlSnapshotSource, JsonSnapshotFile, SnapshotSource},
    models::report::ValidationReport,
    policy, GateError, SchemaGate,
};

use cli::Cli;

/// Parse `args`, run one validation and write the report to `out`.
/// Returns the process exit code.
pub async fn run<I, T>(args: I, out: &mut dyn Write) -> i32
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => policy::EXIT_PASS,
                _ => policy::EXIT_INVOCATION,
            };
        }
    };
    init_logging(&cli);

    let result = validate(&cli).await;
    let code = policy::outcome(&result);
    match result {
        Ok(report) => match render::render(&report, cli.format) {
            Ok(rendered) => {
                if let Err(e) = out.write_all(rendered.as_bytes()).and_then(|_| out.flush()) {
                    error!("Failed to write report: {}", e);
                    return policy::EXIT_INVOCATION;
                }
                code
            }
            Err(e) => {
                eprintln!("error: {}", e);
                policy::error_exit_code(&e)
            }
        },
        Err(e) => {
            eprintln!("error: {}", e);
            if let Some(guidance) = e.guidance() {
                eprintln!("{}", guidance);
            }
            code
        }
    }
}

fn init_logging(cli: &Cli) {
    // Tests call `run` repeatedly; only the first logger wins.
    let _ = env_logger::Builder::new()
        .filter_level(cli.log_level())
        .parse_env("RUST_LOG")
        .target(env_logger::Target::Stderr)
        .try_init();
}

async fn validate(cli: &Cli) -> Result<ValidationReport, GateError> {
    let engine = SchemaGate::new(cli.config());

    if let Some(path) = &cli.snapshot {
        let source = JsonSnapshotFile::new(path);
        return engine.validate_snapshot(&cli.root, &source).await;
    }
    if cli.live {
        let source = MySqlSnapshotSource::connect(database_url(cli)?).await?;
        return engine.validate_snapshot(&cli.root, &source).await;
    }

    let fallback: Option<Box<dyn SnapshotSource>> = if let Some(path) = &cli.fallback_snapshot {
        Some(Box::new(JsonSnapshotFile::new(path)))
    } else if cli.fallback_live {
        Some(Box::new(MySqlSnapshotSource::connect_lazy(database_url(cli)?)?))
    } else {
        None
    };
    engine
        .validate_repository(&cli.root, fallback.as_deref())
        .await
}

fn database_url(cli: &Cli) -> Result<&str, GateError> {
    cli.database_url
        .as_deref()
        .filter(|url| !url.is_empty())
        .ok_or_else(|| {
            GateError::Invocation("--live and --fallback-live need DATABASE_URL or --database-url".into())
        })
}
