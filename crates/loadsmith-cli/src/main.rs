mod harness;
mod registry;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use clap::{Args, Parser, Subcommand};
use loadsmith_core::{ConfigError, WorkloadConfig};
use loadsmith_generate::GeneratorRegistry;
use loadsmith_load::{ConnectionFactory, LoadCoordinator, LoadError, PgConnectionFactory};
use harness::HarnessOutcome;
use registry::{
    ConnectionInfo, RunContext, RunReport, RunStatus, init_run_logging, start_run, write_report,
};
use schemars::schema_for;
use thiserror::Error;
use uuid::Uuid;

/// Exit status for errors that carry no reserved code.
const GENERIC_FAILURE: i32 = 1;

#[derive(Debug, Error)]
enum CliError {
    #[error("registry error: {0}")]
    Registry(#[from] registry::RegistryError),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error("json serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported engine: {0}")]
    UnsupportedEngine(String),
}

impl CliError {
    fn exit_code(&self) -> i32 {
        match self {
            CliError::Load(err) => err
                .as_fatal()
                .map(|fatal| fatal.exit_code())
                .unwrap_or(GENERIC_FAILURE),
            _ => GENERIC_FAILURE,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "loadsmith", version, about = "Loadsmith benchmark data loader")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the create, load and after-load phases of a workload file.
    Load(LoadArgs),
    /// List the available value generators and their parameters.
    Generators,
    /// Print the JSON schema of the workload file.
    Schema,
}

#[derive(Args, Debug)]
struct LoadArgs {
    /// Workload file (.yaml, .yml, .toml or .json).
    #[arg(long, value_name = "FILE")]
    config: PathBuf,
    /// Database connection string.
    #[arg(long, value_name = "CONNECTION_STRING")]
    conn: String,
    /// Rows per flushed batch; overrides the workload file.
    #[arg(long)]
    batch_size: Option<usize>,
    /// Retry ceiling per call site; overrides the workload file.
    #[arg(long)]
    max_retries: Option<u32>,
    /// Seed for reproducible generated values; overrides the workload file.
    #[arg(long)]
    seed: Option<u64>,
    /// Output directory for runs.
    #[arg(long, default_value = "runs")]
    run_dir: PathBuf,
    /// Loader units running at the same time (and pool size).
    #[arg(long, default_value_t = 8)]
    max_connections: u32,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Load(args) => run_load(args).await,
        Command::Generators => print_generators(),
        Command::Schema => print_schema(),
    };

    if let Err(err) = result {
        let code = err.exit_code();
        tracing::error!(event = "run_aborted", exit_code = code, error = %err);
        eprintln!("error: {err}");
        std::process::exit(code);
    }
}

async fn run_load(args: LoadArgs) -> Result<(), CliError> {
    let LoadArgs {
        config: config_path,
        conn,
        batch_size,
        max_retries,
        seed,
        run_dir,
        max_connections,
    } = args;

    let engine = detect_engine(&conn)?;

    let mut config = WorkloadConfig::from_path(&config_path)?;
    if let Some(batch_size) = batch_size {
        config.batch_size = batch_size;
    }
    if let Some(max_retries) = max_retries {
        config.max_retries = max_retries;
    }
    if seed.is_some() {
        config.seed = seed;
    }

    let run_id = Uuid::new_v4().to_string();
    let run_ctx = RunContext {
        run_id: run_id.clone(),
        started_at: chrono::Utc::now(),
        run_dir,
        config_path,
        workload: config.workload_name().to_string(),
        batch_size: config.batch_size,
        max_retries: config.max_retries,
        seed: config.seed,
        connection: ConnectionInfo::from_url(&conn),
    };

    let run_paths = start_run(&run_ctx)?;
    init_run_logging(&run_paths.logs_path)?;

    tracing::info!(event = "run_started", run_id = %run_id, engine = %engine);
    let timer = Instant::now();

    let outcome = execute_run(config, &conn, max_connections).await;
    let duration_ms = timer.elapsed().as_millis() as u64;
    let report = build_report(&run_id, &run_ctx.workload, duration_ms, &outcome);
    write_report(&run_paths, &report)?;
    tracing::info!(event = "report_written", path = %run_paths.report_path.display());

    let outcome = outcome?;
    tracing::info!(
        event = "run_finished",
        status = "success",
        rows = outcome.total_rows(),
        duration_ms = duration_ms
    );
    Ok(())
}

/// Pool, create phase, loader units and after-load hook. Configuration
/// errors surface before the pool opens any connection.
async fn execute_run(
    config: WorkloadConfig,
    conn: &str,
    max_connections: u32,
) -> Result<HarnessOutcome, LoadError> {
    let factory: Arc<dyn ConnectionFactory> =
        Arc::new(PgConnectionFactory::connect_lazy(conn, max_connections)?);
    let coordinator = LoadCoordinator::new(config, Arc::clone(&factory));
    let units = coordinator.create_loader_units().await?;
    harness::run_units(units, factory, max_connections as usize).await
}

fn build_report(
    run_id: &str,
    workload: &str,
    duration_ms: u64,
    outcome: &Result<HarnessOutcome, LoadError>,
) -> RunReport {
    match outcome {
        Ok(outcome) => RunReport {
            run_id: run_id.to_string(),
            status: RunStatus::Success,
            workload: workload.to_string(),
            total_rows: outcome.total_rows(),
            tables: outcome.tables.clone(),
            after_load_fired: outcome.after_load_fired,
            duration_ms,
            error: None,
        },
        Err(err) => RunReport {
            run_id: run_id.to_string(),
            status: RunStatus::Failed,
            workload: workload.to_string(),
            tables: Vec::new(),
            total_rows: 0,
            after_load_fired: false,
            duration_ms,
            error: Some(err.to_string()),
        },
    }
}

fn print_generators() -> Result<(), CliError> {
    let registry = GeneratorRegistry::new();
    for id in registry.ids() {
        let params: Vec<String> = registry
            .signature(id)
            .unwrap_or_default()
            .iter()
            .map(|param| format!("{}: {:?}", param.name, param.kind))
            .collect();
        println!("{id}({})", params.join(", "));
    }
    Ok(())
}

fn print_schema() -> Result<(), CliError> {
    let schema = schema_for!(WorkloadConfig);
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}

fn detect_engine(conn: &str) -> Result<&'static str, CliError> {
    if conn.starts_with("postgres://") || conn.starts_with("postgresql://") {
        Ok("postgres")
    } else {
        Err(CliError::UnsupportedEngine(conn.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use loadsmith_load::{DbError, FatalError, FatalKind};

    const UNREACHABLE: &str = "postgres://bench@127.0.0.1:1/bench";

    #[test]
    fn fatal_errors_keep_their_exit_code() {
        let fatal = FatalError {
            kind: FatalKind::ServerFatal,
            site: "load phase (t)".to_string(),
            source: DbError::with_code("57P01", "terminating connection"),
        };
        assert_eq!(CliError::Load(LoadError::Fatal(fatal)).exit_code(), 6);
        assert_eq!(
            CliError::Config(ConfigError::EmptyRuleSet).exit_code(),
            GENERIC_FAILURE
        );
    }

    #[tokio::test]
    async fn empty_rules_fail_before_connecting() {
        let config = WorkloadConfig {
            create: Some(vec!["CREATE TABLE t (c1 INT)".to_string()]),
            ..WorkloadConfig::default()
        };
        let outcome = tokio::time::timeout(
            Duration::from_secs(5),
            execute_run(config, UNREACHABLE, 2),
        )
        .await
        .expect("config errors must not wait on the server");
        assert!(matches!(
            outcome,
            Err(LoadError::Config(ConfigError::EmptyRuleSet))
        ));

        let report = build_report("r1", "default", 3, &outcome);
        assert_eq!(report.status, RunStatus::Failed);
        assert_eq!(report.total_rows, 0);
        assert!(report.error.unwrap().contains("load rules are empty"));
    }

    #[tokio::test]
    async fn bad_connection_string_is_reported() {
        let outcome = execute_run(WorkloadConfig::default(), "postgres://bench@:notaport/x", 2).await;
        assert!(matches!(outcome, Err(LoadError::Database(_))));
        let report = build_report("r2", "default", 0, &outcome);
        assert_eq!(report.status, RunStatus::Failed);
        assert!(report.error.is_some());
    }

    #[test]
    fn only_postgres_urls_are_accepted() {
        assert!(detect_engine("postgresql://localhost/bench").is_ok());
        assert!(matches!(
            detect_engine("mysql://localhost/bench"),
            Err(CliError::UnsupportedEngine(_))
        ));
    }

    #[test]
    fn load_flags_parse() {
        let cli = Cli::try_parse_from([
            "loadsmith",
            "load",
            "--config",
            "workload.yaml",
            "--conn",
            "postgres://localhost/bench",
            "--batch-size",
            "500",
            "--seed",
            "3",
        ])
        .unwrap();
        let Command::Load(args) = cli.command else {
            panic!("expected load command");
        };
        assert_eq!(args.batch_size, Some(500));
        assert_eq!(args.seed, Some(3));
        assert_eq!(args.max_retries, None);
        assert_eq!(args.run_dir, PathBuf::from("runs"));
    }
}
