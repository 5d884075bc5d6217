use std::fs::{OpenOptions, create_dir_all};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::postgres::PgConnectOptions;

use loadsmith_load::LoadStats;

use super::{RegistryError, RegistryResult};

/// Connection metadata safe to persist: no password, no query options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConnectionInfo {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub database: Option<String>,
    pub user: Option<String>,
}

impl ConnectionInfo {
    /// Extract the non-secret parts of a connection URL. An unparsable URL
    /// yields empty metadata rather than echoing the input.
    pub fn from_url(url: &str) -> Self {
        match PgConnectOptions::from_str(url) {
            Ok(options) => Self {
                host: Some(options.get_host().to_string()),
                port: Some(options.get_port()),
                database: options.get_database().map(str::to_string),
                user: Some(options.get_username().to_string()),
            },
            Err(_) => Self::default(),
        }
    }
}

/// Metadata captured at run start.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub run_dir: PathBuf,
    pub config_path: PathBuf,
    pub workload: String,
    pub batch_size: usize,
    pub max_retries: u32,
    pub seed: Option<u64>,
    pub connection: ConnectionInfo,
}

/// JSON config written to each run directory.
#[derive(Debug, Serialize)]
pub struct RunConfig {
    pub run_id: String,
    pub started_at: String,
    pub config_path: String,
    pub workload: String,
    pub batch_size: usize,
    pub max_retries: u32,
    pub seed: Option<u64>,
    pub connection: ConnectionInfo,
}

/// Files of one run that are written after [`start_run`].
#[derive(Debug, Clone)]
pub struct RunPaths {
    pub logs_path: PathBuf,
    pub report_path: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Success,
    Failed,
}

/// Summary written once the load finishes.
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub run_id: String,
    pub status: RunStatus,
    pub workload: String,
    pub tables: Vec<LoadStats>,
    pub total_rows: u64,
    pub after_load_fired: bool,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub fn start_run(ctx: &RunContext) -> RegistryResult<RunPaths> {
    let timestamp = ctx.started_at.format("%Y-%m-%dT%H-%M-%SZ").to_string();
    let root = ctx.run_dir.join(format!("{timestamp}__run_{}", ctx.run_id));

    create_dir_all(&root).map_err(|source| RegistryError::RunDir {
        path: root.clone(),
        source,
    })?;

    let config_path = root.join("config.json");
    let logs_path = root.join("logs.ndjson");
    let report_path = root.join("report.json");

    let config = RunConfig {
        run_id: ctx.run_id.clone(),
        started_at: ctx.started_at.to_rfc3339(),
        config_path: ctx.config_path.display().to_string(),
        workload: ctx.workload.clone(),
        batch_size: ctx.batch_size,
        max_retries: ctx.max_retries,
        seed: ctx.seed,
        connection: ctx.connection.clone(),
    };

    write_json(&config_path, &config)?;

    OpenOptions::new()
        .create(true)
        .append(true)
        .open(&logs_path)?;

    Ok(RunPaths {
        logs_path,
        report_path,
    })
}

pub fn write_report(paths: &RunPaths, report: &RunReport) -> RegistryResult<()> {
    write_json(&paths.report_path, report)
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> RegistryResult<()> {
    let file = OpenOptions::new()
        .create(true)
        .truncate(true)
        .write(true)
        .open(path)?;
    serde_json::to_writer_pretty(file, value).map_err(RegistryError::from)
}
