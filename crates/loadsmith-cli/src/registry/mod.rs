//! Per-run artifacts: `config.json`, `logs.ndjson` and `report.json` under
//! `<run_dir>/<timestamp>__run_<id>/`.

mod logging;
mod run;

pub use logging::init_run_logging;
pub use run::{ConnectionInfo, RunContext, RunReport, RunStatus, start_run, write_report};

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("cannot create run directory {}: {source}", .path.display())]
    RunDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot serialize run artifact: {0}")]
    Json(#[from] serde_json::Error),
    #[error("cannot install logging: {0}")]
    Logging(String),
}

pub type RegistryResult<T> = std::result::Result<T, RegistryError>;
