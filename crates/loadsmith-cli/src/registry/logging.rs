use std::fs::OpenOptions;
use std::io;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::prelude::*;

use super::{RegistryError, RegistryResult};

/// Filter of the stderr layer when `RUST_LOG` is unset.
const STDERR_FILTER: &str = "info";
/// The run log keeps per-batch events but not driver chatter.
const FILE_FILTER: &str = "debug,sqlx=warn";

/// Install the run subscriber: every event goes to `path` as NDJSON, and a
/// human-readable copy filtered by `RUST_LOG` goes to stderr.
pub fn init_run_logging(path: &Path) -> RegistryResult<()> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;

    let run_log = tracing_subscriber::fmt::layer()
        .json()
        .with_timer(UtcTime::rfc_3339())
        .with_writer(Mutex::new(file))
        .with_filter(EnvFilter::new(FILE_FILTER));

    let console = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(io::stderr)
        .with_filter(stderr_filter());

    tracing_subscriber::registry()
        .with(run_log)
        .with(console)
        .try_init()
        .map_err(|err| RegistryError::Logging(err.to_string()))
}

fn stderr_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(STDERR_FILTER))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters_parse() {
        assert!(EnvFilter::try_new(FILE_FILTER).is_ok());
        assert!(EnvFilter::try_new(STDERR_FILTER).is_ok());
    }
}
