//! SQLSTATE classification and jittered exponential backoff.
//!
//! Every call site that talks to the database owns a [`RetryState`]. When an
//! operation fails with a [`DbError`], the site hands the error to
//! [`RetryPolicy::recover`], which either sleeps and lets the caller run the
//! whole operation again, or turns the error into a [`FatalError`].

use std::time::Duration;

use rand::Rng;
use tracing::{error, info, warn};

use crate::connection::{ConnectionFactory, LoadConnection};
use crate::errors::{DbError, FatalError, FatalKind, LoadError};

/// Fixed part of the wait is `BACKOFF_BASE_MS * 2^attempt`.
pub const BACKOFF_BASE_MS: u64 = 10;
/// Upper bound (exclusive) of the uniform jitter added to each wait.
pub const BACKOFF_JITTER_MS: u64 = 10;

const SYNTAX_ERROR_CLASS: &str = "42";
const SERVER_FATAL_CLASS: &str = "5";
const TRANSIENT_CODES: &[&str] = &[
    "40001", // serialization_failure
    "40P01", // deadlock_detected
    "08006", // connection_failure
    "XX000", // internal_error
];

/// Decision taken for one failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryAction {
    /// Contention or transport failure: back off and run again.
    Retry,
    /// Class `42`. Retried like a transient error, but logged as a syntax error.
    RetrySyntaxError,
    Fatal(FatalKind),
}

/// Classify an error code given the (already incremented) attempt counter.
pub fn classify(code: Option<&str>, attempt: u32, max_attempts: u32) -> RetryAction {
    if attempt >= max_attempts {
        return RetryAction::Fatal(FatalKind::RetryBudgetExhausted);
    }
    let Some(code) = code else {
        return RetryAction::Fatal(FatalKind::Unclassified);
    };
    if code.starts_with(SYNTAX_ERROR_CLASS) {
        RetryAction::RetrySyntaxError
    } else if TRANSIENT_CODES.iter().any(|transient| code.starts_with(transient)) {
        RetryAction::Retry
    } else if code.starts_with(SERVER_FATAL_CLASS) {
        RetryAction::Fatal(FatalKind::ServerFatal)
    } else {
        RetryAction::Fatal(FatalKind::Unclassified)
    }
}

/// Wait before retry number `attempt`: `10 * 2^attempt` ms plus up to 10 ms
/// of jitter.
pub fn backoff_delay(attempt: u32, rng: &mut impl Rng) -> Duration {
    let exponent = attempt.min(32);
    let base_ms = BACKOFF_BASE_MS.saturating_mul(1_u64 << exponent);
    let jitter_us = rng.random_range(0..BACKOFF_JITTER_MS * 1_000);
    Duration::from_millis(base_ms) + Duration::from_micros(jitter_us)
}

/// Per-call-site attempt counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryState {
    attempt: u32,
    max_attempts: u32,
}

impl RetryState {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            attempt: 0,
            max_attempts,
        }
    }

    /// Number of failures recorded so far.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}

/// Retry ceiling shared by all call sites of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self { max_attempts }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Fresh counter for a new call site.
    pub fn state(&self) -> RetryState {
        RetryState::new(self.max_attempts)
    }

    /// Absorb a recoverable failure of `site`.
    ///
    /// Returns `Ok(())` after the backoff wait when the caller should run its
    /// operation again from the top. Non-database errors pass through
    /// untouched; unrecoverable database errors become [`LoadError::Fatal`].
    pub async fn recover(
        &self,
        err: LoadError,
        state: &mut RetryState,
        site: &str,
    ) -> Result<(), LoadError> {
        let db = match err {
            LoadError::Database(db) => db,
            other => return Err(other),
        };

        state.attempt = state.attempt.saturating_add(1);
        match classify(db.code.as_deref(), state.attempt, state.max_attempts) {
            RetryAction::Retry => {
                self.backoff(state, site, &db).await;
                Ok(())
            }
            RetryAction::RetrySyntaxError => {
                warn!(site, error = %db, "syntax error in SQL");
                self.backoff(state, site, &db).await;
                Ok(())
            }
            RetryAction::Fatal(kind) => {
                if kind == FatalKind::RetryBudgetExhausted {
                    error!(site, attempts = state.attempt, error = %db, "reached max number of retries");
                } else {
                    error!(site, kind = kind.as_str(), error = %db, "unrecoverable database error");
                }
                Err(LoadError::Fatal(FatalError {
                    kind,
                    site: site.to_string(),
                    source: db,
                }))
            }
        }
    }

    /// [`RetryPolicy::recover`] for sites that hold a connection across
    /// attempts. After a transport failure the connection is dead, so `conn`
    /// is replaced with a fresh one from `factory` before the caller retries.
    /// Failed reconnects count against the same budget.
    pub async fn recover_connection(
        &self,
        err: LoadError,
        state: &mut RetryState,
        site: &str,
        factory: &dyn ConnectionFactory,
        conn: &mut Box<dyn LoadConnection>,
    ) -> Result<(), LoadError> {
        let lost = err.is_connection_failure();
        self.recover(err, state, site).await?;
        if !lost {
            return Ok(());
        }
        loop {
            match factory.connect().await {
                Ok(fresh) => {
                    *conn = fresh;
                    info!(site, attempt = state.attempt, "connection replaced");
                    return Ok(());
                }
                Err(err) => self.recover(err.into(), state, site).await?,
            }
        }
    }

    async fn backoff(&self, state: &RetryState, site: &str, db: &DbError) {
        let delay = backoff_delay(state.attempt, &mut rand::rng());
        warn!(
            site,
            attempt = state.attempt,
            max_attempts = state.max_attempts,
            wait_ms = delay.as_millis() as u64,
            error = %db,
            "retrying after backoff"
        );
        tokio::time::sleep(delay).await;
    }
}
