//! Load engine for Loadsmith.
//!
//! Compiles load rules into per-table plans, runs the create phase, and
//! produces loader units that insert generated rows in batches. Database
//! errors go through a SQLSTATE-based retry policy; an atomic completion
//! barrier fires the after-load hook exactly once.

pub mod barrier;
pub mod bulkload;
pub mod connection;
pub mod errors;
pub mod loader;
pub mod plan;
pub mod postgres;
pub mod retry;
pub mod sequencer;
pub mod workload;

pub use barrier::CompletionBarrier;
pub use bulkload::BulkCopyWorkload;
pub use connection::{ConnectionFactory, LoadConnection, PreparedInsert};
pub use errors::{DbError, FatalError, FatalKind, LoadError};
pub use loader::{BatchLoader, LoadStats};
pub use plan::{LoadPlan, compile_rules, insert_statement};
pub use postgres::PgConnectionFactory;
pub use retry::{RetryAction, RetryPolicy, RetryState};
pub use sequencer::{LoadCoordinator, LoaderUnit, connect_with_retry};
pub use workload::{DeclarativeWorkload, Workload, WorkloadRegistry};
