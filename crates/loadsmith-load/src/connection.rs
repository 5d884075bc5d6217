use std::path::Path;

use async_trait::async_trait;

use loadsmith_generate::GeneratedValue;

use crate::errors::DbError;

/// Insert statement prepared on one connection.
///
/// The loader hands it back through [`LoadConnection::release`] on every
/// exit path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedInsert {
    /// Statement text with `?` placeholders.
    pub sql: String,
    /// Number of placeholders, one per column.
    pub params: usize,
}

/// Database connection used by the create, load and after-load phases.
///
/// Dropping the connection closes it (or hands it back to its pool).
#[async_trait]
pub trait LoadConnection: Send {
    /// Execute a statement that returns no rows (DDL, maintenance).
    async fn execute(&mut self, sql: &str) -> Result<(), DbError>;

    /// Prepare a parameterized insert with `?` placeholders.
    async fn prepare_insert(&mut self, sql: &str, params: usize)
    -> Result<PreparedInsert, DbError>;

    /// Execute one batch of bound rows. Returns the number of rows written.
    async fn execute_batch(
        &mut self,
        statement: &PreparedInsert,
        rows: &[Vec<GeneratedValue>],
    ) -> Result<u64, DbError>;

    /// Close a statement obtained from [`LoadConnection::prepare_insert`].
    async fn release(&mut self, statement: PreparedInsert);

    /// Opaque bulk table copy from a headerless CSV file.
    async fn copy_from_csv(
        &mut self,
        table: &str,
        path: &Path,
        rows_per_transaction: Option<u64>,
    ) -> Result<u64, DbError>;
}

/// Source of ready-to-use connections.
#[async_trait]
pub trait ConnectionFactory: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn LoadConnection>, DbError>;
}
