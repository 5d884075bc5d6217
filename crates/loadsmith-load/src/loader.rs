use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info};

use loadsmith_generate::GeneratedValue;

use crate::connection::{ConnectionFactory, LoadConnection, PreparedInsert};
use crate::errors::{DbError, LoadError};
use crate::plan::LoadPlan;
use crate::retry::RetryPolicy;

/// Outcome of loading one table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadStats {
    pub table: String,
    /// Rows written by the successful pass.
    pub rows: u64,
    /// Batches flushed by the successful pass.
    pub batches: u64,
    /// Failed passes that were retried from the top.
    pub retries: u32,
    pub elapsed_ms: u64,
}

/// Generates and inserts the rows of one [`LoadPlan`].
#[derive(Debug)]
pub struct BatchLoader {
    plan: LoadPlan,
    batch_size: usize,
}

impl BatchLoader {
    pub fn new(plan: LoadPlan, batch_size: usize) -> Self {
        Self {
            plan,
            batch_size: batch_size.max(1),
        }
    }

    pub fn plan(&self) -> &LoadPlan {
        &self.plan
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Load the table, re-running the whole pass after each recoverable
    /// failure. A transport failure swaps `conn` for a fresh connection from
    /// `factory`. Rows flushed by a failed pass stay in the table, so a
    /// retried load can leave duplicates unless the table enforces uniqueness.
    pub async fn load(
        &mut self,
        conn: &mut Box<dyn LoadConnection>,
        factory: &dyn ConnectionFactory,
        policy: &RetryPolicy,
    ) -> Result<LoadStats, LoadError> {
        let site = format!("load phase ({})", self.plan.table_name());
        let mut retry = policy.state();
        let start = Instant::now();

        let mut stats = loop {
            match self.load_pass(conn.as_mut()).await {
                Ok(stats) => break stats,
                Err(err) => {
                    policy
                        .recover_connection(err.into(), &mut retry, &site, factory, conn)
                        .await?
                }
            }
        };

        stats.retries = retry.attempt();
        stats.elapsed_ms = start.elapsed().as_millis() as u64;
        info!(
            table = %stats.table,
            rows = stats.rows,
            batches = stats.batches,
            retries = stats.retries,
            elapsed_ms = stats.elapsed_ms,
            "table loaded"
        );
        Ok(stats)
    }

    /// One pass over the plan. The prepared statement is released whether
    /// the pass succeeds or fails.
    pub async fn load_pass(&mut self, conn: &mut dyn LoadConnection) -> Result<LoadStats, DbError> {
        let statement = conn
            .prepare_insert(self.plan.insert_statement(), self.plan.column_names().len())
            .await?;
        let result = self.insert_rows(conn, &statement).await;
        conn.release(statement).await;
        result
    }

    async fn insert_rows(
        &mut self,
        conn: &mut dyn LoadConnection,
        statement: &PreparedInsert,
    ) -> Result<LoadStats, DbError> {
        let mut stats = LoadStats {
            table: self.plan.table_name().to_string(),
            ..LoadStats::default()
        };
        let capacity = usize::try_from(self.plan.row_count())
            .unwrap_or(usize::MAX)
            .min(self.batch_size);
        let mut pending: Vec<Vec<GeneratedValue>> = Vec::with_capacity(capacity);

        for _ in 0..self.plan.row_count() {
            pending.push(self.plan.next_row());
            if pending.len() == self.batch_size {
                flush(conn, statement, &mut pending, &mut stats).await?;
            }
        }
        if !pending.is_empty() {
            flush(conn, statement, &mut pending, &mut stats).await?;
        }

        Ok(stats)
    }
}

async fn flush(
    conn: &mut dyn LoadConnection,
    statement: &PreparedInsert,
    pending: &mut Vec<Vec<GeneratedValue>>,
    stats: &mut LoadStats,
) -> Result<(), DbError> {
    let written = conn.execute_batch(statement, pending).await?;
    stats.rows += written;
    stats.batches += 1;
    debug!(
        table = %stats.table,
        batch = stats.batches,
        rows = written,
        "batch flushed"
    );
    pending.clear();
    Ok(())
}
