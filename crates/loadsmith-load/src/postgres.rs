//! Postgres-wire implementation of the connection seam, backed by a sqlx pool.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::pool::PoolConnection;
use sqlx::postgres::{PgArguments, PgPoolOptions};
use sqlx::query::Query;
use sqlx::{Connection, Executor, PgPool, Postgres};
use tokio::io::AsyncReadExt;
use tracing::debug;

use loadsmith_generate::GeneratedValue;

use crate::connection::{ConnectionFactory, LoadConnection, PreparedInsert};
use crate::errors::DbError;

const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);
const COPY_CHUNK_BYTES: usize = 64 * 1024;
/// Bind parameters the wire protocol allows in one statement.
const MAX_BIND_PARAMS: usize = u16::MAX as usize;

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) => DbError::new(db.code().as_deref(), db.message()),
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => DbError::connection_failure(err.to_string()),
            _ => DbError::new(None, err.to_string()),
        }
    }
}

/// Hands out pooled connections; one per loader unit.
#[derive(Debug, Clone)]
pub struct PgConnectionFactory {
    pool: PgPool,
}

impl PgConnectionFactory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Pool sized for `max_connections` concurrent units. Only the URL is
    /// parsed here; no connection is opened until a unit asks for one.
    pub fn connect_lazy(url: &str, max_connections: u32) -> Result<Self, DbError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections.max(1))
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect_lazy(url)?;
        Ok(Self::new(pool))
    }
}

#[async_trait]
impl ConnectionFactory for PgConnectionFactory {
    async fn connect(&self) -> Result<Box<dyn LoadConnection>, DbError> {
        let conn = self.pool.acquire().await?;
        Ok(Box::new(PgLoadConnection { conn }))
    }
}

pub struct PgLoadConnection {
    conn: PoolConnection<Postgres>,
}

#[async_trait]
impl LoadConnection for PgLoadConnection {
    async fn execute(&mut self, sql: &str) -> Result<(), DbError> {
        sqlx::query(sql).execute(&mut *self.conn).await?;
        Ok(())
    }

    async fn prepare_insert(
        &mut self,
        sql: &str,
        params: usize,
    ) -> Result<PreparedInsert, DbError> {
        let numbered = number_placeholders(sql, &vec![false; params]);
        (&mut *self.conn).prepare(numbered.as_str()).await?;
        debug!(sql = %numbered, "insert prepared");
        Ok(PreparedInsert {
            sql: sql.to_string(),
            params,
        })
    }

    async fn execute_batch(
        &mut self,
        statement: &PreparedInsert,
        rows: &[Vec<GeneratedValue>],
    ) -> Result<u64, DbError> {
        let mut tx = Connection::begin(&mut *self.conn).await?;
        let mut written = 0;

        for chunk in rows.chunks(rows_per_statement(statement.params)) {
            let sql = multi_row_insert(&statement.sql, chunk)?;
            let mut query = sqlx::query(&sql);
            for value in chunk.iter().flatten() {
                query = bind_value(query, value);
            }
            written += query.execute(&mut *tx).await?.rows_affected();
        }

        tx.commit().await?;
        Ok(written)
    }

    async fn release(&mut self, statement: PreparedInsert) {
        debug!(sql = %statement.sql, "insert released");
    }

    async fn copy_from_csv(
        &mut self,
        table: &str,
        path: &Path,
        rows_per_transaction: Option<u64>,
    ) -> Result<u64, DbError> {
        let statement = copy_statement(table, rows_per_transaction);
        let mut file = tokio::fs::File::open(path)
            .await
            .map_err(|err| DbError::new(None, format!("open {}: {err}", path.display())))?;

        let mut copy = self.conn.copy_in_raw(&statement).await?;
        let mut buf = vec![0_u8; COPY_CHUNK_BYTES];
        loop {
            let read = match file.read(&mut buf).await {
                Ok(read) => read,
                Err(err) => {
                    let message = format!("read {}: {err}", path.display());
                    let _ = copy.abort(message.clone()).await;
                    return Err(DbError::new(None, message));
                }
            };
            if read == 0 {
                break;
            }
            copy.send(&buf[..read]).await?;
        }
        Ok(copy.finish().await?)
    }
}

/// `COPY <table> FROM STDIN` for a headerless CSV stream.
pub fn copy_statement(table: &str, rows_per_transaction: Option<u64>) -> String {
    match rows_per_transaction {
        Some(rows) => format!(
            "COPY {table} FROM STDIN (FORMAT CSV, HEADER false, ROWS_PER_TRANSACTION {rows})"
        ),
        None => format!("COPY {table} FROM STDIN (FORMAT CSV, HEADER false)"),
    }
}

/// Rewrite `?` placeholders as `$n`. Positions flagged in `nulls` become a
/// literal `NULL` and take no parameter number.
pub fn number_placeholders(sql: &str, nulls: &[bool]) -> String {
    let mut out = String::with_capacity(sql.len() + nulls.len() * 2);
    let mut position = 0;
    let mut next = 1;
    for ch in sql.chars() {
        if ch != '?' {
            out.push(ch);
            continue;
        }
        if nulls.get(position).copied().unwrap_or(false) {
            out.push_str("NULL");
        } else {
            out.push('$');
            out.push_str(&next.to_string());
            next += 1;
        }
        position += 1;
    }
    out
}

/// Rows that fit in one statement without passing the bind limit.
fn rows_per_statement(params: usize) -> usize {
    (MAX_BIND_PARAMS / params.max(1)).max(1)
}

/// Expand a one-row `INSERT ... VALUES (?,...)` into a single statement
/// covering `rows`, numbered across rows. Null values are written inline.
pub fn multi_row_insert(sql: &str, rows: &[Vec<GeneratedValue>]) -> Result<String, DbError> {
    let (head, tuple) = sql
        .rsplit_once("VALUES")
        .ok_or_else(|| DbError::new(None, format!("not a VALUES insert: {sql}")))?;
    let tuple = tuple.trim();
    let mut expanded = String::with_capacity(head.len() + 7 + rows.len() * (tuple.len() + 1));
    expanded.push_str(head);
    expanded.push_str("VALUES ");
    for index in 0..rows.len() {
        if index > 0 {
            expanded.push(',');
        }
        expanded.push_str(tuple);
    }
    let nulls: Vec<bool> = rows.iter().flatten().map(GeneratedValue::is_null).collect();
    Ok(number_placeholders(&expanded, &nulls))
}

fn bind_value<'q>(
    query: Query<'q, Postgres, PgArguments>,
    value: &GeneratedValue,
) -> Query<'q, Postgres, PgArguments> {
    match value {
        GeneratedValue::Null => query,
        GeneratedValue::Bool(value) => query.bind(*value),
        GeneratedValue::Int(value) => query.bind(*value),
        GeneratedValue::Float(value) => query.bind(*value),
        GeneratedValue::Text(value) => query.bind(value.clone()),
        GeneratedValue::Uuid(value) => query.bind(*value),
        GeneratedValue::Date(value) => query.bind(*value),
        GeneratedValue::Timestamp(value) => query.bind(*value),
    }
}
