#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{Value, json};

use loadsmith_core::{ColumnSpec, LoadRule, WorkloadConfig};
use loadsmith_generate::GeneratedValue;
use loadsmith_load::{ConnectionFactory, DbError, LoadConnection, PreparedInsert};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Connect,
    Execute,
    Prepare,
    Batch,
    Copy,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedBatch {
    pub sql: String,
    pub rows: Vec<Vec<GeneratedValue>>,
}

/// Everything the mock database saw, shared by all its connections.
#[derive(Debug, Default)]
pub struct MockState {
    pub connects: usize,
    pub executed: Vec<String>,
    pub prepared: usize,
    pub released: usize,
    pub batches: Vec<RecordedBatch>,
    pub copies: Vec<(String, PathBuf, Option<u64>)>,
    script: HashMap<Op, VecDeque<Option<DbError>>>,
}

impl MockState {
    /// Rows written per table, in insertion order.
    pub fn rows_for(&self, table: &str) -> Vec<Vec<GeneratedValue>> {
        let prefix = format!("INSERT INTO {table} (");
        self.batches
            .iter()
            .filter(|batch| batch.sql.starts_with(&prefix))
            .flat_map(|batch| batch.rows.iter().cloned())
            .collect()
    }

    pub fn batch_sizes_for(&self, table: &str) -> Vec<usize> {
        let prefix = format!("INSERT INTO {table} (");
        self.batches
            .iter()
            .filter(|batch| batch.sql.starts_with(&prefix))
            .map(|batch| batch.rows.len())
            .collect()
    }

    fn next_outcome(&mut self, op: Op) -> Result<(), DbError> {
        match self.script.get_mut(&op).and_then(VecDeque::pop_front) {
            Some(Some(err)) => Err(err),
            _ => Ok(()),
        }
    }
}

/// In-memory database: connections record calls and fail on demand.
#[derive(Debug, Clone, Default)]
pub struct MockDatabase {
    state: Arc<Mutex<MockState>>,
}

impl MockDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the next calls of `op`: `None` passes, `Some(code)` fails with
    /// that SQLSTATE.
    pub fn script(&self, op: Op, outcomes: &[Option<&str>]) {
        let mut state = self.state.lock().unwrap();
        let queue = state.script.entry(op).or_default();
        for outcome in outcomes {
            queue.push_back(outcome.map(|code| DbError::with_code(code, "scripted failure")));
        }
    }

    pub fn fail_with_transport_error(&self, op: Op) {
        let mut state = self.state.lock().unwrap();
        state
            .script
            .entry(op)
            .or_default()
            .push_back(Some(DbError::connection_failure("connection reset")));
    }

    pub fn state(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    pub fn factory(&self) -> Arc<dyn ConnectionFactory> {
        Arc::new(self.clone())
    }

    pub fn connection(&self) -> Box<dyn LoadConnection> {
        Box::new(MockConnection {
            state: Arc::clone(&self.state),
            broken: false,
        })
    }
}

#[async_trait]
impl ConnectionFactory for MockDatabase {
    async fn connect(&self) -> Result<Box<dyn LoadConnection>, DbError> {
        let mut state = self.state.lock().unwrap();
        state.next_outcome(Op::Connect)?;
        state.connects += 1;
        Ok(self.connection())
    }
}

/// A connection that saw a transport failure stays broken: every later call
/// on it fails the same way, like a socket the server has closed.
pub struct MockConnection {
    state: Arc<Mutex<MockState>>,
    broken: bool,
}

fn check(broken: &mut bool, state: &mut MockState, op: Op) -> Result<(), DbError> {
    if *broken {
        return Err(DbError::connection_failure("connection is closed"));
    }
    let outcome = state.next_outcome(op);
    if let Err(err) = &outcome {
        *broken = err.is_connection_failure();
    }
    outcome
}

#[async_trait]
impl LoadConnection for MockConnection {
    async fn execute(&mut self, sql: &str) -> Result<(), DbError> {
        let mut state = self.state.lock().unwrap();
        check(&mut self.broken, &mut state, Op::Execute)?;
        state.executed.push(sql.to_string());
        Ok(())
    }

    async fn prepare_insert(
        &mut self,
        sql: &str,
        params: usize,
    ) -> Result<PreparedInsert, DbError> {
        let mut state = self.state.lock().unwrap();
        check(&mut self.broken, &mut state, Op::Prepare)?;
        state.prepared += 1;
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
        let mut state = self.state.lock().unwrap();
        check(&mut self.broken, &mut state, Op::Batch)?;
        assert!(
            rows.iter().all(|row| row.len() == statement.params),
            "row width must match the statement"
        );
        state.batches.push(RecordedBatch {
            sql: statement.sql.clone(),
            rows: rows.to_vec(),
        });
        Ok(rows.len() as u64)
    }

    async fn release(&mut self, _statement: PreparedInsert) {
        self.state.lock().unwrap().released += 1;
    }

    async fn copy_from_csv(
        &mut self,
        table: &str,
        path: &Path,
        rows_per_transaction: Option<u64>,
    ) -> Result<u64, DbError> {
        let mut state = self.state.lock().unwrap();
        check(&mut self.broken, &mut state, Op::Copy)?;
        state
            .copies
            .push((table.to_string(), path.to_path_buf(), rows_per_transaction));
        Ok(0)
    }
}

pub fn constant_column(name: &str, value: Value) -> ColumnSpec {
    ColumnSpec {
        name: name.to_string(),
        util: "Constant".to_string(),
        count: None,
        params: vec![value],
    }
}

pub fn rule(table: &str, rows: u64, columns: Vec<ColumnSpec>) -> LoadRule {
    LoadRule {
        table: table.to_string(),
        rows,
        count: None,
        columns,
    }
}

/// One table `t`, three rows of `(7, "x")`.
pub fn seven_x_config(batch_size: usize) -> WorkloadConfig {
    WorkloadConfig {
        create: Some(vec!["CREATE TABLE t (c1 INT, c2 TEXT)".to_string()]),
        load_rules: vec![rule(
            "t",
            3,
            vec![
                constant_column("c1", json!(7)),
                constant_column("c2", json!("x")),
            ],
        )],
        batch_size,
        max_retries: 5,
        ..WorkloadConfig::default()
    }
}
