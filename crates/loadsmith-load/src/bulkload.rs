//! Bulk-copy workload: builds a wide text table, writes a CSV file during
//! the create phase and loads it with a single table copy.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::info;

use loadsmith_core::{ConfigError, WorkloadConfig};
use loadsmith_generate::generators::text::random_letters;

use crate::connection::LoadConnection;
use crate::errors::LoadError;
use crate::workload::Workload;

const DEFAULT_STRING_LENGTH: u64 = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkCopyWorkload {
    table_name: String,
    columns: u64,
    rows: u64,
    indexes: u64,
    file_path: PathBuf,
    rows_per_transaction: Option<u64>,
    string_length: u64,
    create_index_before_load: bool,
    create_index_after_load: bool,
}

impl BulkCopyWorkload {
    pub const NAME: &'static str = "bulk_copy";

    /// Read the workload parameters from `properties`.
    pub fn from_config(config: &WorkloadConfig) -> Result<Self, ConfigError> {
        let table_name = config
            .property_str("tableName")
            .ok_or_else(|| missing("tableName"))?
            .to_string();
        let columns = config.property_u64("columns").ok_or_else(|| missing("columns"))?;
        if columns == 0 {
            return Err(ConfigError::InvalidConfig(
                "bulk_copy: columns must be >= 1".to_string(),
            ));
        }
        let file_path = config
            .property_str("filePath")
            .map(PathBuf::from)
            .ok_or_else(|| missing("filePath"))?;

        Ok(Self {
            table_name,
            columns,
            rows: config.property_u64("rows").ok_or_else(|| missing("rows"))?,
            indexes: config.property_u64("indexes").unwrap_or(0),
            file_path,
            rows_per_transaction: config.property_u64("rowsPerTransaction"),
            string_length: config
                .property_u64("stringLength")
                .unwrap_or(DEFAULT_STRING_LENGTH),
            create_index_before_load: config
                .property_bool("createIndexBeforeLoad")
                .unwrap_or(false),
            create_index_after_load: config
                .property_bool("createIndexAfterLoad")
                .unwrap_or(false),
        })
    }

    pub fn create_table_sql(&self) -> String {
        let columns: Vec<String> = (1..=self.columns).map(|i| format!("col{i} TEXT")).collect();
        format!(
            "CREATE TABLE {} (id INT PRIMARY KEY, {})",
            self.table_name,
            columns.join(", ")
        )
    }

    /// `CREATE INDEX` statements, empty unless `0 < indexes <= columns`.
    pub fn index_sql(&self) -> Vec<String> {
        if self.indexes == 0 || self.indexes > self.columns {
            return Vec::new();
        }
        (1..=self.indexes)
            .map(|i| format!("CREATE INDEX idx{i} ON {}(col{i})", self.table_name))
            .collect()
    }

    async fn create_indexes(&self, conn: &mut dyn LoadConnection) -> Result<(), LoadError> {
        let statements = self.index_sql();
        if statements.is_empty() {
            return Ok(());
        }
        info!(table = %self.table_name, indexes = statements.len(), "creating indexes");
        for sql in &statements {
            conn.execute(sql).await?;
        }
        Ok(())
    }

    async fn write_data_file(&self) -> Result<u64, LoadError> {
        let path = self.file_path.clone();
        let rows = self.rows;
        let columns = self.columns;
        let string_length = self.string_length as usize;
        tokio::task::spawn_blocking(move || write_rows(&path, rows, columns, string_length))
            .await
            .map_err(|err| LoadError::Workload(format!("csv writer task failed: {err}")))?
    }
}

fn missing(key: &str) -> ConfigError {
    ConfigError::InvalidConfig(format!("bulk_copy: missing property '{key}'"))
}

fn write_rows(path: &Path, rows: u64, columns: u64, string_length: usize) -> Result<u64, LoadError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)?;
    let mut rng = rand::rng();
    let mut record = Vec::with_capacity(columns as usize + 1);

    for id in 0..rows {
        record.clear();
        record.push(id.to_string());
        for _ in 0..columns {
            record.push(random_letters(&mut rng, string_length));
        }
        writer.write_record(&record)?;
    }

    writer.flush()?;
    Ok(rows)
}

#[async_trait]
impl Workload for BulkCopyWorkload {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn create(&self, conn: &mut dyn LoadConnection) -> Result<(), LoadError> {
        info!(table = %self.table_name, "recreating table");
        conn.execute(&format!("DROP TABLE IF EXISTS {}", self.table_name))
            .await?;
        conn.execute(&self.create_table_sql()).await?;

        if self.create_index_before_load {
            self.create_indexes(conn).await?;
        }

        let written = self.write_data_file().await?;
        info!(path = %self.file_path.display(), rows = written, "csv data file written");
        Ok(())
    }

    fn implements_load_once(&self) -> bool {
        true
    }

    async fn load_once(&self, conn: &mut dyn LoadConnection) -> Result<u64, LoadError> {
        let copied = conn
            .copy_from_csv(&self.table_name, &self.file_path, self.rows_per_transaction)
            .await?;
        info!(table = %self.table_name, rows = copied, "table copy finished");
        Ok(copied)
    }

    fn implements_after_load(&self) -> bool {
        self.create_index_after_load
    }

    async fn after_load(&self, conn: &mut dyn LoadConnection) -> Result<(), LoadError> {
        self.create_indexes(conn).await
    }
}
