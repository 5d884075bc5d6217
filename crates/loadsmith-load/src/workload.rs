use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;

use loadsmith_core::{ConfigError, DECLARATIVE_WORKLOAD, WorkloadConfig};

use crate::bulkload::BulkCopyWorkload;
use crate::connection::LoadConnection;
use crate::errors::LoadError;

/// User routine set driving the create, load and after-load phases.
///
/// Every hook is optional. A workload that implements `load_once` replaces
/// the rule-driven loaders with a single unit that calls it.
#[async_trait]
pub trait Workload: Send + Sync {
    fn name(&self) -> &str;

    /// Create-phase routine, used when the workload file has no `create` list.
    async fn create(&self, _conn: &mut dyn LoadConnection) -> Result<(), LoadError> {
        Ok(())
    }

    fn implements_before_load(&self) -> bool {
        false
    }

    async fn before_load(&self, _conn: &mut dyn LoadConnection) -> Result<(), LoadError> {
        Ok(())
    }

    fn implements_load_once(&self) -> bool {
        false
    }

    /// Bulk-load routine replacing the load rules. Returns the rows loaded.
    async fn load_once(&self, _conn: &mut dyn LoadConnection) -> Result<u64, LoadError> {
        Ok(0)
    }

    fn implements_after_load(&self) -> bool {
        false
    }

    async fn after_load(&self, _conn: &mut dyn LoadConnection) -> Result<(), LoadError> {
        Ok(())
    }
}

/// Workload with no hooks: the create phase runs the `create` DDL list and
/// the load phase runs the load rules.
#[derive(Debug, Default)]
pub struct DeclarativeWorkload;

#[async_trait]
impl Workload for DeclarativeWorkload {
    fn name(&self) -> &str {
        DECLARATIVE_WORKLOAD
    }
}

pub type WorkloadConstructor = fn(&WorkloadConfig) -> Result<Arc<dyn Workload>, ConfigError>;

/// Closed mapping from workload name to constructor.
#[derive(Clone)]
pub struct WorkloadRegistry {
    entries: BTreeMap<&'static str, WorkloadConstructor>,
}

impl Default for WorkloadRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkloadRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            entries: BTreeMap::new(),
        };
        registry.register(DECLARATIVE_WORKLOAD, declarative);
        registry.register(BulkCopyWorkload::NAME, bulk_copy);
        registry
    }

    pub fn register(&mut self, name: &'static str, construct: WorkloadConstructor) {
        self.entries.insert(name, construct);
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.keys().copied()
    }

    /// Instantiate the workload the config selects.
    pub fn resolve(&self, config: &WorkloadConfig) -> Result<Arc<dyn Workload>, ConfigError> {
        let name = config.workload_name();
        let construct = self
            .entries
            .get(name)
            .ok_or_else(|| ConfigError::UnknownWorkload(name.to_string()))?;
        construct(config)
    }
}

fn declarative(_config: &WorkloadConfig) -> Result<Arc<dyn Workload>, ConfigError> {
    Ok(Arc::new(DeclarativeWorkload))
}

fn bulk_copy(config: &WorkloadConfig) -> Result<Arc<dyn Workload>, ConfigError> {
    Ok(Arc::new(BulkCopyWorkload::from_config(config)?))
}
