//! Phase sequencing: create phase, parallel loader units, after-load hook.
//!
//! [`LoadCoordinator::create_loader_units`] runs everything that must happen
//! before loading (validation, rule compilation, the create phase) and hands
//! back independent [`LoaderUnit`]s. The harness runs each unit on its own
//! task with its own connection, then calls [`LoaderUnit::after_load`] on
//! every unit; only the unit elected by the [`CompletionBarrier`] fires the
//! workload's after-load hook.

use std::sync::Arc;
use std::time::Instant;

use tracing::info;

use loadsmith_core::{WorkloadConfig, validate_config};
use loadsmith_generate::GeneratorRegistry;

use crate::barrier::CompletionBarrier;
use crate::connection::{ConnectionFactory, LoadConnection};
use crate::errors::LoadError;
use crate::loader::{BatchLoader, LoadStats};
use crate::plan::compile_rules;
use crate::retry::RetryPolicy;
use crate::workload::{Workload, WorkloadRegistry};

const CREATE_SITE: &str = "create phase";
const AFTER_LOAD_SITE: &str = "after-load phase";

/// Builds the loader units of one run.
pub struct LoadCoordinator {
    config: WorkloadConfig,
    workloads: WorkloadRegistry,
    generators: GeneratorRegistry,
    factory: Arc<dyn ConnectionFactory>,
    policy: RetryPolicy,
}

impl LoadCoordinator {
    pub fn new(config: WorkloadConfig, factory: Arc<dyn ConnectionFactory>) -> Self {
        Self::with_registries(
            config,
            factory,
            WorkloadRegistry::new(),
            GeneratorRegistry::new(),
        )
    }

    pub fn with_registries(
        config: WorkloadConfig,
        factory: Arc<dyn ConnectionFactory>,
        workloads: WorkloadRegistry,
        generators: GeneratorRegistry,
    ) -> Self {
        let policy = RetryPolicy::new(config.max_retries);
        Self {
            config,
            workloads,
            generators,
            factory,
            policy,
        }
    }

    pub fn config(&self) -> &WorkloadConfig {
        &self.config
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Validate and compile the configuration, run the create phase and
    /// return the units of the load phase.
    ///
    /// Configuration errors surface before any connection is opened.
    pub async fn create_loader_units(&self) -> Result<Vec<LoaderUnit>, LoadError> {
        validate_config(&self.config)?;
        let workload = self.workloads.resolve(&self.config)?;

        let plans = if workload.implements_load_once() {
            Vec::new()
        } else {
            compile_rules(&self.config.load_rules, &self.generators, self.config.seed)?
        };

        let start = Instant::now();
        info!(workload = workload.name(), "create phase started");
        run_phase(
            self.factory.as_ref(),
            &self.policy,
            CREATE_SITE,
            Phase::Create {
                statements: self.config.create_statements(),
                workload: workload.as_ref(),
            },
        )
        .await?;
        info!(
            workload = workload.name(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "create phase finished"
        );

        let work: Vec<UnitWork> = if workload.implements_load_once() {
            vec![UnitWork::Once]
        } else {
            plans
                .into_iter()
                .map(|plan| UnitWork::Rules(BatchLoader::new(plan, self.config.batch_size)))
                .collect()
        };

        let shared = Arc::new(UnitShared {
            barrier: CompletionBarrier::new(work.len()),
            workload,
            factory: Arc::clone(&self.factory),
            policy: self.policy,
        });
        info!(units = work.len(), "loader units ready");

        Ok(work
            .into_iter()
            .map(|work| LoaderUnit {
                work,
                shared: Arc::clone(&shared),
                elected: false,
                after_load_fired: false,
            })
            .collect())
    }
}

struct UnitShared {
    barrier: CompletionBarrier,
    workload: Arc<dyn Workload>,
    factory: Arc<dyn ConnectionFactory>,
    policy: RetryPolicy,
}

enum UnitWork {
    Rules(BatchLoader),
    Once,
}

/// One independently schedulable unit of the load phase.
pub struct LoaderUnit {
    work: UnitWork,
    shared: Arc<UnitShared>,
    elected: bool,
    after_load_fired: bool,
}

impl std::fmt::Debug for LoaderUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoaderUnit")
            .field("name", &self.name())
            .field("elected", &self.elected)
            .finish()
    }
}

impl LoaderUnit {
    /// Table loaded by this unit, or the workload name for a load-once unit.
    pub fn name(&self) -> &str {
        match &self.work {
            UnitWork::Rules(loader) => loader.plan().table_name(),
            UnitWork::Once => self.shared.workload.name(),
        }
    }

    pub fn is_load_once(&self) -> bool {
        matches!(self.work, UnitWork::Once)
    }

    /// Whether this unit's completion was the last one of the run.
    pub fn is_elected(&self) -> bool {
        self.elected
    }

    /// Retry ceiling of the run, for harness-side connection retries.
    pub fn policy(&self) -> RetryPolicy {
        self.shared.policy
    }

    /// Run the unit on `conn` and report completion to the barrier.
    ///
    /// A transport failure replaces `conn` with a fresh connection before the
    /// next attempt.
    pub async fn load(
        &mut self,
        conn: &mut Box<dyn LoadConnection>,
    ) -> Result<LoadStats, LoadError> {
        let stats = match &mut self.work {
            UnitWork::Rules(loader) => {
                loader
                    .load(conn, self.shared.factory.as_ref(), &self.shared.policy)
                    .await?
            }
            UnitWork::Once => load_once(&self.shared, conn).await?,
        };

        self.elected = self.shared.barrier.arrive();
        if self.elected {
            info!(
                unit = self.name(),
                units = self.shared.barrier.total(),
                "all loader units finished"
            );
        }
        Ok(stats)
    }

    /// Fire the workload's after-load hook if this unit was elected.
    ///
    /// The hook runs on a fresh connection under its own retry counter.
    /// Returns `true` when the hook ran.
    pub async fn after_load(&mut self) -> Result<bool, LoadError> {
        if !self.elected || self.after_load_fired || !self.shared.workload.implements_after_load()
        {
            return Ok(false);
        }
        self.after_load_fired = true;

        let start = Instant::now();
        info!(workload = self.shared.workload.name(), "after-load phase started");
        run_phase(
            self.shared.factory.as_ref(),
            &self.shared.policy,
            AFTER_LOAD_SITE,
            Phase::AfterLoad(self.shared.workload.as_ref()),
        )
        .await?;
        info!(
            workload = self.shared.workload.name(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "after-load phase finished"
        );
        Ok(true)
    }
}

async fn load_once(
    shared: &UnitShared,
    conn: &mut Box<dyn LoadConnection>,
) -> Result<LoadStats, LoadError> {
    let site = format!("load phase ({})", shared.workload.name());
    let mut retry = shared.policy.state();
    let start = Instant::now();

    let rows = loop {
        match shared.workload.load_once(conn.as_mut()).await {
            Ok(rows) => break rows,
            Err(err) => {
                shared
                    .policy
                    .recover_connection(err, &mut retry, &site, shared.factory.as_ref(), conn)
                    .await?
            }
        }
    };

    let stats = LoadStats {
        table: shared.workload.name().to_string(),
        rows,
        batches: 1,
        retries: retry.attempt(),
        elapsed_ms: start.elapsed().as_millis() as u64,
    };
    info!(
        workload = %stats.table,
        rows = stats.rows,
        retries = stats.retries,
        elapsed_ms = stats.elapsed_ms,
        "bulk load finished"
    );
    Ok(stats)
}

/// Open a connection, retrying transport failures under the policy.
pub async fn connect_with_retry(
    factory: &dyn ConnectionFactory,
    policy: &RetryPolicy,
    site: &str,
) -> Result<Box<dyn LoadConnection>, LoadError> {
    let mut retry = policy.state();
    loop {
        match factory.connect().await {
            Ok(conn) => return Ok(conn),
            Err(err) => policy.recover(err.into(), &mut retry, site).await?,
        }
    }
}

enum Phase<'a> {
    Create {
        statements: Option<&'a [String]>,
        workload: &'a dyn Workload,
    },
    AfterLoad(&'a dyn Workload),
}

/// Run a phase on one connection, re-running it from the top after each
/// recoverable failure. A transport failure drops the connection so the
/// next attempt reconnects.
async fn run_phase(
    factory: &dyn ConnectionFactory,
    policy: &RetryPolicy,
    site: &str,
    phase: Phase<'_>,
) -> Result<(), LoadError> {
    let mut retry = policy.state();
    let mut slot: Option<Box<dyn LoadConnection>> = None;

    loop {
        let result = match slot.as_mut() {
            Some(conn) => run_phase_pass(&phase, conn.as_mut()).await,
            None => match factory.connect().await {
                Ok(conn) => run_phase_pass(&phase, slot.insert(conn).as_mut()).await,
                Err(err) => Err(err.into()),
            },
        };

        match result {
            Ok(()) => return Ok(()),
            Err(err) => {
                if err.is_connection_failure() {
                    slot = None;
                }
                policy.recover(err, &mut retry, site).await?;
            }
        }
    }
}

async fn run_phase_pass(phase: &Phase<'_>, conn: &mut dyn LoadConnection) -> Result<(), LoadError> {
    match phase {
        Phase::Create {
            statements,
            workload,
        } => {
            match statements {
                Some(statements) => {
                    for sql in statements.iter() {
                        conn.execute(sql).await?;
                    }
                    info!(statements = statements.len(), "create statements executed");
                }
                None => workload.create(conn).await?,
            }
            if workload.implements_before_load() {
                workload.before_load(conn).await?;
            }
            Ok(())
        }
        Phase::AfterLoad(workload) => workload.after_load(conn).await,
    }
}
