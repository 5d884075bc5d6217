use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::info;

use loadsmith_load::{ConnectionFactory, LoadError, LoadStats, LoaderUnit, connect_with_retry};

/// Result of running every loader unit of a run.
#[derive(Debug, Default)]
pub struct HarnessOutcome {
    /// Per-unit stats in unit order.
    pub tables: Vec<LoadStats>,
    pub after_load_fired: bool,
}

impl HarnessOutcome {
    pub fn total_rows(&self) -> u64 {
        self.tables.iter().map(|stats| stats.rows).sum()
    }
}

/// Run each unit on its own task and connection, at most `max_parallel` at
/// a time, then call `after_load` on every unit.
///
/// The first failing unit aborts the others.
pub async fn run_units(
    units: Vec<LoaderUnit>,
    factory: Arc<dyn ConnectionFactory>,
    max_parallel: usize,
) -> Result<HarnessOutcome, LoadError> {
    let permits = Arc::new(Semaphore::new(max_parallel.max(1)));
    let mut tasks = JoinSet::new();
    let total = units.len();

    for (index, mut unit) in units.into_iter().enumerate() {
        let factory = Arc::clone(&factory);
        let permits = Arc::clone(&permits);
        tasks.spawn(async move {
            let _permit = permits
                .acquire_owned()
                .await
                .map_err(|err| LoadError::Workload(err.to_string()))?;
            let site = format!("connect ({})", unit.name());
            let mut conn = connect_with_retry(factory.as_ref(), &unit.policy(), &site).await?;
            let stats = unit.load(&mut conn).await?;
            drop(conn);
            let fired = unit.after_load().await?;
            Ok::<_, LoadError>((index, stats, fired))
        });
    }

    let mut slots: Vec<Option<LoadStats>> = vec![None; total];
    let mut after_load_fired = false;
    while let Some(joined) = tasks.join_next().await {
        let (index, stats, fired) = joined
            .map_err(|err| LoadError::Workload(format!("loader task failed: {err}")))??;
        slots[index] = Some(stats);
        after_load_fired |= fired;
    }

    let tables: Vec<LoadStats> = slots.into_iter().flatten().collect();
    info!(
        event = "load_finished",
        units = tables.len(),
        after_load_fired,
        "all units joined"
    );
    Ok(HarnessOutcome {
        tables,
        after_load_fired,
    })
}
