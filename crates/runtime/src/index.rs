//! Quest→enemy aggregation backed by the persistent roster cache.

use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, warn};

use farm_core::{
    EnemySpawn, QuestRecord, QuestSummary, Region, TraitQuery, aggregate_spawns, match_count,
};

use crate::error::{PlannerError, Result};
use crate::sources::{QuestSource, SourceError};
use crate::store::PlanStore;

/// Builds [`QuestRecord`]s for the optimizer: per-activity match counts for
/// the active objectives, with rosters served from the cache when possible.
pub struct QuestEnemyIndex {
    source: Arc<dyn QuestSource>,
    store: PlanStore,
}

impl QuestEnemyIndex {
    pub fn new(source: Arc<dyn QuestSource>, store: PlanStore) -> Self {
        Self { source, store }
    }

    /// Resolve match counts for every quest and drop the irrelevant ones.
    ///
    /// Rosters for distinct quests are fetched concurrently. A quest whose
    /// roster cannot be fetched is skipped with a warning; the rest of the
    /// run proceeds with reduced coverage.
    pub async fn build(
        &self,
        region: Region,
        quests: Vec<QuestSummary>,
        queries: &[TraitQuery],
    ) -> Result<Vec<QuestRecord>> {
        let mut tasks = JoinSet::new();
        for summary in quests {
            let source = Arc::clone(&self.source);
            let store = self.store.clone();
            let queries = queries.to_vec();
            tasks.spawn(async move {
                match resolve_roster(source.as_ref(), &store, region, &summary).await {
                    Ok(spawns) => Some(build_record(&summary, &spawns, &queries)),
                    Err(err) => {
                        warn!(quest = %summary.id, error = %err, "skipping quest: roster unavailable");
                        None
                    }
                }
            });
        }

        let mut records = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            let record = joined.map_err(PlannerError::WorkerJoin)?;
            if let Some(record) = record
                && record.is_relevant()
            {
                records.push(record);
            }
        }
        records.sort_by_key(|record| record.id);

        debug!(quests = records.len(), "indexed relevant quests");
        Ok(records)
    }
}

/// Roster from the cache, or from the source with a write-back. Cache
/// failures degrade to a refetch; they never fail the quest.
async fn resolve_roster(
    source: &dyn QuestSource,
    store: &PlanStore,
    region: Region,
    summary: &QuestSummary,
) -> std::result::Result<Vec<EnemySpawn>, SourceError> {
    match store.roster(summary.id).await {
        Ok(cached) if !cached.is_empty() => return Ok(cached),
        Ok(_) => {}
        Err(err) => {
            warn!(quest = %summary.id, error = %err, "roster cache read failed; refetching")
        }
    }

    let raw = source
        .quest_roster(summary.id, summary.phase, region)
        .await?;
    let spawns = aggregate_spawns(raw);

    if let Err(err) = store.save_roster(summary.id, spawns.clone()).await {
        warn!(quest = %summary.id, error = %err, "roster cache write failed");
    }
    Ok(spawns)
}

fn build_record(
    summary: &QuestSummary,
    spawns: &[EnemySpawn],
    queries: &[TraitQuery],
) -> QuestRecord {
    let mut record = QuestRecord::new(summary.id, summary.ap_cost, summary.info.clone());
    for query in queries {
        let count = match_count(spawns, &query.signature);
        if count > 0 {
            record.match_counts.insert(query.signature.clone(), count);
        }
    }
    record
}
