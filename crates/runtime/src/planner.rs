//! Orchestration and the persisted result cache.
//!
//! [`Planner::solve`] runs extract → cache lookup → index → optimize →
//! persist as one unit on a spawned worker task. On a cache hit the plan is
//! reconstructed straight from persisted rows and neither the index nor the
//! engine runs. The transactional row replacement at the end is the only
//! persistence point for assignments, so an abandoned solve leaves no
//! partial state behind.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use farm_core::{
    MissionSetId, QuestId, QuestRecord, Region, TraitSignature, weekly_objectives,
};

use crate::config::{PlannerConfig, RetryPolicy};
use crate::engine::{self, FarmPlan, PlanEntry, PlanOutcome};
use crate::error::{PlannerError, Result};
use crate::index::QuestEnemyIndex;
use crate::sources::{MissionSource, QuestSource, SourceError};
use crate::store::{AssignmentRow, PlanStore};

/// The planner façade: owns the collaborators and the cache and exposes
/// [`Planner::solve`]. Cheap to clone and share across request handlers.
#[derive(Clone)]
pub struct Planner {
    inner: Arc<PlannerInner>,
}

struct PlannerInner {
    missions: Arc<dyn MissionSource>,
    quests: Arc<dyn QuestSource>,
    store: PlanStore,
    retry: RetryPolicy,
}

impl Planner {
    pub fn new(
        missions: Arc<dyn MissionSource>,
        quests: Arc<dyn QuestSource>,
        store: PlanStore,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            inner: Arc::new(PlannerInner {
                missions,
                quests,
                store,
                retry,
            }),
        }
    }

    /// Open the store described by `config` and build a planner around it.
    pub async fn connect(
        missions: Arc<dyn MissionSource>,
        quests: Arc<dyn QuestSource>,
        config: &PlannerConfig,
    ) -> Result<Self> {
        let store = match &config.database_path {
            Some(path) => PlanStore::open(path).await?,
            None => PlanStore::open_in_memory().await?,
        };
        Ok(Self::new(missions, quests, store, config.retry))
    }

    /// Compute (or re-serve) the cost-minimal farming plan for the region.
    ///
    /// The pipeline runs to completion on its own worker task; dropping the
    /// returned future abandons the result without persisting anything.
    pub async fn solve(&self, region: Region) -> Result<PlanOutcome> {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move { inner.solve(region).await })
            .await
            .map_err(PlannerError::WorkerJoin)?
    }
}

impl PlannerInner {
    async fn solve(&self, region: Region) -> Result<PlanOutcome> {
        let sets = with_retry(&self.retry, "mission set load", || {
            self.missions.mission_sets(region)
        })
        .await?;

        let Some((mission_set_id, objectives)) = weekly_objectives(&sets, Utc::now()) else {
            info!(%region, "no weekly mission set is active");
            return Ok(PlanOutcome::NothingRequired);
        };
        if objectives.is_empty() {
            info!(%region, set = %mission_set_id, "weekly set has no kill objectives");
            return Ok(PlanOutcome::NothingRequired);
        }

        let cached = self.store.assignments(mission_set_id, region).await?;
        if !cached.is_empty() {
            debug!(%region, set = %mission_set_id, rows = cached.len(), "serving cached plan");
            return self.reconstruct(region, cached).await.map(PlanOutcome::Plan);
        }

        let quests = with_retry(&self.retry, "repeatable quest load", || {
            self.quests.repeatable_quests(region)
        })
        .await?;

        let index = QuestEnemyIndex::new(Arc::clone(&self.quests), self.store.clone());
        let records = index.build(region, quests, &objectives).await?;

        let outcome = engine::optimize(&records, &objectives)?;

        if let PlanOutcome::Plan(plan) = &outcome {
            info!(
                %region,
                set = %mission_set_id,
                activities = plan.entries.len(),
                total_ap = plan.total_cost(),
                "solved weekly farming plan"
            );
            let rows = assignment_rows(mission_set_id, region, plan);
            if let Err(err) = self.store.replace_assignments(region, rows).await {
                warn!(%region, error = %err, "failed to persist plan; returning unsaved result");
            }
        }

        Ok(outcome)
    }

    /// Rebuild quest records and run counts straight from persisted rows.
    async fn reconstruct(&self, region: Region, rows: Vec<AssignmentRow>) -> Result<FarmPlan> {
        let mut grouped: BTreeMap<QuestId, Vec<AssignmentRow>> = BTreeMap::new();
        for row in rows {
            grouped.entry(row.activity_id).or_default().push(row);
        }

        let mut entries = Vec::with_capacity(grouped.len());
        for (quest_id, rows) in grouped {
            let summary = self.quests.quest_detail(quest_id, region).await?;
            let mut record = QuestRecord::new(quest_id, summary.ap_cost, summary.info);
            let mut runs = 0;
            for row in rows {
                let signature = TraitSignature::from_trait_key(&row.trait_key, row.is_or)
                    .map_err(PlannerError::CorruptCache)?;
                record.match_counts.insert(signature, row.target_count);
                runs = row.run_count;
            }
            entries.push(PlanEntry {
                quest: record,
                runs,
            });
        }
        Ok(FarmPlan { entries })
    }
}

fn assignment_rows(
    mission_set_id: MissionSetId,
    region: Region,
    plan: &FarmPlan,
) -> Vec<AssignmentRow> {
    let mut rows = Vec::new();
    for entry in &plan.entries {
        for (signature, count) in &entry.quest.match_counts {
            rows.push(AssignmentRow {
                mission_set_id,
                activity_id: entry.quest.id,
                trait_key: signature.trait_key(),
                target_count: *count,
                region,
                run_count: entry.runs,
                is_or: signature.mode().is_or(),
            });
        }
    }
    rows
}

/// Retry an idempotent source read with exponential backoff. Exhausted
/// retries fail the whole solve; partial objective sets are never used.
async fn with_retry<T, F, Fut>(policy: &RetryPolicy, operation: &'static str, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, SourceError>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt + 1 < policy.attempts => {
                let delay = policy.base_delay * 2u32.pow(attempt);
                warn!(operation, error = %err, ?delay, "source read failed; retrying");
                sleep(delay).await;
                attempt += 1;
            }
            Err(err) => {
                return Err(PlannerError::RetriesExhausted {
                    operation,
                    attempts: policy.attempts,
                    source: err,
                });
            }
        }
    }
}
