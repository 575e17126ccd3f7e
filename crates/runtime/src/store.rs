//! SQLite persistence for enemy rosters and solved assignments.
//!
//! Three tables back the planner:
//! - `optimized_assignment` — the solved plan, one row per (activity,
//!   trait-key) pair, keyed by mission set and scoped by region;
//! - `enemy_roster` — per-activity enemy multiplicities;
//! - `enemy_traits` — trait sets shared by enemies across activities.
//!
//! Roster rows are append-only and idempotent; assignment rows for a region
//! are replaced inside a single transaction so readers never observe the
//! gap between delete and insert.

use std::path::Path;
use std::sync::{Arc, Mutex};

use rusqlite::{Connection, params};
use thiserror::Error;
use tokio::task::spawn_blocking;

use farm_core::{EnemyId, EnemySpawn, MissionSetId, QuestId, Region, TraitId};

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database task join failed")]
    Join(#[from] tokio::task::JoinError),

    #[error("database connection poisoned")]
    Poisoned,

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
}

/// One persisted row of a solved assignment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssignmentRow {
    pub mission_set_id: MissionSetId,
    pub activity_id: QuestId,
    pub trait_key: String,
    pub target_count: u64,
    pub region: Region,
    pub run_count: u64,
    pub is_or: bool,
}

/// Handle to the planner database. Cheap to clone; all access funnels
/// through one connection used off the async runtime via `spawn_blocking`.
#[derive(Clone)]
pub struct PlanStore {
    conn: Arc<Mutex<Connection>>,
}

impl PlanStore {
    pub async fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_owned();
        let conn = spawn_blocking(move || Connection::open(path)).await??;
        Self::from_connection(conn).await
    }

    pub async fn open_in_memory() -> StoreResult<Self> {
        let conn = spawn_blocking(Connection::open_in_memory).await??;
        Self::from_connection(conn).await
    }

    async fn from_connection(conn: Connection) -> StoreResult<Self> {
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> StoreResult<()> {
        self.with_conn(|conn| {
            conn.execute_batch(
                "BEGIN;
                 CREATE TABLE IF NOT EXISTS optimized_assignment (
                     mission_set_id INTEGER NOT NULL,
                     activity_id INTEGER NOT NULL,
                     trait_key TEXT NOT NULL,
                     target_count INTEGER NOT NULL,
                     region TEXT NOT NULL,
                     run_count INTEGER NOT NULL,
                     is_or INTEGER NOT NULL,
                     PRIMARY KEY (mission_set_id, activity_id, trait_key)
                 );
                 CREATE TABLE IF NOT EXISTS enemy_roster (
                     activity_id INTEGER NOT NULL,
                     enemy_id INTEGER NOT NULL,
                     multiplicity INTEGER NOT NULL,
                     PRIMARY KEY (activity_id, enemy_id)
                 );
                 CREATE TABLE IF NOT EXISTS enemy_traits (
                     enemy_id INTEGER NOT NULL,
                     trait_id INTEGER NOT NULL,
                     PRIMARY KEY (enemy_id, trait_id)
                 );
                 COMMIT;",
            )
        })
        .await
    }

    async fn with_conn<F, T>(&self, func: F) -> StoreResult<T>
    where
        F: FnOnce(&mut Connection) -> Result<T, rusqlite::Error> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        spawn_blocking(move || {
            let mut guard = conn.lock().map_err(|_| StoreError::Poisoned)?;
            func(&mut guard).map_err(StoreError::from)
        })
        .await?
    }

    /// Cached roster for an activity; empty when never populated.
    pub async fn roster(&self, activity: QuestId) -> StoreResult<Vec<EnemySpawn>> {
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT r.enemy_id, r.multiplicity, t.trait_id
                 FROM enemy_roster r
                 LEFT JOIN enemy_traits t ON t.enemy_id = r.enemy_id
                 WHERE r.activity_id = ?1
                 ORDER BY r.enemy_id",
            )?;
            let rows = stmt.query_map(params![activity.0], |row| {
                let enemy_id: u32 = row.get(0)?;
                let multiplicity: i64 = row.get(1)?;
                let trait_id: Option<u32> = row.get(2)?;
                Ok((enemy_id, multiplicity, trait_id))
            })?;

            let mut spawns: Vec<EnemySpawn> = Vec::new();
            for row in rows {
                let (enemy_id, multiplicity, trait_id) = row?;
                let enemy_id = EnemyId(enemy_id);
                match spawns.last_mut() {
                    Some(last) if last.enemy_id == enemy_id => {
                        if let Some(id) = trait_id {
                            last.traits.insert(TraitId(id));
                        }
                    }
                    _ => {
                        let mut spawn =
                            EnemySpawn::new(enemy_id, multiplicity as u64, std::iter::empty());
                        if let Some(id) = trait_id {
                            spawn.traits.insert(TraitId(id));
                        }
                        spawns.push(spawn);
                    }
                }
            }
            Ok(spawns)
        })
        .await
    }

    /// Persist a fetched roster. Inserts are idempotent, so concurrent
    /// population of the same activity is safe.
    pub async fn save_roster(&self, activity: QuestId, spawns: Vec<EnemySpawn>) -> StoreResult<()> {
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            {
                let mut roster = tx.prepare(
                    "INSERT OR IGNORE INTO enemy_roster (activity_id, enemy_id, multiplicity)
                     VALUES (?1, ?2, ?3)",
                )?;
                let mut traits = tx.prepare(
                    "INSERT OR IGNORE INTO enemy_traits (enemy_id, trait_id) VALUES (?1, ?2)",
                )?;
                for spawn in &spawns {
                    roster.execute(params![
                        activity.0,
                        spawn.enemy_id.0,
                        spawn.multiplicity as i64
                    ])?;
                    for trait_id in &spawn.traits {
                        traits.execute(params![spawn.enemy_id.0, trait_id.0])?;
                    }
                }
            }
            tx.commit()
        })
        .await
    }

    /// Persisted assignment rows for one mission set and region, ordered by
    /// activity id.
    pub async fn assignments(
        &self,
        mission_set: MissionSetId,
        region: Region,
    ) -> StoreResult<Vec<AssignmentRow>> {
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT mission_set_id, activity_id, trait_key, target_count, run_count, is_or
                 FROM optimized_assignment
                 WHERE mission_set_id = ?1 AND region = ?2
                 ORDER BY activity_id, trait_key",
            )?;
            let rows = stmt
                .query_map(params![mission_set.0, region.to_string()], move |row| {
                    Ok(AssignmentRow {
                        mission_set_id: MissionSetId(row.get(0)?),
                        activity_id: QuestId(row.get(1)?),
                        trait_key: row.get(2)?,
                        target_count: row.get::<_, i64>(3)? as u64,
                        region,
                        run_count: row.get::<_, i64>(4)? as u64,
                        is_or: row.get(5)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await
    }

    /// Atomically replace the region's assignment rows.
    pub async fn replace_assignments(
        &self,
        region: Region,
        rows: Vec<AssignmentRow>,
    ) -> StoreResult<()> {
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "DELETE FROM optimized_assignment WHERE region = ?1",
                params![region.to_string()],
            )?;
            {
                let mut insert = tx.prepare(
                    "INSERT INTO optimized_assignment
                     (mission_set_id, activity_id, trait_key, target_count, region, run_count, is_or)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                )?;
                for row in &rows {
                    insert.execute(params![
                        row.mission_set_id.0,
                        row.activity_id.0,
                        row.trait_key,
                        row.target_count as i64,
                        row.region.to_string(),
                        row.run_count as i64,
                        row.is_or,
                    ])?;
                }
            }
            tx.commit()
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spawn(enemy: u32, multiplicity: u64, traits: &[u32]) -> EnemySpawn {
        EnemySpawn::new(
            EnemyId(enemy),
            multiplicity,
            traits.iter().copied().map(TraitId),
        )
    }

    fn row(set: u32, quest: u32, key: &str, region: Region, runs: u64) -> AssignmentRow {
        AssignmentRow {
            mission_set_id: MissionSetId(set),
            activity_id: QuestId(quest),
            trait_key: key.to_owned(),
            target_count: 3,
            region,
            run_count: runs,
            is_or: false,
        }
    }

    #[tokio::test]
    async fn roster_round_trips_and_saves_are_idempotent() {
        let store = PlanStore::open_in_memory().await.unwrap();
        let spawns = vec![spawn(7, 2, &[201, 1000]), spawn(9, 1, &[305])];

        store.save_roster(QuestId(1), spawns.clone()).await.unwrap();
        store.save_roster(QuestId(1), spawns.clone()).await.unwrap();

        let loaded = store.roster(QuestId(1)).await.unwrap();
        assert_eq!(loaded, spawns);

        assert!(store.roster(QuestId(2)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn enemy_traits_are_shared_across_activities() {
        let store = PlanStore::open_in_memory().await.unwrap();
        store
            .save_roster(QuestId(1), vec![spawn(7, 2, &[201])])
            .await
            .unwrap();
        store
            .save_roster(QuestId(2), vec![spawn(7, 5, &[201])])
            .await
            .unwrap();

        let loaded = store.roster(QuestId(2)).await.unwrap();
        assert_eq!(loaded, vec![spawn(7, 5, &[201])]);
    }

    #[tokio::test]
    async fn replace_swaps_rows_for_one_region_only() {
        let store = PlanStore::open_in_memory().await.unwrap();
        store
            .replace_assignments(Region::Jp, vec![row(1, 10, "201", Region::Jp, 3)])
            .await
            .unwrap();
        store
            .replace_assignments(Region::Na, vec![row(1, 20, "305", Region::Na, 2)])
            .await
            .unwrap();

        store
            .replace_assignments(Region::Jp, vec![row(2, 11, "201,305", Region::Jp, 4)])
            .await
            .unwrap();

        assert!(
            store
                .assignments(MissionSetId(1), Region::Jp)
                .await
                .unwrap()
                .is_empty()
        );
        let current = store.assignments(MissionSetId(2), Region::Jp).await.unwrap();
        assert_eq!(current.len(), 1);
        assert_eq!(current[0].trait_key, "201,305");

        let na = store.assignments(MissionSetId(1), Region::Na).await.unwrap();
        assert_eq!(na.len(), 1);
        assert_eq!(na[0].activity_id, QuestId(20));
    }

    #[tokio::test]
    async fn assignments_are_scoped_by_mission_set() {
        let store = PlanStore::open_in_memory().await.unwrap();
        store
            .replace_assignments(Region::Jp, vec![row(1, 10, "201", Region::Jp, 3)])
            .await
            .unwrap();

        assert!(
            store
                .assignments(MissionSetId(99), Region::Jp)
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn reopening_a_file_store_preserves_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("farm.db");

        {
            let store = PlanStore::open(&path).await.unwrap();
            store
                .save_roster(QuestId(1), vec![spawn(7, 2, &[201])])
                .await
                .unwrap();
        }

        let store = PlanStore::open(&path).await.unwrap();
        assert_eq!(store.roster(QuestId(1)).await.unwrap().len(), 1);
    }
}
