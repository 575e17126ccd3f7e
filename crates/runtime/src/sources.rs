//! Contracts for the external game-data collaborators.
//!
//! The mission and quest sources are HTTP-backed in production and live
//! outside this repository; the planner only sees these traits. Test
//! doubles implement them in the integration suite.

use async_trait::async_trait;
use thiserror::Error;

use farm_core::{EnemySpawn, MissionSet, QuestId, QuestSummary, Region};

/// Failure reported by a game-data collaborator.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("game data endpoint unavailable: {0}")]
    Unavailable(String),

    #[error("malformed game data payload: {0}")]
    Decode(String),
}

/// Source of mission-set definitions for a region.
#[async_trait]
pub trait MissionSource: Send + Sync {
    /// All mission sets currently published for the region, active or not.
    /// Window filtering happens in the extractor.
    async fn mission_sets(&self, region: Region) -> Result<Vec<MissionSet>, SourceError>;
}

/// Source of repeatable farming quests and their enemy rosters.
#[async_trait]
pub trait QuestSource: Send + Sync {
    /// Repeatable quests for the region: filtered to quests whose clear
    /// repeats the last phase, reported at their maximum phase.
    async fn repeatable_quests(&self, region: Region) -> Result<Vec<QuestSummary>, SourceError>;

    /// Full enemy roster of one quest phase, one entry per spawn. The index
    /// aggregates multiplicities.
    async fn quest_roster(
        &self,
        quest: QuestId,
        phase: u8,
        region: Region,
    ) -> Result<Vec<EnemySpawn>, SourceError>;

    /// Cost and display metadata for one quest; used when reconstructing a
    /// cached plan without re-walking the full quest list.
    async fn quest_detail(
        &self,
        quest: QuestId,
        region: Region,
    ) -> Result<QuestSummary, SourceError>;
}
