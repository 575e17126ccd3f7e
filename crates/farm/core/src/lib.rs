//! Domain model for the weekly farming planner.
//!
//! `farm-core` defines the canonical objective and matching rules (trait
//! signatures, mission extraction, roster aggregation) and exposes pure APIs
//! reused by the runtime crate and by offline tools. Nothing here performs
//! I/O; collaborator sources, storage, and the solver live in `farm-runtime`.
pub mod enemy;
pub mod missions;
pub mod query;
pub mod quest;
pub mod region;

pub use enemy::{EnemyId, EnemySpawn, aggregate_spawns, match_count};
pub use missions::{
    ClassId, ConditionKind, Mission, MissionCondition, MissionProgressType, MissionSet,
    MissionSetId, active_weekly_set, class_trait, describe_objective, extract_objectives,
    weekly_objectives,
};
pub use query::{MatchMode, TraitId, TraitKeyError, TraitQuery, TraitSignature};
pub use quest::{QuestId, QuestInfo, QuestRecord, QuestSummary};
pub use region::Region;
