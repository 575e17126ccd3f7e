//! Weekly mission sets and objective extraction.
//!
//! The mission source reports time-windowed mission sets; the planner cares
//! only about the active weekly set (a window of exactly seven days) and,
//! inside it, the fully-clear conditions that ask for enemy kills. Those
//! conditions become [`TraitQuery`] objectives, deduplicated by canonical
//! signature with last-wins kill counts.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::query::{MatchMode, TraitId, TraitQuery, TraitSignature};

/// Identifier of a mission set; doubles as the result-cache key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MissionSetId(pub u32);

impl fmt::Display for MissionSetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier for a servant class as reported in mission conditions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClassId(pub u32);

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Progress requirement attached to a mission condition. Only conditions
/// that demand a full clear feed the optimizer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MissionProgressType {
    Clear,
    #[serde(other)]
    Other,
}

/// Condition kinds the mission source distinguishes.
///
/// Kinds with no bearing on kill objectives are retained so the source DTO
/// is faithful, but extraction ignores them; they matter only to the
/// presentation layer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ConditionKind {
    /// Defeat enemies bearing every listed trait.
    DefeatEnemiesWithTraits { trait_ids: Vec<TraitId> },
    /// Defeat enemies belonging to any of the listed classes.
    DefeatEnemyClass { class_ids: Vec<ClassId> },
    /// Clear quests some number of times.
    ClearQuests,
    /// Collect items from battles.
    CollectItems,
    /// Summon on the friend-point banner.
    FriendPointSummon,
    /// Anything else the source reports.
    Other,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissionCondition {
    pub progress: MissionProgressType,
    pub target_count: u64,
    pub kind: ConditionKind,
}

/// One mission inside a set: display text plus its clear conditions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mission {
    pub detail: String,
    pub conds: Vec<MissionCondition>,
}

/// A time-windowed container of missions as returned by the mission source.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissionSet {
    pub id: MissionSetId,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub missions: Vec<Mission>,
}

impl MissionSet {
    /// Whether `now` falls inside the active window. Boundaries are
    /// inclusive.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.started_at <= now && now <= self.ended_at
    }

    /// The weekly set is the one whose window spans exactly seven days.
    pub fn is_weekly(&self) -> bool {
        self.ended_at - self.started_at == Duration::days(7)
    }
}

/// Servant-class id to the class trait carried by members of that class.
///
/// Classes absent here have no class trait and cannot be targeted by
/// defeat-by-class objectives.
pub fn class_trait(class: ClassId) -> Option<TraitId> {
    let trait_id = match class.0 {
        1 => 100,  // saber
        2 => 102,  // archer
        3 => 101,  // lancer
        4 => 103,  // rider
        5 => 104,  // caster
        6 => 105,  // assassin
        7 => 106,  // berserker
        8 => 107,  // shielder
        9 => 108,  // ruler
        10 => 109, // alter ego
        11 => 110, // avenger
        25 => 117, // foreigner
        28 => 120, // pretender
        _ => return None,
    };
    Some(TraitId(trait_id))
}

/// First active weekly set, if any. At most one weekly set is assumed live
/// at a time; later matches are ignored.
pub fn active_weekly_set(sets: &[MissionSet], now: DateTime<Utc>) -> Option<&MissionSet> {
    sets.iter().find(|set| set.is_active(now) && set.is_weekly())
}

/// Extract the kill objectives from a weekly set's fully-clear conditions.
///
/// Trait conditions match with AND semantics; class conditions translate
/// through [`class_trait`] and match with OR semantics. A duplicate
/// signature overwrites the previously recorded kill count (last condition
/// wins; counts are never summed).
pub fn extract_objectives(set: &MissionSet) -> Vec<TraitQuery> {
    let mut merged: BTreeMap<TraitSignature, u64> = BTreeMap::new();
    for mission in &set.missions {
        for cond in &mission.conds {
            if cond.progress != MissionProgressType::Clear {
                continue;
            }
            let signature = match &cond.kind {
                ConditionKind::DefeatEnemiesWithTraits { trait_ids } => {
                    TraitSignature::new(trait_ids.iter().copied(), MatchMode::All)
                }
                ConditionKind::DefeatEnemyClass { class_ids } => {
                    // Class ids without a class trait are dropped; a
                    // condition whose ids all miss produces no objective.
                    let traits: Vec<TraitId> =
                        class_ids.iter().copied().filter_map(class_trait).collect();
                    TraitSignature::new(traits, MatchMode::Any)
                }
                _ => continue,
            };
            if signature.is_empty() {
                continue;
            }
            merged.insert(signature, cond.target_count);
        }
    }
    merged
        .into_iter()
        .map(|(signature, required_count)| TraitQuery::new(signature, required_count))
        .collect()
}

/// Active-weekly extraction in one step: the planner's entry point.
///
/// `None` means no weekly set is currently active, which is a trivial
/// success upstream, not an error.
pub fn weekly_objectives(
    sets: &[MissionSet],
    now: DateTime<Utc>,
) -> Option<(MissionSetId, Vec<TraitQuery>)> {
    let set = active_weekly_set(sets, now)?;
    Some((set.id, extract_objectives(set)))
}

/// Human-readable rendering of one extracted objective, for the report the
/// presentation layer builds.
pub fn describe_objective(query: &TraitQuery) -> String {
    format!(
        "Defeat {} enemies with {}",
        query.required_count, query.signature
    )
}
