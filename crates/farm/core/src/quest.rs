//! Farming-activity records consumed by the optimizer.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::query::TraitSignature;

/// Identifier for a farming quest.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct QuestId(pub u32);

impl fmt::Display for QuestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Presentation metadata for an activity, carried through the pipeline so
/// the report layer never re-derives it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestInfo {
    pub name: String,
    pub spot_name: String,
    pub war_name: String,
}

impl QuestInfo {
    /// War names arrive with embedded newlines; flatten them for
    /// single-line display.
    pub fn new(name: impl Into<String>, spot_name: impl Into<String>, war_name: &str) -> Self {
        Self {
            name: name.into(),
            spot_name: spot_name.into(),
            war_name: war_name.replace('\n', ", "),
        }
    }
}

/// A repeatable activity as listed by the quest source: already filtered to
/// quests whose clear repeats the last phase, reported at their maximum
/// phase.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestSummary {
    pub id: QuestId,
    pub phase: u8,
    pub ap_cost: u64,
    pub info: QuestInfo,
}

/// One optimization-eligible activity with its per-objective match counts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuestRecord {
    pub id: QuestId,
    pub ap_cost: u64,
    pub info: QuestInfo,
    pub match_counts: BTreeMap<TraitSignature, u64>,
}

impl QuestRecord {
    pub fn new(id: QuestId, ap_cost: u64, info: QuestInfo) -> Self {
        Self {
            id,
            ap_cost,
            info,
            match_counts: BTreeMap::new(),
        }
    }

    /// Matching kills one run contributes toward `signature`; zero when the
    /// roster has no matching enemy.
    pub fn matched_count(&self, signature: &TraitSignature) -> u64 {
        self.match_counts.get(signature).copied().unwrap_or(0)
    }

    /// Activities that cannot help any objective are pruned before the
    /// optimizer sees them.
    pub fn is_relevant(&self) -> bool {
        self.match_counts.values().any(|&count| count > 0)
    }
}
