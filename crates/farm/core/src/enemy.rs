//! Enemy roster entries and multiplicity aggregation.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::query::{TraitId, TraitSignature};

/// Identifier for a distinct enemy unit within a quest roster.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EnemyId(pub u32);

impl fmt::Display for EnemyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One distinct enemy within an activity roster: how many times it spawns
/// across all stages and which traits it bears.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnemySpawn {
    pub enemy_id: EnemyId,
    pub multiplicity: u64,
    pub traits: BTreeSet<TraitId>,
}

impl EnemySpawn {
    pub fn new(
        enemy_id: EnemyId,
        multiplicity: u64,
        traits: impl IntoIterator<Item = TraitId>,
    ) -> Self {
        Self {
            enemy_id,
            multiplicity,
            traits: traits.into_iter().collect(),
        }
    }

    pub fn matches(&self, signature: &TraitSignature) -> bool {
        signature.matches(&self.traits)
    }
}

/// Collapse raw per-stage spawns into one entry per enemy id.
///
/// Multiplicities add; trait sets union, since later stages repeat the same
/// enemy definition.
pub fn aggregate_spawns(spawns: impl IntoIterator<Item = EnemySpawn>) -> Vec<EnemySpawn> {
    let mut merged: BTreeMap<EnemyId, EnemySpawn> = BTreeMap::new();
    for spawn in spawns {
        match merged.entry(spawn.enemy_id) {
            Entry::Occupied(mut slot) => {
                let existing = slot.get_mut();
                existing.multiplicity += spawn.multiplicity;
                existing.traits.extend(spawn.traits);
            }
            Entry::Vacant(slot) => {
                slot.insert(spawn);
            }
        }
    }
    merged.into_values().collect()
}

/// Total matching kills one clear of the given roster yields for `signature`.
pub fn match_count(spawns: &[EnemySpawn], signature: &TraitSignature) -> u64 {
    spawns
        .iter()
        .filter(|spawn| spawn.matches(signature))
        .map(|spawn| spawn.multiplicity)
        .sum()
}
