//! Trait-matching queries and their canonical identity.
//!
//! A weekly objective is "defeat N enemies bearing trait-set T". The trait
//! set plus its AND/OR discriminant form a [`TraitSignature`], the identity
//! used for deduplication, match-count keys, and the persisted cache rows.
//! The required kill count rides along in [`TraitQuery`] but never
//! participates in identity.

use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// Identifier for an enemy trait ("individuality") tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TraitId(pub u32);

impl fmt::Display for TraitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a multi-trait signature matches an enemy's trait set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MatchMode {
    /// The enemy must bear every trait in the signature.
    All,
    /// Bearing any one trait in the signature is enough.
    Any,
}

impl MatchMode {
    pub fn is_or(self) -> bool {
        matches!(self, MatchMode::Any)
    }

    pub fn from_is_or(is_or: bool) -> Self {
        if is_or { MatchMode::Any } else { MatchMode::All }
    }
}

/// Canonical identity of a kill objective: an unordered trait set plus the
/// AND/OR discriminant.
///
/// Equality and hashing are order-independent over the trait set. A
/// single-trait signature normalizes to [`MatchMode::All`] at construction,
/// so the discriminant never distinguishes two signatures over the same one
/// trait.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TraitSignature {
    traits: BTreeSet<TraitId>,
    mode: MatchMode,
}

impl TraitSignature {
    pub fn new(traits: impl IntoIterator<Item = TraitId>, mode: MatchMode) -> Self {
        let traits: BTreeSet<TraitId> = traits.into_iter().collect();
        let mode = if traits.len() <= 1 { MatchMode::All } else { mode };
        Self { traits, mode }
    }

    /// Signature requiring every listed trait.
    pub fn all(traits: impl IntoIterator<Item = TraitId>) -> Self {
        Self::new(traits, MatchMode::All)
    }

    /// Signature satisfied by any one of the listed traits.
    pub fn any(traits: impl IntoIterator<Item = TraitId>) -> Self {
        Self::new(traits, MatchMode::Any)
    }

    pub fn single(id: TraitId) -> Self {
        Self::new([id], MatchMode::All)
    }

    pub fn traits(&self) -> &BTreeSet<TraitId> {
        &self.traits
    }

    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    pub fn is_empty(&self) -> bool {
        self.traits.is_empty()
    }

    /// Whether an enemy bearing `enemy_traits` counts toward this signature.
    pub fn matches(&self, enemy_traits: &BTreeSet<TraitId>) -> bool {
        if self.traits.is_empty() {
            return false;
        }
        match self.mode {
            MatchMode::All => self.traits.is_subset(enemy_traits),
            MatchMode::Any => !self.traits.is_disjoint(enemy_traits),
        }
    }

    /// Canonical persisted encoding: sorted trait ids joined with `,`. The
    /// discriminant is stored in its own column, not inside the key.
    pub fn trait_key(&self) -> String {
        let ids: Vec<String> = self.traits.iter().map(TraitId::to_string).collect();
        ids.join(",")
    }

    /// Decode a persisted `trait_key` / `is_or` column pair.
    pub fn from_trait_key(key: &str, is_or: bool) -> Result<Self, TraitKeyError> {
        let mut traits = BTreeSet::new();
        for part in key.split(',') {
            let id = part.trim().parse::<u32>().map_err(|_| TraitKeyError {
                key: key.to_owned(),
            })?;
            traits.insert(TraitId(id));
        }
        Ok(Self::new(traits, MatchMode::from_is_or(is_or)))
    }
}

impl fmt::Display for TraitSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ids: Vec<String> = self.traits.iter().map(TraitId::to_string).collect();
        if ids.len() == 1 {
            return write!(f, "trait {}", ids[0]);
        }
        match self.mode {
            MatchMode::All => write!(f, "traits [{}]", ids.join(", ")),
            MatchMode::Any => write!(f, "any of traits [{}]", ids.join(", ")),
        }
    }
}

/// Raised when a persisted trait key fails to decode.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed trait key {key:?}")]
pub struct TraitKeyError {
    pub key: String,
}

/// One coverage objective: a signature plus the cumulative kill count it
/// requires.
///
/// Identity is the signature's alone; `required_count` is merge state and is
/// excluded from equality and hashing.
#[derive(Clone, Debug)]
pub struct TraitQuery {
    pub signature: TraitSignature,
    pub required_count: u64,
}

impl TraitQuery {
    pub fn new(signature: TraitSignature, required_count: u64) -> Self {
        Self {
            signature,
            required_count,
        }
    }
}

impl PartialEq for TraitQuery {
    fn eq(&self, other: &Self) -> bool {
        self.signature == other.signature
    }
}

impl Eq for TraitQuery {}

impl Hash for TraitQuery {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.signature.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::hash_map::DefaultHasher;

    use super::*;

    fn hash_of<T: Hash>(value: &T) -> u64 {
        let mut hasher = DefaultHasher::new();
        value.hash(&mut hasher);
        hasher.finish()
    }

    fn traits(ids: &[u32]) -> BTreeSet<TraitId> {
        ids.iter().copied().map(TraitId).collect()
    }

    #[test]
    fn identity_is_order_independent() {
        let a = TraitSignature::all([TraitId(201), TraitId(305)]);
        let b = TraitSignature::all([TraitId(305), TraitId(201)]);
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
    }

    #[test]
    fn identity_distinguishes_match_mode() {
        let and = TraitSignature::all([TraitId(201), TraitId(305)]);
        let or = TraitSignature::any([TraitId(201), TraitId(305)]);
        assert_ne!(and, or);
    }

    #[test]
    fn single_trait_normalizes_mode() {
        let as_or = TraitSignature::any([TraitId(201)]);
        let as_and = TraitSignature::all([TraitId(201)]);
        assert_eq!(as_or, as_and);
        assert_eq!(as_or.mode(), MatchMode::All);
    }

    #[test]
    fn required_count_is_not_identity() {
        let five = TraitQuery::new(TraitSignature::single(TraitId(201)), 5);
        let eight = TraitQuery::new(TraitSignature::single(TraitId(201)), 8);
        assert_eq!(five, eight);
        assert_eq!(hash_of(&five), hash_of(&eight));
    }

    #[test]
    fn all_mode_requires_superset() {
        let enemy = traits(&[100, 200, 300]);
        assert!(TraitSignature::all([TraitId(100), TraitId(200)]).matches(&enemy));
        assert!(!TraitSignature::all([TraitId(100), TraitId(999)]).matches(&enemy));
    }

    #[test]
    fn any_mode_requires_intersection() {
        let enemy = traits(&[100, 200, 300]);
        assert!(TraitSignature::any([TraitId(100), TraitId(999)]).matches(&enemy));
        assert!(!TraitSignature::any([TraitId(998), TraitId(999)]).matches(&enemy));
    }

    #[test]
    fn single_trait_is_membership() {
        let enemy = traits(&[100, 200, 300]);
        assert!(TraitSignature::single(TraitId(200)).matches(&enemy));
        assert!(!TraitSignature::single(TraitId(999)).matches(&enemy));
    }

    #[test]
    fn empty_signature_matches_nothing() {
        let enemy = traits(&[100]);
        assert!(!TraitSignature::all([]).matches(&enemy));
    }

    #[test]
    fn trait_key_is_sorted_and_round_trips() {
        let signature = TraitSignature::any([TraitId(305), TraitId(201), TraitId(1000)]);
        assert_eq!(signature.trait_key(), "201,305,1000");

        let decoded = TraitSignature::from_trait_key("201,305,1000", true).unwrap();
        assert_eq!(decoded, signature);
    }

    #[test]
    fn trait_key_rejects_garbage() {
        assert!(TraitSignature::from_trait_key("201,banana", false).is_err());
        assert!(TraitSignature::from_trait_key("", false).is_err());
    }
}
