//! Game-data regions the planner can be scoped to.

use serde::{Deserialize, Serialize};

/// Region whose mission and quest data the planner operates on.
///
/// Enemy roster data only exists upstream for these two regions; persisted
/// rows are keyed by the region's canonical two-letter code.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    Serialize,
    Deserialize,
)]
pub enum Region {
    #[default]
    #[strum(serialize = "JP")]
    Jp,
    #[strum(serialize = "NA")]
    Na,
}
