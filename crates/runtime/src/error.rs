//! Unified error types surfaced by the planner API.
//!
//! Wraps failures from the game-data sources, the store, and the solver so
//! callers can bubble them up with consistent context.
use thiserror::Error;

use crate::engine::SolveError;
use crate::sources::SourceError;
use crate::store::StoreError;

pub type Result<T> = std::result::Result<T, PlannerError>;

#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("{operation} still failing after {attempts} attempts")]
    RetriesExhausted {
        operation: &'static str,
        attempts: u32,
        #[source]
        source: SourceError,
    },

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Solve(#[from] SolveError),

    #[error("cached assignment row could not be decoded")]
    CorruptCache(#[source] farm_core::TraitKeyError),

    #[error("planner worker join failed")]
    WorkerJoin(#[source] tokio::task::JoinError),
}
