use pigskin_core::LeagueId;
use pigskin_host::HostError;
use thiserror::Error;

/// Failure reported by a store or feed collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("league {0} not found")]
    LeagueNotFound(LeagueId),
    #[error("commit rejected for league {league}: {reason}")]
    CommitRejected { league: LeagueId, reason: String },
}

/// Aborts a whole tick before any league commits. No league's cursor moves.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TickError {
    #[error("play feed unavailable: {0}")]
    FeedUnavailable(#[source] StoreError),
    #[error("store read failed: {0}")]
    StoreReadFailure(#[source] StoreError),
}

/// Fails one league for one tick. Its staged mutations are dropped and the
/// range is retried on the next tick.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LeagueError {
    #[error("commit failed: {0}")]
    StoreCommitFailure(#[source] StoreError),
    #[error(transparent)]
    Engine(#[from] HostError),
}

/// Error from a commissioner operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdminError {
    #[error("league {0} has no members")]
    EmptyQueue(LeagueId),
    #[error(transparent)]
    Engine(HostError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<HostError> for AdminError {
    fn from(err: HostError) -> Self {
        match err {
            HostError::EmptyQueue(league) => AdminError::EmptyQueue(league),
            other => AdminError::Engine(other),
        }
    }
}
