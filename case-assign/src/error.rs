use thiserror::Error;

use crate::types::TeamId;

/// Enumeration of errors raised by a `CaseStore` backend.
/// All of these are transient lookup failures from the resolver's point of
/// view: no write has been issued yet, so the whole resolution can be retried.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("a database error occurred: {0}")]
    Database(#[from] sqlx::Error),
    #[error("timed out waiting for the case store")]
    Timeout,
    #[error("the case store is unavailable: {0}")]
    Unavailable(String),
}

/// Enumeration of errors raised while resolving an assignment.
#[derive(Error, Debug)]
pub enum AssignError {
    #[error("failed to look up assignment data")]
    LookupFailed(#[from] StoreError),
    #[error("team {0} has no members and no default queue configured")]
    NoQueueConfigured(TeamId),
}
