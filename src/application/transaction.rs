//! Transaction discipline shared by the services.
//!
//! `begin → mutate → commit`. A failed mutation rolls back; if the rollback
//! fails too, both errors are kept. Begin and commit failures surface as is.
//! A unit of work that lost a uniqueness race is rerun a bounded number of
//! times with [`retry_on_conflict`].

use std::fmt::Display;
use std::future::Future;

use tracing::{error, warn};

use crate::domain::access::AccessError;
use crate::domain::foundation::{DomainError, ErrorCode};
use crate::domain::participant::ParticipantError;
use crate::ports::{Store, StoreTx};

/// Errors that can carry a failed rollback alongside their cause.
pub trait RollbackAware: Sized {
    fn with_rollback_failure(self, rollback: DomainError) -> Self;
}

impl RollbackAware for ParticipantError {
    fn with_rollback_failure(self, rollback: DomainError) -> Self {
        ParticipantError::RollbackFailed {
            cause: Box::new(self),
            rollback,
        }
    }
}

impl RollbackAware for AccessError {
    fn with_rollback_failure(self, rollback: DomainError) -> Self {
        AccessError::RollbackFailed {
            cause: Box::new(self),
            rollback,
        }
    }
}

/// Errors that can report a lost uniqueness race.
pub trait ConflictAware {
    fn is_conflict(&self) -> bool;
}

impl ConflictAware for ParticipantError {
    fn is_conflict(&self) -> bool {
        self.code() == ErrorCode::Conflict
    }
}

impl ConflictAware for AccessError {
    fn is_conflict(&self) -> bool {
        self.code() == ErrorCode::Conflict
    }
}

/// Attempts a conflicting unit of work gets before the conflict surfaces.
pub const CONFLICT_ATTEMPTS: u32 = 3;

/// Runs `attempt` until it stops failing with a conflict, at most
/// [`CONFLICT_ATTEMPTS`] times. Each attempt must open its own transaction.
pub async fn retry_on_conflict<T, E, F, Fut>(
    operation: &'static str,
    mut attempt: F,
) -> Result<T, E>
where
    E: ConflictAware + Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut tries = 1;
    loop {
        match attempt().await {
            Err(err) if err.is_conflict() && tries < CONFLICT_ATTEMPTS => {
                warn!(operation, attempt = tries, error = %err, "Conflict, retrying");
                tries += 1;
            }
            result => return result,
        }
    }
}

/// Rolls `tx` back after `err`, combining a rollback failure into it.
pub async fn abort<E>(tx: Box<dyn StoreTx>, operation: &'static str, err: E) -> E
where
    E: RollbackAware + Display,
{
    error!(operation, error = %err, "Transaction step failed, rolling back");
    match tx.rollback().await {
        Ok(()) => err,
        Err(rollback) => {
            error!(operation, error = %rollback, "Failed to roll back transaction");
            err.with_rollback_failure(rollback)
        }
    }
}

/// Commits `tx`, logging a failure before surfacing it.
pub async fn commit(tx: Box<dyn StoreTx>, operation: &'static str) -> Result<(), DomainError> {
    tx.commit().await.map_err(|err| {
        error!(operation, error = %err, "Failed to commit transaction");
        err
    })
}

/// Opens a transaction, logging a failure before surfacing it.
pub async fn begin(
    store: &dyn Store,
    operation: &'static str,
) -> Result<Box<dyn StoreTx>, DomainError> {
    store.begin_tx().await.map_err(|err| {
        error!(operation, error = %err, "Failed to begin transaction");
        err
    })
}
