//! Participant-specific errors.

use thiserror::Error;

use crate::domain::foundation::{DiscussionId, DomainError, ErrorCode, ParticipantId};

fn flavor(anonymous: &bool) -> &'static str {
    if *anonymous {
        "an anonymous"
    } else {
        "a non-anonymous"
    }
}

/// Errors raised while creating or changing participant records.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParticipantError {
    #[error("Participant {0} is not one of the user's identities")]
    NoMatchingParticipant(ParticipantId),

    #[error("User already has {} identity in discussion {discussion_id}", flavor(.anonymous))]
    DuplicateIdentity {
        discussion_id: DiscussionId,
        anonymous: bool,
    },

    #[error("Join guard for discussion {held} cannot be used for discussion {requested}")]
    GuardMismatch {
        held: DiscussionId,
        requested: DiscussionId,
    },

    #[error(transparent)]
    Store(#[from] DomainError),

    #[error("{cause} (rollback also failed: {rollback})")]
    RollbackFailed {
        cause: Box<ParticipantError>,
        rollback: DomainError,
    },
}

impl ParticipantError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ParticipantError::NoMatchingParticipant(_) => ErrorCode::ParticipantNotFound,
            ParticipantError::DuplicateIdentity { .. } => ErrorCode::DuplicateIdentity,
            ParticipantError::GuardMismatch { .. } => ErrorCode::InternalError,
            ParticipantError::Store(err) => err.code,
            ParticipantError::RollbackFailed { .. } => ErrorCode::TransactionError,
        }
    }
}

impl From<ParticipantError> for DomainError {
    fn from(err: ParticipantError) -> Self {
        match err {
            ParticipantError::Store(inner) => inner,
            other => DomainError::new(other.code(), other.to_string()),
        }
    }
}
