//! Access-workflow errors.

use thiserror::Error;

use crate::domain::foundation::{
    AccessRequestId, DiscussionId, DomainError, ErrorCode, InviteId, ParticipantId,
    ValidationError,
};
use crate::domain::participant::ParticipantError;

use super::InviteRequestStatus;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AccessError {
    #[error("Invite {0} not found")]
    InviteNotFound(InviteId),

    #[error("Access request {0} not found")]
    RequestNotFound(AccessRequestId),

    #[error("Discussion {0} not found")]
    DiscussionNotFound(DiscussionId),

    #[error("Participant {0} not found")]
    ParticipantNotFound(ParticipantId),

    #[error("Cannot move from {from} to {to}")]
    InvalidTransition {
        from: InviteRequestStatus,
        to: InviteRequestStatus,
    },

    #[error("Participant {participant} does not belong to discussion {discussion}")]
    Forbidden {
        participant: ParticipantId,
        discussion: DiscussionId,
    },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Participant(#[from] ParticipantError),

    #[error(transparent)]
    Store(#[from] DomainError),

    #[error("{cause} (rollback also failed: {rollback})")]
    RollbackFailed {
        cause: Box<AccessError>,
        rollback: DomainError,
    },
}

impl AccessError {
    pub fn code(&self) -> ErrorCode {
        match self {
            AccessError::InviteNotFound(_) => ErrorCode::InviteNotFound,
            AccessError::RequestNotFound(_) => ErrorCode::AccessRequestNotFound,
            AccessError::DiscussionNotFound(_) => ErrorCode::DiscussionNotFound,
            AccessError::ParticipantNotFound(_) => ErrorCode::ParticipantNotFound,
            AccessError::InvalidTransition { .. } => ErrorCode::InvalidStateTransition,
            AccessError::Forbidden { .. } => ErrorCode::Forbidden,
            AccessError::Validation(_) => ErrorCode::ValidationFailed,
            AccessError::Participant(err) => err.code(),
            AccessError::Store(err) => err.code,
            AccessError::RollbackFailed { .. } => ErrorCode::TransactionError,
        }
    }
}

impl From<AccessError> for DomainError {
    fn from(err: AccessError) -> Self {
        match err {
            AccessError::Store(inner) => inner,
            other => DomainError::new(other.code(), other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_follow_variants() {
        assert_eq!(
            AccessError::InviteNotFound(InviteId::new()).code(),
            ErrorCode::InviteNotFound
        );
        assert_eq!(
            AccessError::InvalidTransition {
                from: InviteRequestStatus::Accepted,
                to: InviteRequestStatus::Rejected,
            }
            .code(),
            ErrorCode::InvalidStateTransition
        );
        assert_eq!(
            AccessError::Store(DomainError::database("x")).code(),
            ErrorCode::DatabaseError
        );
    }

    #[test]
    fn invalid_transition_reads_naturally() {
        let err = AccessError::InvalidTransition {
            from: InviteRequestStatus::Accepted,
            to: InviteRequestStatus::Pending,
        };
        assert_eq!(err.to_string(), "Cannot move from accepted to pending");
    }

    #[test]
    fn participant_errors_keep_their_code() {
        let err: AccessError = ParticipantError::DuplicateIdentity {
            discussion_id: DiscussionId::new(),
            anonymous: false,
        }
        .into();
        assert_eq!(err.code(), ErrorCode::DuplicateIdentity);
    }
}
