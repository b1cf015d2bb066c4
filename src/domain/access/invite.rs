//! Invites and access requests.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    AccessRequestId, DiscussionId, InviteId, ParticipantId, StateMachine, Timestamp, UserId,
    ValidationError,
};

use super::{InviteRequestStatus, InviteType};

/// A member's offer for another user to join a discussion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscussionInvite {
    pub id: InviteId,
    pub user_id: UserId,
    pub discussion_id: DiscussionId,
    pub inviting_participant_id: ParticipantId,
    pub status: InviteRequestStatus,
    pub invite_type: InviteType,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl DiscussionInvite {
    /// Creates a pending invite.
    pub fn pending(
        user_id: UserId,
        discussion_id: DiscussionId,
        inviting_participant_id: ParticipantId,
        invite_type: InviteType,
    ) -> Self {
        let now = Timestamp::now();
        Self {
            id: InviteId::new(),
            user_id,
            discussion_id,
            inviting_participant_id,
            status: InviteRequestStatus::Pending,
            invite_type,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == InviteRequestStatus::Pending
    }

    /// Moves the invite to `decision`, validating the transition.
    pub fn respond(&mut self, decision: InviteRequestStatus) -> Result<(), ValidationError> {
        self.status = self.status.transition_to(decision)?;
        self.updated_at = Timestamp::now();
        Ok(())
    }
}

/// A user's ask to join a restricted discussion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscussionAccessRequest {
    pub id: AccessRequestId,
    pub user_id: UserId,
    pub discussion_id: DiscussionId,
    pub status: InviteRequestStatus,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl DiscussionAccessRequest {
    /// Creates a pending request.
    pub fn pending(user_id: UserId, discussion_id: DiscussionId) -> Self {
        let now = Timestamp::now();
        Self {
            id: AccessRequestId::new(),
            user_id,
            discussion_id,
            status: InviteRequestStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == InviteRequestStatus::Pending
    }

    /// Moves the request to `decision`, validating the transition.
    pub fn respond(&mut self, decision: InviteRequestStatus) -> Result<(), ValidationError> {
        self.status = self.status.transition_to(decision)?;
        self.updated_at = Timestamp::now();
        Ok(())
    }
}
