//! Commands and results of the access workflow.

use crate::application::notifications::DispatchHandle;
use crate::domain::access::{
    DiscussionAccessRequest, DiscussionInvite, InviteRequestStatus, UserAccessUpdate,
};
use crate::domain::discussion::Post;
use crate::domain::foundation::{AccessRequestId, DiscussionId, Handle, InviteId, ParticipantId, UserId};
use crate::domain::participant::{JoinParams, Participant};

#[derive(Debug, Clone)]
pub struct RequestAccessCommand {
    pub user_id: UserId,
    pub discussion_id: DiscussionId,
}

#[derive(Debug, Clone)]
pub struct RespondToRequestCommand {
    pub request_id: AccessRequestId,
    pub decision: InviteRequestStatus,
    pub responding_participant_id: ParticipantId,
}

#[derive(Debug, Clone)]
pub struct RespondToRequestResult {
    pub request: DiscussionAccessRequest,
    /// Invite issued to the requester on acceptance.
    pub invite: Option<DiscussionInvite>,
}

#[derive(Debug, Clone)]
pub struct InviteUserCommand {
    pub inviter_participant_id: ParticipantId,
    pub discussion_id: DiscussionId,
    pub user_id: UserId,
}

/// Invite a batch of users by their social handles.
#[derive(Debug, Clone)]
pub struct InviteByHandleCommand {
    pub inviter_participant_id: ParticipantId,
    pub discussion_id: DiscussionId,
    pub handles: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct InviteByHandleResult {
    /// One invite per resolved user; pre-existing pending invites are
    /// returned unchanged.
    pub invites: Vec<DiscussionInvite>,
    /// Handles that are malformed or match no user.
    pub unknown_handles: Vec<String>,
    /// Handles that resolve to the inviter.
    pub self_invites: Vec<Handle>,
}

#[derive(Debug, Clone)]
pub struct RespondToInvitationCommand {
    pub invite_id: InviteId,
    pub decision: InviteRequestStatus,
    pub join_params: JoinParams,
}

#[derive(Debug)]
pub struct RespondToInvitationResult {
    pub invite: DiscussionInvite,
    /// Membership created or reactivated on acceptance.
    pub participant: Option<Participant>,
    /// Announcement appended on acceptance.
    pub post: Option<Post>,
    /// Fan-out started for the announcement after commit.
    pub dispatch: Option<DispatchHandle>,
}

#[derive(Debug, Clone)]
pub struct UpsertUserAccessCommand {
    pub discussion_id: DiscussionId,
    pub user_id: UserId,
    pub update: UserAccessUpdate,
}
