//! AccessControlWorkflow - invite and access-request lifecycles.
//!
//! Every mutating operation runs in one store transaction:
//! `begin → mutate → commit`, with a failed mutation rolled back and a
//! failed rollback combined into the returned error. A unit of work that
//! loses a uniqueness race (two pending invites for one pair, a taken slug)
//! is rerun; the rerun finds and returns the winner's row.

use std::sync::Arc;

use tracing::{info, warn};

use crate::application::notifications::{NotificationDispatcher, NotifyCommand};
use crate::application::participants::{CreateParticipantCommand, JoinGuard, ParticipantManager};
use crate::application::transaction::{abort, begin, commit, retry_on_conflict};
use crate::domain::access::{
    merge_user_access, AccessError, DiscussionAccessLink, DiscussionAccessRequest,
    DiscussionInvite, DiscussionUserAccess, InviteRequestStatus, InviteType, LinkSlug,
    UserAccessUpdate,
};
use crate::domain::discussion::{Discussion, Post};
use crate::domain::foundation::{
    AccessRequestId, DiscussionId, Handle, InviteId, ParticipantId, StateMachine, UserId,
};
use crate::domain::participant::{Participant, ParticipantChanges, UserIdentities};
use crate::ports::{collect_cursor, Store, StoreTx};

use super::commands::{
    InviteByHandleCommand, InviteByHandleResult, InviteUserCommand, RequestAccessCommand,
    RespondToInvitationCommand, RespondToInvitationResult, RespondToRequestCommand,
    RespondToRequestResult, UpsertUserAccessCommand,
};

/// What an invitation response changed inside its transaction.
struct InvitationOutcome {
    invite: DiscussionInvite,
    joined: Option<Joined>,
}

struct Joined {
    participant: Participant,
    post: Post,
    discussion: Discussion,
}

pub struct AccessControlWorkflow {
    store: Arc<dyn Store>,
    participants: Arc<ParticipantManager>,
    notifier: Arc<NotificationDispatcher>,
}

impl AccessControlWorkflow {
    pub fn new(
        store: Arc<dyn Store>,
        participants: Arc<ParticipantManager>,
        notifier: Arc<NotificationDispatcher>,
    ) -> Self {
        Self {
            store,
            participants,
            notifier,
        }
    }

    // ════════════════════════════════════════════════════════════════════════
    // Access requests
    // ════════════════════════════════════════════════════════════════════════

    /// Files a pending access request.
    ///
    /// While a pending request for the same (user, discussion) exists it is
    /// returned instead of filing another. A new request after a decided one
    /// is allowed.
    pub async fn request_access(
        &self,
        cmd: RequestAccessCommand,
    ) -> Result<DiscussionAccessRequest, AccessError> {
        retry_on_conflict("request_access", || self.request_access_once(&cmd)).await
    }

    async fn request_access_once(
        &self,
        cmd: &RequestAccessCommand,
    ) -> Result<DiscussionAccessRequest, AccessError> {
        let mut tx = begin(self.store.as_ref(), "request_access").await?;
        match request_access_in_tx(tx.as_mut(), cmd).await {
            Ok(request) => {
                commit(tx, "request_access").await?;
                Ok(request)
            }
            Err(err) => Err(abort(tx, "request_access", err).await),
        }
    }

    /// Accepts or rejects an access request.
    ///
    /// Acceptance grants active access (notifying on everything, linked to
    /// the request) and issues a pending invite of type
    /// [`InviteType::AccessRequestAccepted`] from the responder.
    pub async fn respond_to_request(
        &self,
        cmd: RespondToRequestCommand,
    ) -> Result<RespondToRequestResult, AccessError> {
        retry_on_conflict("respond_to_request", || self.respond_to_request_once(&cmd)).await
    }

    async fn respond_to_request_once(
        &self,
        cmd: &RespondToRequestCommand,
    ) -> Result<RespondToRequestResult, AccessError> {
        let mut tx = begin(self.store.as_ref(), "respond_to_request").await?;
        match respond_to_request_in_tx(tx.as_mut(), cmd).await {
            Ok(result) => {
                commit(tx, "respond_to_request").await?;
                info!(
                    request_id = %result.request.id,
                    decision = %result.request.status,
                    "Access request answered"
                );
                Ok(result)
            }
            Err(err) => Err(abort(tx, "respond_to_request", err).await),
        }
    }

    // ════════════════════════════════════════════════════════════════════════
    // Invites
    // ════════════════════════════════════════════════════════════════════════

    /// Invites a user, returning the existing pending invite if there is one.
    pub async fn invite_user(
        &self,
        cmd: InviteUserCommand,
    ) -> Result<DiscussionInvite, AccessError> {
        retry_on_conflict("invite_user", || self.invite_user_once(&cmd)).await
    }

    async fn invite_user_once(
        &self,
        cmd: &InviteUserCommand,
    ) -> Result<DiscussionInvite, AccessError> {
        let mut tx = begin(self.store.as_ref(), "invite_user").await?;
        match invite_user_in_tx(tx.as_mut(), cmd).await {
            Ok(invite) => {
                commit(tx, "invite_user").await?;
                Ok(invite)
            }
            Err(err) => Err(abort(tx, "invite_user", err).await),
        }
    }

    /// Invites a batch of users by handle in one transaction.
    ///
    /// Unknown handles and handles resolving to the inviter are reported in
    /// the result rather than failing the batch.
    pub async fn invite_users_by_handle(
        &self,
        cmd: InviteByHandleCommand,
    ) -> Result<InviteByHandleResult, AccessError> {
        let inviter = self
            .store
            .find_participant(&cmd.inviter_participant_id)
            .await?
            .ok_or(AccessError::ParticipantNotFound(cmd.inviter_participant_id))?;
        ensure_member(&inviter, cmd.discussion_id)?;

        let mut result = InviteByHandleResult::default();
        let mut users: Vec<UserId> = Vec::new();
        for raw in &cmd.handles {
            let Ok(handle) = Handle::parse(raw) else {
                result.unknown_handles.push(raw.clone());
                continue;
            };
            match self.store.find_user_by_handle(&handle).await? {
                None => result.unknown_handles.push(raw.clone()),
                Some(user_id) if inviter.is_owned_by(&user_id) => result.self_invites.push(handle),
                Some(user_id) => {
                    if !users.contains(&user_id) {
                        users.push(user_id);
                    }
                }
            }
        }

        result.invites = retry_on_conflict("invite_users_by_handle", || {
            self.issue_invites_once(&users, cmd.discussion_id, inviter.id)
        })
        .await?;

        info!(
            discussion_id = %cmd.discussion_id,
            invited = result.invites.len(),
            unknown = result.unknown_handles.len(),
            "Bulk invite processed"
        );
        Ok(result)
    }

    async fn issue_invites_once(
        &self,
        users: &[UserId],
        discussion_id: DiscussionId,
        inviter: ParticipantId,
    ) -> Result<Vec<DiscussionInvite>, AccessError> {
        let mut tx = begin(self.store.as_ref(), "invite_users_by_handle").await?;
        let mut invites = Vec::with_capacity(users.len());
        for user_id in users {
            match issue_invite(
                tx.as_mut(),
                user_id.clone(),
                discussion_id,
                inviter,
                InviteType::Invite,
            )
            .await
            {
                Ok(invite) => invites.push(invite),
                Err(err) => return Err(abort(tx, "invite_users_by_handle", err).await),
            }
        }
        commit(tx, "invite_users_by_handle").await?;
        Ok(invites)
    }

    /// Accepts or rejects an invite.
    ///
    /// Acceptance grants active access, materializes the membership (or
    /// reactivates an existing record of the requested flavor) and appends
    /// a "joined" post, all in one transaction. Once committed, subscribers
    /// are notified of the post.
    pub async fn respond_to_invitation(
        &self,
        cmd: RespondToInvitationCommand,
    ) -> Result<RespondToInvitationResult, AccessError> {
        let outcome =
            retry_on_conflict("respond_to_invitation", || self.respond_to_invitation_once(&cmd))
                .await?;

        let Some(joined) = outcome.joined else {
            return Ok(RespondToInvitationResult {
                invite: outcome.invite,
                participant: None,
                post: None,
                dispatch: None,
            });
        };

        let dispatch = match self
            .notifier
            .notify_subscribers(NotifyCommand {
                discussion: Some(joined.discussion),
                post: Some(joined.post.clone()),
                content_preview: None,
            })
            .await
        {
            Ok(handle) => Some(handle),
            Err(err) => {
                warn!(invite_id = %outcome.invite.id, error = %err, "Could not notify subscribers");
                None
            }
        };

        Ok(RespondToInvitationResult {
            invite: outcome.invite,
            participant: Some(joined.participant),
            post: Some(joined.post),
            dispatch,
        })
    }

    async fn respond_to_invitation_once(
        &self,
        cmd: &RespondToInvitationCommand,
    ) -> Result<InvitationOutcome, AccessError> {
        let current = self
            .store
            .find_invite(&cmd.invite_id)
            .await?
            .ok_or(AccessError::InviteNotFound(cmd.invite_id))?;
        check_transition(current.status, cmd.decision)?;

        let guard = if cmd.decision == InviteRequestStatus::Accepted {
            Some(self.participants.lock_joins(current.discussion_id).await)
        } else {
            None
        };

        let mut tx = begin(self.store.as_ref(), "respond_to_invitation").await?;
        match self
            .respond_to_invitation_in_tx(tx.as_mut(), guard.as_ref(), cmd)
            .await
        {
            Ok(outcome) => {
                commit(tx, "respond_to_invitation").await?;
                Ok(outcome)
            }
            Err(err) => Err(abort(tx, "respond_to_invitation", err).await),
        }
    }

    async fn respond_to_invitation_in_tx(
        &self,
        tx: &mut dyn StoreTx,
        guard: Option<&JoinGuard>,
        cmd: &RespondToInvitationCommand,
    ) -> Result<InvitationOutcome, AccessError> {
        let mut invite = tx
            .find_invite(&cmd.invite_id)
            .await?
            .ok_or(AccessError::InviteNotFound(cmd.invite_id))?;
        check_transition(invite.status, cmd.decision)?;
        invite.respond(cmd.decision)?;
        let invite = tx.update_invite(&invite).await?;

        let Some(guard) = guard else {
            return Ok(InvitationOutcome {
                invite,
                joined: None,
            });
        };

        grant_access(tx, invite.discussion_id, &invite.user_id, None).await?;

        let discussion = tx
            .find_discussion(&invite.discussion_id)
            .await?
            .ok_or(AccessError::DiscussionNotFound(invite.discussion_id))?;
        let participant = self.materialize_membership(tx, guard, &invite, cmd).await?;
        let post = tx
            .put_post(&Post::participant_joined(&discussion, &participant))
            .await?;

        info!(
            invite_id = %invite.id,
            participant_id = %participant.id,
            discussion_id = %discussion.id,
            "Invitation accepted"
        );
        Ok(InvitationOutcome {
            invite,
            joined: Some(Joined {
                participant,
                post,
                discussion,
            }),
        })
    }

    async fn materialize_membership(
        &self,
        tx: &mut dyn StoreTx,
        guard: &JoinGuard,
        invite: &DiscussionInvite,
        cmd: &RespondToInvitationCommand,
    ) -> Result<Participant, AccessError> {
        let records = tx
            .participants_for_user(&invite.discussion_id, &invite.user_id)
            .await?;
        let identities = UserIdentities::from_records(records)?;

        if let Some(identities) = identities {
            if let Some(existing) = identities.flavor(cmd.join_params.is_anonymous) {
                let changes = ParticipantChanges::set_joined(cmd.join_params.has_joined);
                let target = existing.id;
                return Ok(self
                    .participants
                    .update_participant(tx, &identities, target, &changes)
                    .await?);
            }
        }

        let mut params = cmd.join_params.clone();
        params.inviter_id = Some(invite.inviting_participant_id);
        Ok(self
            .participants
            .create_participant(
                tx,
                guard,
                CreateParticipantCommand {
                    discussion_id: invite.discussion_id,
                    user_id: invite.user_id.clone(),
                    params,
                },
            )
            .await?)
    }

    // ════════════════════════════════════════════════════════════════════════
    // Access rows
    // ════════════════════════════════════════════════════════════════════════

    /// Writes a user's access row, keeping every field the update omits.
    pub async fn upsert_user_access(
        &self,
        cmd: UpsertUserAccessCommand,
    ) -> Result<DiscussionUserAccess, AccessError> {
        let mut tx = begin(self.store.as_ref(), "upsert_user_access").await?;
        match upsert_access_in_tx(tx.as_mut(), cmd.discussion_id, &cmd.user_id, &cmd.update).await
        {
            Ok(access) => {
                commit(tx, "upsert_user_access").await?;
                Ok(access)
            }
            Err(err) => Err(abort(tx, "upsert_user_access", err).await),
        }
    }

    pub async fn user_access(
        &self,
        discussion_id: &DiscussionId,
        user_id: &UserId,
    ) -> Result<Option<DiscussionUserAccess>, AccessError> {
        Ok(self.store.find_user_access(discussion_id, user_id).await?)
    }

    // ════════════════════════════════════════════════════════════════════════
    // Access links
    // ════════════════════════════════════════════════════════════════════════

    /// Issues a new shareable link for a discussion.
    ///
    /// Older links keep resolving; [`Self::access_link_for_discussion`]
    /// hands out the newest. A slug collision draws a fresh slug.
    pub async fn create_access_link(
        &self,
        discussion_id: DiscussionId,
    ) -> Result<DiscussionAccessLink, AccessError> {
        retry_on_conflict("create_access_link", || self.create_access_link_once(discussion_id))
            .await
    }

    async fn create_access_link_once(
        &self,
        discussion_id: DiscussionId,
    ) -> Result<DiscussionAccessLink, AccessError> {
        let mut tx = begin(self.store.as_ref(), "create_access_link").await?;
        match create_access_link_in_tx(tx.as_mut(), discussion_id).await {
            Ok(link) => {
                commit(tx, "create_access_link").await?;
                info!(discussion_id = %link.discussion_id, "Access link created");
                Ok(link)
            }
            Err(err) => Err(abort(tx, "create_access_link", err).await),
        }
    }

    /// Resolves a slug taken from a shared URL.
    pub async fn access_link_by_slug(
        &self,
        raw: &str,
    ) -> Result<Option<DiscussionAccessLink>, AccessError> {
        let slug = LinkSlug::parse(raw)?;
        Ok(self.store.find_access_link(&slug).await?)
    }

    pub async fn access_link_for_discussion(
        &self,
        discussion_id: &DiscussionId,
    ) -> Result<Option<DiscussionAccessLink>, AccessError> {
        Ok(self.store.latest_access_link(discussion_id).await?)
    }

    // ════════════════════════════════════════════════════════════════════════
    // Queries
    // ════════════════════════════════════════════════════════════════════════

    pub async fn invite(&self, id: &InviteId) -> Result<Option<DiscussionInvite>, AccessError> {
        Ok(self.store.find_invite(id).await?)
    }

    pub async fn pending_invites_for(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<DiscussionInvite>, AccessError> {
        Ok(collect_cursor(self.store.pending_invites_for_user(user_id).await).await?)
    }

    pub async fn sent_invites(
        &self,
        inviter: &ParticipantId,
    ) -> Result<Vec<DiscussionInvite>, AccessError> {
        Ok(collect_cursor(self.store.sent_invites(inviter).await).await?)
    }

    pub async fn access_request(
        &self,
        id: &AccessRequestId,
    ) -> Result<Option<DiscussionAccessRequest>, AccessError> {
        Ok(self.store.find_access_request(id).await?)
    }

    pub async fn requests_for_discussion(
        &self,
        discussion_id: &DiscussionId,
    ) -> Result<Vec<DiscussionAccessRequest>, AccessError> {
        Ok(collect_cursor(self.store.requests_for_discussion(discussion_id).await).await?)
    }

    pub async fn requests_by_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<DiscussionAccessRequest>, AccessError> {
        Ok(collect_cursor(self.store.requests_by_user(user_id).await).await?)
    }
}

fn check_transition(
    from: InviteRequestStatus,
    to: InviteRequestStatus,
) -> Result<(), AccessError> {
    if from.can_transition_to(&to) {
        Ok(())
    } else {
        Err(AccessError::InvalidTransition { from, to })
    }
}

fn ensure_member(participant: &Participant, discussion_id: DiscussionId) -> Result<(), AccessError> {
    if participant.discussion_id == discussion_id {
        Ok(())
    } else {
        Err(AccessError::Forbidden {
            participant: participant.id,
            discussion: discussion_id,
        })
    }
}

async fn request_access_in_tx(
    tx: &mut dyn StoreTx,
    cmd: &RequestAccessCommand,
) -> Result<DiscussionAccessRequest, AccessError> {
    if tx.find_discussion(&cmd.discussion_id).await?.is_none() {
        return Err(AccessError::DiscussionNotFound(cmd.discussion_id));
    }
    if let Some(existing) = tx
        .find_pending_request(&cmd.user_id, &cmd.discussion_id)
        .await?
    {
        return Ok(existing);
    }

    let request = tx
        .put_access_request(&DiscussionAccessRequest::pending(
            cmd.user_id.clone(),
            cmd.discussion_id,
        ))
        .await?;
    info!(
        request_id = %request.id,
        discussion_id = %request.discussion_id,
        "Access requested"
    );
    Ok(request)
}

async fn respond_to_request_in_tx(
    tx: &mut dyn StoreTx,
    cmd: &RespondToRequestCommand,
) -> Result<RespondToRequestResult, AccessError> {
    let mut request = tx
        .find_access_request(&cmd.request_id)
        .await?
        .ok_or(AccessError::RequestNotFound(cmd.request_id))?;
    check_transition(request.status, cmd.decision)?;

    let responder = tx
        .find_participant(&cmd.responding_participant_id)
        .await?
        .ok_or(AccessError::ParticipantNotFound(cmd.responding_participant_id))?;
    ensure_member(&responder, request.discussion_id)?;

    request.respond(cmd.decision)?;
    let request = tx.update_access_request(&request).await?;

    let invite = if request.status == InviteRequestStatus::Accepted {
        grant_access(tx, request.discussion_id, &request.user_id, Some(request.id)).await?;
        Some(
            issue_invite(
                tx,
                request.user_id.clone(),
                request.discussion_id,
                responder.id,
                InviteType::AccessRequestAccepted,
            )
            .await?,
        )
    } else {
        None
    };

    Ok(RespondToRequestResult { request, invite })
}

async fn invite_user_in_tx(
    tx: &mut dyn StoreTx,
    cmd: &InviteUserCommand,
) -> Result<DiscussionInvite, AccessError> {
    let inviter = tx
        .find_participant(&cmd.inviter_participant_id)
        .await?
        .ok_or(AccessError::ParticipantNotFound(cmd.inviter_participant_id))?;
    ensure_member(&inviter, cmd.discussion_id)?;

    issue_invite(
        tx,
        cmd.user_id.clone(),
        cmd.discussion_id,
        inviter.id,
        InviteType::Invite,
    )
    .await
}

async fn create_access_link_in_tx(
    tx: &mut dyn StoreTx,
    discussion_id: DiscussionId,
) -> Result<DiscussionAccessLink, AccessError> {
    if tx.find_discussion(&discussion_id).await?.is_none() {
        return Err(AccessError::DiscussionNotFound(discussion_id));
    }
    Ok(tx
        .put_access_link(&DiscussionAccessLink::generate(discussion_id))
        .await?)
}

/// Returns the pending invite for (user, discussion), creating one if none.
async fn issue_invite(
    tx: &mut dyn StoreTx,
    user_id: UserId,
    discussion_id: DiscussionId,
    inviter: ParticipantId,
    invite_type: InviteType,
) -> Result<DiscussionInvite, AccessError> {
    if let Some(existing) = tx.find_pending_invite(&user_id, &discussion_id).await? {
        return Ok(existing);
    }
    let invite = tx
        .put_invite(&DiscussionInvite::pending(
            user_id,
            discussion_id,
            inviter,
            invite_type,
        ))
        .await?;
    info!(
        invite_id = %invite.id,
        discussion_id = %invite.discussion_id,
        invite_type = invite.invite_type.as_str(),
        "Invite issued"
    );
    Ok(invite)
}

async fn grant_access(
    tx: &mut dyn StoreTx,
    discussion_id: DiscussionId,
    user_id: &UserId,
    request_id: Option<AccessRequestId>,
) -> Result<DiscussionUserAccess, AccessError> {
    upsert_access_in_tx(
        tx,
        discussion_id,
        user_id,
        &UserAccessUpdate::granted(request_id),
    )
    .await
}

async fn upsert_access_in_tx(
    tx: &mut dyn StoreTx,
    discussion_id: DiscussionId,
    user_id: &UserId,
    update: &UserAccessUpdate,
) -> Result<DiscussionUserAccess, AccessError> {
    let existing = tx.find_user_access(&discussion_id, user_id).await?;
    let merged = merge_user_access(existing, discussion_id, user_id.clone(), update);
    Ok(tx.put_user_access(&merged).await?)
}
