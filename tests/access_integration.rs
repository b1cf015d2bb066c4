//! Integration tests for the request and invitation workflows.

mod common;

use std::sync::Arc;

use common::{user_id, Harness};
use conclave::adapters::StoreOp;
use conclave::application::{
    AccessControlWorkflow, ChangeParticipantCommand, InviteByHandleCommand, InviteUserCommand,
    RequestAccessCommand, RespondToInvitationCommand, RespondToRequestCommand,
    UpsertUserAccessCommand,
};
use conclave::domain::access::{
    AccessError, AccessState, InviteRequestStatus, InviteType, NotificationSetting,
    UserAccessUpdate,
};
use conclave::domain::discussion::PostKind;
use conclave::domain::foundation::{DiscussionId, ErrorCode, Handle, InviteId};
use conclave::domain::participant::{JoinParams, ParticipantChanges};

fn accept(invite_id: InviteId, anonymous: bool) -> RespondToInvitationCommand {
    RespondToInvitationCommand {
        invite_id,
        decision: InviteRequestStatus::Accepted,
        join_params: JoinParams::joined(anonymous),
    }
}

#[tokio::test]
async fn request_accept_join_and_notify() {
    let h = Harness::new();
    let d = h.discussion("Rust in production");
    let owner = h.member(d.id, "olive", false).await;
    h.device("olive-old", "olive", "android", 50);
    let latest = h.device("olive-new", "olive", "ios", 100);

    let request = h
        .access
        .request_access(RequestAccessCommand {
            user_id: user_id("ann"),
            discussion_id: d.id,
        })
        .await
        .unwrap();
    assert_eq!(request.status, InviteRequestStatus::Pending);

    let answered = h
        .access
        .respond_to_request(RespondToRequestCommand {
            request_id: request.id,
            decision: InviteRequestStatus::Accepted,
            responding_participant_id: owner.id,
        })
        .await
        .unwrap();
    assert_eq!(answered.request.status, InviteRequestStatus::Accepted);
    let invite = answered.invite.expect("acceptance issues an invite");
    assert_eq!(invite.invite_type, InviteType::AccessRequestAccepted);
    assert_eq!(invite.inviting_participant_id, owner.id);

    let access = h.access.user_access(&d.id, &user_id("ann")).await.unwrap().unwrap();
    assert_eq!(access.state, AccessState::Active);
    assert_eq!(access.notification_setting, NotificationSetting::Everything);
    assert_eq!(access.request_id, Some(request.id));

    let pending = h.access.pending_invites_for(&user_id("ann")).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, invite.id);

    let joined = h.access.respond_to_invitation(accept(invite.id, false)).await.unwrap();
    assert_eq!(joined.invite.status, InviteRequestStatus::Accepted);

    let participant = joined.participant.expect("acceptance creates membership");
    assert_eq!(participant.participant_index, 1);
    assert!(participant.has_joined);
    assert_eq!(participant.inviter_id, Some(owner.id));

    let post = joined.post.expect("acceptance announces the join");
    assert_eq!(post.kind, PostKind::ParticipantJoined);
    assert_eq!(post.participant_id, participant.id);
    assert_eq!(
        post.content,
        format!("{} joined the discussion", participant.display_name(d.shuffle_count))
    );
    assert_eq!(h.store.posts().unwrap(), vec![post.clone()]);

    let dispatch = joined.dispatch.expect("subscribers are notified after commit");
    assert_eq!(dispatch.target_count, 1, "ann wrote the join post");
    dispatch.settled().await;

    let deliveries = h.push.deliveries();
    assert_eq!(deliveries.len(), 1, "olive gets exactly one push");
    assert_eq!(deliveries[0].device, latest);
    assert_eq!(deliveries[0].notification.title, "New post in Rust in production");

    let access = h.access.user_access(&d.id, &user_id("ann")).await.unwrap().unwrap();
    assert_eq!(access.request_id, Some(request.id), "acceptance keeps the request link");
    assert!(h.access.pending_invites_for(&user_id("ann")).await.unwrap().is_empty());
}

#[tokio::test]
async fn pending_request_is_returned_instead_of_duplicated() {
    let h = Harness::new();
    let d = h.discussion("Requests");
    let cmd = RequestAccessCommand {
        user_id: user_id("ann"),
        discussion_id: d.id,
    };

    let first = h.access.request_access(cmd.clone()).await.unwrap();
    let second = h.access.request_access(cmd).await.unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(h.access.requests_for_discussion(&d.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn rejected_request_can_be_filed_again_but_not_answered_twice() {
    let h = Harness::new();
    let d = h.discussion("Again");
    let owner = h.join(d.id, "olive", false).await;
    let cmd = RequestAccessCommand {
        user_id: user_id("ann"),
        discussion_id: d.id,
    };

    let first = h.access.request_access(cmd.clone()).await.unwrap();
    let rejected = h
        .access
        .respond_to_request(RespondToRequestCommand {
            request_id: first.id,
            decision: InviteRequestStatus::Rejected,
            responding_participant_id: owner.id,
        })
        .await
        .unwrap();
    assert!(rejected.invite.is_none());
    assert!(h.access.user_access(&d.id, &user_id("ann")).await.unwrap().is_none());

    let err = h
        .access
        .respond_to_request(RespondToRequestCommand {
            request_id: first.id,
            decision: InviteRequestStatus::Accepted,
            responding_participant_id: owner.id,
        })
        .await
        .unwrap_err();
    assert_eq!(
        err,
        AccessError::InvalidTransition {
            from: InviteRequestStatus::Rejected,
            to: InviteRequestStatus::Accepted,
        }
    );

    let second = h.access.request_access(cmd).await.unwrap();
    assert_ne!(second.id, first.id);
    assert_eq!(h.access.requests_by_user(&user_id("ann")).await.unwrap().len(), 2);
}

#[tokio::test]
async fn outsider_cannot_answer_a_request() {
    let h = Harness::new();
    let d = h.discussion("Guarded");
    let elsewhere = h.discussion("Elsewhere");
    let outsider = h.join(elsewhere.id, "mallory", false).await;

    let request = h
        .access
        .request_access(RequestAccessCommand {
            user_id: user_id("ann"),
            discussion_id: d.id,
        })
        .await
        .unwrap();

    let err = h
        .access
        .respond_to_request(RespondToRequestCommand {
            request_id: request.id,
            decision: InviteRequestStatus::Accepted,
            responding_participant_id: outsider.id,
        })
        .await
        .unwrap_err();

    assert_eq!(err.code(), ErrorCode::Forbidden);
    let stored = h.access.access_request(&request.id).await.unwrap().unwrap();
    assert_eq!(stored.status, InviteRequestStatus::Pending);
}

#[tokio::test]
async fn request_for_unknown_discussion_fails() {
    let h = Harness::new();
    let missing = DiscussionId::new();
    let err = h
        .access
        .request_access(RequestAccessCommand {
            user_id: user_id("ann"),
            discussion_id: missing,
        })
        .await
        .unwrap_err();
    assert_eq!(err, AccessError::DiscussionNotFound(missing));
}

#[tokio::test]
async fn inviting_twice_returns_the_pending_invite() {
    let h = Harness::new();
    let d = h.discussion("Invites");
    let owner = h.join(d.id, "olive", false).await;
    let cmd = InviteUserCommand {
        inviter_participant_id: owner.id,
        discussion_id: d.id,
        user_id: user_id("ann"),
    };

    let first = h.access.invite_user(cmd.clone()).await.unwrap();
    let second = h.access.invite_user(cmd.clone()).await.unwrap();
    assert_eq!(first.id, second.id);
    assert_eq!(first.invite_type, InviteType::Invite);

    let declined = h
        .access
        .respond_to_invitation(RespondToInvitationCommand {
            invite_id: first.id,
            decision: InviteRequestStatus::Rejected,
            join_params: JoinParams::default(),
        })
        .await
        .unwrap();
    assert_eq!(declined.invite.status, InviteRequestStatus::Rejected);
    assert!(declined.participant.is_none());
    assert!(declined.dispatch.is_none());

    let third = h.access.invite_user(cmd).await.unwrap();
    assert_ne!(third.id, first.id);
    assert_eq!(h.access.sent_invites(&owner.id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn decided_invite_cannot_be_answered_again() {
    let h = Harness::new();
    let d = h.discussion("Once");
    let owner = h.join(d.id, "olive", false).await;
    let invite = h
        .access
        .invite_user(InviteUserCommand {
            inviter_participant_id: owner.id,
            discussion_id: d.id,
            user_id: user_id("ann"),
        })
        .await
        .unwrap();

    h.access.respond_to_invitation(accept(invite.id, false)).await.unwrap();
    let err = h
        .access
        .respond_to_invitation(accept(invite.id, true))
        .await
        .unwrap_err();

    assert_eq!(err.code(), ErrorCode::InvalidStateTransition);
    assert_eq!(h.store.participants().unwrap().len(), 2);
}

#[tokio::test]
async fn unknown_invite_is_not_found() {
    let h = Harness::new();
    let missing = InviteId::new();
    let err = h.access.respond_to_invitation(accept(missing, false)).await.unwrap_err();
    assert_eq!(err, AccessError::InviteNotFound(missing));
}

#[tokio::test]
async fn accepting_reactivates_a_left_identity() {
    let h = Harness::new();
    let d = h.discussion("Return");
    let owner = h.join(d.id, "olive", false).await;
    let ann = h.join(d.id, "ann", false).await;
    h.participants
        .change_participant(ChangeParticipantCommand {
            discussion_id: d.id,
            user_id: user_id("ann"),
            target: ann.id,
            changes: ParticipantChanges::set_joined(false),
        })
        .await
        .unwrap();

    let invite = h
        .access
        .invite_user(InviteUserCommand {
            inviter_participant_id: owner.id,
            discussion_id: d.id,
            user_id: user_id("ann"),
        })
        .await
        .unwrap();
    let joined = h.access.respond_to_invitation(accept(invite.id, false)).await.unwrap();

    let participant = joined.participant.unwrap();
    assert_eq!(participant.id, ann.id);
    assert!(participant.has_joined);
    assert_eq!(h.store.participants().unwrap().len(), 2);
}

#[tokio::test]
async fn failed_acceptance_leaves_nothing_behind() {
    let h = Harness::new();
    let d = h.discussion("Atomic");
    let owner = h.join(d.id, "olive", false).await;
    let invite = h
        .access
        .invite_user(InviteUserCommand {
            inviter_participant_id: owner.id,
            discussion_id: d.id,
            user_id: user_id("ann"),
        })
        .await
        .unwrap();
    h.store.fail_on(StoreOp::PutPost).unwrap();

    let err = h.access.respond_to_invitation(accept(invite.id, false)).await.unwrap_err();

    assert!(matches!(err, AccessError::Store(_)));
    let stored = h.access.invite(&invite.id).await.unwrap().unwrap();
    assert_eq!(stored.status, InviteRequestStatus::Pending);
    assert_eq!(h.store.participants().unwrap().len(), 1);
    assert!(h.access.user_access(&d.id, &user_id("ann")).await.unwrap().is_none());
    assert_eq!(h.push.delivery_count(), 0);
}

#[tokio::test]
async fn rollback_failure_is_combined_with_the_cause() {
    let h = Harness::new();
    let d = h.discussion("Double fault");
    h.store.fail_on(StoreOp::PutAccessRequest).unwrap();
    h.store.fail_on(StoreOp::Rollback).unwrap();

    let err = h
        .access
        .request_access(RequestAccessCommand {
            user_id: user_id("ann"),
            discussion_id: d.id,
        })
        .await
        .unwrap_err();

    assert_eq!(err.code(), ErrorCode::TransactionError);
    let AccessError::RollbackFailed { cause, rollback } = err else {
        panic!("expected a combined rollback failure");
    };
    assert!(matches!(*cause, AccessError::Store(_)));
    assert_eq!(rollback.code, ErrorCode::DatabaseError);
}

#[tokio::test]
async fn bulk_invite_reports_unknown_and_self_handles() {
    let h = Harness::new();
    let d = h.discussion("Bulk");
    let owner = h.join(d.id, "olive", false).await;
    h.handle("@Bea", "bea");
    h.handle("cal", "cal");
    h.handle("olive", "olive");

    let earlier = h
        .access
        .invite_user(InviteUserCommand {
            inviter_participant_id: owner.id,
            discussion_id: d.id,
            user_id: user_id("cal"),
        })
        .await
        .unwrap();

    let result = h
        .access
        .invite_users_by_handle(InviteByHandleCommand {
            inviter_participant_id: owner.id,
            discussion_id: d.id,
            handles: vec![
                "@bea".to_string(),
                "BEA".to_string(),
                "cal".to_string(),
                "@ghost".to_string(),
                "".to_string(),
                "@olive".to_string(),
            ],
        })
        .await
        .unwrap();

    assert_eq!(result.invites.len(), 2);
    assert_eq!(result.invites[0].user_id, user_id("bea"));
    assert_eq!(result.invites[1].id, earlier.id);
    assert_eq!(result.unknown_handles, vec!["@ghost".to_string(), "".to_string()]);
    assert_eq!(result.self_invites, vec![Handle::parse("olive").unwrap()]);
    assert_eq!(h.store.invites().unwrap().len(), 2);
}

#[tokio::test]
async fn access_upsert_keeps_omitted_fields() {
    let h = Harness::new();
    let d = h.discussion("Settings");

    let archived = h
        .access
        .upsert_user_access(UpsertUserAccessCommand {
            discussion_id: d.id,
            user_id: user_id("ann"),
            update: UserAccessUpdate {
                state: Some(AccessState::Archived),
                ..Default::default()
            },
        })
        .await
        .unwrap();
    assert_eq!(archived.state, AccessState::Archived);
    assert_eq!(archived.notification_setting, NotificationSetting::Everything);

    let muted = h
        .access
        .upsert_user_access(UpsertUserAccessCommand {
            discussion_id: d.id,
            user_id: user_id("ann"),
            update: UserAccessUpdate {
                notification_setting: Some(NotificationSetting::Mentions),
                ..Default::default()
            },
        })
        .await
        .unwrap();
    assert_eq!(muted.state, AccessState::Archived);
    assert_eq!(muted.notification_setting, NotificationSetting::Mentions);
    assert_eq!(muted.created_at, archived.created_at);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_invites_for_one_pair_share_a_single_invite() {
    let h = Harness::new();
    let d = h.discussion("Racing");
    let owner = h.join(d.id, "olive", false).await;
    let access = Arc::new(AccessControlWorkflow::new(
        Arc::new(h.store.clone()),
        Arc::clone(&h.participants),
        Arc::clone(&h.dispatcher),
    ));
    let cmd = InviteUserCommand {
        inviter_participant_id: owner.id,
        discussion_id: d.id,
        user_id: user_id("ann"),
    };

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let access = Arc::clone(&access);
            let cmd = cmd.clone();
            tokio::spawn(async move { access.invite_user(cmd).await })
        })
        .collect();
    let mut ids = Vec::new();
    for task in tasks {
        ids.push(task.await.unwrap().unwrap().id);
    }

    ids.dedup();
    assert_eq!(ids.len(), 1);
    assert_eq!(h.store.invites().unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_for_one_pair_share_a_single_request() {
    let h = Harness::new();
    let d = h.discussion("Racing requests");
    let access = Arc::new(AccessControlWorkflow::new(
        Arc::new(h.store.clone()),
        Arc::clone(&h.participants),
        Arc::clone(&h.dispatcher),
    ));
    let cmd = RequestAccessCommand {
        user_id: user_id("ann"),
        discussion_id: d.id,
    };

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let access = Arc::clone(&access);
            let cmd = cmd.clone();
            tokio::spawn(async move { access.request_access(cmd).await })
        })
        .collect();
    let mut ids = Vec::new();
    for task in tasks {
        ids.push(task.await.unwrap().unwrap().id);
    }

    ids.dedup();
    assert_eq!(ids.len(), 1);
    assert_eq!(h.access.requests_for_discussion(&d.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn access_link_resolves_by_slug_and_discussion() {
    let h = Harness::new();
    let d = h.discussion("Shared");

    let link = h.access.create_access_link(d.id).await.unwrap();
    assert_eq!(link.discussion_id, d.id);

    let by_slug = h
        .access
        .access_link_by_slug(&link.link_slug.as_str().to_uppercase())
        .await
        .unwrap();
    assert_eq!(by_slug, Some(link.clone()));
    assert_eq!(h.access.access_link_for_discussion(&d.id).await.unwrap(), Some(link));
}

#[tokio::test]
async fn newest_access_link_is_handed_out_and_older_ones_still_resolve() {
    let h = Harness::new();
    let d = h.discussion("Rotated");

    let first = h.access.create_access_link(d.id).await.unwrap();
    let second = h.access.create_access_link(d.id).await.unwrap();
    assert_ne!(first.link_slug, second.link_slug);

    assert_eq!(
        h.access.access_link_for_discussion(&d.id).await.unwrap(),
        Some(second)
    );
    assert_eq!(
        h.access.access_link_by_slug(first.link_slug.as_str()).await.unwrap(),
        Some(first)
    );
}

#[tokio::test]
async fn unknown_and_malformed_slugs() {
    let h = Harness::new();
    let d = h.discussion("Nothing shared");

    assert_eq!(h.access.access_link_by_slug("abcdefghijkl").await.unwrap(), None);
    assert_eq!(h.access.access_link_for_discussion(&d.id).await.unwrap(), None);

    let err = h.access.access_link_by_slug("not/a/slug").await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::ValidationFailed);
}

#[tokio::test]
async fn access_link_for_unknown_discussion_fails() {
    let h = Harness::new();
    let missing = DiscussionId::new();

    let err = h.access.create_access_link(missing).await.unwrap_err();

    assert_eq!(err, AccessError::DiscussionNotFound(missing));
    assert!(h.store.access_links().unwrap().is_empty());
}

#[tokio::test]
async fn failed_access_link_write_rolls_back() {
    let h = Harness::new();
    let d = h.discussion("Unlucky");
    h.store.fail_on(StoreOp::PutAccessLink).unwrap();

    let err = h.access.create_access_link(d.id).await.unwrap_err();

    assert!(matches!(err, AccessError::Store(_)));
    assert!(h.store.access_links().unwrap().is_empty());
    assert_eq!(h.access.access_link_for_discussion(&d.id).await.unwrap(), None);
}
