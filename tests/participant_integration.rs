//! Integration tests for participant creation and identity changes.

mod common;

use std::collections::BTreeSet;
use std::sync::Arc;

use common::{user_id, Harness};
use conclave::adapters::StoreOp;
use conclave::application::{ChangeParticipantCommand, CreateParticipantCommand};
use conclave::domain::discussion::Flair;
use conclave::domain::foundation::{ErrorCode, FlairId};
use conclave::domain::participant::{JoinParams, ParticipantChanges, ParticipantError, UserIdentities};
use conclave::ports::Store;

#[tokio::test]
async fn join_order_follows_arrival() {
    let h = Harness::new();
    let d = h.discussion("Order");

    let first = h.join(d.id, "ann", false).await;
    let second = h.join(d.id, "ben", false).await;
    let third = h.join(d.id, "ann", true).await;

    assert_eq!(first.participant_index, 0);
    assert_eq!(second.participant_index, 1);
    assert_eq!(third.participant_index, 2);
    assert_eq!(first.viewer_id, third.viewer_id, "identities share one viewer");
    assert_eq!(h.store.viewers().unwrap().len(), 2);
    assert_eq!(h.store.links().unwrap().len(), 3);
}

#[tokio::test]
async fn concurrent_joins_get_dense_unique_indexes() {
    let h = Harness::new();
    let d = h.discussion("Crowd");

    let mut tasks = Vec::new();
    for n in 0..16 {
        let manager = Arc::clone(&h.participants);
        tasks.push(tokio::spawn(async move {
            manager
                .join_discussion(CreateParticipantCommand {
                    discussion_id: d.id,
                    user_id: user_id(&format!("user-{}", n)),
                    params: JoinParams::joined(n % 2 == 0),
                })
                .await
        }));
    }

    let mut indexes = BTreeSet::new();
    for task in tasks {
        let participant = task.await.unwrap().unwrap();
        indexes.insert(participant.participant_index);
    }

    assert_eq!(indexes, (0..16).collect::<BTreeSet<u32>>());
}

#[tokio::test]
async fn second_record_of_same_flavor_is_rejected() {
    let h = Harness::new();
    let d = h.discussion("Dupes");
    h.join(d.id, "ann", true).await;

    let err = h
        .participants
        .join_discussion(CreateParticipantCommand {
            discussion_id: d.id,
            user_id: user_id("ann"),
            params: JoinParams::joined(true),
        })
        .await
        .unwrap_err();

    assert_eq!(err.code(), ErrorCode::DuplicateIdentity);
    assert_eq!(h.store.participants().unwrap().len(), 1);
    assert_eq!(h.store.rollback_count(), 1);
}

#[tokio::test]
async fn flair_is_attached_only_when_owned() {
    let h = Harness::new();
    let d = h.discussion("Flair");
    let owned = Flair {
        id: FlairId::new(),
        user_id: user_id("ann"),
        display_name: "Verified".to_string(),
        image_url: None,
        source: "twitter".to_string(),
    };
    let foreign = Flair {
        id: FlairId::new(),
        user_id: user_id("ben"),
        ..owned.clone()
    };
    h.store.insert_flair(owned.clone()).unwrap();
    h.store.insert_flair(foreign.clone()).unwrap();

    let with_owned = h
        .participants
        .join_discussion(CreateParticipantCommand {
            discussion_id: d.id,
            user_id: user_id("ann"),
            params: JoinParams {
                flair_id: Some(owned.id),
                ..JoinParams::joined(false)
            },
        })
        .await
        .unwrap();
    let with_foreign = h
        .participants
        .join_discussion(CreateParticipantCommand {
            discussion_id: d.id,
            user_id: user_id("ann"),
            params: JoinParams {
                flair_id: Some(foreign.id),
                ..JoinParams::joined(true)
            },
        })
        .await
        .unwrap();

    assert_eq!(with_owned.flair_id, Some(owned.id));
    assert_eq!(with_foreign.flair_id, None);
}

#[tokio::test]
async fn failed_step_and_failed_rollback_are_both_reported() {
    let h = Harness::new();
    let d = h.discussion("Broken");
    h.store.fail_on(StoreOp::PutParticipant).unwrap();
    h.store.fail_on(StoreOp::Rollback).unwrap();

    let err = h
        .participants
        .join_discussion(CreateParticipantCommand {
            discussion_id: d.id,
            user_id: user_id("ann"),
            params: JoinParams::joined(false),
        })
        .await
        .unwrap_err();

    match err {
        ParticipantError::RollbackFailed { cause, rollback } => {
            match *cause {
                ParticipantError::Store(inner) => {
                    assert_eq!(inner.details.get("op").map(String::as_str), Some("PutParticipant"));
                }
                other => panic!("unexpected cause: {:?}", other),
            }
            assert_eq!(rollback.details.get("op").map(String::as_str), Some("Rollback"));
        }
        other => panic!("expected RollbackFailed, got {:?}", other),
    }
    assert!(h.store.participants().unwrap().is_empty());
    assert!(h.store.viewers().unwrap().is_empty());
}

#[tokio::test]
async fn failed_link_discards_the_new_record() {
    let h = Harness::new();
    let d = h.discussion("Link");
    h.store.fail_on(StoreOp::LinkUserParticipant).unwrap();

    let err = h
        .participants
        .join_discussion(CreateParticipantCommand {
            discussion_id: d.id,
            user_id: user_id("ann"),
            params: JoinParams::joined(false),
        })
        .await
        .unwrap_err();

    assert!(matches!(err, ParticipantError::Store(_)));
    assert!(h.store.participants().unwrap().is_empty());

    h.store.clear_failures().unwrap();
    let retry = h.join(d.id, "ann", false).await;
    assert_eq!(retry.participant_index, 0);
}

#[tokio::test]
async fn guard_must_cover_the_requested_discussion() {
    let h = Harness::new();
    let held = h.discussion("Held");
    let other = h.discussion("Other");

    let guard = h.participants.lock_joins(held.id).await;
    let mut tx = h.store.begin_tx().await.unwrap();
    let err = h
        .participants
        .create_participant(
            tx.as_mut(),
            &guard,
            CreateParticipantCommand {
                discussion_id: other.id,
                user_id: user_id("ann"),
                params: JoinParams::joined(false),
            },
        )
        .await
        .unwrap_err();
    tx.rollback().await.unwrap();

    assert!(matches!(err, ParticipantError::GuardMismatch { .. }));
}

#[tokio::test]
async fn switching_anonymity_without_counterpart_converts_in_place() {
    let h = Harness::new();
    let d = h.discussion("Switch");
    let original = h.join(d.id, "ann", false).await;

    let switched = h
        .participants
        .change_participant(ChangeParticipantCommand {
            discussion_id: d.id,
            user_id: user_id("ann"),
            target: original.id,
            changes: ParticipantChanges::switch_anonymity(true),
        })
        .await
        .unwrap();

    assert_eq!(switched.id, original.id);
    assert!(switched.is_anonymous);
    assert_eq!(switched.display_name(0), original.display_name(0));
    assert_eq!(h.store.participants().unwrap().len(), 1);
}

#[tokio::test]
async fn switching_anonymity_reactivates_existing_counterpart() {
    let h = Harness::new();
    let d = h.discussion("Both");
    let public = h.join(d.id, "ann", false).await;
    let anonymous = h.join(d.id, "ann", true).await;

    h.participants
        .change_participant(ChangeParticipantCommand {
            discussion_id: d.id,
            user_id: user_id("ann"),
            target: public.id,
            changes: ParticipantChanges::set_joined(false),
        })
        .await
        .unwrap();

    let active = h
        .participants
        .change_participant(ChangeParticipantCommand {
            discussion_id: d.id,
            user_id: user_id("ann"),
            target: anonymous.id,
            changes: ParticipantChanges::switch_anonymity(false),
        })
        .await
        .unwrap();

    assert_eq!(active.id, public.id);
    assert!(active.has_joined);
    assert!(!active.is_anonymous);

    let identities = h
        .participants
        .identities_for(&d.id, &user_id("ann"))
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(identities, UserIdentities::Both { .. }));
    assert_eq!(identities.anonymous().map(|p| p.id), Some(anonymous.id));
}

#[tokio::test]
async fn changing_someone_elses_record_fails() {
    let h = Harness::new();
    let d = h.discussion("Others");
    h.join(d.id, "ann", false).await;
    let ben = h.join(d.id, "ben", false).await;

    let err = h
        .participants
        .change_participant(ChangeParticipantCommand {
            discussion_id: d.id,
            user_id: user_id("ann"),
            target: ben.id,
            changes: ParticipantChanges::set_joined(false),
        })
        .await
        .unwrap_err();

    assert_eq!(err, ParticipantError::NoMatchingParticipant(ben.id));
}

#[tokio::test]
async fn user_without_records_has_no_identities() {
    let h = Harness::new();
    let d = h.discussion("Empty");
    assert!(h
        .participants
        .identities_for(&d.id, &user_id("nobody"))
        .await
        .unwrap()
        .is_none());
}
