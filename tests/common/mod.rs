//! Shared wiring for integration tests: services over the in-memory store
//! and the recording push gateway.

#![allow(dead_code)]

use std::sync::Arc;

use conclave::adapters::{InMemoryStore, RecordingPushGateway};
use conclave::application::{
    AccessControlWorkflow, CreateParticipantCommand, DispatchSettings, NotificationDispatcher,
    ParticipantManager, UpsertUserAccessCommand,
};
use conclave::domain::access::UserAccessUpdate;
use conclave::domain::discussion::Discussion;
use conclave::domain::foundation::{DeviceId, DiscussionId, Handle, Timestamp, UserId};
use conclave::domain::notification::UserDevice;
use conclave::domain::participant::{JoinParams, Participant};

pub struct Harness {
    pub store: InMemoryStore,
    pub push: RecordingPushGateway,
    pub participants: Arc<ParticipantManager>,
    pub dispatcher: Arc<NotificationDispatcher>,
    pub access: AccessControlWorkflow,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_settings(DispatchSettings::default())
    }

    pub fn with_settings(settings: DispatchSettings) -> Self {
        let store = InMemoryStore::new();
        let push = RecordingPushGateway::new();
        let participants = Arc::new(ParticipantManager::new(Arc::new(store.clone())));
        let dispatcher = Arc::new(NotificationDispatcher::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(push.clone()),
            settings,
        ));
        let access = AccessControlWorkflow::new(
            Arc::new(store.clone()),
            Arc::clone(&participants),
            Arc::clone(&dispatcher),
        );
        Self {
            store,
            push,
            participants,
            dispatcher,
            access,
        }
    }

    pub fn discussion(&self, title: &str) -> Discussion {
        let discussion = Discussion::new(title).unwrap();
        self.store.insert_discussion(discussion.clone()).unwrap();
        discussion
    }

    pub async fn join(&self, discussion_id: DiscussionId, user: &str, anonymous: bool) -> Participant {
        self.participants
            .join_discussion(CreateParticipantCommand {
                discussion_id,
                user_id: user_id(user),
                params: JoinParams::joined(anonymous),
            })
            .await
            .unwrap()
    }

    /// Grants `user` active access that notifies on everything.
    pub async fn subscribe(&self, discussion_id: DiscussionId, user: &str) {
        self.access
            .upsert_user_access(UpsertUserAccessCommand {
                discussion_id,
                user_id: user_id(user),
                update: UserAccessUpdate::granted(None),
            })
            .await
            .unwrap();
    }

    /// Joins `user` and subscribes them to every post.
    pub async fn member(&self, discussion_id: DiscussionId, user: &str, anonymous: bool) -> Participant {
        let participant = self.join(discussion_id, user, anonymous).await;
        self.subscribe(discussion_id, user).await;
        participant
    }

    pub fn handle(&self, handle: &str, user: &str) {
        self.store
            .register_handle(Handle::parse(handle).unwrap(), user_id(user))
            .unwrap();
    }

    pub fn device(&self, id: &str, user: &str, platform: &str, last_seen_secs: i64) -> UserDevice {
        let device = UserDevice {
            id: DeviceId::new(id).unwrap(),
            user_id: user_id(user),
            platform: platform.to_string(),
            token: Some(format!("token-{}", id)),
            last_seen: Timestamp::from_unix_secs(last_seen_secs),
        };
        self.store.insert_device(device.clone()).unwrap();
        device
    }
}

pub fn user_id(raw: &str) -> UserId {
    UserId::new(raw).unwrap()
}
