//! NotificationDispatcher - best-effort push fan-out for new posts.
//!
//! Targets are the joined members whose user is subscribed to everything
//! in the discussion, minus the post's author. One detached task runs per
//! distinct user. Each task picks the user's most recently seen device,
//! delivers the payload and reports a [`SendStatus`] with a non-blocking
//! send. Nothing a task does can fail the dispatch call or another task.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, trace, warn};

use crate::config::NotificationsConfig;
use crate::domain::discussion::{Discussion, Post};
use crate::domain::foundation::UserId;
use crate::domain::notification::{
    most_recent_device, NotificationError, PayloadLimits, PushNotification, SendStatus,
};
use crate::domain::participant::Participant;
use crate::ports::{collect_cursor, DeviceDirectory, PushGateway, Store};

use super::handle::{DispatchHandle, DispatchStats};

/// Tuning for the fan-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchSettings {
    /// Capacity of the progress channel; at least 1.
    pub status_capacity: usize,
    pub limits: PayloadLimits,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            status_capacity: 1,
            limits: PayloadLimits::default(),
        }
    }
}

impl From<&NotificationsConfig> for DispatchSettings {
    fn from(config: &NotificationsConfig) -> Self {
        Self {
            status_capacity: config.status_capacity,
            limits: PayloadLimits {
                title_max_chars: config.title_max_chars,
                body_max_chars: config.body_max_chars,
            },
        }
    }
}

/// Command to notify a discussion's members about a post.
///
/// Both `discussion` and `post` are required; they are optional here so a
/// missing one is rejected before any work starts.
#[derive(Debug, Clone, Default)]
pub struct NotifyCommand {
    pub discussion: Option<Discussion>,
    pub post: Option<Post>,
    pub content_preview: Option<String>,
}

pub struct NotificationDispatcher {
    store: Arc<dyn Store>,
    devices: Arc<dyn DeviceDirectory>,
    push: Arc<dyn PushGateway>,
    settings: DispatchSettings,
}

impl NotificationDispatcher {
    pub fn new(
        store: Arc<dyn Store>,
        devices: Arc<dyn DeviceDirectory>,
        push: Arc<dyn PushGateway>,
        settings: DispatchSettings,
    ) -> Self {
        Self {
            store,
            devices,
            push,
            settings,
        }
    }

    /// Starts the fan-out and returns immediately.
    ///
    /// Uses the discussion's attached member list when present, otherwise
    /// reads it from the store.
    pub async fn notify_subscribers(
        &self,
        cmd: NotifyCommand,
    ) -> Result<DispatchHandle, NotificationError> {
        let discussion = cmd
            .discussion
            .ok_or(NotificationError::MissingInput("discussion"))?;
        let post = cmd.post.ok_or(NotificationError::MissingInput("post"))?;

        let members = match &discussion.participants {
            Some(attached) => attached.clone(),
            None => {
                collect_cursor(self.store.participants_for_discussion(&discussion.id).await)
                    .await?
            }
        };
        let subscribed: HashSet<UserId> =
            collect_cursor(self.store.subscribed_users(&discussion.id).await)
                .await?
                .into_iter()
                .collect();
        let author = match members.iter().find(|p| p.id == post.participant_id) {
            Some(author) => author.user_id.clone(),
            None => self
                .store
                .find_participant(&post.participant_id)
                .await?
                .and_then(|p| p.user_id),
        };
        let targets = eligible_targets(members, author.as_ref(), &subscribed);

        let notification = Arc::new(PushNotification::for_post(
            &discussion,
            &post,
            cmd.content_preview.as_deref(),
            self.settings.limits,
        ));
        let (progress_tx, progress_rx) = mpsc::channel(self.settings.status_capacity.max(1));
        let stats = Arc::new(DispatchStats::new(targets.len()));

        debug!(
            discussion_id = %discussion.id,
            post_id = %post.id,
            targets = targets.len(),
            "Dispatching notifications"
        );

        for participant in &targets {
            let unit = DeliveryUnit {
                participant: participant.clone(),
                devices: Arc::clone(&self.devices),
                push: Arc::clone(&self.push),
                notification: Arc::clone(&notification),
            };
            let progress_tx = progress_tx.clone();
            let stats = Arc::clone(&stats);
            tokio::spawn(async move {
                let status = unit.run().await;
                report(&progress_tx, &stats, status);
                stats.record_finished();
            });
        }

        Ok(DispatchHandle {
            progress: progress_rx,
            target_count: targets.len(),
            stats,
        })
    }
}

/// Keeps joined members that should hear about a post by `author`.
///
/// Members with a user must be subscribed and must not be the author.
/// Members without a user stay and collapse into one skipped unit.
fn eligible_targets(
    members: Vec<Participant>,
    author: Option<&UserId>,
    subscribed: &HashSet<UserId>,
) -> Vec<Participant> {
    let eligible = members.into_iter().filter(|p| {
        p.has_joined
            && match p.user_id.as_ref() {
                None => true,
                Some(user_id) => Some(user_id) != author && subscribed.contains(user_id),
            }
    });
    unique_targets(eligible)
}

/// Collapses members to one entry per user reference, first occurrence wins.
fn unique_targets(members: impl IntoIterator<Item = Participant>) -> Vec<Participant> {
    let mut seen = HashSet::new();
    members
        .into_iter()
        .filter(|p| seen.insert(p.user_id.clone()))
        .collect()
}

fn report(progress: &mpsc::Sender<SendStatus>, stats: &DispatchStats, status: SendStatus) {
    match progress.try_send(status) {
        Ok(()) => stats.record_report(true),
        Err(TrySendError::Full(status)) | Err(TrySendError::Closed(status)) => {
            trace!(participant_id = %status.participant_id, "Dropped send status");
            stats.record_report(false);
        }
    }
}

struct DeliveryUnit {
    participant: Participant,
    devices: Arc<dyn DeviceDirectory>,
    push: Arc<dyn PushGateway>,
    notification: Arc<PushNotification>,
}

impl DeliveryUnit {
    async fn run(self) -> SendStatus {
        let mut status = SendStatus::skipped(self.participant.id, self.participant.user_id.clone());

        let Some(user_id) = self.participant.user_id.as_ref() else {
            return status;
        };

        let devices = match self.devices.devices_for_user(user_id).await {
            Ok(devices) => devices,
            Err(err) => {
                warn!(%user_id, error = %err, "Device lookup failed");
                return status;
            }
        };
        let Some(device) = most_recent_device(&devices) else {
            debug!(%user_id, "No devices to notify");
            return status;
        };
        status.device = Some(device.clone());

        if device.push_token().is_none() {
            debug!(%user_id, device_id = %device.id, "Device has no push token");
            return status;
        }

        let outcome = self.push.deliver(device, &self.notification).await;
        match &outcome {
            Ok(sent) => {
                debug!(%user_id, device_id = %device.id, sent, "Notification delivered");
            }
            Err(err) => {
                warn!(%user_id, device_id = %device.id, error = %err, "Push delivery failed");
            }
        }
        status.record_delivery(&outcome);
        status
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{DiscussionId, UserId, ViewerId};
    use crate::domain::participant::JoinParams;

    fn member(discussion: DiscussionId, user: Option<&str>, anonymous: bool) -> Participant {
        let mut p = Participant::create(
            discussion,
            UserId::new("placeholder").unwrap(),
            0,
            ViewerId::new(),
            &JoinParams::joined(anonymous),
        );
        p.user_id = user.map(|u| UserId::new(u).unwrap());
        p
    }

    #[test]
    fn unique_targets_collapse_both_identities_of_a_user() {
        let d = DiscussionId::new();
        let first = member(d, Some("ann"), true);
        let members = vec![
            first.clone(),
            member(d, Some("ann"), false),
            member(d, Some("ben"), false),
        ];

        let targets = unique_targets(members);

        assert_eq!(targets.len(), 2);
        assert_eq!(targets[0].id, first.id);
    }

    #[test]
    fn unique_targets_collapse_members_without_user() {
        let d = DiscussionId::new();
        let targets = unique_targets(vec![member(d, None, false), member(d, None, true)]);
        assert_eq!(targets.len(), 1);
    }

    fn users(names: &[&str]) -> HashSet<UserId> {
        names.iter().map(|n| UserId::new(*n).unwrap()).collect()
    }

    #[test]
    fn author_is_not_a_target() {
        let d = DiscussionId::new();
        let ann = UserId::new("ann").unwrap();
        let members = vec![member(d, Some("ann"), false), member(d, Some("ben"), false)];

        let targets = eligible_targets(members, Some(&ann), &users(&["ann", "ben"]));

        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].user_id.as_ref().map(UserId::as_str), Some("ben"));
    }

    #[test]
    fn unsubscribed_users_are_not_targets() {
        let d = DiscussionId::new();
        let members = vec![member(d, Some("ann"), false), member(d, Some("ben"), false)];

        let targets = eligible_targets(members, None, &users(&["ben"]));

        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].user_id.as_ref().map(UserId::as_str), Some("ben"));
    }

    #[test]
    fn members_who_left_are_not_targets() {
        let d = DiscussionId::new();
        let mut left = member(d, Some("ann"), false);
        left.has_joined = false;

        let targets = eligible_targets(vec![left], None, &users(&["ann"]));

        assert!(targets.is_empty());
    }

    #[test]
    fn settings_follow_config() {
        assert_eq!(
            DispatchSettings::from(&NotificationsConfig::default()),
            DispatchSettings::default()
        );

        let tuned = NotificationsConfig {
            status_capacity: 8,
            body_max_chars: 40,
            ..NotificationsConfig::default()
        };
        let settings = DispatchSettings::from(&tuned);
        assert_eq!(settings.status_capacity, 8);
        assert_eq!(settings.limits.body_max_chars, 40);
    }
}
