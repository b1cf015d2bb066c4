//! Participant entity - one identity of a user inside a discussion.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DiscussionId, FlairId, ParticipantId, Timestamp, UserId, ViewerId};
use crate::domain::identity::{display_name, gradient_for, participant_seed, GradientColor};

/// A user's membership record in a discussion.
///
/// # Invariants
///
/// - At most one anonymous and one non-anonymous record exist per
///   (discussion, user); see [`super::UserIdentities`].
/// - Records are never deleted; leaving sets `has_joined = false`.
/// - The display name is derived from the record id, so it is stable for
///   the life of the record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub discussion_id: DiscussionId,
    /// Zero-based join order within the discussion.
    pub participant_index: u32,
    pub viewer_id: ViewerId,
    pub flair_id: Option<FlairId>,
    pub gradient_color: Option<GradientColor>,
    pub user_id: Option<UserId>,
    pub is_anonymous: bool,
    pub has_joined: bool,
    pub inviter_id: Option<ParticipantId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Participant {
    /// Creates a fresh record with a deterministic gradient.
    pub fn create(
        discussion_id: DiscussionId,
        user_id: UserId,
        participant_index: u32,
        viewer_id: ViewerId,
        params: &JoinParams,
    ) -> Self {
        let id = ParticipantId::new();
        let now = Timestamp::now();
        let gradient = params
            .gradient_color
            .unwrap_or_else(|| gradient_for(participant_seed(&discussion_id, &id, 0)));
        Self {
            id,
            discussion_id,
            participant_index,
            viewer_id,
            flair_id: None,
            gradient_color: Some(gradient),
            user_id: Some(user_id),
            is_anonymous: params.is_anonymous,
            has_joined: params.has_joined,
            inviter_id: params.inviter_id,
            created_at: now,
            updated_at: now,
        }
    }

    /// Pseudonym shown for this record under the discussion's shuffle count.
    pub fn display_name(&self, shuffle_count: u32) -> String {
        display_name(self.seed(shuffle_count))
    }

    /// Seed feeding [`Participant::display_name`].
    pub fn seed(&self, shuffle_count: u32) -> u64 {
        participant_seed(&self.discussion_id, &self.id, shuffle_count)
    }

    /// Returns true if the record belongs to `user_id`.
    pub fn is_owned_by(&self, user_id: &UserId) -> bool {
        self.user_id.as_ref() == Some(user_id)
    }
}

/// Caller-supplied parameters for materializing a membership.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JoinParams {
    /// Explicit gradient; derived from the record's seed when absent.
    pub gradient_color: Option<GradientColor>,
    /// Requested flair; only attached if the user owns it.
    pub flair_id: Option<FlairId>,
    pub has_joined: bool,
    pub is_anonymous: bool,
    pub inviter_id: Option<ParticipantId>,
}

impl JoinParams {
    /// Parameters for a user actively joining under the given flavor.
    pub fn joined(is_anonymous: bool) -> Self {
        Self {
            has_joined: true,
            is_anonymous,
            ..Self::default()
        }
    }
}
