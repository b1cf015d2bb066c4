//! Discussion module - the discussion, its posts and flair badges.
//!
//! These are read-mostly collaborators of the membership core: the core
//! appends system posts and reads titles and shuffle counts, nothing more.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    DiscussionId, FlairId, ParticipantId, PostId, Timestamp, UserId, ValidationError,
};
use crate::domain::participant::Participant;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discussion {
    pub id: DiscussionId,
    pub title: String,
    /// Bumped to re-derive every pseudonym in the discussion.
    pub shuffle_count: u32,
    /// Member list, when the caller already loaded it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub participants: Option<Vec<Participant>>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Discussion {
    pub fn new(title: impl Into<String>) -> Result<Self, ValidationError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(ValidationError::empty_field("title"));
        }
        let now = Timestamp::now();
        Ok(Self {
            id: DiscussionId::new(),
            title,
            shuffle_count: 0,
            participants: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Attaches an already-loaded member list.
    pub fn with_participants(mut self, participants: Vec<Participant>) -> Self {
        self.participants = Some(participants);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostKind {
    Standard,
    /// System post announcing a new member.
    ParticipantJoined,
}

impl PostKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostKind::Standard => "standard",
            PostKind::ParticipantJoined => "participant_joined",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "standard" => Some(PostKind::Standard),
            "participant_joined" => Some(PostKind::ParticipantJoined),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub discussion_id: DiscussionId,
    pub participant_id: ParticipantId,
    pub kind: PostKind,
    pub content: String,
    pub created_at: Timestamp,
}

impl Post {
    pub fn new(
        discussion_id: DiscussionId,
        participant_id: ParticipantId,
        kind: PostKind,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: PostId::new(),
            discussion_id,
            participant_id,
            kind,
            content: content.into(),
            created_at: Timestamp::now(),
        }
    }

    /// The announcement appended when `participant` joins `discussion`.
    pub fn participant_joined(discussion: &Discussion, participant: &Participant) -> Self {
        Self::new(
            discussion.id,
            participant.id,
            PostKind::ParticipantJoined,
            format!(
                "{} joined the discussion",
                participant.display_name(discussion.shuffle_count)
            ),
        )
    }
}

/// Decorative badge owned by a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flair {
    pub id: FlairId,
    pub user_id: UserId,
    pub display_name: String,
    pub image_url: Option<String>,
    pub source: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::ViewerId;
    use crate::domain::participant::JoinParams;

    #[test]
    fn discussion_requires_title() {
        assert!(Discussion::new("  ").is_err());
        let d = Discussion::new("Rust").unwrap();
        assert_eq!(d.shuffle_count, 0);
        assert!(d.participants.is_none());
    }

    #[test]
    fn joined_post_names_the_participant() {
        let discussion = Discussion::new("Rust").unwrap();
        let participant = Participant::create(
            discussion.id,
            UserId::new("dave").unwrap(),
            0,
            ViewerId::new(),
            &JoinParams::joined(false),
        );

        let post = Post::participant_joined(&discussion, &participant);

        assert_eq!(post.kind, PostKind::ParticipantJoined);
        assert_eq!(post.participant_id, participant.id);
        assert_eq!(
            post.content,
            format!("{} joined the discussion", participant.display_name(0))
        );
    }

    #[test]
    fn post_kind_strings_parse_back() {
        assert_eq!(PostKind::parse("participant_joined"), Some(PostKind::ParticipantJoined));
        assert_eq!(PostKind::parse(PostKind::Standard.as_str()), Some(PostKind::Standard));
    }
}
