use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DiscussionId, PostId, Timestamp, UserId, ViewerId};

/// Per-(discussion, user) read cursor, shared by both of a user's identities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewer {
    pub id: ViewerId,
    pub discussion_id: DiscussionId,
    pub user_id: UserId,
    pub last_viewed_post_id: Option<PostId>,
    pub last_viewed_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Viewer {
    pub fn new(discussion_id: DiscussionId, user_id: UserId) -> Self {
        let now = Timestamp::now();
        Self {
            id: ViewerId::new(),
            discussion_id,
            user_id,
            last_viewed_post_id: None,
            last_viewed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Advances the cursor to `post_id`.
    pub fn mark_viewed(&mut self, post_id: PostId) {
        let now = Timestamp::now();
        self.last_viewed_post_id = Some(post_id);
        self.last_viewed_at = Some(now);
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mark_viewed_moves_cursor() {
        let mut viewer = Viewer::new(DiscussionId::new(), UserId::new("u").unwrap());
        assert!(viewer.last_viewed_post_id.is_none());

        let post = PostId::new();
        viewer.mark_viewed(post);
        assert_eq!(viewer.last_viewed_post_id, Some(post));
        assert!(viewer.last_viewed_at.is_some());
    }
}
