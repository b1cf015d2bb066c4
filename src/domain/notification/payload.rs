//! Push payload construction.

use serde::{Deserialize, Serialize};

use crate::domain::discussion::{Discussion, Post};

/// Character limits applied to the payload text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayloadLimits {
    pub title_max_chars: usize,
    pub body_max_chars: usize,
}

impl Default for PayloadLimits {
    fn default() -> Self {
        Self {
            title_max_chars: 65,
            body_max_chars: 156,
        }
    }
}

/// Title and body handed to the push gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushNotification {
    pub title: String,
    pub body: String,
}

impl PushNotification {
    /// Builds the payload for a new post.
    ///
    /// The body is the preview when one is given and differs from the post
    /// content, otherwise the post content.
    pub fn for_post(
        discussion: &Discussion,
        post: &Post,
        content_preview: Option<&str>,
        limits: PayloadLimits,
    ) -> Self {
        let content = match content_preview {
            Some(preview) if preview != post.content => preview,
            _ => post.content.as_str(),
        };
        Self {
            title: truncate_chars(
                &format!("New post in {}", discussion.title),
                limits.title_max_chars,
            ),
            body: truncate_chars(content, limits.body_max_chars),
        }
    }
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::discussion::PostKind;
    use crate::domain::foundation::ParticipantId;

    fn fixture(title: &str, content: &str) -> (Discussion, Post) {
        let discussion = Discussion::new(title).unwrap();
        let post = Post::new(discussion.id, ParticipantId::new(), PostKind::Standard, content);
        (discussion, post)
    }

    #[test]
    fn uses_content_without_preview() {
        let (d, p) = fixture("Rust", "hello there");
        let n = PushNotification::for_post(&d, &p, None, PayloadLimits::default());
        assert_eq!(n.title, "New post in Rust");
        assert_eq!(n.body, "hello there");
    }

    #[test]
    fn prefers_a_different_preview() {
        let (d, p) = fixture("Rust", "full content");
        let n = PushNotification::for_post(&d, &p, Some("preview"), PayloadLimits::default());
        assert_eq!(n.body, "preview");
    }

    #[test]
    fn truncates_by_characters() {
        let (d, p) = fixture(&"é".repeat(100), &"ü".repeat(200));
        let n = PushNotification::for_post(&d, &p, None, PayloadLimits::default());
        assert_eq!(n.title.chars().count(), 65);
        assert_eq!(n.body.chars().count(), 156);
        assert!(n.title.starts_with("New post in é"));
    }
}
