//! Shareable access links.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::{DiscussionId, Timestamp, ValidationError};

/// Characters a generated slug is drawn from.
const SLUG_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Length of every slug.
pub const SLUG_LENGTH: usize = 12;

/// Public token of an access link, e.g. `k3v9q0x2m7ab`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LinkSlug(String);

impl LinkSlug {
    /// Draws a fresh random slug.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let slug = (0..SLUG_LENGTH)
            .map(|_| SLUG_ALPHABET[rng.gen_range(0..SLUG_ALPHABET.len())] as char)
            .collect();
        Self(slug)
    }

    /// Parses a slug taken from a shared URL. Case is ignored.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let slug = raw.trim().to_ascii_lowercase();
        if slug.is_empty() {
            return Err(ValidationError::empty_field("link_slug"));
        }
        if slug.len() != SLUG_LENGTH || !slug.bytes().all(|b| SLUG_ALPHABET.contains(&b)) {
            return Err(ValidationError::invalid_format(
                "link_slug",
                format!("expected {} lowercase letters or digits", SLUG_LENGTH),
            ));
        }
        Ok(Self(slug))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LinkSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A link anyone can follow to reach a discussion.
///
/// A discussion may have several; the newest one is the one handed out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscussionAccessLink {
    pub discussion_id: DiscussionId,
    pub link_slug: LinkSlug,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl DiscussionAccessLink {
    pub fn generate(discussion_id: DiscussionId) -> Self {
        let now = Timestamp::now();
        Self {
            discussion_id,
            link_slug: LinkSlug::generate(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn generated_slugs_parse_back() {
        let slug = LinkSlug::generate();
        assert_eq!(slug.as_str().len(), SLUG_LENGTH);
        assert_eq!(LinkSlug::parse(slug.as_str()), Ok(slug));
    }

    #[test]
    fn parse_ignores_case_and_padding() {
        let slug = LinkSlug::parse("  ABCDEF123456 ").unwrap();
        assert_eq!(slug.as_str(), "abcdef123456");
    }

    #[test]
    fn parse_rejects_wrong_shape() {
        assert_eq!(
            LinkSlug::parse("").unwrap_err(),
            ValidationError::empty_field("link_slug")
        );
        assert!(LinkSlug::parse("short").is_err());
        assert!(LinkSlug::parse("abcdef-12345").is_err());
    }

    #[test]
    fn new_links_belong_to_their_discussion() {
        let discussion = DiscussionId::new();
        let a = DiscussionAccessLink::generate(discussion);
        let b = DiscussionAccessLink::generate(discussion);
        assert_eq!(a.discussion_id, discussion);
        assert_ne!(a.link_slug, b.link_slug);
    }

    proptest! {
        #[test]
        fn only_alphabet_characters_are_generated(_round in 0u8..32) {
            let slug = LinkSlug::generate();
            prop_assert!(slug.as_str().bytes().all(|b| SLUG_ALPHABET.contains(&b)));
        }
    }
}
