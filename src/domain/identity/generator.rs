//! Deterministic pseudonym generation.
//!
//! A 64-bit seed is cut into three 8-bit windows, read big-endian from the
//! most significant byte:
//!
//! | Field    | Bits  | Mapping                                   |
//! |----------|-------|-------------------------------------------|
//! | animal   | 63-56 | `byte % ANIMAL_COUNT`                     |
//! | gradient | 55-48 | `byte % (GRADIENT_COLORS.len() - 1) + 1`  |
//! | suffix   | 47-40 | `byte % SUFFIX_MODULUS`                   |
//!
//! The suffix is nominally a 10-bit field but only ever sees 8 bits, so it
//! stays in `0..=255`. Existing pseudonyms depend on that, so the window is
//! kept as is.

use sha1::{Digest, Sha1};

use super::tables::{GradientColor, ANIMALS, ANIMAL_COUNT, GRADIENT_COLORS};
use crate::domain::foundation::{DiscussionId, ParticipantId};

const WINDOW_SHIFT: u32 = 56;
const ANIMAL_OFFSET: u32 = 0;
const GRADIENT_OFFSET: u32 = 8;
const SUFFIX_OFFSET: u32 = 16;

/// Modulus applied to the suffix window.
pub const SUFFIX_MODULUS: u64 = 1024;

/// Extracts the byte starting `offset` bits below the most significant bit.
fn window(seed: u64, offset: u32) -> u64 {
    (seed << offset) >> WINDOW_SHIFT
}

/// Animal name for a seed.
pub fn animal_for(seed: u64) -> &'static str {
    let index = window(seed, ANIMAL_OFFSET) % ANIMAL_COUNT as u64;
    ANIMALS[index as usize]
}

/// Gradient color for a seed. Never returns [`GradientColor::Unknown`].
pub fn gradient_for(seed: u64) -> GradientColor {
    let usable = (GRADIENT_COLORS.len() - 1) as u64;
    let index = window(seed, GRADIENT_OFFSET) % usable + 1;
    GRADIENT_COLORS[index as usize]
}

/// Numeric suffix for a seed.
pub fn suffix_for(seed: u64) -> u16 {
    (window(seed, SUFFIX_OFFSET) % SUFFIX_MODULUS) as u16
}

/// Full display name, e.g. `"Azalea Otter (#0)"`.
pub fn display_name(seed: u64) -> String {
    let raw = format!(
        "{} {} (#{})",
        gradient_for(seed).as_str(),
        animal_for(seed).to_lowercase(),
        suffix_for(seed)
    );
    title_case(&raw)
}

/// Seed for a participant's pseudonym.
///
/// SHA-1 over the discussion id, participant id and shuffle count
/// concatenated without separators; the first eight digest bytes are read
/// big-endian. Changing the hash changes every stored pseudonym. Bumping the discussion's shuffle count re-derives every
/// pseudonym in it.
pub fn participant_seed(
    discussion_id: &DiscussionId,
    participant_id: &ParticipantId,
    shuffle_count: u32,
) -> u64 {
    let digest = Sha1::digest(format!("{}{}{}", discussion_id, participant_id, shuffle_count));
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(head)
}

/// Uppercases every letter that follows a non-word character.
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut at_word_start = true;
    for c in s.chars() {
        if at_word_start {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        at_word_start = !(c.is_alphanumeric() || c == '_');
    }
    out
}
