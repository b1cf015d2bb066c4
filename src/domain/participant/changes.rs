//! Partial updates to a participant record.

use crate::domain::foundation::FlairId;
use crate::domain::identity::GradientColor;

use super::Participant;

/// Three-way update for an optional field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FieldChange<T> {
    /// Leave the stored value untouched.
    #[default]
    Keep,
    /// Replace the stored value.
    Set(T),
    /// Clear the stored value.
    Unset,
}

impl<T: Copy> FieldChange<T> {
    /// Applies the change to `slot`.
    pub fn apply(&self, slot: &mut Option<T>) {
        match self {
            FieldChange::Keep => {}
            FieldChange::Set(value) => *slot = Some(*value),
            FieldChange::Unset => *slot = None,
        }
    }
}

/// Requested changes to one of a user's identities in a discussion.
///
/// `None` on the boolean fields means "no change".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParticipantChanges {
    pub gradient_color: FieldChange<GradientColor>,
    pub flair_id: FieldChange<FlairId>,
    pub has_joined: Option<bool>,
    pub is_anonymous: Option<bool>,
}

impl ParticipantChanges {
    /// Switch to (or convert into) the given anonymity flavor.
    pub fn switch_anonymity(is_anonymous: bool) -> Self {
        Self {
            is_anonymous: Some(is_anonymous),
            ..Self::default()
        }
    }

    /// Mark the identity as joined or left.
    pub fn set_joined(has_joined: bool) -> Self {
        Self {
            has_joined: Some(has_joined),
            ..Self::default()
        }
    }

    /// Returns true if the requested anonymity differs from `current`.
    pub fn flips_anonymity(&self, current: bool) -> bool {
        matches!(self.is_anonymous, Some(flag) if flag != current)
    }

    /// Applies everything except the anonymity flag.
    pub(crate) fn apply_fields(&self, participant: &mut Participant) {
        self.gradient_color.apply(&mut participant.gradient_color);
        self.flair_id.apply(&mut participant.flair_id);
        if let Some(has_joined) = self.has_joined {
            participant.has_joined = has_joined;
        }
    }
}
