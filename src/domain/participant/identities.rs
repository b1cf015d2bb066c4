//! A user's identities within one discussion.
//!
//! Modeled as a tagged union so that "at most one anonymous and at most one
//! non-anonymous record" is enforced by construction rather than by two
//! loosely related optionals.

use crate::domain::foundation::{ParticipantId, Timestamp};

use super::{Participant, ParticipantChanges, ParticipantError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserIdentities {
    Anonymous(Participant),
    NonAnonymous(Participant),
    Both {
        anonymous: Participant,
        non_anonymous: Participant,
    },
}

impl UserIdentities {
    /// Wraps a single record under its own flavor.
    pub fn single(participant: Participant) -> Self {
        if participant.is_anonymous {
            UserIdentities::Anonymous(participant)
        } else {
            UserIdentities::NonAnonymous(participant)
        }
    }

    /// Builds the union from a user's stored records.
    ///
    /// Returns `Ok(None)` when there are no records and
    /// [`ParticipantError::DuplicateIdentity`] when two records share a
    /// flavor.
    pub fn from_records(
        records: impl IntoIterator<Item = Participant>,
    ) -> Result<Option<Self>, ParticipantError> {
        let mut identities: Option<Self> = None;
        for record in records {
            identities = Some(match identities {
                None => Self::single(record),
                Some(existing) => existing.with(record)?,
            });
        }
        Ok(identities)
    }

    /// Adds a record of the missing flavor.
    pub fn with(self, participant: Participant) -> Result<Self, ParticipantError> {
        match (self, participant.is_anonymous) {
            (UserIdentities::Anonymous(anonymous), false) => Ok(UserIdentities::Both {
                anonymous,
                non_anonymous: participant,
            }),
            (UserIdentities::NonAnonymous(non_anonymous), true) => Ok(UserIdentities::Both {
                anonymous: participant,
                non_anonymous,
            }),
            (_, anonymous) => Err(ParticipantError::DuplicateIdentity {
                discussion_id: participant.discussion_id,
                anonymous,
            }),
        }
    }

    pub fn anonymous(&self) -> Option<&Participant> {
        match self {
            UserIdentities::Anonymous(p) => Some(p),
            UserIdentities::Both { anonymous, .. } => Some(anonymous),
            UserIdentities::NonAnonymous(_) => None,
        }
    }

    pub fn non_anonymous(&self) -> Option<&Participant> {
        match self {
            UserIdentities::NonAnonymous(p) => Some(p),
            UserIdentities::Both { non_anonymous, .. } => Some(non_anonymous),
            UserIdentities::Anonymous(_) => None,
        }
    }

    /// The record of the requested flavor, if it exists.
    pub fn flavor(&self, is_anonymous: bool) -> Option<&Participant> {
        if is_anonymous {
            self.anonymous()
        } else {
            self.non_anonymous()
        }
    }

    pub fn has_flavor(&self, is_anonymous: bool) -> bool {
        self.flavor(is_anonymous).is_some()
    }

    pub fn find(&self, id: ParticipantId) -> Option<&Participant> {
        self.records().into_iter().find(|p| p.id == id)
    }

    /// All records, anonymous first.
    pub fn records(&self) -> Vec<&Participant> {
        self.anonymous()
            .into_iter()
            .chain(self.non_anonymous())
            .collect()
    }

    /// Works out the record to persist for `changes` aimed at `target`.
    ///
    /// Field changes apply to the matched record. When the changes flip
    /// anonymity and a record of the other flavor already exists, that
    /// counterpart is reactivated and returned instead, with the field
    /// changes applied to it. Without a counterpart the matched record's
    /// flag is flipped in place. The pseudonym is never regenerated.
    pub fn resolve_update(
        &self,
        target: ParticipantId,
        changes: &ParticipantChanges,
    ) -> Result<Participant, ParticipantError> {
        let matched = self
            .find(target)
            .ok_or(ParticipantError::NoMatchingParticipant(target))?;

        let mut updated = if changes.flips_anonymity(matched.is_anonymous) {
            let wanted = !matched.is_anonymous;
            match self.flavor(wanted) {
                Some(counterpart) => {
                    let mut activated = counterpart.clone();
                    activated.has_joined = true;
                    activated
                }
                None => {
                    let mut converted = matched.clone();
                    converted.is_anonymous = wanted;
                    converted
                }
            }
        } else {
            matched.clone()
        };

        changes.apply_fields(&mut updated);
        updated.updated_at = Timestamp::now();
        Ok(updated)
    }

    /// Replaces the stored record with the same id, re-tagging if its flavor
    /// changed.
    pub fn replace(self, updated: Participant) -> Result<Self, ParticipantError> {
        let others: Vec<Participant> = self
            .into_records()
            .into_iter()
            .filter(|p| p.id != updated.id)
            .collect();
        let mut identities = Self::single(updated);
        for other in others {
            identities = identities.with(other)?;
        }
        Ok(identities)
    }

    fn into_records(self) -> Vec<Participant> {
        match self {
            UserIdentities::Anonymous(p) | UserIdentities::NonAnonymous(p) => vec![p],
            UserIdentities::Both {
                anonymous,
                non_anonymous,
            } => vec![anonymous, non_anonymous],
        }
    }
}
