//! Participant module - per-(discussion, user) membership records.
//!
//! # Module Structure
//!
//! - `participant` - The Participant entity and join parameters
//! - `identities` - Tagged union of a user's (at most two) identities
//! - `changes` - Partial updates with keep/set/unset semantics
//! - `viewer` - Per-(discussion, user) read cursor
//! - `errors` - Participant-specific errors

mod changes;
mod errors;
mod identities;
mod participant;
mod viewer;

pub use changes::{FieldChange, ParticipantChanges};
pub use errors::ParticipantError;
pub use identities::UserIdentities;
pub use participant::{JoinParams, Participant};
pub use viewer::Viewer;
