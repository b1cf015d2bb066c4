//! Participant management - creation under a join guard and identity changes.

mod join_guard;
mod manager;

pub use join_guard::JoinGuard;
pub use manager::{ChangeParticipantCommand, CreateParticipantCommand, ParticipantManager};
