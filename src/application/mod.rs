//! Application layer - services orchestrating the domain over the ports.
//!
//! - `participants` - ParticipantManager (creation, identity changes)
//! - `access` - AccessControlWorkflow (requests, invites, access rows)
//! - `notifications` - NotificationDispatcher (push fan-out)
//! - `transaction` - Shared begin/commit/rollback discipline

pub mod access;
pub mod notifications;
pub mod participants;
pub mod transaction;

pub use access::{
    AccessControlWorkflow, InviteByHandleCommand, InviteByHandleResult, InviteUserCommand,
    RequestAccessCommand, RespondToInvitationCommand, RespondToInvitationResult,
    RespondToRequestCommand, RespondToRequestResult, UpsertUserAccessCommand,
};
pub use notifications::{
    DispatchHandle, DispatchSettings, DispatchStats, NotificationDispatcher, NotifyCommand,
};
pub use participants::{
    ChangeParticipantCommand, CreateParticipantCommand, JoinGuard, ParticipantManager,
};
