//! Access control - request and invite workflows.

mod commands;
mod workflow;

pub use commands::{
    InviteByHandleCommand, InviteByHandleResult, InviteUserCommand, RequestAccessCommand,
    RespondToInvitationCommand, RespondToInvitationResult, RespondToRequestCommand,
    RespondToRequestResult, UpsertUserAccessCommand,
};
pub use workflow::AccessControlWorkflow;
