//! Invite and access-request status state machine.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::StateMachine;

/// Lifecycle shared by invites and access requests.
///
/// Records start `Pending` and move exactly once to a terminal decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InviteRequestStatus {
    Pending,
    Accepted,
    Rejected,
}

impl InviteRequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InviteRequestStatus::Pending => "pending",
            InviteRequestStatus::Accepted => "accepted",
            InviteRequestStatus::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(InviteRequestStatus::Pending),
            "accepted" => Some(InviteRequestStatus::Accepted),
            "rejected" => Some(InviteRequestStatus::Rejected),
            _ => None,
        }
    }

    /// Returns true for the two decisions a responder may give.
    pub fn is_decision(&self) -> bool {
        matches!(
            self,
            InviteRequestStatus::Accepted | InviteRequestStatus::Rejected
        )
    }
}

impl fmt::Display for InviteRequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl StateMachine for InviteRequestStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use InviteRequestStatus::*;
        matches!((self, target), (Pending, Accepted) | (Pending, Rejected))
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use InviteRequestStatus::*;
        match self {
            Pending => vec![Accepted, Rejected],
            Accepted | Rejected => vec![],
        }
    }
}

/// Why an invite was issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InviteType {
    /// A member invited the user directly.
    Invite,
    /// Issued automatically when the user's access request was accepted.
    AccessRequestAccepted,
}

impl InviteType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InviteType::Invite => "invite",
            InviteType::AccessRequestAccepted => "access_granted",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "invite" => Some(InviteType::Invite),
            "access_granted" => Some(InviteType::AccessRequestAccepted),
            _ => None,
        }
    }
}
