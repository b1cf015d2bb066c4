use crate::domain::foundation::{DomainError, ParticipantId, UserId};

use super::UserDevice;

/// Outcome of one notification target, as reported on the progress channel.
///
/// `sent` and `success` stay `None` when the unit never reached the push
/// gateway (no user, no device, no token).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendStatus {
    pub participant_id: ParticipantId,
    pub user_id: Option<UserId>,
    /// Device selected for delivery, once one was found.
    pub device: Option<UserDevice>,
    /// Whether the gateway accepted the payload for sending.
    pub sent: Option<bool>,
    pub finished: bool,
    pub success: Option<bool>,
}

impl SendStatus {
    /// A finished unit that did not attempt delivery.
    pub fn skipped(participant_id: ParticipantId, user_id: Option<UserId>) -> Self {
        Self {
            participant_id,
            user_id,
            device: None,
            sent: None,
            finished: true,
            success: None,
        }
    }

    /// Records the gateway's answer for the selected device.
    pub fn record_delivery(&mut self, outcome: &Result<bool, DomainError>) {
        match outcome {
            Ok(sent) => {
                self.sent = Some(*sent);
                self.success = Some(true);
            }
            Err(_) => {
                self.sent = Some(false);
                self.success = Some(false);
            }
        }
    }

    /// The push gateway was called for this target.
    pub fn attempted(&self) -> bool {
        self.success.is_some()
    }

    pub fn delivered(&self) -> bool {
        self.success == Some(true) && self.sent == Some(true)
    }
}
