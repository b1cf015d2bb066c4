use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DeviceId, Timestamp, UserId};

/// A device a user has signed in on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDevice {
    pub id: DeviceId,
    pub user_id: UserId,
    /// Client platform tag, e.g. `ios` or `android`.
    pub platform: String,
    pub token: Option<String>,
    pub last_seen: Timestamp,
}

impl UserDevice {
    /// Push token, if present and non-empty.
    pub fn push_token(&self) -> Option<&str> {
        self.token.as_deref().filter(|t| !t.is_empty())
    }
}

/// Picks the device seen most recently. Ties keep the earliest entry.
pub fn most_recent_device(devices: &[UserDevice]) -> Option<&UserDevice> {
    devices.iter().fold(None, |best: Option<&UserDevice>, device| match best {
        Some(current) if current.last_seen >= device.last_seen => Some(current),
        _ => Some(device),
    })
}
