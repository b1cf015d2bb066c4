//! Device directory port.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, UserId};
use crate::domain::notification::UserDevice;

/// Read-only lookup of the devices a user has signed in on.
#[async_trait]
pub trait DeviceDirectory: Send + Sync {
    /// All devices for `user_id`; empty when the user has none.
    async fn devices_for_user(&self, user_id: &UserId) -> Result<Vec<UserDevice>, DomainError>;
}
