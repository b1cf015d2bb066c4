//! Push gateway port.

use async_trait::async_trait;

use crate::domain::foundation::DomainError;
use crate::domain::notification::{PushNotification, UserDevice};

/// Delivers a built payload to one device.
///
/// Returns whether a send was actually attempted; an adapter that is
/// switched off reports `Ok(true)` without contacting anything.
#[async_trait]
pub trait PushGateway: Send + Sync {
    async fn deliver(
        &self,
        device: &UserDevice,
        notification: &PushNotification,
    ) -> Result<bool, DomainError>;
}
