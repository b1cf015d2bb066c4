//! Push gateway that records deliveries instead of sending them.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use crate::domain::foundation::{DeviceId, DomainError, ErrorCode};
use crate::domain::notification::{PushNotification, UserDevice};
use crate::ports::PushGateway;

/// A delivery seen by [`RecordingPushGateway`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedDelivery {
    pub device: UserDevice,
    pub notification: PushNotification,
}

#[derive(Debug, Default)]
struct Recorder {
    deliveries: Vec<RecordedDelivery>,
    failing: HashSet<DeviceId>,
}

/// In-memory gateway for tests.
#[derive(Debug, Clone, Default)]
pub struct RecordingPushGateway {
    inner: Arc<Mutex<Recorder>>,
}

impl RecordingPushGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes deliveries to `device_id` fail.
    pub fn fail_for(&self, device_id: DeviceId) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.failing.insert(device_id);
        }
    }

    pub fn deliveries(&self) -> Vec<RecordedDelivery> {
        self.inner
            .lock()
            .map(|inner| inner.deliveries.clone())
            .unwrap_or_default()
    }

    pub fn delivery_count(&self) -> usize {
        self.inner
            .lock()
            .map(|inner| inner.deliveries.len())
            .unwrap_or_default()
    }
}

#[async_trait]
impl PushGateway for RecordingPushGateway {
    async fn deliver(
        &self,
        device: &UserDevice,
        notification: &PushNotification,
    ) -> Result<bool, DomainError> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| DomainError::new(ErrorCode::InternalError, "Recorder lock poisoned"))?;

        if inner.failing.contains(&device.id) {
            return Err(DomainError::new(
                ErrorCode::PushDeliveryError,
                "Simulated delivery failure",
            )
            .with_detail("device_id", device.id.as_str()));
        }

        inner.deliveries.push(RecordedDelivery {
            device: device.clone(),
            notification: notification.clone(),
        });
        Ok(true)
    }
}
