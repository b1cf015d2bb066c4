//! HTTP push gateway.
//!
//! Publishes one message per delivery to a push relay's REST endpoint.
//! Android devices are addressed through FCM by registration token, iOS
//! devices through APNs by device token.
//!
//! # Configuration
//!
//! ```ignore
//! let config = HttpPushConfig::new("app-key", "app-secret")
//!     .with_base_url("https://rest.ably.io");
//!
//! let gateway = HttpPushGateway::new(config)?;
//! ```

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde::Serialize;
use std::time::Duration;

use crate::domain::foundation::{DomainError, ErrorCode};
use crate::domain::notification::{PushNotification, UserDevice};
use crate::ports::PushGateway;

/// Settings for [`HttpPushGateway`].
#[derive(Debug, Clone)]
pub struct HttpPushConfig {
    /// When false every delivery reports success without a request.
    pub enabled: bool,
    pub base_url: String,
    pub username: String,
    password: Secret<String>,
    pub timeout: Duration,
}

impl HttpPushConfig {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            enabled: true,
            base_url: "https://rest.ably.io".to_string(),
            username: username.into(),
            password: Secret::new(password.into()),
            timeout: Duration::from_secs(10),
        }
    }

    /// A configuration that never contacts the relay.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::new("", "")
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn publish_url(&self) -> String {
        format!("{}/push/publish", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(tag = "transportType")]
enum Recipient<'a> {
    #[serde(rename = "apns")]
    Apns {
        #[serde(rename = "deviceToken")]
        device_token: &'a str,
    },
    #[serde(rename = "fcm")]
    Fcm {
        #[serde(rename = "registrationToken")]
        registration_token: &'a str,
    },
}

#[derive(Debug, Serialize)]
struct PublishRequest<'a> {
    recipient: Recipient<'a>,
    notification: &'a PushNotification,
}

fn delivery_error(device: &UserDevice, message: impl Into<String>) -> DomainError {
    DomainError::new(ErrorCode::PushDeliveryError, message)
        .with_detail("device_id", device.id.as_str())
        .with_detail("platform", device.platform.clone())
}

/// Builds the relay request for `device`.
fn publish_request<'a>(
    device: &'a UserDevice,
    notification: &'a PushNotification,
) -> Result<PublishRequest<'a>, DomainError> {
    let token = device
        .push_token()
        .ok_or_else(|| delivery_error(device, "Device has no push token"))?;

    let recipient = match device.platform.to_lowercase().as_str() {
        "android" => Recipient::Fcm {
            registration_token: token,
        },
        "ios" => Recipient::Apns {
            device_token: token,
        },
        other => {
            return Err(delivery_error(
                device,
                format!("Unknown platform for device: {}", other),
            ))
        }
    };

    Ok(PublishRequest {
        recipient,
        notification,
    })
}

/// Push gateway backed by a REST relay.
pub struct HttpPushGateway {
    config: HttpPushConfig,
    client: Client,
}

impl HttpPushGateway {
    pub fn new(config: HttpPushConfig) -> Result<Self, DomainError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                DomainError::new(
                    ErrorCode::InternalError,
                    format!("Failed to create HTTP client: {}", e),
                )
            })?;

        Ok(Self { config, client })
    }
}

#[async_trait]
impl PushGateway for HttpPushGateway {
    async fn deliver(
        &self,
        device: &UserDevice,
        notification: &PushNotification,
    ) -> Result<bool, DomainError> {
        if !self.config.enabled {
            return Ok(true);
        }

        let request = publish_request(device, notification)?;

        let response = self
            .client
            .post(self.config.publish_url())
            .basic_auth(
                &self.config.username,
                Some(self.config.password.expose_secret()),
            )
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    delivery_error(device, "Push relay timed out")
                } else {
                    delivery_error(device, format!("Push relay request failed: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(delivery_error(
                device,
                format!("Push relay rejected the message: {}", status),
            )
            .with_detail("status", status.as_u16().to_string()));
        }

        tracing::debug!(device_id = %device.id, "Push message published");
        Ok(true)
    }
}
