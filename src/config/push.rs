//! Push delivery configuration

use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use super::logging::Environment;
use crate::adapters::push::HttpPushConfig;

/// Push relay settings
#[derive(Debug, Clone, Deserialize)]
pub struct PushConfig {
    /// When false deliveries succeed without contacting the relay
    #[serde(default)]
    pub enabled: bool,

    /// Base URL of the relay's REST API
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Key name used as the basic-auth user
    #[serde(default)]
    pub key_name: String,

    /// Key secret used as the basic-auth password
    pub api_key: Option<Secret<String>>,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl PushConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Settings for the HTTP gateway.
    pub fn gateway_config(&self) -> HttpPushConfig {
        if !self.enabled {
            return HttpPushConfig::disabled();
        }
        let secret = self
            .api_key
            .as_ref()
            .map(|k| k.expose_secret().clone())
            .unwrap_or_default();
        HttpPushConfig::new(self.key_name.clone(), secret)
            .with_base_url(self.endpoint.clone())
            .with_timeout(self.timeout())
    }

    pub fn validate(&self, environment: &Environment) -> Result<(), ValidationError> {
        if !self.enabled {
            return Ok(());
        }
        if !self.endpoint.starts_with("http://") && !self.endpoint.starts_with("https://") {
            return Err(ValidationError::InvalidPushEndpoint);
        }
        if *environment == Environment::Production && !self.endpoint.starts_with("https://") {
            return Err(ValidationError::PushEndpointMustBeHttps);
        }
        if self.key_name.is_empty() {
            return Err(ValidationError::MissingRequired("CONCLAVE__PUSH__KEY_NAME"));
        }
        if self.api_key.as_ref().map_or(true, |k| k.expose_secret().is_empty()) {
            return Err(ValidationError::MissingRequired("CONCLAVE__PUSH__API_KEY"));
        }
        if self.timeout_secs == 0 || self.timeout_secs > 60 {
            return Err(ValidationError::InvalidTimeout("push"));
        }
        Ok(())
    }
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: default_endpoint(),
            key_name: String::new(),
            api_key: None,
            timeout_secs: default_timeout(),
        }
    }
}

fn default_endpoint() -> String {
    "https://rest.ably.io".to_string()
}

fn default_timeout() -> u64 {
    10
}
