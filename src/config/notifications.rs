//! Notification fan-out configuration

use serde::Deserialize;

use super::error::ValidationError;

/// Fan-out tuning and payload limits
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct NotificationsConfig {
    /// Capacity of each dispatch's progress channel
    #[serde(default = "default_status_capacity")]
    pub status_capacity: usize,

    #[serde(default = "default_title_max_chars")]
    pub title_max_chars: usize,

    #[serde(default = "default_body_max_chars")]
    pub body_max_chars: usize,
}

impl NotificationsConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.status_capacity == 0 {
            return Err(ValidationError::InvalidStatusCapacity);
        }
        if self.title_max_chars == 0 {
            return Err(ValidationError::InvalidTruncationLimit("title"));
        }
        if self.body_max_chars == 0 {
            return Err(ValidationError::InvalidTruncationLimit("body"));
        }
        Ok(())
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            status_capacity: default_status_capacity(),
            title_max_chars: default_title_max_chars(),
            body_max_chars: default_body_max_chars(),
        }
    }
}

fn default_status_capacity() -> usize {
    1
}

fn default_title_max_chars() -> usize {
    65
}

fn default_body_max_chars() -> usize {
    156
}
