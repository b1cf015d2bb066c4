//! Logging configuration

use serde::Deserialize;
use tracing_subscriber::EnvFilter;

use super::error::ValidationError;

/// Deployment environment
#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

/// Tracing subscriber settings
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub environment: Environment,

    /// `EnvFilter` directive; `RUST_LOG` overrides it when set
    #[serde(default = "default_filter")]
    pub filter: String,

    /// JSON output; defaults to on outside development
    pub json: Option<bool>,
}

impl LoggingConfig {
    pub fn use_json(&self) -> bool {
        self.json
            .unwrap_or(self.environment != Environment::Development)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        EnvFilter::try_new(&self.filter)
            .map(|_| ())
            .map_err(|e| ValidationError::InvalidLogFilter(e.to_string()))
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            environment: Environment::default(),
            filter: default_filter(),
            json: None,
        }
    }
}

fn default_filter() -> String {
    "info,conclave=debug".to_string()
}
