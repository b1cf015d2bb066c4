//! Application configuration module
//!
//! Configuration is read from environment variables with the `CONCLAVE`
//! prefix; nested values are separated by a double underscore.
//!
//! # Example
//!
//! ```no_run
//! use conclave::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod database;
mod error;
mod logging;
mod notifications;
mod push;

pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use logging::{Environment, LoggingConfig};
pub use notifications::NotificationsConfig;
pub use push::PushConfig;

use serde::Deserialize;

/// Root configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// PostgreSQL connection
    pub database: DatabaseConfig,

    /// Push relay
    #[serde(default)]
    pub push: PushConfig,

    /// Fan-out tuning and payload limits
    #[serde(default)]
    pub notifications: NotificationsConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Loads configuration from the environment
    ///
    /// Reads `.env` when present, then `CONCLAVE__*` variables:
    ///
    /// - `CONCLAVE__DATABASE__URL=...` -> `database.url`
    /// - `CONCLAVE__PUSH__ENABLED=true` -> `push.enabled`
    /// - `CONCLAVE__NOTIFICATIONS__STATUS_CAPACITY=4` -> `notifications.status_capacity`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when a required value is missing or a value
    /// does not parse.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("CONCLAVE")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Semantic validation of every section
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.database.validate()?;
        self.push.validate(&self.logging.environment)?;
        self.notifications.validate()?;
        self.logging.validate()?;
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.logging.environment == Environment::Production
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Env vars are process-global
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const VARS: &[&str] = &[
        "CONCLAVE__DATABASE__URL",
        "CONCLAVE__PUSH__ENABLED",
        "CONCLAVE__PUSH__KEY_NAME",
        "CONCLAVE__PUSH__API_KEY",
        "CONCLAVE__NOTIFICATIONS__STATUS_CAPACITY",
        "CONCLAVE__LOGGING__ENVIRONMENT",
    ];

    fn set_minimal_env() {
        env::set_var("CONCLAVE__DATABASE__URL", "postgresql://test@localhost/conclave");
    }

    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    fn loads_minimal_environment_with_defaults() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        let config = result.expect("config should load");
        assert_eq!(config.database.url(), "postgresql://test@localhost/conclave");
        assert!(!config.push.enabled);
        assert_eq!(config.notifications.status_capacity, 1);
        assert_eq!(config.notifications.title_max_chars, 65);
        assert_eq!(config.logging.environment, Environment::Development);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn missing_database_url_fails_to_load() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        assert!(AppConfig::load().is_err());
    }

    #[test]
    fn reads_nested_sections() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("CONCLAVE__PUSH__ENABLED", "true");
        env::set_var("CONCLAVE__PUSH__KEY_NAME", "app.key");
        env::set_var("CONCLAVE__PUSH__API_KEY", "secret");
        env::set_var("CONCLAVE__NOTIFICATIONS__STATUS_CAPACITY", "8");
        env::set_var("CONCLAVE__LOGGING__ENVIRONMENT", "production");
        let result = AppConfig::load();
        clear_env();

        let config = result.expect("config should load");
        assert!(config.push.enabled);
        assert_eq!(config.notifications.status_capacity, 8);
        assert!(config.is_production());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn enabled_push_without_key_fails_validation() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("CONCLAVE__PUSH__ENABLED", "true");
        env::set_var("CONCLAVE__PUSH__KEY_NAME", "app.key");
        let result = AppConfig::load();
        clear_env();

        let config = result.expect("config should load");
        assert!(config.validate().is_err());
    }
}
