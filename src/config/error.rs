//! Configuration error types

use thiserror::Error;

/// Errors raised while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Semantic problems found by `validate()`
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid database URL format")]
    InvalidDatabaseUrl,

    #[error("Pool min_connections exceeds max_connections")]
    InvalidPoolSize,

    #[error("Pool size exceeds maximum allowed (100)")]
    PoolSizeTooLarge,

    #[error("Push endpoint must be an http(s) URL")]
    InvalidPushEndpoint,

    #[error("Push endpoint must use HTTPS in production")]
    PushEndpointMustBeHttps,

    #[error("Invalid timeout for {0}")]
    InvalidTimeout(&'static str),

    #[error("Status channel capacity must be at least 1")]
    InvalidStatusCapacity,

    #[error("Truncation limit for {0} must be positive")]
    InvalidTruncationLimit(&'static str),

    #[error("Invalid log filter directive: {0}")]
    InvalidLogFilter(String),
}
