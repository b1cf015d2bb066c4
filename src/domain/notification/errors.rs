use thiserror::Error;

use crate::domain::foundation::{DomainError, ErrorCode};

/// Errors returned by the dispatch call itself. Per-target failures are
/// reported on the progress channel instead.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NotificationError {
    #[error("Cannot notify subscribers without a {0}")]
    MissingInput(&'static str),

    #[error(transparent)]
    Store(#[from] DomainError),
}

impl NotificationError {
    pub fn code(&self) -> ErrorCode {
        match self {
            NotificationError::MissingInput(_) => ErrorCode::ValidationFailed,
            NotificationError::Store(err) => err.code,
        }
    }
}
