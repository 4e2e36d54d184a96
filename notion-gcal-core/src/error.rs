//! Error types for notion-gcal-sync.

use thiserror::Error;

/// Errors that can occur while syncing task records into a calendar.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid time format '{0}': expected HHMM, e.g. 0600 or 1345")]
    InvalidTimeFormat(String),

    #[error("Invalid date '{0}'")]
    InvalidDate(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// The referenced remote object no longer exists (HTTP 404/410).
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("HTTP error: {0}")]
    Http(String),
}

impl SyncError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, SyncError::NotFound(_))
    }
}

/// Result type alias for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;
