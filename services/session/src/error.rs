//! Custom error types for the session service

use common::error::StorageError;
use thiserror::Error;

/// Custom error type for session operations
#[derive(Error, Debug)]
pub enum SessionError {
    /// No complete credential set is stored
    #[error("Not authenticated")]
    NotAuthenticated,

    /// The request was still unauthorized after the one allowed refresh and retry.
    /// The session has been ended.
    #[error("Authentication failed")]
    AuthenticationFailed,

    /// The refresh endpoint rejected the refresh token or could not be reached.
    /// The session has been ended.
    #[error("Token refresh failed: {0}")]
    RefreshFailed(String),

    /// A backend endpoint answered with a non-success status
    #[error("{operation} failed with status {status}: {detail}")]
    Rejected {
        operation: &'static str,
        status: u16,
        detail: String,
    },

    /// Transport level failure, no response received
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Token could not be decoded
    #[error("Token decode error: {0}")]
    Token(String),

    /// Bad input rejected before any request was sent
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Credential storage error
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Background upkeep scheduler error
    #[error("Scheduler error: {0}")]
    Scheduler(String),
}

impl SessionError {
    /// Whether this error ended the session (credentials cleared, login shown)
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SessionError::AuthenticationFailed | SessionError::RefreshFailed(_)
        )
    }
}

/// Type alias for session results
pub type SessionResult<T> = Result<T, SessionError>;
