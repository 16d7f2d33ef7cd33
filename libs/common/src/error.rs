//! Custom error types for the common library
//!
//! This module defines the storage and configuration errors shared by the
//! session and jobs crates.

use thiserror::Error;

/// Custom error type for credential storage operations
#[derive(Error, Debug)]
pub enum StorageError {
    /// Error occurred while reading or writing the backing file
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The backing file exists but does not hold a valid key/value document
    #[error("Storage format error: {0}")]
    Format(#[from] serde_json::Error),

    /// The in-memory store lock was poisoned by a panicking writer
    #[error("Storage lock poisoned")]
    Poisoned,
}

/// Custom error type for client configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Error raised by the configuration loader
    #[error("Configuration load error: {0}")]
    Load(#[from] config::ConfigError),

    /// A value was loaded but is not usable
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Type alias for Result with StorageError
pub type StorageResult<T> = Result<T, StorageError>;

/// Type alias for Result with ConfigError
pub type ConfigResult<T> = Result<T, ConfigError>;
