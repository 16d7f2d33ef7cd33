//! Common library for the session client
//!
//! This crate provides the plumbing shared by the session and jobs crates:
//! client configuration, credential storage backends, error types, input
//! validation and tracing setup.
//!
//! ```rust,no_run
//! use common::{ClientConfig, CredentialStorage, FileStorage};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig::from_env()?;
//!     let storage = FileStorage::open("profile/credentials.json")?;
//!     println!("Talking to {}", config.base_url);
//!     println!("Stored token present: {}", storage.get("access_token")?.is_some());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod storage;
pub mod telemetry;
pub mod validation;

pub use config::{ClientConfig, Endpoints};
pub use error::{ConfigError, StorageError};
pub use storage::{CredentialStorage, FileStorage, MemoryStorage};
