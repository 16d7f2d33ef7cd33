//! Session credential management
//!
//! This crate owns the access/refresh token lifecycle of the client: it
//! persists the credential set, decodes tokens to detect expiry, refreshes
//! them transparently (before a request and once after a 401), keeps them
//! fresh in the background and ends the session cleanly when recovery is no
//! longer possible.
//!
//! ```rust,no_run
//! use common::ClientConfig;
//! use session::{LogOnlyNavigator, SessionManager};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig::from_env()?;
//!     let session = SessionManager::from_config(config, Arc::new(LogOnlyNavigator))?;
//!     session.initialize().await?;
//!
//!     session.login("therapist@clinic.org", "secret").await?;
//!     let url = session.config().url("/patientsdb/dashboard-data");
//!     let response = session
//!         .authenticated_request(|http| http.get(url.as_str()))
//!         .await?;
//!     println!("Dashboard answered {}", response.status());
//!
//!     session.dispose().await?;
//!     Ok(())
//! }
//! ```

pub mod auth_client;
pub mod credentials;
pub mod error;
pub mod jwt;
pub mod models;
pub mod navigator;
mod recovery;
pub mod session;
mod upkeep;

pub use credentials::{CredentialSet, Identity};
pub use error::{SessionError, SessionResult};
pub use jwt::{DecodedToken, decode_token, is_expired};
pub use navigator::{LogOnlyNavigator, LoginNavigator};
pub use session::SessionManager;
