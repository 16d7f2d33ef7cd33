//! HTTP client for the auth service endpoints
//!
//! These calls carry no recovery logic of their own: the session manager
//! decides what a failure means for the stored credentials.

use common::ClientConfig;
use reqwest::StatusCode;
use tracing::debug;

use crate::error::{SessionError, SessionResult};
use crate::models::{LoginRequest, LoginResponse, RefreshTokenRequest, RefreshTokenResponse};

/// Auth service client
#[derive(Debug, Clone)]
pub struct AuthClient {
    config: ClientConfig,
    http: reqwest::Client,
}

impl AuthClient {
    pub fn new(config: ClientConfig, http: reqwest::Client) -> Self {
        Self { config, http }
    }

    /// Exchange email and password for a token pair
    pub async fn login(&self, email: &str, password: &str) -> SessionResult<LoginResponse> {
        let response = self
            .http
            .post(self.config.login_url())
            .json(&LoginRequest { email, password })
            .send()
            .await?;

        let response = Self::ensure_success(response, "login").await?;
        Ok(response.json::<LoginResponse>().await?)
    }

    /// Exchange a refresh token for a new token pair
    pub async fn refresh(&self, refresh_token: &str) -> SessionResult<RefreshTokenResponse> {
        let response = self
            .http
            .post(self.config.refresh_url())
            .json(&RefreshTokenRequest { refresh_token })
            .send()
            .await?;

        let response = Self::ensure_success(response, "token refresh").await?;
        Ok(response.json::<RefreshTokenResponse>().await?)
    }

    /// Ask the server whether an access token is still accepted
    pub async fn validate(&self, access_token: &str) -> SessionResult<bool> {
        let response = self
            .http
            .post(self.config.validate_url())
            .bearer_auth(access_token)
            .send()
            .await?;

        debug!("Token validation answered {}", response.status());
        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Ok(false),
            _ => Self::ensure_success(response, "token validation")
                .await
                .map(|_| true),
        }
    }

    /// Notify the server of a logout
    pub async fn logout(&self, access_token: &str) -> SessionResult<()> {
        let response = self
            .http
            .post(self.config.logout_url())
            .bearer_auth(access_token)
            .send()
            .await?;

        Self::ensure_success(response, "logout").await?;
        Ok(())
    }

    /// Checks HTTP response status; returns the response on success or an error with details.
    pub(crate) async fn ensure_success(
        response: reqwest::Response,
        operation: &'static str,
    ) -> SessionResult<reqwest::Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let detail = response.text().await.unwrap_or_default();
        Err(SessionError::Rejected {
            operation,
            status,
            detail,
        })
    }
}
