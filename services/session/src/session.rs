//! Session management
//!
//! [`SessionManager`] is the single owner of the stored credential set. It
//! is the only writer of the credential keys, the only caller of the refresh
//! endpoint, and the place where every credential-fatal failure is handled:
//! credentials are cleared and the embedding application is sent to login.

use common::storage::{CredentialStorage, FileStorage, MemoryStorage};
use common::{ClientConfig, validation};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::auth_client::AuthClient;
use crate::credentials::{CredentialSet, Identity};
use crate::error::{SessionError, SessionResult};
use crate::jwt::{self, DecodedToken};
use crate::navigator::LoginNavigator;
use crate::recovery::Recovery;
use crate::upkeep::Upkeep;

pub(crate) struct Inner {
    pub(crate) config: ClientConfig,
    pub(crate) http: reqwest::Client,
    pub(crate) auth: AuthClient,
    pub(crate) storage: Arc<dyn CredentialStorage>,
    pub(crate) navigator: Arc<dyn LoginNavigator>,
    /// Serializes refreshes and credential clearing
    pub(crate) refresh_lock: Mutex<()>,
    pub(crate) upkeep: Mutex<Option<Upkeep>>,
}

/// Session manager for handling the user's credentials.
///
/// Cloning is cheap and every clone shares the same state; construct one per
/// process and hand clones to whatever needs authenticated access.
#[derive(Clone)]
pub struct SessionManager {
    pub(crate) inner: Arc<Inner>,
}

impl SessionManager {
    /// Create a new session manager
    pub fn new(
        config: ClientConfig,
        storage: Arc<dyn CredentialStorage>,
        navigator: Arc<dyn LoginNavigator>,
    ) -> SessionResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        let auth = AuthClient::new(config.clone(), http.clone());

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                http,
                auth,
                storage,
                navigator,
                refresh_lock: Mutex::new(()),
                upkeep: Mutex::new(None),
            }),
        })
    }

    /// Create a session manager whose storage follows `config.storage_path`
    pub fn from_config(
        config: ClientConfig,
        navigator: Arc<dyn LoginNavigator>,
    ) -> SessionResult<Self> {
        let storage: Arc<dyn CredentialStorage> = match &config.storage_path {
            Some(path) => Arc::new(FileStorage::open(path)?),
            None => Arc::new(MemoryStorage::new()),
        };
        Self::new(config, storage, navigator)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Shared HTTP client, for building requests passed to [`Self::authenticated_request`]
    pub fn http(&self) -> &reqwest::Client {
        &self.inner.http
    }

    fn credentials(&self) -> SessionResult<Option<CredentialSet>> {
        Ok(CredentialSet::load(self.inner.storage.as_ref())?)
    }

    /// Log in with email and password and store the returned credentials
    pub async fn login(&self, email: &str, password: &str) -> SessionResult<Identity> {
        let email = email.trim();

        if email.is_empty() {
            return Err(SessionError::Validation("Email is required".to_string()));
        }
        validation::validate_password(password).map_err(SessionError::Validation)?;

        info!("Login attempt for user: {}", email);
        let response = self.inner.auth.login(email, password).await?;

        self.set_credentials(
            &response.access_token,
            &response.refresh_token,
            &response.therapist_id,
            &response.full_name,
            email,
        )?;

        info!("Login succeeded for subject: {}", response.therapist_id);
        Ok(Identity {
            subject_id: response.therapist_id,
            display_name: response.full_name,
            email: email.to_string(),
        })
    }

    /// Persist a full credential set
    pub fn set_credentials(
        &self,
        access_token: &str,
        refresh_token: &str,
        subject_id: &str,
        display_name: &str,
        email: &str,
    ) -> SessionResult<()> {
        let credentials = CredentialSet {
            access_token: access_token.to_string(),
            refresh_token: refresh_token.to_string(),
            subject_id: subject_id.to_string(),
            display_name: display_name.to_string(),
            email: email.to_string(),
        };

        if [access_token, refresh_token, subject_id, display_name, email]
            .iter()
            .any(|field| field.is_empty())
        {
            return Err(SessionError::Validation(
                "Credential set requires every field".to_string(),
            ));
        }

        debug!(
            "Storing credentials for subject: {} ({})",
            credentials.subject_id, credentials.email
        );
        credentials.save(self.inner.storage.as_ref())?;
        Ok(())
    }

    /// Whether a complete credential set is stored. Expiry is not checked here.
    pub fn is_authenticated(&self) -> bool {
        match self.credentials() {
            Ok(credentials) => credentials.is_some(),
            Err(e) => {
                warn!("Failed to read credentials: {}", e);
                false
            }
        }
    }

    /// Whether a token's embedded expiry has passed
    pub fn is_expired(&self, token: &str) -> bool {
        jwt::is_expired(token)
    }

    /// Decoded view of the stored access token
    pub fn decoded_access_token(&self) -> SessionResult<DecodedToken> {
        let credentials = self.credentials()?.ok_or(SessionError::NotAuthenticated)?;
        jwt::decode_token(&credentials.access_token)
    }

    /// Identity fields of the logged-in user
    pub fn current_identity(&self) -> Option<Identity> {
        self.credentials().ok().flatten().map(|c| c.identity())
    }

    /// A currently valid access token, refreshing first if the stored one expired
    pub async fn access_token(&self) -> SessionResult<String> {
        let credentials = self.credentials()?.ok_or(SessionError::NotAuthenticated)?;

        if jwt::is_expired(&credentials.access_token) {
            info!("Access token expired, refreshing before use");
            return self.refresh_stale(&credentials.access_token).await;
        }

        Ok(credentials.access_token)
    }

    /// Exchange the stored refresh token for a new token pair.
    ///
    /// On failure the session is ended before the error is returned.
    pub async fn refresh(&self) -> SessionResult<String> {
        let _guard = self.inner.refresh_lock.lock().await;
        self.refresh_locked().await
    }

    /// Refresh on behalf of a caller that found `stale` unusable.
    ///
    /// A caller that waited on another refresh reuses the token it produced.
    pub(crate) async fn refresh_stale(&self, stale: &str) -> SessionResult<String> {
        let _guard = self.inner.refresh_lock.lock().await;

        if let Some(credentials) = self.credentials()? {
            if credentials.access_token != stale && !jwt::is_expired(&credentials.access_token) {
                debug!("Access token already rotated by a concurrent refresh");
                return Ok(credentials.access_token);
            }
        }

        self.refresh_locked().await
    }

    async fn refresh_locked(&self) -> SessionResult<String> {
        let Some(credentials) = self.credentials()? else {
            self.end_session_locked("no refresh token available");
            return Err(SessionError::RefreshFailed(
                "No refresh token available".to_string(),
            ));
        };

        info!(
            "Attempting to refresh token for subject: {}",
            credentials.subject_id
        );

        let response = match self.inner.auth.refresh(&credentials.refresh_token).await {
            Ok(response) if !response.access_token.is_empty() => response,
            Ok(_) => {
                error!("Token refresh returned an empty access token");
                self.end_session_locked("token refresh failed");
                return Err(SessionError::RefreshFailed(
                    "Empty access token in refresh response".to_string(),
                ));
            }
            Err(e) => {
                error!("Token refresh failed: {}", e);
                self.end_session_locked("token refresh failed");
                return Err(SessionError::RefreshFailed(e.to_string()));
            }
        };

        let refresh_token = match response.refresh_token {
            Some(token) if !token.is_empty() => token,
            _ => {
                warn!("Refresh response carried no refresh token, keeping the current one");
                credentials.refresh_token.clone()
            }
        };

        let rotated = credentials.with_rotated_tokens(response.access_token, refresh_token);
        // The server has consumed the old refresh token; a stale pair cannot recover
        if let Err(e) = rotated.save(self.inner.storage.as_ref()) {
            error!("Failed to store refreshed credentials: {}", e);
            self.end_session_locked("refreshed credentials could not be stored");
            return Err(SessionError::RefreshFailed(e.to_string()));
        }

        info!("Token refreshed successfully");
        Ok(rotated.access_token)
    }

    /// Send a request with the bearer token, recovering from expiry and 401.
    ///
    /// `build` is called once per attempt, so bodies that cannot be cloned
    /// (multipart forms) are rebuilt for the retry. At most one refresh
    /// happens before the first attempt and at most one refresh and retry
    /// after a 401. A second 401 ends the session.
    pub async fn authenticated_request<F>(&self, build: F) -> SessionResult<reqwest::Response>
    where
        F: Fn(&reqwest::Client) -> reqwest::RequestBuilder + Send + Sync,
    {
        let mut token = self.access_token().await?;
        let mut recovery = Recovery::NoRefreshAttempted;

        loop {
            let response = build(&self.inner.http).bearer_auth(&token).send().await?;

            if response.status() != reqwest::StatusCode::UNAUTHORIZED {
                return Ok(response);
            }

            match recovery.on_unauthorized() {
                Some(next) => {
                    warn!("Request to {} unauthorized, refreshing once", response.url());
                    recovery = next;
                    token = self.refresh_stale(&token).await?;
                    recovery = recovery.on_refreshed();
                }
                None => {
                    error!(
                        "Request to {} still unauthorized after refresh",
                        response.url()
                    );
                    let _guard = self.inner.refresh_lock.lock().await;
                    self.end_session_locked("request unauthorized after retry");
                    return Err(SessionError::AuthenticationFailed);
                }
            }
        }
    }

    /// Check the stored access token with the server. Never refreshes or clears.
    pub async fn validate(&self) -> bool {
        let credentials = match self.credentials() {
            Ok(Some(credentials)) => credentials,
            Ok(None) => {
                debug!("No access token available for validation");
                return false;
            }
            Err(e) => {
                warn!("Failed to read credentials: {}", e);
                return false;
            }
        };

        match self.inner.auth.validate(&credentials.access_token).await {
            Ok(valid) => valid,
            Err(e) => {
                warn!("Token validation error: {}", e);
                false
            }
        }
    }

    /// Notify the server, then clear credentials and go to login whatever the
    /// notification's outcome.
    pub async fn logout(&self) {
        match self.credentials() {
            Ok(Some(credentials)) => {
                if let Err(e) = self.inner.auth.logout(&credentials.access_token).await {
                    warn!("Logout notification failed, continuing: {}", e);
                }
            }
            Ok(None) => debug!("Logout without stored credentials"),
            Err(e) => warn!("Failed to read credentials: {}", e),
        }

        {
            let _guard = self.inner.refresh_lock.lock().await;
            if let Err(e) = CredentialSet::clear(self.inner.storage.as_ref()) {
                error!("Failed to clear credentials: {}", e);
            }
        }

        info!("Logged out");
        self.inner.navigator.redirect_to_login();
    }

    /// Clear credentials and navigate to login. Caller holds `refresh_lock`.
    ///
    /// Navigation only happens when something was stored, so concurrent
    /// failures of one session redirect once.
    fn end_session_locked(&self, reason: &str) {
        let storage = self.inner.storage.as_ref();
        let had_session = CredentialSet::any_present(storage).unwrap_or(true);

        if let Err(e) = CredentialSet::clear(storage) {
            error!("Failed to clear credentials: {}", e);
        }

        if had_session {
            warn!("Ending session: {}", reason);
            self.inner.navigator.redirect_to_login();
        } else {
            debug!("Session already ended ({})", reason);
        }
    }
}
