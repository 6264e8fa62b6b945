//! Session ownership: login, credential refresh, and the logged-in signal.
//!
//! The `SessionAuthority` is the single owner of "logged in" state. UI
//! layers observe it through a watch channel instead of reading a shared
//! flag; the interceptor notifies it when a refresh fails or the API
//! rejects a credential.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, warn};

use super::{Credential, TokenStore};

/// Route segment of the refresh endpoint. Requests to this path are exempt
/// from interception so a refresh can never trigger another refresh.
pub const REFRESH_ROUTE: &str = "/auth/refresh";

/// Route of the login endpoint.
const LOGIN_ROUTE: &str = "/auth/login";

#[derive(Debug, Error)]
pub enum RefreshError {
    #[error("Refresh request could not be sent: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Refresh rejected with status {0}")]
    Rejected(StatusCode),

    #[error("Refresh response was malformed: {0}")]
    Malformed(String),

    #[error("No credential to refresh")]
    NotLoggedIn,
}

/// Owns login/logout state and the refresh operation. Injected into the
/// interceptor so it can be swapped for a test double.
#[async_trait]
pub trait SessionAuthority: Send + Sync {
    /// Obtain a fresh credential from the API. Does not persist it; the
    /// caller decides where the new credential goes.
    async fn refresh(&self) -> Result<Credential, RefreshError>;

    /// Mark the session as ended. Idempotent, safe to call when the session
    /// is already ended.
    fn end_session(&self);
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct TokenResponse {
    token: String,
}

/// Session authority backed by the Wayfarer auth endpoints.
///
/// Refresh calls go out on a plain HTTP client, never through the
/// interceptor.
pub struct HttpSessionAuthority {
    http: Client,
    base_url: String,
    store: Arc<dyn TokenStore>,
    logged_in: watch::Sender<bool>,
}

impl HttpSessionAuthority {
    pub fn new(http: Client, base_url: String, store: Arc<dyn TokenStore>) -> Self {
        // A credential persisted from a previous run counts as logged in
        let (logged_in, _) = watch::channel(store.get().is_some());
        Self {
            http,
            base_url,
            store,
            logged_in,
        }
    }

    /// Authenticate with username and password, storing the minted
    /// credential and flipping the session signal to logged-in.
    pub async fn login(&self, username: &str, password: &str) -> Result<(), RefreshError> {
        let url = format!("{}{}", self.base_url, LOGIN_ROUTE);
        let response = self
            .http
            .post(&url)
            .json(&LoginRequest { username, password })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(RefreshError::Rejected(response.status()));
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| RefreshError::Malformed(e.to_string()))?;
        let credential = Credential::from_token(body.token)
            .map_err(|e| RefreshError::Malformed(e.to_string()))?;

        if let Err(e) = self.store.set(credential) {
            warn!(error = %e, "Failed to persist credential after login");
        }
        self.logged_in.send_replace(true);
        debug!(username, "Login succeeded");
        Ok(())
    }

    /// Observe the logged-in signal.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.logged_in.subscribe()
    }

    pub fn is_logged_in(&self) -> bool {
        *self.logged_in.borrow()
    }
}

#[async_trait]
impl SessionAuthority for HttpSessionAuthority {
    async fn refresh(&self) -> Result<Credential, RefreshError> {
        let current = self.store.get().ok_or(RefreshError::NotLoggedIn)?;

        let url = format!("{}{}", self.base_url, REFRESH_ROUTE);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&current.value)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(RefreshError::Rejected(response.status()));
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| RefreshError::Malformed(e.to_string()))?;

        let credential = Credential::from_token(body.token)
            .map_err(|e| RefreshError::Malformed(e.to_string()))?;
        debug!(expires_at = %credential.expires_at, "Credential refreshed");
        Ok(credential)
    }

    fn end_session(&self) {
        // Best effort: a failed clear must not mask the error that caused
        // the termination
        if let Err(e) = self.store.clear() {
            warn!(error = %e, "Failed to clear stored credential on session end");
        }
        if self.logged_in.send_replace(false) {
            debug!("Session ended");
        }
    }
}
