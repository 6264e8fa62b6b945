//! API client for the Wayfarer itinerary service.
//!
//! Every call goes through the credential interceptor, so callers never
//! handle tokens themselves: they log in once and the client keeps the
//! credential attached and renewed behind the scenes.

use std::sync::Arc;

use anyhow::{Context, Result};
use reqwest::Method;
use serde::de::DeserializeOwned;
use tokio::sync::watch;
use tracing::debug;

use crate::auth::{
    HttpSessionAuthority, KeyringVault, PasswordVault, RefreshError, SessionAuthority, TokenStore,
};
use crate::config::Config;
use crate::models::{Itinerary, ItinerarySummary, Place, PlaceSuggestion};

use super::interceptor::CredentialInterceptor;
use super::transport::{HttpTransport, OutgoingRequest, TransportResponse};
use super::ApiError;

/// Base URL for the Wayfarer web API
const DEFAULT_BASE_URL: &str = "https://api.wayfarer.app";

pub struct WayfarerClient {
    base_url: String,
    config: Config,
    interceptor: CredentialInterceptor,
    authority: Arc<HttpSessionAuthority>,
    vault: Arc<dyn PasswordVault>,
}

impl WayfarerClient {
    /// Create a client from configuration, with the credential persisted
    /// under the cache directory.
    pub fn new(config: &Config) -> Result<Self> {
        let store: Arc<dyn TokenStore> = Arc::new(
            crate::auth::FileTokenStore::open(config.cache_dir()?)
                .context("Failed to open token store")?,
        );
        Self::with_store(config, store)
    }

    /// Create a client over an explicit token store.
    pub fn with_store(config: &Config, store: Arc<dyn TokenStore>) -> Result<Self> {
        let base_url = config
            .api_base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let transport = HttpTransport::new().context("Failed to build HTTP client")?;
        let authority = Arc::new(HttpSessionAuthority::new(
            transport.client(),
            base_url.clone(),
            store.clone(),
        ));

        let mut interceptor = CredentialInterceptor::new(
            store,
            authority.clone(),
            Arc::new(transport),
        );
        if let Some(window) = config.renewal_window() {
            interceptor = interceptor.with_renewal_window(window);
        }

        Ok(Self {
            base_url,
            config: config.clone(),
            interceptor,
            authority,
            vault: Arc::new(KeyringVault),
        })
    }

    /// Swap the password vault, so tests stay off the OS keychain.
    pub fn with_vault(mut self, vault: Arc<dyn PasswordVault>) -> Self {
        self.vault = vault;
        self
    }

    // ===== Session =====

    pub async fn login(&self, username: &str, password: &str) -> Result<(), RefreshError> {
        self.authority.login(username, password).await
    }

    /// Log in and remember the credentials: the password goes into the
    /// vault and the username into the saved configuration, so
    /// [`Self::login_remembered`] can reauthenticate after the credential
    /// expires.
    pub async fn login_and_remember(&self, username: &str, password: &str) -> Result<()> {
        self.authority.login(username, password).await?;
        self.vault
            .store(username, password)
            .context("Failed to remember password")?;

        let mut config = self.config.clone();
        config.last_username = Some(username.to_string());
        config.save().context("Failed to save remembered username")?;
        Ok(())
    }

    /// Log in with the remembered username and password. Fails before any
    /// request goes out when nothing was remembered.
    pub async fn login_remembered(&self) -> Result<()> {
        let username = self
            .config
            .last_username
            .as_deref()
            .context("No remembered login")?;
        let password = self.vault.get(username)?;
        self.authority.login(username, &password).await?;
        Ok(())
    }

    /// Username remembered from the last `login_and_remember`, if any.
    pub fn remembered_username(&self) -> Option<&str> {
        self.config.last_username.as_deref()
    }

    /// Drop the remembered password from the vault.
    pub fn forget_remembered(&self) -> Result<()> {
        if let Some(username) = self.config.last_username.as_deref() {
            self.vault.delete(username)?;
        }
        Ok(())
    }

    pub fn logout(&self) {
        self.authority.end_session();
    }

    pub fn is_logged_in(&self) -> bool {
        self.authority.is_logged_in()
    }

    /// Observe the logged-in signal, for UI layers that need to react to a
    /// session ending mid-flight.
    pub fn subscribe_session(&self) -> watch::Receiver<bool> {
        self.authority.subscribe()
    }

    // ===== Request plumbing =====

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(&self, request: OutgoingRequest) -> Result<TransportResponse, ApiError> {
        let response = self.interceptor.send(request).await?;
        if !response.status.is_success() {
            return Err(ApiError::from_status(response.status, &response.body));
        }
        Ok(response)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send(OutgoingRequest::get(self.url(path))).await?.json()
    }

    async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<T, ApiError> {
        self.send(OutgoingRequest::post(self.url(path)).json(body))
            .await?
            .json()
    }

    // ===== Itineraries =====

    pub async fn list_itineraries(&self) -> Result<Vec<ItinerarySummary>, ApiError> {
        self.get("/itineraries").await
    }

    pub async fn fetch_itinerary(&self, id: i64) -> Result<Itinerary, ApiError> {
        self.get(&format!("/itineraries/{}", id)).await
    }

    /// Create or update an itinerary, returning it as stored (with id and
    /// server timestamps filled in).
    pub async fn save_itinerary(&self, itinerary: &Itinerary) -> Result<Itinerary, ApiError> {
        let body = serde_json::to_value(itinerary)
            .map_err(|e| ApiError::InvalidResponse(format!("Unserializable itinerary: {}", e)))?;

        match itinerary.id {
            Some(id) => {
                debug!(id, "Updating itinerary");
                self.send(
                    OutgoingRequest::new(Method::PUT, self.url(&format!("/itineraries/{}", id)))
                        .json(body),
                )
                .await?
                .json()
            }
            None => {
                debug!(name = %itinerary.name, "Creating itinerary");
                self.post("/itineraries", body).await
            }
        }
    }

    pub async fn delete_itinerary(&self, id: i64) -> Result<(), ApiError> {
        self.send(OutgoingRequest::new(
            Method::DELETE,
            self.url(&format!("/itineraries/{}", id)),
        ))
        .await?;
        Ok(())
    }

    // ===== Geodata =====

    /// Search places by free-text query; the server aggregates the geodata
    /// providers.
    pub async fn search_places(&self, query: &str) -> Result<Vec<Place>, ApiError> {
        let mut url = reqwest::Url::parse(&self.url("/places/search"))
            .map_err(|e| ApiError::InvalidResponse(format!("Bad search URL: {}", e)))?;
        url.query_pairs_mut().append_pair("q", query);
        self.send(OutgoingRequest::get(url)).await?.json()
    }

    /// Ask the server's AI suggestion service for places matching a prompt,
    /// in the context of an itinerary.
    pub async fn suggest_places(
        &self,
        itinerary_id: i64,
        prompt: &str,
    ) -> Result<Vec<PlaceSuggestion>, ApiError> {
        self.post(
            &format!("/itineraries/{}/suggestions", itinerary_id),
            serde_json::json!({ "prompt": prompt }),
        )
        .await
    }
}
