//! Wayfarer client core - API client, models, and authentication for the
//! Wayfarer itinerary planner.
//!
//! The front end builds on this crate for everything that touches the
//! Wayfarer web API. Its centerpiece is the credential-attachment
//! interceptor in [`api::interceptor`], which transparently renews the
//! bearer credential around outgoing requests and ends the session when the
//! API stops accepting it.

pub mod api;
pub mod auth;
pub mod config;
pub mod models;

pub use api::{ApiError, CredentialInterceptor, WayfarerClient};
pub use auth::{Credential, RefreshError, SessionAuthority, TokenStore};
pub use config::Config;
