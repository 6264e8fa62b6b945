//! REST API layer for the Wayfarer itinerary service.
//!
//! This module provides the `WayfarerClient` for talking to the Wayfarer
//! web API, and the `CredentialInterceptor` that sits between the client
//! and the wire to keep a valid bearer credential attached to every
//! request.

pub mod client;
pub mod error;
pub mod interceptor;
pub mod transport;

pub use client::WayfarerClient;
pub use error::ApiError;
pub use interceptor::CredentialInterceptor;
pub use transport::{HttpTransport, OutgoingRequest, Transport, TransportResponse};
