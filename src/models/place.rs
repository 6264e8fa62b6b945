//! Place search and suggestion types mirroring the Wayfarer API JSON.
//!
//! The server aggregates the underlying geodata providers (Nominatim,
//! Overpass, Wikipedia) and the AI suggestion service; the client only sees
//! these flattened shapes.

use serde::Deserialize;

/// A place returned by the search endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct Place {
    #[serde(rename = "displayName")]
    pub display_name: String,
    #[serde(rename = "lat")]
    pub latitude: f64,
    #[serde(rename = "lon")]
    pub longitude: f64,
    #[serde(default)]
    pub category: Option<String>,
    /// Wikipedia article title, when the server could enrich the result
    #[serde(default)]
    pub wikipedia: Option<String>,
}

/// An AI-suggested place for the current itinerary.
#[derive(Debug, Clone, Deserialize)]
pub struct PlaceSuggestion {
    pub name: String,
    /// Why the suggestion fits the itinerary, as produced by the server
    pub reason: String,
    #[serde(rename = "lat", default)]
    pub latitude: Option<f64>,
    #[serde(rename = "lon", default)]
    pub longitude: Option<f64>,
}
