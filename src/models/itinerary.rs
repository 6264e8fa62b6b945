//! Itinerary and waypoint types mirroring the Wayfarer API JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A planned stop on an itinerary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Waypoint {
    pub name: String,
    #[serde(rename = "lat")]
    pub latitude: f64,
    #[serde(rename = "lon")]
    pub longitude: f64,
    /// 1-based day of the trip this stop belongs to
    pub day: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// A full itinerary as stored by the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Itinerary {
    /// None for itineraries not yet saved
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub waypoints: Vec<Waypoint>,
    #[serde(rename = "updatedAt", default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// List entry returned by the itinerary listing endpoint; waypoints are
/// fetched separately.
#[derive(Debug, Clone, Deserialize)]
pub struct ItinerarySummary {
    pub id: i64,
    pub name: String,
    #[serde(rename = "waypointCount", default)]
    pub waypoint_count: u32,
    #[serde(rename = "updatedAt")]
    pub updated_at: Option<DateTime<Utc>>,
}
