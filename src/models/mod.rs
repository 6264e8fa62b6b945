//! Data types mirroring the Wayfarer web API JSON.

pub mod itinerary;
pub mod place;

pub use itinerary::{Itinerary, ItinerarySummary, Waypoint};
pub use place::{Place, PlaceSuggestion};
