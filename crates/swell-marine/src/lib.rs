//! Marine weather data for Swell
//!
//! Fetches wave and swell series from the Open-Meteo marine API, derives the
//! projected wave face and resolves place names through Open-Meteo geocoding.

pub mod client;
pub mod error;
pub mod geocode;
pub mod service;
pub mod types;

pub use client::{MarineClient, OpenMeteoMarineClient, MARINE_API_BASE_URL, MARINE_API_PATH};
pub use error::MarineError;
pub use geocode::{Geocoder, OpenMeteoGeocoder, GEOCODING_API_BASE_URL, GEOCODING_SEARCH_PATH};
pub use service::{calculate_projected_wave_face, OceanicDataService};
pub use types::*;
