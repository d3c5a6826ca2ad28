//! Forward geocoding: turn a place name into candidate coordinates.
//! Uses the Open-Meteo geocoding API - free, no API key required.

use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use swell_core::ReqwestErrorExt;
use url::Url;

use crate::error::MarineError;
use crate::types::Location;

pub const GEOCODING_API_BASE_URL: &str = "https://geocoding-api.open-meteo.com";
pub const GEOCODING_SEARCH_PATH: &str = "/v1/search";

const USER_AGENT: &str = concat!("swell-server/", env!("CARGO_PKG_VERSION"));

pub trait Geocoder: Send + Sync {
    /// Candidate locations matching `name`, best match first.
    fn search(&self, name: &str) -> impl Future<Output = Result<Vec<Location>, MarineError>> + Send;
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    name: String,
    latitude: f64,
    longitude: f64,
    admin1: Option<String>,
    country: Option<String>,
}

impl SearchResult {
    /// "Muizenberg, Western Cape, South Africa", skipping empty or repeated parts
    fn display_name(&self) -> String {
        let mut parts: Vec<&str> = vec![self.name.as_str()];
        for part in [self.admin1.as_deref(), self.country.as_deref()]
            .into_iter()
            .flatten()
        {
            if !part.is_empty() && !parts.contains(&part) {
                parts.push(part);
            }
        }
        parts.join(", ")
    }

    fn into_location(self) -> Result<Location, MarineError> {
        let name = self.display_name();
        Ok(Location::new(self.latitude.to_string(), self.longitude.to_string())?.with_name(name))
    }
}

#[derive(Debug, Clone)]
pub struct OpenMeteoGeocoder {
    client: Client,
    base_url: Url,
    max_results: u8,
}

impl OpenMeteoGeocoder {
    pub fn new(timeout: Duration, max_results: u8) -> Result<Self, MarineError> {
        Self::with_base_url(GEOCODING_API_BASE_URL, timeout, max_results)
    }

    pub fn with_base_url(
        base_url: &str,
        timeout: Duration,
        max_results: u8,
    ) -> Result<Self, MarineError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            base_url: Url::parse(base_url)?,
            max_results,
        })
    }
}

impl Geocoder for OpenMeteoGeocoder {
    async fn search(&self, name: &str) -> Result<Vec<Location>, MarineError> {
        let name = name.trim();
        if name.is_empty() {
            return Ok(Vec::new());
        }

        let mut url = self.base_url.join(GEOCODING_SEARCH_PATH)?;
        url.query_pairs_mut()
            .append_pair("name", name)
            .append_pair("count", &self.max_results.to_string())
            .append_pair("format", "json");

        let response = self.client.get(url).send().await.map_err(|e| {
            tracing::debug!("Geocoding request failed: {}", e);
            MarineError::Geocoding(e.into_network_error().to_string())
        })?;

        if !response.status().is_success() {
            let status = response.status();
            tracing::debug!("Geocoding returned status {}", status);
            return Err(MarineError::Geocoding(format!("status {}", status)));
        }

        let body: SearchResponse = response.json().await.map_err(|e| {
            tracing::debug!("Geocoding parse error: {}", e);
            MarineError::Geocoding(format!("parse error: {}", e))
        })?;

        let locations = body
            .results
            .into_iter()
            .map(SearchResult::into_location)
            .collect::<Result<Vec<_>, _>>()?;

        tracing::info!("Geocoded '{}' to {} candidate(s)", name, locations.len());
        Ok(locations)
    }
}
