//! Open-Meteo marine API client.
//!
//! See <https://open-meteo.com/en/docs/marine-weather-api>. Every call asks for a
//! single hourly series; there are no retries and no caching.

use std::future::Future;
use std::time::Duration;

use reqwest::{header, Client};
use serde::Deserialize;
use swell_core::{NetworkError, ReqwestErrorExt};
use tracing::instrument;
use url::Url;

use crate::error::MarineError;
use crate::types::{SeriesName, UpstreamEnvelope};

pub const MARINE_API_BASE_URL: &str = "https://marine-api.open-meteo.com";
pub const MARINE_API_PATH: &str = "/v1/marine";

const USER_AGENT: &str = concat!("swell-server/", env!("CARGO_PKG_VERSION"));

/// Source of upstream marine envelopes.
///
/// The aggregator only depends on this trait, so tests can hand it canned
/// envelopes instead of talking to Open-Meteo.
pub trait MarineClient: Send + Sync {
    /// Fetch one hourly series for the given coordinates.
    fn fetch_series(
        &self,
        latitude: &str,
        longitude: &str,
        series: SeriesName,
    ) -> impl Future<Output = Result<UpstreamEnvelope, MarineError>> + Send;
}

/// Body Open-Meteo sends with 4xx responses.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    reason: String,
}

#[derive(Debug, Clone)]
pub struct OpenMeteoMarineClient {
    client: Client,
    base_url: Url,
}

impl OpenMeteoMarineClient {
    pub fn new(timeout: Duration) -> Result<Self, MarineError> {
        Self::with_base_url(MARINE_API_BASE_URL, timeout)
    }

    /// Point the client at another host (a mock server in tests).
    pub fn with_base_url(base_url: &str, timeout: Duration) -> Result<Self, MarineError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            base_url: Url::parse(base_url)?,
        })
    }

    /// `<base>/v1/marine?latitude=..&longitude=..&hourly=..`
    pub fn request_url(
        &self,
        latitude: &str,
        longitude: &str,
        series: SeriesName,
    ) -> Result<Url, MarineError> {
        let mut url = self.base_url.join(MARINE_API_PATH)?;
        url.query_pairs_mut()
            .append_pair("latitude", latitude)
            .append_pair("longitude", longitude)
            .append_pair("hourly", series.as_str());
        Ok(url)
    }
}

impl MarineClient for OpenMeteoMarineClient {
    #[instrument(skip(self), level = "debug")]
    async fn fetch_series(
        &self,
        latitude: &str,
        longitude: &str,
        series: SeriesName,
    ) -> Result<UpstreamEnvelope, MarineError> {
        if latitude.trim().is_empty() || longitude.trim().is_empty() {
            return Err(MarineError::InvalidLocation(format!(
                "latitude and longitude are required to fetch {}",
                series
            )));
        }

        let url = self.request_url(latitude, longitude, series)?;

        let response = self
            .client
            .get(url)
            .header(header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| {
                let err = e.into_network_error();
                tracing::warn!("Marine request for {} failed: {}", series, err);
                MarineError::upstream(series.as_str(), err)
            })?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| MarineError::upstream(series.as_str(), e.into_network_error()))?;

        if !status.is_success() {
            let message = serde_json::from_slice::<ApiErrorBody>(&body)
                .map(|b| b.reason)
                .unwrap_or_else(|_| String::from_utf8_lossy(&body).into_owned());
            tracing::warn!("Marine API returned {} for {}: {}", status, series, message);
            return Err(MarineError::upstream(
                series.as_str(),
                NetworkError::ServerError {
                    status: status.as_u16(),
                    message,
                },
            ));
        }

        if body.is_empty() {
            return Err(MarineError::upstream(
                series.as_str(),
                NetworkError::EmptyResponse,
            ));
        }

        serde_json::from_slice(&body).map_err(|e| {
            MarineError::upstream(
                series.as_str(),
                NetworkError::InvalidResponse(format!("JSON parse error: {}", e)),
            )
        })
    }
}
