//! Marine-specific error types.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MarineError {
    /// An upstream call failed outright or produced nothing usable.
    #[error("Failed to fetch {series}: {reason}")]
    UpstreamFetch { series: String, reason: String },

    #[error(
        "Series length mismatch: wave_height has {wave_height} values, swell_wave_height has {swell_wave_height}"
    )]
    SeriesLengthMismatch {
        wave_height: usize,
        swell_wave_height: usize,
    },

    #[error("Invalid location: {0}")]
    InvalidLocation(String),

    #[error("Unknown hourly series: {0}")]
    UnknownSeries(String),

    #[error("Location search failed: {0}")]
    Geocoding(String),

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl MarineError {
    pub fn upstream(series: impl Into<String>, reason: impl ToString) -> Self {
        Self::UpstreamFetch {
            series: series.into(),
            reason: reason.to_string(),
        }
    }

    /// User-friendly error message for API responses.
    pub fn user_message(&self) -> String {
        match self {
            Self::UpstreamFetch { series, .. } => {
                format!("Marine weather data for {} is unavailable right now", series)
            }
            Self::SeriesLengthMismatch { .. } => {
                "Marine weather service returned inconsistent data".to_string()
            }
            Self::InvalidLocation(msg) => format!("Invalid location: {}", msg),
            Self::UnknownSeries(name) => format!("Unknown hourly series: {}", name),
            Self::Geocoding(_) => "Location search is unavailable right now".to_string(),
            Self::Client(_) | Self::InvalidUrl(_) => "Internal configuration error".to_string(),
        }
    }

    /// Whether the failure was caused by an upstream service rather than the caller.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            Self::UpstreamFetch { .. } | Self::SeriesLengthMismatch { .. } | Self::Geocoding(_)
        )
    }
}
