use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::MarineError;

pub const MUIZENBERG_NAME: &str = "Muizenberg";
pub const MUIZENBERG_LATITUDE: &str = "-33.7972";
pub const MUIZENBERG_LONGITUDE: &str = "18.4620";

/// One hourly value from the upstream API. `None` where the API reported `null`.
pub type SeriesValue = Option<Decimal>;

/// Geographic location.
///
/// Coordinates stay as the caller wrote them; they go verbatim into the
/// upstream query string and are never parsed into floats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Location {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    latitude: String,
    longitude: String,
}

impl Location {
    /// Build a location from decimal-string coordinates.
    ///
    /// Only emptiness is checked; numeric range is left to the upstream API.
    pub fn new(latitude: impl Into<String>, longitude: impl Into<String>) -> Result<Self, MarineError> {
        let latitude = latitude.into();
        let longitude = longitude.into();

        if latitude.trim().is_empty() {
            return Err(MarineError::InvalidLocation("latitude is empty".into()));
        }
        if longitude.trim().is_empty() {
            return Err(MarineError::InvalidLocation("longitude is empty".into()));
        }

        Ok(Self {
            name: None,
            latitude,
            longitude,
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// The fixed smoke-test spot behind `/surf/muizenberg`.
    pub fn muizenberg() -> Self {
        Self {
            name: Some(MUIZENBERG_NAME.to_string()),
            latitude: MUIZENBERG_LATITUDE.to_string(),
            longitude: MUIZENBERG_LONGITUDE.to_string(),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn latitude(&self) -> &str {
        &self.latitude
    }

    pub fn longitude(&self) -> &str {
        &self.longitude
    }
}

/// Hourly series the marine API can be asked for via `hourly=<name>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesName {
    WaveHeight,
    WavePeriod,
    SwellWaveHeight,
    SwellWavePeriod,
}

impl SeriesName {
    pub const ALL: [SeriesName; 4] = [
        SeriesName::WaveHeight,
        SeriesName::WavePeriod,
        SeriesName::SwellWaveHeight,
        SeriesName::SwellWavePeriod,
    ];

    /// Name used in the `hourly` query parameter and as the JSON field name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WaveHeight => "wave_height",
            Self::WavePeriod => "wave_period",
            Self::SwellWaveHeight => "swell_wave_height",
            Self::SwellWavePeriod => "swell_wave_period",
        }
    }
}

impl std::fmt::Display for SeriesName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SeriesName {
    type Err = MarineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|series| series.as_str() == s)
            .ok_or_else(|| MarineError::UnknownSeries(s.to_string()))
    }
}

/// The `hourly` object of an upstream response.
///
/// Only the series named in the request is present, so every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HourlyData {
    #[serde(
        default,
        with = "hourly_time::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub time: Option<Vec<NaiveDateTime>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wave_height: Option<Vec<SeriesValue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wave_period: Option<Vec<SeriesValue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub swell_wave_height: Option<Vec<SeriesValue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub swell_wave_period: Option<Vec<SeriesValue>>,
}

impl HourlyData {
    pub fn with_time(mut self, time: Vec<NaiveDateTime>) -> Self {
        self.time = Some(time);
        self
    }

    pub fn with_series(mut self, series: SeriesName, values: Vec<SeriesValue>) -> Self {
        *self.slot(series) = Some(values);
        self
    }

    pub fn series(&self, series: SeriesName) -> Option<&[SeriesValue]> {
        match series {
            SeriesName::WaveHeight => self.wave_height.as_deref(),
            SeriesName::WavePeriod => self.wave_period.as_deref(),
            SeriesName::SwellWaveHeight => self.swell_wave_height.as_deref(),
            SeriesName::SwellWavePeriod => self.swell_wave_period.as_deref(),
        }
    }

    /// Move the requested series out, leaving `None` behind.
    pub fn take_series(&mut self, series: SeriesName) -> Option<Vec<SeriesValue>> {
        self.slot(series).take()
    }

    fn slot(&mut self, series: SeriesName) -> &mut Option<Vec<SeriesValue>> {
        match series {
            SeriesName::WaveHeight => &mut self.wave_height,
            SeriesName::WavePeriod => &mut self.wave_period,
            SeriesName::SwellWaveHeight => &mut self.swell_wave_height,
            SeriesName::SwellWavePeriod => &mut self.swell_wave_period,
        }
    }
}

/// Full upstream response for one `/v1/marine` request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpstreamEnvelope {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub generationtime_ms: Option<f64>,
    pub utc_offset_seconds: Option<i64>,
    pub timezone: Option<String>,
    pub timezone_abbreviation: Option<String>,
    pub elevation: Option<f64>,
    pub hourly: Option<HourlyData>,
}

impl UpstreamEnvelope {
    pub fn with_hourly(hourly: HourlyData) -> Self {
        Self {
            hourly: Some(hourly),
            ..Self::default()
        }
    }
}

/// Aggregated response for one location.
///
/// All six sequences are index-aligned: position `i` refers to `time[i]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OceanicSeries {
    #[serde(with = "hourly_time")]
    pub time: Vec<NaiveDateTime>,
    pub wave_height: Vec<SeriesValue>,
    pub wave_period: Vec<SeriesValue>,
    pub swell_wave_height: Vec<SeriesValue>,
    pub swell_wave_period: Vec<SeriesValue>,
    pub projected_wave_face: Vec<SeriesValue>,
}

/// Open-Meteo hourly timestamps: local ISO 8601 without seconds, e.g. `2024-06-01T13:00`.
pub mod hourly_time {
    use chrono::NaiveDateTime;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%Y-%m-%dT%H:%M";
    const FORMAT_WITH_SECONDS: &str = "%Y-%m-%dT%H:%M:%S";

    pub fn parse(raw: &str) -> Result<NaiveDateTime, chrono::ParseError> {
        NaiveDateTime::parse_from_str(raw, FORMAT)
            .or_else(|_| NaiveDateTime::parse_from_str(raw, FORMAT_WITH_SECONDS))
    }

    pub fn serialize<S: Serializer>(
        times: &[NaiveDateTime],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(times.iter().map(|t| t.format(FORMAT).to_string()))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<NaiveDateTime>, D::Error> {
        Vec::<String>::deserialize(deserializer)?
            .iter()
            .map(|raw| parse(raw).map_err(de::Error::custom))
            .collect()
    }

    pub mod option {
        use chrono::NaiveDateTime;
        use serde::{de, Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            times: &Option<Vec<NaiveDateTime>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match times {
                Some(times) => super::serialize(times, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<Vec<NaiveDateTime>>, D::Error> {
            Option::<Vec<String>>::deserialize(deserializer)?
                .map(|raw| {
                    raw.iter()
                        .map(|r| super::parse(r).map_err(de::Error::custom))
                        .collect()
                })
                .transpose()
        }
    }
}
