//! Oceanic data aggregation.
//!
//! One request for a location turns into five upstream calls: the four series
//! plus a dedicated timestamp fetch. They share no state, so they run
//! concurrently and the result is the same as issuing them one after another.

use chrono::NaiveDateTime;
use tracing::instrument;

use crate::client::MarineClient;
use crate::error::MarineError;
use crate::types::{Location, OceanicSeries, SeriesName, SeriesValue};

/// Coordinates used for the timestamp fetch, whatever location was asked for.
///
/// Hourly timestamps are calendar based, so any ocean point yields the same
/// grid.
pub const TIMESTAMP_REFERENCE_LATITUDE: &str = "0";
pub const TIMESTAMP_REFERENCE_LONGITUDE: &str = "0";

/// Projected wave face: `wave_height[i] - swell_wave_height[i]`.
///
/// A missing value on either side gives a missing result at that index.
/// An empty side (series absent from the response) gives an empty projection.
/// Two populated sequences of different length are rejected rather than
/// truncated.
pub fn calculate_projected_wave_face(
    wave_height: &[SeriesValue],
    swell_wave_height: &[SeriesValue],
) -> Result<Vec<SeriesValue>, MarineError> {
    if wave_height.is_empty() || swell_wave_height.is_empty() {
        return Ok(Vec::new());
    }

    if wave_height.len() != swell_wave_height.len() {
        return Err(MarineError::SeriesLengthMismatch {
            wave_height: wave_height.len(),
            swell_wave_height: swell_wave_height.len(),
        });
    }

    Ok(wave_height
        .iter()
        .zip(swell_wave_height)
        .map(|(wave, swell)| match (wave, swell) {
            (Some(wave), Some(swell)) => Some(wave - swell),
            _ => None,
        })
        .collect())
}

/// Builds [`OceanicSeries`] from an injected [`MarineClient`].
#[derive(Debug, Clone)]
pub struct OceanicDataService<C> {
    client: C,
}

impl<C: MarineClient> OceanicDataService<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Fetch every series for `location` and derive the projected wave face.
    ///
    /// Fails without a partial result when any upstream call fails, when the
    /// wave height or timestamps are missing, or when wave and swell heights
    /// disagree in length. Missing period/swell series become empty.
    #[instrument(skip(self, location), fields(latitude = location.latitude(), longitude = location.longitude()))]
    pub async fn get_oceanic_data(&self, location: &Location) -> Result<OceanicSeries, MarineError> {
        let (wave_height, wave_period, swell_wave_height, swell_wave_period, time) = tokio::try_join!(
            self.required_series(location, SeriesName::WaveHeight),
            self.optional_series(location, SeriesName::WavePeriod),
            self.optional_series(location, SeriesName::SwellWaveHeight),
            self.optional_series(location, SeriesName::SwellWavePeriod),
            self.timestamps(),
        )?;

        let projected_wave_face = calculate_projected_wave_face(&wave_height, &swell_wave_height)?;

        if time.len() != wave_height.len() {
            tracing::warn!(
                "Timestamp count {} differs from wave height count {}",
                time.len(),
                wave_height.len()
            );
        }

        tracing::debug!("Aggregated {} hourly values", wave_height.len());

        Ok(OceanicSeries {
            time,
            wave_height,
            wave_period,
            swell_wave_height,
            swell_wave_period,
            projected_wave_face,
        })
    }

    /// A series the aggregation cannot do without.
    async fn required_series(
        &self,
        location: &Location,
        series: SeriesName,
    ) -> Result<Vec<SeriesValue>, MarineError> {
        self.fetch(location, series)
            .await?
            .ok_or_else(|| MarineError::upstream(series.as_str(), "series missing from response"))
    }

    /// A series that degrades to empty when the response does not carry it.
    async fn optional_series(
        &self,
        location: &Location,
        series: SeriesName,
    ) -> Result<Vec<SeriesValue>, MarineError> {
        let values = self.fetch(location, series).await?;
        if values.is_none() {
            tracing::debug!("{} missing from response, using empty series", series);
        }
        Ok(values.unwrap_or_default())
    }

    async fn fetch(
        &self,
        location: &Location,
        series: SeriesName,
    ) -> Result<Option<Vec<SeriesValue>>, MarineError> {
        let envelope = self
            .client
            .fetch_series(location.latitude(), location.longitude(), series)
            .await?;

        Ok(envelope.hourly.and_then(|mut hourly| hourly.take_series(series)))
    }

    async fn timestamps(&self) -> Result<Vec<NaiveDateTime>, MarineError> {
        let envelope = self
            .client
            .fetch_series(
                TIMESTAMP_REFERENCE_LATITUDE,
                TIMESTAMP_REFERENCE_LONGITUDE,
                SeriesName::WaveHeight,
            )
            .await
            .map_err(|e| match e {
                MarineError::UpstreamFetch { reason, .. } => MarineError::upstream("time", reason),
                other => other,
            })?;

        envelope
            .hourly
            .and_then(|hourly| hourly.time)
            .ok_or_else(|| MarineError::upstream("time", "timestamps missing from response"))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use crate::types::{HourlyData, UpstreamEnvelope};
    use chrono::Duration;
    use rust_decimal::Decimal;
    use std::collections::HashMap;
    use std::sync::Mutex;

    enum Canned {
        Envelope(UpstreamEnvelope),
        Fail(&'static str),
    }

    /// In-memory client: one canned answer per series, every call recorded.
    struct FakeMarineClient {
        responses: HashMap<SeriesName, Canned>,
        timestamp_response: Option<Canned>,
        calls: Mutex<Vec<(String, String, SeriesName)>>,
    }

    impl FakeMarineClient {
        fn new() -> Self {
            Self {
                responses: HashMap::new(),
                timestamp_response: None,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn respond(mut self, series: SeriesName, hourly: HourlyData) -> Self {
            self.responses
                .insert(series, Canned::Envelope(UpstreamEnvelope::with_hourly(hourly)));
            self
        }

        fn respond_raw(mut self, series: SeriesName, envelope: UpstreamEnvelope) -> Self {
            self.responses.insert(series, Canned::Envelope(envelope));
            self
        }

        fn fail(mut self, series: SeriesName, reason: &'static str) -> Self {
            self.responses.insert(series, Canned::Fail(reason));
            self
        }

        fn timestamps(mut self, hourly: HourlyData) -> Self {
            self.timestamp_response = Some(Canned::Envelope(UpstreamEnvelope::with_hourly(hourly)));
            self
        }

        fn fail_timestamps(mut self, reason: &'static str) -> Self {
            self.timestamp_response = Some(Canned::Fail(reason));
            self
        }

        fn calls(&self) -> Vec<(String, String, SeriesName)> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl MarineClient for FakeMarineClient {
        async fn fetch_series(
            &self,
            latitude: &str,
            longitude: &str,
            series: SeriesName,
        ) -> Result<UpstreamEnvelope, MarineError> {
            self.calls
                .lock()
                .unwrap()
                .push((latitude.to_string(), longitude.to_string(), series));

            let is_timestamp_call = latitude == TIMESTAMP_REFERENCE_LATITUDE
                && longitude == TIMESTAMP_REFERENCE_LONGITUDE;
            let canned = if is_timestamp_call {
                self.timestamp_response.as_ref()
            } else {
                self.responses.get(&series)
            };

            match canned {
                Some(Canned::Envelope(envelope)) => Ok(envelope.clone()),
                Some(Canned::Fail(reason)) => Err(MarineError::upstream(series.as_str(), reason)),
                None => Err(MarineError::upstream(series.as_str(), "Empty response")),
            }
        }
    }

    fn values(raw: &[i64]) -> Vec<SeriesValue> {
        raw.iter().map(|v| Some(Decimal::new(*v, 2))).collect()
    }

    /// Twenty deterministic hourly values starting at `seed` hundredths.
    fn twenty(seed: i64) -> Vec<SeriesValue> {
        values(&(0..20).map(|i| seed + i * 7).collect::<Vec<_>>())
    }

    fn twenty_timestamps() -> Vec<NaiveDateTime> {
        let start = crate::types::hourly_time::parse("2024-06-01T00:00").unwrap();
        (0..20).map(|i| start + Duration::hours(3 * i)).collect()
    }

    fn full_client() -> FakeMarineClient {
        FakeMarineClient::new()
            .respond(
                SeriesName::WaveHeight,
                HourlyData::default().with_series(SeriesName::WaveHeight, twenty(150)),
            )
            .respond(
                SeriesName::WavePeriod,
                HourlyData::default().with_series(SeriesName::WavePeriod, twenty(900)),
            )
            .respond(
                SeriesName::SwellWaveHeight,
                HourlyData::default().with_series(SeriesName::SwellWaveHeight, twenty(110)),
            )
            .respond(
                SeriesName::SwellWavePeriod,
                HourlyData::default().with_series(SeriesName::SwellWavePeriod, twenty(1200)),
            )
            .timestamps(
                HourlyData::default()
                    .with_time(twenty_timestamps())
                    .with_series(SeriesName::WaveHeight, twenty(0)),
            )
    }

    fn muizenberg() -> Location {
        Location::new("-33.7972", "18.4620").unwrap()
    }

    #[test]
    fn test_projection_is_elementwise_difference() {
        let wave = values(&[150, 210, 95]);
        let swell = values(&[110, 60, 95]);

        let projected = calculate_projected_wave_face(&wave, &swell).unwrap();

        assert_eq!(projected, values(&[40, 150, 0]));
        for i in 0..wave.len() {
            assert_eq!(projected[i], Some(wave[i].unwrap() - swell[i].unwrap()));
        }
    }

    #[test]
    fn test_projection_is_exact_decimal() {
        let wave = vec![Some(Decimal::new(12, 1))];
        let swell = vec![Some(Decimal::new(8, 1))];
        let projected = calculate_projected_wave_face(&wave, &swell).unwrap();
        assert_eq!(projected[0].unwrap().to_string(), "0.4");
    }

    #[test]
    fn test_projection_can_be_negative() {
        let projected = calculate_projected_wave_face(&values(&[50]), &values(&[80])).unwrap();
        assert_eq!(projected, values(&[-30]));
    }

    #[test]
    fn test_projection_propagates_missing_values() {
        let wave = vec![Some(Decimal::ONE), None, Some(Decimal::TWO)];
        let swell = vec![None, Some(Decimal::ONE), Some(Decimal::ONE)];
        let projected = calculate_projected_wave_face(&wave, &swell).unwrap();
        assert_eq!(projected, vec![None, None, Some(Decimal::ONE)]);
    }

    #[test]
    fn test_projection_rejects_length_mismatch() {
        let result = calculate_projected_wave_face(&values(&[1, 2, 3]), &values(&[1, 2]));
        assert!(matches!(
            result,
            Err(MarineError::SeriesLengthMismatch {
                wave_height: 3,
                swell_wave_height: 2
            })
        ));
    }

    #[test]
    fn test_projection_of_empty_series() {
        assert!(calculate_projected_wave_face(&[], &[]).unwrap().is_empty());
        assert!(calculate_projected_wave_face(&values(&[150, 160]), &[])
            .unwrap()
            .is_empty());
        assert!(calculate_projected_wave_face(&[], &values(&[110]))
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_full_aggregation() {
        let service = OceanicDataService::new(full_client());

        let result = service.get_oceanic_data(&muizenberg()).await.unwrap();

        assert_eq!(result.time.len(), 20);
        assert_eq!(result.wave_height.len(), 20);
        assert_eq!(result.wave_period.len(), 20);
        assert_eq!(result.swell_wave_height.len(), 20);
        assert_eq!(result.swell_wave_period.len(), 20);
        assert_eq!(result.projected_wave_face.len(), 20);
        assert_eq!(
            result.projected_wave_face[0],
            Some(result.wave_height[0].unwrap() - result.swell_wave_height[0].unwrap())
        );
        assert_eq!(result.wave_period, twenty(900));
        assert_eq!(result.time, twenty_timestamps());
    }

    #[tokio::test]
    async fn test_each_series_requested_once_at_location() {
        let service = OceanicDataService::new(full_client());
        service.get_oceanic_data(&muizenberg()).await.unwrap();

        let calls = service.client().calls();
        assert_eq!(calls.len(), 5);
        for series in SeriesName::ALL {
            let at_location = calls
                .iter()
                .filter(|(lat, lon, s)| lat == "-33.7972" && lon == "18.4620" && *s == series)
                .count();
            assert_eq!(at_location, 1, "{} should be fetched once", series);
        }
    }

    // Known quirk: timestamps always come from a wave_height fetch at 0,0.
    #[tokio::test]
    async fn test_timestamps_fetched_at_reference_coordinates() {
        let service = OceanicDataService::new(full_client());
        service.get_oceanic_data(&muizenberg()).await.unwrap();

        let calls = service.client().calls();
        assert!(calls.contains(&("0".to_string(), "0".to_string(), SeriesName::WaveHeight)));
    }

    #[tokio::test]
    async fn test_missing_optional_series_become_empty() {
        let client = full_client()
            .respond(SeriesName::WavePeriod, HourlyData::default())
            .respond_raw(SeriesName::SwellWavePeriod, UpstreamEnvelope::default());
        let service = OceanicDataService::new(client);

        let result = service.get_oceanic_data(&muizenberg()).await.unwrap();

        assert!(result.wave_period.is_empty());
        assert!(result.swell_wave_period.is_empty());
        assert_eq!(result.wave_height.len(), 20);
        assert_eq!(result.swell_wave_height.len(), 20);
        assert_eq!(result.projected_wave_face.len(), 20);
        assert_eq!(result.time.len(), 20);
    }

    #[tokio::test]
    async fn test_missing_swell_wave_period_only() {
        let client = full_client().respond(SeriesName::SwellWavePeriod, HourlyData::default());
        let service = OceanicDataService::new(client);

        let result = service.get_oceanic_data(&muizenberg()).await.unwrap();

        assert!(result.swell_wave_period.is_empty());
        assert_eq!(result.wave_period, twenty(900));
        assert_eq!(result.swell_wave_height, twenty(110));
        assert_eq!(result.wave_height, twenty(150));
    }

    #[tokio::test]
    async fn test_wave_height_transport_error_fails_aggregation() {
        let client = full_client().fail(SeriesName::WaveHeight, "Connection failed: refused");
        let service = OceanicDataService::new(client);

        let result = service.get_oceanic_data(&muizenberg()).await;

        match result {
            Err(MarineError::UpstreamFetch { series, reason }) => {
                assert_eq!(series, "wave_height");
                assert!(reason.contains("refused"));
            }
            other => panic!("expected UpstreamFetch, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_wave_height_field_fails_aggregation() {
        let client = full_client().respond(SeriesName::WaveHeight, HourlyData::default());
        let service = OceanicDataService::new(client);

        let result = service.get_oceanic_data(&muizenberg()).await;

        assert!(matches!(
            result,
            Err(MarineError::UpstreamFetch { ref series, .. }) if series == "wave_height"
        ));
    }

    #[tokio::test]
    async fn test_optional_series_transport_error_is_fatal() {
        let client = full_client().fail(SeriesName::WavePeriod, "Request timed out");
        let service = OceanicDataService::new(client);

        assert!(service.get_oceanic_data(&muizenberg()).await.is_err());
    }

    #[tokio::test]
    async fn test_timestamp_failure_fails_aggregation() {
        let client = full_client().fail_timestamps("Request timed out");
        let service = OceanicDataService::new(client);

        let result = service.get_oceanic_data(&muizenberg()).await;

        assert!(matches!(
            result,
            Err(MarineError::UpstreamFetch { ref series, .. }) if series == "time"
        ));
    }

    #[tokio::test]
    async fn test_missing_timestamps_fail_aggregation() {
        let client = full_client().timestamps(HourlyData::default());
        let service = OceanicDataService::new(client);

        assert!(matches!(
            service.get_oceanic_data(&muizenberg()).await,
            Err(MarineError::UpstreamFetch { .. })
        ));
    }

    #[tokio::test]
    async fn test_missing_swell_height_gives_empty_projection() {
        let client = full_client().respond(SeriesName::SwellWaveHeight, HourlyData::default());
        let service = OceanicDataService::new(client);

        let result = service.get_oceanic_data(&muizenberg()).await.unwrap();

        assert!(result.swell_wave_height.is_empty());
        assert!(result.projected_wave_face.is_empty());
        assert_eq!(result.wave_height, twenty(150));
        assert_eq!(result.wave_period, twenty(900));
        assert_eq!(result.swell_wave_period, twenty(1200));
        assert_eq!(result.time.len(), 20);
    }

    #[tokio::test]
    async fn test_swell_height_of_different_length_fails_aggregation() {
        let client = full_client().respond(
            SeriesName::SwellWaveHeight,
            HourlyData::default().with_series(SeriesName::SwellWaveHeight, values(&[110, 120])),
        );
        let service = OceanicDataService::new(client);

        assert!(matches!(
            service.get_oceanic_data(&muizenberg()).await,
            Err(MarineError::SeriesLengthMismatch {
                wave_height: 20,
                swell_wave_height: 2
            })
        ));
    }

    #[tokio::test]
    async fn test_aggregation_is_idempotent() {
        let service = OceanicDataService::new(full_client());

        let first = service.get_oceanic_data(&muizenberg()).await.unwrap();
        let second = service.get_oceanic_data(&muizenberg()).await.unwrap();

        assert_eq!(
            serde_json::to_vec(&first).unwrap(),
            serde_json::to_vec(&second).unwrap()
        );
    }
}
