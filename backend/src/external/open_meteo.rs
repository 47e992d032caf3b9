//! Open-Meteo historical archive client
//!
//! Gridded reanalysis data, available for any coordinate without credentials.
//! This is the terminal provider of the fallback chain.

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use shared::types::{DateRange, Location};
use shared::{DailyWeatherRecord, WeatherSource};
use uuid::Uuid;

use super::WeatherProvider;
use crate::error::{AppError, AppResult};

/// Daily variables requested from the archive
const DAILY_VARIABLES: &str = "temperature_2m_max,temperature_2m_min,temperature_2m_mean,\
precipitation_sum,relative_humidity_2m_mean,shortwave_radiation_sum,\
et0_fao_evapotranspiration,wind_speed_10m_max,dew_point_2m_mean,\
soil_temperature_0_to_7cm_mean,soil_moisture_0_to_7cm_mean";

/// MJ/m² per day to mean W/m²
const MJ_PER_DAY_TO_WATTS: f64 = 1_000_000.0 / 86_400.0;

/// Open-Meteo archive client
#[derive(Clone)]
pub struct OpenMeteoClient {
    client: Client,
    base_url: String,
}

/// Archive response
#[derive(Debug, Deserialize)]
pub(crate) struct ArchiveResponse {
    #[serde(default)]
    daily: Option<ArchiveDaily>,
}

#[derive(Debug, Default, Deserialize)]
struct ArchiveDaily {
    #[serde(default)]
    time: Vec<String>,
    #[serde(default)]
    temperature_2m_max: Vec<Option<f64>>,
    #[serde(default)]
    temperature_2m_min: Vec<Option<f64>>,
    #[serde(default)]
    temperature_2m_mean: Vec<Option<f64>>,
    #[serde(default)]
    precipitation_sum: Vec<Option<f64>>,
    #[serde(default)]
    relative_humidity_2m_mean: Vec<Option<f64>>,
    #[serde(default)]
    shortwave_radiation_sum: Vec<Option<f64>>,
    #[serde(default)]
    et0_fao_evapotranspiration: Vec<Option<f64>>,
    #[serde(default)]
    wind_speed_10m_max: Vec<Option<f64>>,
    #[serde(default)]
    dew_point_2m_mean: Vec<Option<f64>>,
    #[serde(default)]
    soil_temperature_0_to_7cm_mean: Vec<Option<f64>>,
    #[serde(default)]
    soil_moisture_0_to_7cm_mean: Vec<Option<f64>>,
}

/// Error body returned with 4xx responses
#[derive(Debug, Deserialize)]
struct ArchiveError {
    reason: String,
}

fn at(series: &[Option<f64>], i: usize) -> Option<f64> {
    series.get(i).copied().flatten()
}

impl OpenMeteoClient {
    pub fn new(client: Client, base_url: String) -> Self {
        Self { client, base_url }
    }

    fn archive_url(&self, location: &Location, range: &DateRange) -> String {
        format!(
            "{}/archive?latitude={}&longitude={}&start_date={}&end_date={}&daily={}&wind_speed_unit=ms&timezone=auto",
            self.base_url,
            location.coordinates.latitude,
            location.coordinates.longitude,
            range.start,
            range.end,
            DAILY_VARIABLES
        )
    }

    /// Convert the archive's parallel arrays into one record per day.
    ///
    /// Days where every variable is null (not yet published) are dropped.
    pub(crate) fn normalize(
        location_id: Uuid,
        response: ArchiveResponse,
    ) -> AppResult<Vec<DailyWeatherRecord>> {
        let daily = response.daily.unwrap_or_default();
        let mut records = Vec::with_capacity(daily.time.len());

        for (i, day) in daily.time.iter().enumerate() {
            let date = NaiveDate::parse_from_str(day, "%Y-%m-%d").map_err(|e| {
                AppError::ExternalService(format!("Open-Meteo returned invalid date {}: {}", day, e))
            })?;

            let mut record = DailyWeatherRecord::new(location_id, date, WeatherSource::OpenMeteo);
            record.tmax = at(&daily.temperature_2m_max, i);
            record.tmin = at(&daily.temperature_2m_min, i);
            record.tmean = at(&daily.temperature_2m_mean, i);
            record.precipitation = at(&daily.precipitation_sum, i);
            record.humidity = at(&daily.relative_humidity_2m_mean, i);
            record.solar_radiation = at(&daily.shortwave_radiation_sum, i).map(|mj| mj * MJ_PER_DAY_TO_WATTS);
            record.evapotranspiration = at(&daily.et0_fao_evapotranspiration, i);
            record.wind_speed_max = at(&daily.wind_speed_10m_max, i);
            record.dew_point = at(&daily.dew_point_2m_mean, i);
            record.soil_temperature = at(&daily.soil_temperature_0_to_7cm_mean, i);
            record.soil_moisture = at(&daily.soil_moisture_0_to_7cm_mean, i);

            if !record.is_blank() {
                records.push(record);
            }
        }

        Ok(records)
    }
}

#[async_trait]
impl WeatherProvider for OpenMeteoClient {
    fn source(&self) -> WeatherSource {
        WeatherSource::OpenMeteo
    }

    fn is_configured(&self) -> bool {
        true
    }

    async fn fetch(&self, location: &Location, range: &DateRange) -> AppResult<Vec<DailyWeatherRecord>> {
        let url = self.archive_url(location, range);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::ExternalService(format!("Open-Meteo request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let reason = serde_json::from_str::<ArchiveError>(&body)
                .map(|e| e.reason)
                .unwrap_or(body);
            return Err(AppError::ExternalService(format!(
                "Open-Meteo error: {} - {}",
                status, reason
            )));
        }

        let data: ArchiveResponse = response.json().await.map_err(|e| {
            AppError::ExternalService(format!("Failed to parse Open-Meteo response: {}", e))
        })?;

        Self::normalize(location.id, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalizes_parallel_arrays_and_drops_blank_days() {
        let json = r#"{
            "latitude": 40.0, "longitude": -88.0,
            "daily": {
                "time": ["2024-05-01", "2024-05-02", "2024-05-03"],
                "temperature_2m_max": [24.1, 19.5, null],
                "temperature_2m_min": [12.3, null, null],
                "precipitation_sum": [0.0, 7.2, null],
                "shortwave_radiation_sum": [21.6, null, null]
            }
        }"#;
        let response: ArchiveResponse = serde_json::from_str(json).unwrap();
        let location = Uuid::new_v4();

        let records = OpenMeteoClient::normalize(location, response).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].tmax, Some(24.1));
        assert_eq!(records[0].tmin, Some(12.3));
        assert!((records[0].solar_radiation.unwrap() - 250.0).abs() < 1e-9);
        assert_eq!(records[1].tmin, None);
        assert_eq!(records[1].precipitation, Some(7.2));
        assert_eq!(records[1].humidity, None);
        assert!(records.iter().all(|r| r.source == WeatherSource::OpenMeteo && r.location_id == location));
    }

    #[test]
    fn test_missing_daily_block_is_empty() {
        let response: ArchiveResponse = serde_json::from_str("{}").unwrap();
        assert!(OpenMeteoClient::normalize(Uuid::nil(), response).unwrap().is_empty());
    }
}
