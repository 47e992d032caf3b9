//! Davis WeatherLink v2 client
//!
//! Historic data is served in windows of at most 24 hours, so a range is
//! fetched one day at a time and the archive intervals of every sensor are
//! reduced into a single daily record. WeatherLink reports imperial units.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use reqwest::Client;
use serde::Deserialize;
use shared::types::{DateRange, Location};
use shared::{DailyWeatherRecord, WeatherSource};
use uuid::Uuid;

use super::aggregate::{fahrenheit_to_celsius, inches_to_mm, mph_to_mps, Samples};
use super::signing::weatherlink_signature;
use super::WeatherProvider;
use crate::config::DavisConfig;
use crate::error::{AppError, AppResult};

/// WeatherLink credentials; all three are required
#[derive(Clone)]
struct Credentials {
    api_key: String,
    api_secret: String,
    station_id: String,
}

/// WeatherLink historic data client
#[derive(Clone)]
pub struct DavisClient {
    client: Client,
    base_url: String,
    credentials: Option<Credentials>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct HistoricResponse {
    #[serde(default)]
    sensors: Vec<Sensor>,
}

#[derive(Debug, Deserialize)]
struct Sensor {
    #[serde(default)]
    data: Vec<ArchiveInterval>,
}

/// One archive interval; fields present depend on the sensor type
#[derive(Debug, Default, Deserialize)]
struct ArchiveInterval {
    temp_hi: Option<f64>,
    temp_lo: Option<f64>,
    temp_avg: Option<f64>,
    hum_last: Option<f64>,
    dew_point_last: Option<f64>,
    rainfall_mm: Option<f64>,
    solar_rad_avg: Option<f64>,
    et: Option<f64>,
    wind_speed_hi: Option<f64>,
    temp_last_1: Option<f64>,
}

impl DavisClient {
    pub fn new(client: Client, config: &DavisConfig) -> Self {
        let credentials = if config.is_configured() {
            Some(Credentials {
                api_key: config.api_key.clone().unwrap_or_default(),
                api_secret: config.api_secret.clone().unwrap_or_default(),
                station_id: config.station_id.clone().unwrap_or_default(),
            })
        } else {
            None
        };
        Self {
            client,
            base_url: config.base_url.clone(),
            credentials,
        }
    }

    fn historic_url(&self, credentials: &Credentials, day: NaiveDate) -> AppResult<String> {
        let start = day
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| AppError::Internal(format!("Invalid day {}", day)))?
            .and_utc()
            .timestamp();
        let end = start + 86_400;

        let params = [
            ("api-key", credentials.api_key.clone()),
            ("end-timestamp", end.to_string()),
            ("start-timestamp", start.to_string()),
            ("station-id", credentials.station_id.clone()),
            ("t", Utc::now().timestamp().to_string()),
        ];
        let signature = weatherlink_signature(&credentials.api_secret, &params)?;

        // station-id travels in the path, the rest as query parameters
        let query: Vec<String> = params
            .iter()
            .filter(|(name, _)| *name != "station-id")
            .map(|(name, value)| format!("{}={}", name, value))
            .collect();

        Ok(format!(
            "{}/historic/{}?{}&api-signature={}",
            self.base_url,
            credentials.station_id,
            query.join("&"),
            signature
        ))
    }

    async fn fetch_day(
        &self,
        credentials: &Credentials,
        location_id: Uuid,
        day: NaiveDate,
    ) -> AppResult<Option<DailyWeatherRecord>> {
        let url = self.historic_url(credentials, day)?;

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::ExternalService(format!("WeatherLink request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalService(format!(
                "WeatherLink error: {} - {}",
                status, body
            )));
        }

        let data: HistoricResponse = response.json().await.map_err(|e| {
            AppError::ExternalService(format!("Failed to parse WeatherLink response: {}", e))
        })?;

        Ok(Self::normalize_day(location_id, day, &data))
    }

    /// Reduce every sensor's archive intervals for one day into a record
    pub(crate) fn normalize_day(
        location_id: Uuid,
        day: NaiveDate,
        response: &HistoricResponse,
    ) -> Option<DailyWeatherRecord> {
        let mut temp_hi = Samples::default();
        let mut temp_lo = Samples::default();
        let mut temp_avg = Samples::default();
        let mut humidity = Samples::default();
        let mut dew_point = Samples::default();
        let mut rainfall = Samples::default();
        let mut solar = Samples::default();
        let mut et = Samples::default();
        let mut wind = Samples::default();
        let mut soil_temp = Samples::default();

        for interval in response.sensors.iter().flat_map(|s| s.data.iter()) {
            temp_hi.push(interval.temp_hi.map(fahrenheit_to_celsius));
            temp_lo.push(interval.temp_lo.map(fahrenheit_to_celsius));
            temp_avg.push(interval.temp_avg.map(fahrenheit_to_celsius));
            humidity.push(interval.hum_last);
            dew_point.push(interval.dew_point_last.map(fahrenheit_to_celsius));
            rainfall.push(interval.rainfall_mm);
            solar.push(interval.solar_rad_avg);
            et.push(interval.et.map(inches_to_mm));
            wind.push(interval.wind_speed_hi.map(mph_to_mps));
            soil_temp.push(interval.temp_last_1.map(fahrenheit_to_celsius));
        }

        let mut record = DailyWeatherRecord::new(location_id, day, WeatherSource::Davis);
        record.tmax = temp_hi.max();
        record.tmin = temp_lo.min();
        record.tmean = temp_avg.mean();
        record.precipitation = rainfall.sum();
        record.humidity = humidity.mean();
        record.solar_radiation = solar.mean();
        record.evapotranspiration = et.sum();
        record.wind_speed_max = wind.max();
        record.dew_point = dew_point.mean();
        record.soil_temperature = soil_temp.mean();

        (!record.is_blank()).then_some(record)
    }
}

#[async_trait]
impl WeatherProvider for DavisClient {
    fn source(&self) -> WeatherSource {
        WeatherSource::Davis
    }

    fn is_configured(&self) -> bool {
        self.credentials.is_some()
    }

    async fn fetch(&self, location: &Location, range: &DateRange) -> AppResult<Vec<DailyWeatherRecord>> {
        let credentials = self
            .credentials
            .as_ref()
            .ok_or_else(|| AppError::Configuration("WeatherLink credentials not configured".to_string()))?;

        let mut records = Vec::new();
        for day in range.days() {
            if let Some(record) = self.fetch_day(credentials, location.id, day).await? {
                records.push(record);
            }
        }

        tracing::debug!(
            "WeatherLink station {} returned {} of {} days",
            credentials.station_id,
            records.len(),
            range.num_days()
        );

        Ok(records)
    }
}
