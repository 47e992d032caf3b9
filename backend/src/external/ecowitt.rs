//! Ecowitt cloud history client
//!
//! The history endpoint returns each measurement as a map of unix timestamp to
//! string value. Metric units are requested explicitly and a range is fetched
//! one day at a time at 30-minute resolution, then reduced to daily values.

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use shared::types::{DateRange, Location};
use shared::{DailyWeatherRecord, WeatherSource};
use uuid::Uuid;

use super::aggregate::Samples;
use super::WeatherProvider;
use crate::config::EcowittConfig;
use crate::error::{AppError, AppResult};

const CALL_BACK: &str = "outdoor,rainfall,solar_and_uvi,wind,soil_ch1";

/// Unit ids: ℃, mm, m/s, W/m²
const UNIT_PARAMS: &str = "temp_unitid=1&rainfall_unitid=12&wind_speed_unitid=6&solar_irradiance_unitid=16";

#[derive(Clone)]
struct Credentials {
    application_key: String,
    api_key: String,
    mac: String,
}

/// Ecowitt history client
#[derive(Clone)]
pub struct EcowittClient {
    client: Client,
    base_url: String,
    credentials: Option<Credentials>,
}

/// Response envelope; `data` is an empty array when nothing was recorded
#[derive(Debug, Deserialize)]
pub(crate) struct HistoryResponse {
    code: i64,
    #[serde(default)]
    msg: String,
    #[serde(default)]
    data: Value,
}

/// Collect every sample of the series at `path`
fn series(data: &Value, path: &[&str]) -> Samples {
    let mut samples = Samples::default();
    let list = path
        .iter()
        .try_fold(data, |node, key| node.get(key))
        .and_then(|node| node.get("list"))
        .and_then(Value::as_object);

    if let Some(list) = list {
        for value in list.values() {
            let parsed = match value {
                Value::String(s) => s.trim().parse::<f64>().ok(),
                Value::Number(n) => n.as_f64(),
                _ => None,
            };
            samples.push(parsed);
        }
    }
    samples
}

impl EcowittClient {
    pub fn new(client: Client, config: &EcowittConfig) -> Self {
        let credentials = if config.is_configured() {
            Some(Credentials {
                application_key: config.application_key.clone().unwrap_or_default(),
                api_key: config.api_key.clone().unwrap_or_default(),
                mac: config.mac.clone().unwrap_or_default(),
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

    fn history_url(&self, credentials: &Credentials, day: NaiveDate) -> String {
        format!(
            "{}/device/history?application_key={}&api_key={}&mac={}&start_date={}%2000:00:00&end_date={}%2023:59:59&cycle_type=30min&call_back={}&{}",
            self.base_url,
            credentials.application_key,
            credentials.api_key,
            credentials.mac,
            day,
            day,
            CALL_BACK,
            UNIT_PARAMS
        )
    }

    async fn fetch_day(
        &self,
        credentials: &Credentials,
        location_id: Uuid,
        day: NaiveDate,
    ) -> AppResult<Option<DailyWeatherRecord>> {
        let url = self.history_url(credentials, day);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::ExternalService(format!("Ecowitt request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalService(format!(
                "Ecowitt error: {} - {}",
                status, body
            )));
        }

        let data: HistoryResponse = response.json().await.map_err(|e| {
            AppError::ExternalService(format!("Failed to parse Ecowitt response: {}", e))
        })?;

        Self::normalize_day(location_id, day, &data)
    }

    /// Reduce one day of history into a record
    pub(crate) fn normalize_day(
        location_id: Uuid,
        day: NaiveDate,
        response: &HistoryResponse,
    ) -> AppResult<Option<DailyWeatherRecord>> {
        if response.code != 0 {
            return Err(AppError::ExternalService(format!(
                "Ecowitt error code {}: {}",
                response.code, response.msg
            )));
        }
        let data = &response.data;
        let temperature = series(data, &["outdoor", "temperature"]);

        let mut record = DailyWeatherRecord::new(location_id, day, WeatherSource::Ecowitt);
        record.tmax = temperature.max();
        record.tmin = temperature.min();
        record.tmean = temperature.mean();
        record.humidity = series(data, &["outdoor", "humidity"]).mean();
        record.dew_point = series(data, &["outdoor", "dew_point"]).mean();
        // Daily rainfall is a running total that resets at midnight
        record.precipitation = series(data, &["rainfall", "daily"]).max();
        record.solar_radiation = series(data, &["solar_and_uvi", "solar"]).mean();
        record.wind_speed_max = series(data, &["wind", "wind_speed"]).max();
        record.soil_moisture = series(data, &["soil_ch1", "soilmoisture"])
            .mean()
            .map(|percent| percent / 100.0);

        Ok((!record.is_blank()).then_some(record))
    }
}

#[async_trait]
impl WeatherProvider for EcowittClient {
    fn source(&self) -> WeatherSource {
        WeatherSource::Ecowitt
    }

    fn is_configured(&self) -> bool {
        self.credentials.is_some()
    }

    async fn fetch(&self, location: &Location, range: &DateRange) -> AppResult<Vec<DailyWeatherRecord>> {
        let credentials = self
            .credentials
            .as_ref()
            .ok_or_else(|| AppError::Configuration("Ecowitt credentials not configured".to_string()))?;

        let mut records = Vec::new();
        for day in range.days() {
            if let Some(record) = self.fetch_day(credentials, location.id, day).await? {
                records.push(record);
            }
        }

        tracing::debug!(
            "Ecowitt gateway {} returned {} of {} days",
            credentials.mac,
            records.len(),
            range.num_days()
        );

        Ok(records)
    }
}
