//! PostgreSQL-backed stores
//!
//! Expects the `weather_daily`, `locations`, `trials`, `plots` and
//! `plot_observations` tables to exist; provisioning them is not done here.

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use shared::types::{DateRange, GpsCoordinates};
use shared::{DailyWeatherRecord, RawPhenologyValue, TrialContext, WeatherSource};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::{LocationStore, TrialStore, WeatherCacheStore};
use crate::error::AppResult;

/// Stores backed by a Postgres pool
#[derive(Clone)]
pub struct PgStore {
    db: PgPool,
}

/// Cached daily weather row
#[derive(Debug, Clone, FromRow)]
struct WeatherDailyRow {
    location_id: Uuid,
    date: NaiveDate,
    source: String,
    tmax: Option<f64>,
    tmin: Option<f64>,
    tmean: Option<f64>,
    precipitation: Option<f64>,
    humidity: Option<f64>,
    solar_radiation: Option<f64>,
    evapotranspiration: Option<f64>,
    wind_speed_max: Option<f64>,
    dew_point: Option<f64>,
    soil_temperature: Option<f64>,
    soil_moisture: Option<f64>,
}

impl From<WeatherDailyRow> for DailyWeatherRecord {
    fn from(row: WeatherDailyRow) -> Self {
        DailyWeatherRecord {
            location_id: row.location_id,
            date: row.date,
            source: WeatherSource::from(row.source),
            tmax: row.tmax,
            tmin: row.tmin,
            tmean: row.tmean,
            precipitation: row.precipitation,
            humidity: row.humidity,
            solar_radiation: row.solar_radiation,
            evapotranspiration: row.evapotranspiration,
            wind_speed_max: row.wind_speed_max,
            dew_point: row.dew_point,
            soil_temperature: row.soil_temperature,
            soil_moisture: row.soil_moisture,
        }
    }
}

#[derive(Debug, FromRow)]
struct LocationRow {
    latitude: Decimal,
    longitude: Decimal,
}

#[derive(Debug, FromRow)]
struct TrialRow {
    id: Uuid,
    planting_date: NaiveDate,
    location_id: Uuid,
}

#[derive(Debug, FromRow)]
struct ObservationRow {
    plot_id: Uuid,
    value: String,
}

impl PgStore {
    /// Create a new PgStore instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl WeatherCacheStore for PgStore {
    async fn daily_range(&self, location_id: Uuid, range: &DateRange) -> AppResult<Vec<DailyWeatherRecord>> {
        let rows = sqlx::query_as::<_, WeatherDailyRow>(
            r#"
            SELECT location_id, date, source, tmax, tmin, tmean, precipitation, humidity,
                   solar_radiation, evapotranspiration, wind_speed_max, dew_point,
                   soil_temperature, soil_moisture
            FROM weather_daily
            WHERE location_id = $1
              AND date >= $2
              AND date <= $3
            ORDER BY date ASC,
                     CASE source
                         WHEN 'davis' THEN 1
                         WHEN 'ecowitt' THEN 1
                         WHEN 'open-meteo' THEN 2
                         ELSE 3
                     END ASC,
                     written_at DESC
            "#,
        )
        .bind(location_id)
        .bind(range.start)
        .bind(range.end)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(DailyWeatherRecord::from).collect())
    }

    async fn upsert_daily(&self, records: &[DailyWeatherRecord]) -> AppResult<u64> {
        let mut tx = self.db.begin().await?;
        let mut written = 0;

        for record in records {
            let result = sqlx::query(
                r#"
                INSERT INTO weather_daily (
                    location_id, date, source, tmax, tmin, tmean, precipitation, humidity,
                    solar_radiation, evapotranspiration, wind_speed_max, dew_point,
                    soil_temperature, soil_moisture, written_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, NOW())
                ON CONFLICT (location_id, date, source) DO UPDATE SET
                    tmax = EXCLUDED.tmax,
                    tmin = EXCLUDED.tmin,
                    tmean = EXCLUDED.tmean,
                    precipitation = EXCLUDED.precipitation,
                    humidity = EXCLUDED.humidity,
                    solar_radiation = EXCLUDED.solar_radiation,
                    evapotranspiration = EXCLUDED.evapotranspiration,
                    wind_speed_max = EXCLUDED.wind_speed_max,
                    dew_point = EXCLUDED.dew_point,
                    soil_temperature = EXCLUDED.soil_temperature,
                    soil_moisture = EXCLUDED.soil_moisture,
                    written_at = NOW()
                "#,
            )
            .bind(record.location_id)
            .bind(record.date)
            .bind(record.source.as_str())
            .bind(record.tmax)
            .bind(record.tmin)
            .bind(record.tmean)
            .bind(record.precipitation)
            .bind(record.humidity)
            .bind(record.solar_radiation)
            .bind(record.evapotranspiration)
            .bind(record.wind_speed_max)
            .bind(record.dew_point)
            .bind(record.soil_temperature)
            .bind(record.soil_moisture)
            .execute(&mut *tx)
            .await?;

            written += result.rows_affected();
        }

        tx.commit().await?;
        Ok(written)
    }
}

#[async_trait]
impl LocationStore for PgStore {
    async fn coordinates(&self, location_id: Uuid) -> AppResult<Option<GpsCoordinates>> {
        let row = sqlx::query_as::<_, LocationRow>(
            "SELECT latitude, longitude FROM locations WHERE id = $1",
        )
        .bind(location_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(|r| GpsCoordinates::new(r.latitude, r.longitude)))
    }
}

#[async_trait]
impl TrialStore for PgStore {
    async fn trial_context(&self, trial_id: Uuid) -> AppResult<Option<TrialContext>> {
        let row = sqlx::query_as::<_, TrialRow>(
            r#"
            SELECT id, planting_date, location_id
            FROM trials
            WHERE id = $1 AND planting_date IS NOT NULL
            "#,
        )
        .bind(trial_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(|r| TrialContext {
            trial_id: r.id,
            planting_date: r.planting_date,
            location_id: r.location_id,
        }))
    }

    async fn phenology_values(&self, trial_id: Uuid, trait_id: i64) -> AppResult<Vec<RawPhenologyValue>> {
        let rows = sqlx::query_as::<_, ObservationRow>(
            r#"
            SELECT o.plot_id, o.value
            FROM plot_observations o
            JOIN plots p ON p.id = o.plot_id
            WHERE p.trial_id = $1
              AND o.trait_id = $2
              AND o.value IS NOT NULL
            ORDER BY p.plot_number ASC, o.recorded_at DESC
            "#,
        )
        .bind(trial_id)
        .bind(trait_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| RawPhenologyValue::new(r.plot_id, r.value))
            .collect())
    }
}
