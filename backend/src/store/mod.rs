//! Storage collaborators
//!
//! The core reads and writes through these traits only. [`PgStore`] backs them
//! with PostgreSQL; [`MemoryStore`] keeps everything in process.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use shared::types::{DateRange, GpsCoordinates};
use shared::{DailyWeatherRecord, RawPhenologyValue, TrialContext};
use uuid::Uuid;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::error::AppResult;

/// Persistent daily weather cache keyed on (location, date, source)
#[async_trait]
pub trait WeatherCacheStore: Send + Sync {
    /// Every stored row in the range, ordered by date, then source priority
    /// rank, then most recently written first
    async fn daily_range(&self, location_id: Uuid, range: &DateRange) -> AppResult<Vec<DailyWeatherRecord>>;

    /// Insert or overwrite rows; returns how many were written
    async fn upsert_daily(&self, records: &[DailyWeatherRecord]) -> AppResult<u64>;
}

/// Geolocation lookup for field locations
#[async_trait]
pub trait LocationStore: Send + Sync {
    async fn coordinates(&self, location_id: Uuid) -> AppResult<Option<GpsCoordinates>>;
}

/// Read access to trial metadata and recorded plot traits
#[async_trait]
pub trait TrialStore: Send + Sync {
    async fn trial_context(&self, trial_id: Uuid) -> AppResult<Option<TrialContext>>;

    /// Raw recorded values of one trait for every plot in the trial
    async fn phenology_values(&self, trial_id: Uuid, trait_id: i64) -> AppResult<Vec<RawPhenologyValue>>;
}
