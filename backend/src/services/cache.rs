//! Source-prioritized daily weather cache
//!
//! Neither operation ever fails its caller: a store error is logged and the
//! cache behaves as if it were empty.

use std::sync::Arc;

use shared::types::DateRange;
use shared::{merge_by_priority, DailyWeatherRecord, WeatherSource};
use uuid::Uuid;

use crate::store::WeatherCacheStore;

/// Weather cache over a [`WeatherCacheStore`]
#[derive(Clone)]
pub struct WeatherCache {
    store: Arc<dyn WeatherCacheStore>,
}

impl WeatherCache {
    pub fn new(store: Arc<dyn WeatherCacheStore>) -> Self {
        Self { store }
    }

    /// One record per cached date, taken from the highest-priority source
    pub async fn read(&self, location_id: Uuid, range: &DateRange) -> Vec<DailyWeatherRecord> {
        match self.store.daily_range(location_id, range).await {
            Ok(rows) => merge_by_priority(rows),
            Err(e) => {
                tracing::warn!(
                    "Weather cache read failed for location {} ({} to {}): {}",
                    location_id,
                    range.start,
                    range.end,
                    e
                );
                Vec::new()
            }
        }
    }

    /// Upsert records under `location_id` and `source`; returns rows persisted.
    ///
    /// Rows of other sources for the same days are left untouched.
    pub async fn write(&self, location_id: Uuid, source: &WeatherSource, records: &[DailyWeatherRecord]) -> u64 {
        if records.is_empty() {
            return 0;
        }

        let rows: Vec<DailyWeatherRecord> = records
            .iter()
            .cloned()
            .map(|mut record| {
                record.location_id = location_id;
                record.source = source.clone();
                record
            })
            .collect();

        match self.store.upsert_daily(&rows).await {
            Ok(written) => {
                tracing::debug!("Cached {} {} records for location {}", written, source, location_id);
                written
            }
            Err(e) => {
                tracing::warn!(
                    "Weather cache write failed for location {} ({} records from {}): {}",
                    location_id,
                    rows.len(),
                    source,
                    e
                );
                0
            }
        }
    }
}
