//! In-process stores
//!
//! Used by the job binary's dry runs and by tests. Rows carry a write
//! sequence number so the "most recently written wins" ordering of the
//! Postgres store is reproduced exactly.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::NaiveDate;
use shared::types::{DateRange, GpsCoordinates};
use shared::{DailyWeatherRecord, RawPhenologyValue, TrialContext};
use uuid::Uuid;

use super::{LocationStore, TrialStore, WeatherCacheStore};
use crate::error::{AppError, AppResult};

type CacheKey = (Uuid, NaiveDate, String);

#[derive(Default)]
struct Inner {
    weather: HashMap<CacheKey, (u64, DailyWeatherRecord)>,
    next_seq: u64,
    locations: HashMap<Uuid, GpsCoordinates>,
    trials: HashMap<Uuid, TrialContext>,
    /// (trial, trait) → observations in insertion order
    observations: HashMap<(Uuid, i64), Vec<RawPhenologyValue>>,
}

/// Every store trait over one shared in-memory state
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

fn poisoned() -> AppError {
    AppError::Internal("In-memory store lock poisoned".to_string())
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_location(&self, location_id: Uuid, coordinates: GpsCoordinates) -> AppResult<()> {
        let mut inner = self.inner.write().map_err(|_| poisoned())?;
        inner.locations.insert(location_id, coordinates);
        Ok(())
    }

    pub fn insert_trial(&self, context: TrialContext) -> AppResult<()> {
        let mut inner = self.inner.write().map_err(|_| poisoned())?;
        inner.trials.insert(context.trial_id, context);
        Ok(())
    }

    pub fn insert_observation(&self, trial_id: Uuid, trait_id: i64, value: RawPhenologyValue) -> AppResult<()> {
        let mut inner = self.inner.write().map_err(|_| poisoned())?;
        inner
            .observations
            .entry((trial_id, trait_id))
            .or_default()
            .push(value);
        Ok(())
    }

    /// Number of cached rows across all locations and sources
    pub fn cached_rows(&self) -> usize {
        self.inner.read().map(|inner| inner.weather.len()).unwrap_or(0)
    }
}

#[async_trait]
impl WeatherCacheStore for MemoryStore {
    async fn daily_range(&self, location_id: Uuid, range: &DateRange) -> AppResult<Vec<DailyWeatherRecord>> {
        let inner = self.inner.read().map_err(|_| poisoned())?;

        let mut rows: Vec<&(u64, DailyWeatherRecord)> = inner
            .weather
            .iter()
            .filter(|((loc, date, _), _)| *loc == location_id && range.contains(*date))
            .map(|(_, row)| row)
            .collect();

        rows.sort_by(|(seq_a, a), (seq_b, b)| {
            a.date
                .cmp(&b.date)
                .then(a.source.priority_rank().cmp(&b.source.priority_rank()))
                .then(seq_b.cmp(seq_a))
        });

        Ok(rows.into_iter().map(|(_, record)| record.clone()).collect())
    }

    async fn upsert_daily(&self, records: &[DailyWeatherRecord]) -> AppResult<u64> {
        let mut inner = self.inner.write().map_err(|_| poisoned())?;

        for record in records {
            let seq = inner.next_seq;
            inner.next_seq += 1;
            let key = (record.location_id, record.date, record.source.as_str().to_string());
            inner.weather.insert(key, (seq, record.clone()));
        }

        Ok(records.len() as u64)
    }
}

#[async_trait]
impl LocationStore for MemoryStore {
    async fn coordinates(&self, location_id: Uuid) -> AppResult<Option<GpsCoordinates>> {
        let inner = self.inner.read().map_err(|_| poisoned())?;
        Ok(inner.locations.get(&location_id).copied())
    }
}

#[async_trait]
impl TrialStore for MemoryStore {
    async fn trial_context(&self, trial_id: Uuid) -> AppResult<Option<TrialContext>> {
        let inner = self.inner.read().map_err(|_| poisoned())?;
        Ok(inner.trials.get(&trial_id).cloned())
    }

    async fn phenology_values(&self, trial_id: Uuid, trait_id: i64) -> AppResult<Vec<RawPhenologyValue>> {
        let inner = self.inner.read().map_err(|_| poisoned())?;
        Ok(inner
            .observations
            .get(&(trial_id, trait_id))
            .cloned()
            .unwrap_or_default())
    }
}
