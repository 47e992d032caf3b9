//! Stub collaborators shared by the integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use shared::types::{DateRange, Location};
use shared::{DailyWeatherRecord, WeatherSource};
use uuid::Uuid;

use agroweather_backend::error::{AppError, AppResult};
use agroweather_backend::external::WeatherProvider;
use agroweather_backend::store::WeatherCacheStore;

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

pub fn range(start: &str, end: &str) -> DateRange {
    DateRange::new(date(start), date(end)).unwrap()
}

enum Behavior {
    Constant { tmax: f64, tmin: f64, rain: f64 },
    Empty,
    Fail,
}

/// Provider that answers every range the same way and counts its calls
pub struct StubProvider {
    source: WeatherSource,
    configured: bool,
    behavior: Behavior,
    calls: AtomicUsize,
}

impl StubProvider {
    /// Same temperatures and rainfall on every day of the range
    pub fn constant(source: WeatherSource, tmax: f64, tmin: f64, rain: f64) -> Arc<Self> {
        Self::build(source, true, Behavior::Constant { tmax, tmin, rain })
    }

    pub fn empty(source: WeatherSource) -> Arc<Self> {
        Self::build(source, true, Behavior::Empty)
    }

    pub fn failing(source: WeatherSource) -> Arc<Self> {
        Self::build(source, true, Behavior::Fail)
    }

    /// Missing credentials; must never be called
    pub fn unconfigured(source: WeatherSource) -> Arc<Self> {
        Self::build(source, false, Behavior::Fail)
    }

    fn build(source: WeatherSource, configured: bool, behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            source,
            configured,
            behavior,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WeatherProvider for StubProvider {
    fn source(&self) -> WeatherSource {
        self.source.clone()
    }

    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn fetch(&self, location: &Location, range: &DateRange) -> AppResult<Vec<DailyWeatherRecord>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.behavior {
            Behavior::Constant { tmax, tmin, rain } => Ok(range
                .days()
                .map(|day| {
                    DailyWeatherRecord::new(location.id, day, self.source.clone())
                        .with_temperatures(Some(tmax), Some(tmin))
                        .with_precipitation(Some(rain))
                })
                .collect()),
            Behavior::Empty => Ok(Vec::new()),
            Behavior::Fail => Err(AppError::ExternalService(format!("{} is down", self.source))),
        }
    }
}

/// Cache store whose every call fails
pub struct BrokenStore;

#[async_trait]
impl WeatherCacheStore for BrokenStore {
    async fn daily_range(&self, _location_id: Uuid, _range: &DateRange) -> AppResult<Vec<DailyWeatherRecord>> {
        Err(AppError::Internal("connection refused".to_string()))
    }

    async fn upsert_daily(&self, _records: &[DailyWeatherRecord]) -> AppResult<u64> {
        Err(AppError::Internal("connection refused".to_string()))
    }
}

pub fn chain(providers: &[&Arc<StubProvider>]) -> Vec<Arc<dyn WeatherProvider>> {
    providers
        .iter()
        .map(|p| Arc::clone(*p) as Arc<dyn WeatherProvider>)
        .collect()
}
