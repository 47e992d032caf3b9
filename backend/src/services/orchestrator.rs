//! Weather acquisition across the cache and the provider chain

use std::sync::Arc;

use serde::Serialize;
use shared::types::{DateRange, Location};
use shared::{DailyWeatherRecord, WeatherOrigin};

use super::cache::WeatherCache;
use crate::error::{AppError, AppResult};
use crate::external::WeatherProvider;

/// Records for a range and where they came from
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedWeather {
    pub records: Vec<DailyWeatherRecord>,
    pub origin: WeatherOrigin,
}

/// Cache first, then each configured provider in order until one has data
#[derive(Clone)]
pub struct SourceOrchestrator {
    cache: WeatherCache,
    providers: Vec<Arc<dyn WeatherProvider>>,
    strict_coverage: bool,
}

impl SourceOrchestrator {
    pub fn new(cache: WeatherCache, providers: Vec<Arc<dyn WeatherProvider>>, strict_coverage: bool) -> Self {
        Self {
            cache,
            providers,
            strict_coverage,
        }
    }

    fn is_cache_hit(&self, cached: &[DailyWeatherRecord], range: &DateRange) -> bool {
        if cached.is_empty() {
            return false;
        }
        !self.strict_coverage || cached.len() as i64 >= range.num_days()
    }

    /// Resolve daily weather for the location over the range.
    ///
    /// Fails with `ProviderUnavailable` only when the last configured
    /// provider errors, and with `NoWeatherData` when every provider
    /// answered with nothing.
    pub async fn resolve(&self, location: &Location, range: &DateRange) -> AppResult<ResolvedWeather> {
        let cached = self.cache.read(location.id, range).await;
        if self.is_cache_hit(&cached, range) {
            tracing::debug!(
                "Cache hit for location {}: {} of {} days",
                location.id,
                cached.len(),
                range.num_days()
            );
            return Ok(ResolvedWeather {
                records: cached,
                origin: WeatherOrigin::Cache,
            });
        }
        tracing::debug!(
            "Cache miss for location {} ({} of {} days cached)",
            location.id,
            cached.len(),
            range.num_days()
        );

        let configured: Vec<&Arc<dyn WeatherProvider>> =
            self.providers.iter().filter(|p| p.is_configured()).collect();
        if configured.is_empty() {
            return Err(AppError::Configuration("No weather provider is configured".to_string()));
        }
        let last = configured.len() - 1;

        for (i, provider) in configured.into_iter().enumerate() {
            let source = provider.source();
            tracing::debug!("Fetching {} to {} from {}", range.start, range.end, source);

            match provider.fetch(location, range).await {
                Ok(mut records) => {
                    records.retain(|r| range.contains(r.date));
                    if records.is_empty() {
                        tracing::debug!("{} returned no data, trying next provider", source);
                        continue;
                    }
                    records.sort_by_key(|r| r.date);

                    self.cache.write(location.id, &source, &records).await;
                    tracing::info!(
                        "Resolved {} days for location {} from {}",
                        records.len(),
                        location.id,
                        source
                    );
                    return Ok(ResolvedWeather {
                        records,
                        origin: WeatherOrigin::Provider(source),
                    });
                }
                Err(e) if i == last => {
                    tracing::error!("Terminal weather provider {} failed: {}", source, e);
                    return Err(AppError::ProviderUnavailable {
                        provider: source.to_string(),
                        message: e.to_string(),
                    });
                }
                Err(e) => {
                    tracing::warn!("Weather provider {} failed, trying next: {}", source, e);
                }
            }
        }

        tracing::info!(
            "No provider had weather for location {} ({} to {})",
            location.id,
            range.start,
            range.end
        );
        Err(AppError::NoWeatherData)
    }
}
