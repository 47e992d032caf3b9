//! Weather provider integrations
//!
//! Each provider converts its own payload into [`DailyWeatherRecord`]s. The
//! orchestrator only sees the [`WeatherProvider`] capability, so adding a
//! provider means implementing the trait and placing it in the chain.

pub mod aggregate;
pub mod davis;
pub mod ecowitt;
pub mod open_meteo;
pub mod signing;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use shared::types::{DateRange, Location};
use shared::{DailyWeatherRecord, WeatherSource};

pub use davis::DavisClient;
pub use ecowitt::EcowittClient;
pub use open_meteo::OpenMeteoClient;

use crate::config::ProvidersConfig;
use crate::error::{AppError, AppResult};

/// A source of normalized daily weather
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    /// Tag written on every record this provider produces
    fn source(&self) -> WeatherSource;

    /// Whether the credentials this provider needs are present
    fn is_configured(&self) -> bool;

    /// Fetch and normalize daily records for the range.
    ///
    /// An empty vector means the provider has no data for the range.
    async fn fetch(&self, location: &Location, range: &DateRange) -> AppResult<Vec<DailyWeatherRecord>>;
}

/// HTTP client shared by every provider
pub fn build_http_client(timeout_secs: u64) -> AppResult<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .user_agent(concat!("agroweather/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| AppError::Configuration(format!("Failed to build HTTP client: {}", e)))
}

/// Providers in priority order: Davis, Ecowitt, then Open-Meteo
pub fn provider_chain(config: &ProvidersConfig) -> AppResult<Vec<Arc<dyn WeatherProvider>>> {
    let client = build_http_client(config.timeout_secs)?;

    Ok(vec![
        Arc::new(DavisClient::new(client.clone(), &config.davis)),
        Arc::new(EcowittClient::new(client.clone(), &config.ecowitt)),
        Arc::new(OpenMeteoClient::new(client, config.open_meteo.base_url.clone())),
    ])
}
