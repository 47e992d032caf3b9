//! Configuration management for the agroweather backend
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (development.toml, production.toml)
//! 3. Environment variable overrides with AGW_ prefix

use config::{ConfigError, Environment, File};
use rust_decimal::Decimal;
use serde::Deserialize;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Weather provider credentials and endpoints
    pub providers: ProvidersConfig,

    /// Weather cache behavior
    pub cache: CacheConfig,

    /// Fallbacks applied by callers
    pub defaults: DefaultsConfig,

    /// Trait ids and policies for phenology aggregation
    pub phenology: PhenologyConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProvidersConfig {
    /// Timeout for a single provider call, in seconds
    pub timeout_secs: u64,

    pub davis: DavisConfig,

    pub ecowitt: EcowittConfig,

    pub open_meteo: OpenMeteoConfig,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct DavisConfig {
    /// WeatherLink v2 API key
    pub api_key: Option<String>,

    /// WeatherLink v2 API secret, used for request signatures
    pub api_secret: Option<String>,

    /// WeatherLink station id
    pub station_id: Option<String>,

    pub base_url: String,
}

impl DavisConfig {
    pub fn is_configured(&self) -> bool {
        [&self.api_key, &self.api_secret, &self.station_id]
            .iter()
            .all(|v| v.as_deref().is_some_and(|s| !s.trim().is_empty()))
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct EcowittConfig {
    pub application_key: Option<String>,

    pub api_key: Option<String>,

    /// Gateway MAC address
    pub mac: Option<String>,

    pub base_url: String,
}

impl EcowittConfig {
    pub fn is_configured(&self) -> bool {
        [&self.application_key, &self.api_key, &self.mac]
            .iter()
            .all(|v| v.as_deref().is_some_and(|s| !s.trim().is_empty()))
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct OpenMeteoConfig {
    /// Historical archive endpoint
    pub base_url: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct CacheConfig {
    /// Require one cached record per day before skipping providers
    pub strict_coverage: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DefaultsConfig {
    /// Latitude used when a location has no stored coordinates
    pub latitude: Decimal,

    /// Longitude used when a location has no stored coordinates
    pub longitude: Decimal,

    /// GDD base temperature, °C
    pub base_temp: f64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PhenologyConfig {
    /// Trait holding recorded maturity
    pub maturity_trait_id: i64,

    /// Trait holding recorded emergence, if the trial records it
    pub emergence_trait_id: Option<i64>,

    /// Emergence offset assumed when a plot has no usable emergence
    pub fallback_emergence_offset: Option<i64>,
    /// Largest plausible day offset from planting; later values are excluded
    pub max_offset_days: i64,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment = std::env::var("AGW_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("providers.timeout_secs", 30)?
            .set_default("providers.davis.base_url", "https://api.weatherlink.com/v2")?
            .set_default("providers.ecowitt.base_url", "https://api.ecowitt.net/api/v3")?
            .set_default(
                "providers.open_meteo.base_url",
                "https://archive-api.open-meteo.com/v1",
            )?
            .set_default("cache.strict_coverage", false)?
            .set_default("defaults.latitude", "40.0")?
            .set_default("defaults.longitude", "-88.0")?
            .set_default("defaults.base_temp", 10.0)?
            .set_default("phenology.maturity_trait_id", 1)?
            .set_default("phenology.max_offset_days", shared::MAX_SEASON_DAYS)?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (AGW_ prefix)
            .add_source(
                Environment::with_prefix("AGW")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_davis_needs_every_credential() {
        let mut davis = DavisConfig {
            api_key: Some("key".into()),
            api_secret: Some("secret".into()),
            station_id: None,
            base_url: String::new(),
        };
        assert!(!davis.is_configured());
        davis.station_id = Some("  ".into());
        assert!(!davis.is_configured());
        davis.station_id = Some("12345".into());
        assert!(davis.is_configured());
    }

    #[test]
    fn test_ecowitt_unconfigured_by_default() {
        assert!(!EcowittConfig::default().is_configured());
    }
}
