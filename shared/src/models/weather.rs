//! Weather data models

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Provider that produced a daily record
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum WeatherSource {
    Davis,
    Ecowitt,
    OpenMeteo,
    /// Any other tag found in the cache (manual imports, retired providers)
    Other(String),
}

impl WeatherSource {
    pub fn as_str(&self) -> &str {
        match self {
            WeatherSource::Davis => "davis",
            WeatherSource::Ecowitt => "ecowitt",
            WeatherSource::OpenMeteo => "open-meteo",
            WeatherSource::Other(tag) => tag,
        }
    }

    /// Read-time priority rank; lower wins.
    ///
    /// On-site stations outrank the reanalysis grid, which outranks anything else.
    pub fn priority_rank(&self) -> u8 {
        match self {
            WeatherSource::Davis | WeatherSource::Ecowitt => 1,
            WeatherSource::OpenMeteo => 2,
            WeatherSource::Other(_) => 3,
        }
    }
}

impl From<&str> for WeatherSource {
    fn from(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "davis" => WeatherSource::Davis,
            "ecowitt" => WeatherSource::Ecowitt,
            "open-meteo" | "open_meteo" | "openmeteo" => WeatherSource::OpenMeteo,
            _ => WeatherSource::Other(tag.to_string()),
        }
    }
}

impl From<String> for WeatherSource {
    fn from(tag: String) -> Self {
        WeatherSource::from(tag.as_str())
    }
}

impl From<WeatherSource> for String {
    fn from(source: WeatherSource) -> Self {
        source.as_str().to_string()
    }
}

impl std::fmt::Display for WeatherSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where the records for a resolved range came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum WeatherOrigin {
    Cache,
    Provider(WeatherSource),
}

impl From<String> for WeatherOrigin {
    fn from(tag: String) -> Self {
        if tag == "cache" {
            WeatherOrigin::Cache
        } else {
            WeatherOrigin::Provider(WeatherSource::from(tag))
        }
    }
}

impl From<WeatherOrigin> for String {
    fn from(origin: WeatherOrigin) -> Self {
        origin.to_string()
    }
}

impl std::fmt::Display for WeatherOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WeatherOrigin::Cache => write!(f, "cache"),
            WeatherOrigin::Provider(source) => write!(f, "{}", source),
        }
    }
}

/// Normalized daily weather record, the shape every provider converts into.
///
/// Every measurement is optional: `None` means the provider did not report it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyWeatherRecord {
    pub location_id: Uuid,
    pub date: NaiveDate,
    pub source: WeatherSource,
    /// Maximum air temperature, °C
    pub tmax: Option<f64>,
    /// Minimum air temperature, °C
    pub tmin: Option<f64>,
    /// Mean air temperature, °C
    pub tmean: Option<f64>,
    /// Precipitation total, mm
    pub precipitation: Option<f64>,
    /// Mean relative humidity, %
    pub humidity: Option<f64>,
    /// Mean solar radiation, W/m²
    pub solar_radiation: Option<f64>,
    /// Reference evapotranspiration, mm
    pub evapotranspiration: Option<f64>,
    /// Maximum wind speed, m/s
    pub wind_speed_max: Option<f64>,
    /// Mean dew point, °C
    pub dew_point: Option<f64>,
    /// Mean soil temperature, °C
    pub soil_temperature: Option<f64>,
    /// Mean volumetric soil moisture, m³/m³
    pub soil_moisture: Option<f64>,
}

impl DailyWeatherRecord {
    /// An empty record for a day; providers fill in what they measured
    pub fn new(location_id: Uuid, date: NaiveDate, source: WeatherSource) -> Self {
        Self {
            location_id,
            date,
            source,
            tmax: None,
            tmin: None,
            tmean: None,
            precipitation: None,
            humidity: None,
            solar_radiation: None,
            evapotranspiration: None,
            wind_speed_max: None,
            dew_point: None,
            soil_temperature: None,
            soil_moisture: None,
        }
    }

    pub fn with_temperatures(mut self, tmax: Option<f64>, tmin: Option<f64>) -> Self {
        self.tmax = tmax;
        self.tmin = tmin;
        self
    }

    pub fn with_precipitation(mut self, precipitation: Option<f64>) -> Self {
        self.precipitation = precipitation;
        self
    }

    /// True when no measured field is present
    pub fn is_blank(&self) -> bool {
        [
            self.tmax,
            self.tmin,
            self.tmean,
            self.precipitation,
            self.humidity,
            self.solar_radiation,
            self.evapotranspiration,
            self.wind_speed_max,
            self.dew_point,
            self.soil_temperature,
            self.soil_moisture,
        ]
        .iter()
        .all(Option::is_none)
    }
}

/// Pick one whole record per date, preferring the highest-priority source.
///
/// Records for the same date and rank keep their input order, so the first one
/// wins. Stores hand rows over newest-first within a rank, which makes the most
/// recently written row the winner. Fields are never combined across rows.
pub fn merge_by_priority(mut records: Vec<DailyWeatherRecord>) -> Vec<DailyWeatherRecord> {
    records.sort_by_key(|r| (r.date, r.source.priority_rank()));
    records.dedup_by_key(|r| r.date);
    records
}
