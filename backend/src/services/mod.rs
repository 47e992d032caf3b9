//! Weather acquisition and heat-unit services

pub mod cache;
pub mod heat_units;
pub mod orchestrator;

pub use cache::WeatherCache;
pub use heat_units::{HeatUnitService, SeasonReport, TrialHeatUnits};
pub use orchestrator::{ResolvedWeather, SourceOrchestrator};
