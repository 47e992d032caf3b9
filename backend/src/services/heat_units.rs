//! Heat-unit reports: multi-season GDD/CHU series and per-plot phenology
//! window totals for a trial

use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use serde::Serialize;
use shared::agronomy::{accumulate_season, season_totals, summarize, DailyIndexResult, MultiSeasonSummary, SeasonTotals};
use shared::phenology::{aggregate_plots, resolve_plots, DayIndexTable, PlotDiagnostic, PlotHeatUnits, ACCEPTED_FORMATS};
use shared::types::{DateRange, GpsCoordinates, Location};
use shared::{validate_base_temperature, validate_coordinates, validate_seasons, Season, WeatherOrigin};
use uuid::Uuid;

use super::orchestrator::SourceOrchestrator;
use crate::config::PhenologyConfig;
use crate::error::{AppError, AppResult};
use crate::store::{LocationStore, TrialStore};

/// One season's accumulated series
#[derive(Debug, Clone, Serialize)]
pub struct SeasonResult {
    pub label: String,
    pub range: DateRange,
    pub origin: WeatherOrigin,
    pub totals: SeasonTotals,
    pub days: Vec<DailyIndexResult>,
}

/// A season that could not be computed
#[derive(Debug, Clone, Serialize)]
pub struct SeasonFailure {
    pub label: String,
    pub range: DateRange,
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SeasonReport {
    pub location: Location,
    pub base_temp: f64,
    pub seasons: Vec<SeasonResult>,
    pub failures: Vec<SeasonFailure>,
    /// Mean of the successful seasons' totals
    pub summary: Option<MultiSeasonSummary>,
}

/// Per-plot totals for one trial
#[derive(Debug, Clone, Serialize)]
pub struct TrialHeatUnits {
    pub trial_id: Uuid,
    pub planting_date: NaiveDate,
    pub location: Location,
    pub base_temp: f64,
    pub weather_range: DateRange,
    pub origin: WeatherOrigin,
    pub plots: Vec<PlotHeatUnits>,
    pub diagnostics: Vec<PlotDiagnostic>,
}

/// Composes location lookup, weather acquisition and the calculators
#[derive(Clone)]
pub struct HeatUnitService {
    locations: Arc<dyn LocationStore>,
    trials: Arc<dyn TrialStore>,
    orchestrator: SourceOrchestrator,
    default_coordinates: GpsCoordinates,
    phenology: PhenologyConfig,
}

impl HeatUnitService {
    pub fn new(
        locations: Arc<dyn LocationStore>,
        trials: Arc<dyn TrialStore>,
        orchestrator: SourceOrchestrator,
        default_coordinates: GpsCoordinates,
        phenology: PhenologyConfig,
    ) -> Self {
        Self {
            locations,
            trials,
            orchestrator,
            default_coordinates,
            phenology,
        }
    }

    /// Stored coordinates for the location, or the configured default
    pub async fn resolve_location(&self, location_id: Uuid) -> Location {
        let coordinates = match self.locations.coordinates(location_id).await {
            Ok(Some(coordinates)) => coordinates,
            Ok(None) => {
                tracing::debug!("Location {} has no coordinates, using default", location_id);
                self.default_coordinates
            }
            Err(e) => {
                tracing::warn!("Coordinate lookup for location {} failed, using default: {}", location_id, e);
                self.default_coordinates
            }
        };
        Location::new(location_id, coordinates)
    }

    /// Accumulate GDD, CHU and precipitation for each season.
    ///
    /// A season whose weather cannot be resolved is listed under `failures`;
    /// the report is an error only when no season succeeded.
    pub async fn season_report(&self, location_id: Uuid, seasons: &[Season], base_temp: f64) -> AppResult<SeasonReport> {
        validate_base_temperature(base_temp).map_err(|e| AppError::validation("base_temp", e))?;
        validate_seasons(seasons).map_err(|e| AppError::validation("seasons", e))?;

        let location = self.resolve_location(location_id).await;
        validate_coordinates(&location.coordinates).map_err(|e| AppError::validation("coordinates", e))?;

        let mut results = Vec::with_capacity(seasons.len());
        let mut failures = Vec::new();
        let mut last_error = None;

        for season in seasons {
            let label = season.display_label();
            match self.orchestrator.resolve(&location, &season.range).await {
                Ok(weather) => {
                    let days = accumulate_season(&weather.records, base_temp);
                    let totals = season_totals(&days);
                    tracing::info!(
                        "Season {}: {} days, {:.1} GDD, {:.1} CHU from {}",
                        label,
                        totals.days,
                        totals.gdd_total,
                        totals.chu_total,
                        weather.origin
                    );
                    results.push(SeasonResult {
                        label,
                        range: season.range,
                        origin: weather.origin,
                        totals,
                        days,
                    });
                }
                Err(e) => {
                    tracing::warn!("Season {} failed: {}", label, e);
                    failures.push(SeasonFailure {
                        label,
                        range: season.range,
                        code: e.code(),
                        message: e.to_string(),
                    });
                    last_error = Some(e);
                }
            }
        }

        if results.is_empty() {
            if let Some(e) = last_error {
                return Err(e);
            }
        }

        let totals: Vec<SeasonTotals> = results.iter().map(|s| s.totals).collect();
        Ok(SeasonReport {
            location,
            base_temp,
            summary: summarize(&totals),
            seasons: results,
            failures,
        })
    }

    /// GDD and CHU per plot between emergence and maturity.
    ///
    /// Weather is fetched once for the whole trial, covering every plot's
    /// window.
    pub async fn aggregate_trial(&self, trial_id: Uuid, base_temp: f64) -> AppResult<TrialHeatUnits> {
        validate_base_temperature(base_temp).map_err(|e| AppError::validation("base_temp", e))?;

        let context = self
            .trials
            .trial_context(trial_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Trial {} with a planting date", trial_id)))?;

        let maturity = self
            .trials
            .phenology_values(trial_id, self.phenology.maturity_trait_id)
            .await?;
        if maturity.is_empty() {
            return Err(AppError::NotFound(format!("Maturity observations for trial {}", trial_id)));
        }

        let emergence = match self.phenology.emergence_trait_id {
            Some(trait_id) => self.trials.phenology_values(trial_id, trait_id).await?,
            None => Vec::new(),
        };

        let (resolved, mut diagnostics) = resolve_plots(
            &maturity,
            &emergence,
            context.planting_date,
            self.phenology.max_offset_days,
        );
        let Some(max_offset) = resolved.iter().map(|p| p.maturity_offset).max() else {
            return Err(AppError::UnparseablePhenology(format!(
                "None of the {} maturity values for trial {} resolved to a day within {} days of planting; expected {}",
                maturity.len(),
                trial_id,
                self.phenology.max_offset_days,
                ACCEPTED_FORMATS
            )));
        };
        tracing::debug!(
            "Trial {}: {} plots resolved, {} excluded, latest maturity at day {}",
            trial_id,
            resolved.len(),
            diagnostics.len(),
            max_offset
        );

        let planting = context.planting_date;
        let weather_range = DateRange::new(planting + Duration::days(1), planting + Duration::days(max_offset))
            .map_err(|e| AppError::Internal(e.to_string()))?;

        let location = self.resolve_location(context.location_id).await;
        validate_coordinates(&location.coordinates).map_err(|e| AppError::validation("coordinates", e))?;
        let weather = self.orchestrator.resolve(&location, &weather_range).await?;

        let table = DayIndexTable::build(planting, &weather.records, base_temp);
        let aggregation = aggregate_plots(&resolved, &table, self.phenology.fallback_emergence_offset);
        diagnostics.extend(aggregation.diagnostics);

        tracing::info!(
            "Trial {}: {} plots aggregated, {} excluded, weather from {}",
            trial_id,
            aggregation.plots.len(),
            diagnostics.len(),
            weather.origin
        );

        Ok(TrialHeatUnits {
            trial_id,
            planting_date: planting,
            location,
            base_temp,
            weather_range,
            origin: weather.origin,
            plots: aggregation.plots,
            diagnostics,
        })
    }
}
