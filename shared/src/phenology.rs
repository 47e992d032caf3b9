//! Phenology-windowed heat-unit aggregation
//!
//! Maturity and emergence observations are recorded inconsistently across
//! trials: some as days after planting, some as calendar dates in one of three
//! encodings. Every value is converted into a day offset from the trial's
//! planting date before a plot's accumulation window is derived.

use std::collections::{HashMap, HashSet};
use std::ops::Range;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::agronomy::{day_index, DayIndex, DayTemperatures};
use crate::models::{DailyWeatherRecord, RawPhenologyValue};

/// Plain integers below this are day counts; anything larger must be a date
pub const DAY_COUNT_LIMIT: i64 = 200;

/// Human-readable list of accepted encodings, for error messages
pub const ACCEPTED_FORMATS: &str =
    "days after planting (< 200), YYYYMMDD, YYMMDD, or YYYY-MM-DD (optionally followed by a time)";

/// Encoding a recorded value was detected as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordedFormat {
    DayCount,
    /// `YYYYMMDD`
    CompactDate,
    /// `YYMMDD`, always in the 2000s
    ShortDate,
    /// `YYYY-MM-DD` prefix
    IsoDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DayOffsetError {
    #[error("unrecognized phenology value '{value}'")]
    Unparseable { value: String },

    #[error("phenology value '{value}' is {offset} days from planting; it must fall after planting")]
    NotAfterPlanting { value: String, offset: i64 },
}

fn digits_only(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

fn ymd(year: &str, month: &str, day: &str) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, day.parse().ok()?)
}

/// Detect the encoding of a recorded value and compute its raw offset.
///
/// Formats are tried in a fixed order; the first that parses wins.
pub fn detect_offset(raw: &str, planting_date: NaiveDate) -> Option<(RecordedFormat, i64)> {
    let value = raw.trim();

    if let Ok(days) = value.parse::<i64>() {
        if days < DAY_COUNT_LIMIT {
            return Some((RecordedFormat::DayCount, days));
        }
    }

    if value.len() == 8 && digits_only(value) {
        if let Some(date) = ymd(&value[0..4], &value[4..6], &value[6..8]) {
            return Some((RecordedFormat::CompactDate, (date - planting_date).num_days()));
        }
    }

    if value.len() == 6 && digits_only(value) {
        let year = format!("20{}", &value[0..2]);
        if let Some(date) = ymd(&year, &value[2..4], &value[4..6]) {
            return Some((RecordedFormat::ShortDate, (date - planting_date).num_days()));
        }
    }

    if let Some(prefix) = value.get(0..10) {
        if let Ok(date) = NaiveDate::parse_from_str(prefix, "%Y-%m-%d") {
            return Some((RecordedFormat::IsoDate, (date - planting_date).num_days()));
        }
    }

    None
}

/// Resolve a recorded phenology value into days after planting.
///
/// Offsets at or before planting are rejected.
pub fn resolve_day_offset(raw: &str, planting_date: NaiveDate) -> Result<i64, DayOffsetError> {
    match detect_offset(raw, planting_date) {
        Some((_, offset)) if offset > 0 => Ok(offset),
        Some((_, offset)) => Err(DayOffsetError::NotAfterPlanting {
            value: raw.to_string(),
            offset,
        }),
        None => Err(DayOffsetError::Unparseable {
            value: raw.to_string(),
        }),
    }
}

/// Where a window's start came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmergenceSource {
    Observed,
    Fallback,
}

/// Accumulation window in days after planting, `start_offset < end_offset`.
///
/// The emergence day is counted, the maturity day is not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhenologyWindow {
    pub start_offset: i64,
    pub end_offset: i64,
    pub emergence_source: EmergenceSource,
}

impl PhenologyWindow {
    pub fn offsets(&self) -> Range<i64> {
        self.start_offset..self.end_offset
    }

    /// Observed emergence when it precedes maturity, else the fallback offset
    pub fn derive(
        emergence_offset: Option<i64>,
        maturity_offset: i64,
        fallback_emergence_offset: Option<i64>,
    ) -> Option<Self> {
        let usable = |start: i64| start >= 0 && start < maturity_offset;

        if let Some(start) = emergence_offset.filter(|s| usable(*s)) {
            return Some(Self {
                start_offset: start,
                end_offset: maturity_offset,
                emergence_source: EmergenceSource::Observed,
            });
        }
        fallback_emergence_offset.filter(|s| usable(*s)).map(|start| Self {
            start_offset: start,
            end_offset: maturity_offset,
            emergence_source: EmergenceSource::Fallback,
        })
    }
}

/// Day-level indices for one trial, indexed by day offset from planting.
///
/// Built once from the trial's weather and borrowed by every plot.
#[derive(Debug, Clone)]
pub struct DayIndexTable {
    planting_date: NaiveDate,
    days: Vec<Option<DayIndex>>,
}

impl DayIndexTable {
    pub fn build(planting_date: NaiveDate, records: &[DailyWeatherRecord], base_temp: f64) -> Self {
        let mut days: Vec<Option<DayIndex>> = Vec::new();
        for record in records {
            let offset = (record.date - planting_date).num_days();
            if offset < 0 {
                continue;
            }
            let slot = offset as usize;
            if slot >= days.len() {
                days.resize(slot + 1, None);
            }
            days[slot] = Some(day_index(&DayTemperatures::from_record(record), base_temp));
        }
        Self {
            planting_date,
            days,
        }
    }

    pub fn planting_date(&self) -> NaiveDate {
        self.planting_date
    }

    pub fn get(&self, offset: i64) -> Option<&DayIndex> {
        usize::try_from(offset)
            .ok()
            .and_then(|slot| self.days.get(slot))
            .and_then(Option::as_ref)
    }

    pub fn days_with_weather(&self) -> usize {
        self.days.iter().filter(|d| d.is_some()).count()
    }
}

/// Heat units summed over a window
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WindowTotals {
    pub gdd_total: f64,
    pub chu_total: f64,
    pub days_counted: usize,
}

/// Sum day indices across the window, skipping days without weather
pub fn aggregate_window(window: &PhenologyWindow, table: &DayIndexTable) -> WindowTotals {
    window
        .offsets()
        .filter_map(|offset| table.get(offset))
        .fold(WindowTotals::default(), |mut totals, day| {
            totals.gdd_total += day.gdd;
            totals.chu_total += day.chu;
            totals.days_counted += 1;
            totals
        })
}

/// A plot whose maturity resolved to a usable offset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedPlot {
    pub plot_id: Uuid,
    pub maturity_raw: String,
    pub maturity_offset: i64,
    /// `None` when emergence was not recorded or could not be resolved
    pub emergence_offset: Option<i64>,
}

/// Why a plot is missing from the aggregated output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum ExclusionReason {
    UnparseableMaturity,
    MaturityNotAfterPlanting { offset: i64 },
    MaturityBeyondLimit { offset: i64, limit: i64 },
    NoUsableWindow {
        emergence_offset: Option<i64>,
        maturity_offset: i64,
    },
    NoWeatherInWindow { start_offset: i64, end_offset: i64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlotDiagnostic {
    pub plot_id: Uuid,
    pub raw_value: String,
    #[serde(flatten)]
    pub reason: ExclusionReason,
}

/// Heat units accumulated for one plot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlotHeatUnits {
    pub plot_id: Uuid,
    pub gdd_total: f64,
    pub chu_total: f64,
    pub maturity_day_offset: i64,
    pub emergence_day_offset: i64,
    pub emergence_source: EmergenceSource,
    pub days_counted: usize,
}

/// Output of a batch aggregation over one trial
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TrialAggregation {
    pub plots: Vec<PlotHeatUnits>,
    pub diagnostics: Vec<PlotDiagnostic>,
}

/// Resolve every plot's maturity and emergence values.
///
/// Plots whose maturity cannot be used come back as diagnostics. Emergence
/// problems only clear the emergence offset, since a fallback may still apply.
/// Offsets beyond `max_offset_days` are treated as recording errors. When a
/// plot has several observations the first one is used.
pub fn resolve_plots(
    maturity: &[RawPhenologyValue],
    emergence: &[RawPhenologyValue],
    planting_date: NaiveDate,
    max_offset_days: i64,
) -> (Vec<ResolvedPlot>, Vec<PlotDiagnostic>) {
    let mut emergence_by_plot: HashMap<Uuid, &str> = HashMap::new();
    for observation in emergence {
        emergence_by_plot
            .entry(observation.plot_id)
            .or_insert(observation.value.as_str());
    }

    let mut seen = HashSet::new();
    let mut resolved = Vec::new();
    let mut diagnostics = Vec::new();

    for observation in maturity {
        if !seen.insert(observation.plot_id) {
            continue;
        }
        match resolve_day_offset(&observation.value, planting_date) {
            Ok(offset) if offset > max_offset_days => diagnostics.push(PlotDiagnostic {
                plot_id: observation.plot_id,
                raw_value: observation.value.clone(),
                reason: ExclusionReason::MaturityBeyondLimit {
                    offset,
                    limit: max_offset_days,
                },
            }),
            Ok(maturity_offset) => resolved.push(ResolvedPlot {
                plot_id: observation.plot_id,
                maturity_raw: observation.value.clone(),
                maturity_offset,
                emergence_offset: emergence_by_plot
                    .get(&observation.plot_id)
                    .and_then(|raw| resolve_day_offset(raw, planting_date).ok())
                    .filter(|offset| *offset <= max_offset_days),
            }),
            Err(err) => diagnostics.push(PlotDiagnostic {
                plot_id: observation.plot_id,
                raw_value: observation.value.clone(),
                reason: match err {
                    DayOffsetError::Unparseable { .. } => ExclusionReason::UnparseableMaturity,
                    DayOffsetError::NotAfterPlanting { offset, .. } => {
                        ExclusionReason::MaturityNotAfterPlanting { offset }
                    }
                },
            }),
        }
    }

    (resolved, diagnostics)
}

/// Accumulate heat units for each resolved plot over its own window.
///
/// Plots without a usable window, or whose window has no weather at all, are
/// excluded and reported rather than returned with zero totals.
pub fn aggregate_plots(
    plots: &[ResolvedPlot],
    table: &DayIndexTable,
    fallback_emergence_offset: Option<i64>,
) -> TrialAggregation {
    let mut aggregation = TrialAggregation::default();

    for plot in plots {
        let raw_value = plot.maturity_raw.clone();
        let Some(window) =
            PhenologyWindow::derive(plot.emergence_offset, plot.maturity_offset, fallback_emergence_offset)
        else {
            aggregation.diagnostics.push(PlotDiagnostic {
                plot_id: plot.plot_id,
                raw_value,
                reason: ExclusionReason::NoUsableWindow {
                    emergence_offset: plot.emergence_offset,
                    maturity_offset: plot.maturity_offset,
                },
            });
            continue;
        };

        let totals = aggregate_window(&window, table);
        if totals.days_counted == 0 {
            aggregation.diagnostics.push(PlotDiagnostic {
                plot_id: plot.plot_id,
                raw_value,
                reason: ExclusionReason::NoWeatherInWindow {
                    start_offset: window.start_offset,
                    end_offset: window.end_offset,
                },
            });
            continue;
        }

        aggregation.plots.push(PlotHeatUnits {
            plot_id: plot.plot_id,
            gdd_total: totals.gdd_total,
            chu_total: totals.chu_total,
            maturity_day_offset: plot.maturity_offset,
            emergence_day_offset: window.start_offset,
            emergence_source: window.emergence_source,
            days_counted: totals.days_counted,
        });
    }

    aggregation
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agronomy::chu_day;
    use crate::models::WeatherSource;
    use chrono::Duration;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn constant_weather(planting: NaiveDate, days: i64, tmax: f64, tmin: f64) -> Vec<DailyWeatherRecord> {
        (1..=days)
            .map(|offset| {
                DailyWeatherRecord::new(Uuid::nil(), planting + Duration::days(offset), WeatherSource::OpenMeteo)
                    .with_temperatures(Some(tmax), Some(tmin))
            })
            .collect()
    }

    #[test]
    fn test_resolves_every_recorded_format() {
        let planting = date("2025-04-15");
        assert_eq!(resolve_day_offset("45", planting), Ok(45));
        assert_eq!(resolve_day_offset("20250615", planting), Ok(61));
        assert_eq!(resolve_day_offset("250615", planting), Ok(61));
        assert_eq!(resolve_day_offset("2025-06-15", planting), Ok(61));
        assert_eq!(resolve_day_offset("2025-06-15T00:00:00", planting), Ok(61));
        assert_eq!(resolve_day_offset(" 45 ", planting), Ok(45));
    }

    #[test]
    fn test_detects_format_in_fixed_order() {
        let planting = date("2025-04-15");
        assert_eq!(detect_offset("199", planting).map(|d| d.0), Some(RecordedFormat::DayCount));
        assert_eq!(
            detect_offset("20250615", planting).map(|d| d.0),
            Some(RecordedFormat::CompactDate)
        );
        assert_eq!(detect_offset("250615", planting).map(|d| d.0), Some(RecordedFormat::ShortDate));
        assert_eq!(
            detect_offset("2025-06-15 08:30", planting).map(|d| d.0),
            Some(RecordedFormat::IsoDate)
        );
    }

    #[test]
    fn test_rejects_unrecognized_values() {
        let planting = date("2025-04-15");
        for raw in ["abc", "", "200", "2025/06/15", "20251345", "251345", "06-15-2025"] {
            assert_eq!(
                resolve_day_offset(raw, planting),
                Err(DayOffsetError::Unparseable { value: raw.to_string() }),
                "{raw}"
            );
        }
    }

    #[test]
    fn test_rejects_offsets_at_or_before_planting() {
        let planting = date("2025-04-15");
        assert!(matches!(
            resolve_day_offset("0", planting),
            Err(DayOffsetError::NotAfterPlanting { offset: 0, .. })
        ));
        assert!(matches!(
            resolve_day_offset("-3", planting),
            Err(DayOffsetError::NotAfterPlanting { offset: -3, .. })
        ));
        assert!(matches!(
            resolve_day_offset("2025-04-10", planting),
            Err(DayOffsetError::NotAfterPlanting { offset: -5, .. })
        ));
    }

    #[test]
    fn test_window_prefers_observed_emergence() {
        let window = PhenologyWindow::derive(Some(10), 100, Some(7)).unwrap();
        assert_eq!(window.start_offset, 10);
        assert_eq!(window.emergence_source, EmergenceSource::Observed);
        assert_eq!(window.offsets().count(), 90);
    }

    #[test]
    fn test_window_falls_back_when_emergence_unusable() {
        let window = PhenologyWindow::derive(Some(120), 100, Some(7)).unwrap();
        assert_eq!(window.start_offset, 7);
        assert_eq!(window.emergence_source, EmergenceSource::Fallback);

        assert!(PhenologyWindow::derive(None, 100, None).is_none());
        assert!(PhenologyWindow::derive(Some(100), 100, None).is_none());
        assert!(PhenologyWindow::derive(None, 5, Some(7)).is_none());
    }

    #[test]
    fn test_constant_weather_window_totals() {
        let planting = date("2024-05-01");
        let table = DayIndexTable::build(planting, &constant_weather(planting, 120, 25.0, 15.0), 10.0);
        let window = PhenologyWindow::derive(Some(10), 100, None).unwrap();

        let totals = aggregate_window(&window, &table);

        assert_eq!(totals.days_counted, 90);
        assert!((totals.gdd_total - 900.0).abs() < 1e-9);
        assert!((totals.chu_total - chu_day(25.0, 15.0) * 90.0).abs() < 1e-6);
    }

    #[test]
    fn test_missing_weather_days_are_skipped() {
        let planting = date("2024-05-01");
        let mut weather = constant_weather(planting, 30, 25.0, 15.0);
        weather.retain(|r| (r.date - planting).num_days() % 2 == 0);
        let table = DayIndexTable::build(planting, &weather, 10.0);
        let window = PhenologyWindow::derive(Some(10), 20, None).unwrap();

        let totals = aggregate_window(&window, &table);

        assert_eq!(totals.days_counted, 5);
        assert!((totals.gdd_total - 50.0).abs() < 1e-9);
        assert!(table.get(-1).is_none());
        assert!(table.get(11).is_none());
    }

    #[test]
    fn test_plots_are_resolved_and_aggregated_with_diagnostics() {
        let planting = date("2024-05-01");
        let good = Uuid::new_v4();
        let fallback = Uuid::new_v4();
        let garbled = Uuid::new_v4();
        let dry = Uuid::new_v4();

        let maturity = vec![
            RawPhenologyValue::new(good, "100"),
            RawPhenologyValue::new(fallback, "2024-07-10"),
            RawPhenologyValue::new(garbled, "n/a"),
            RawPhenologyValue::new(dry, "190"),
            RawPhenologyValue::new(good, "5"),
        ];
        let emergence = vec![
            RawPhenologyValue::new(good, "10"),
            RawPhenologyValue::new(fallback, "soon"),
            RawPhenologyValue::new(dry, "150"),
        ];

        let (resolved, mut diagnostics) = resolve_plots(&maturity, &emergence, planting, 731);
        assert_eq!(resolved.len(), 3);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].reason, ExclusionReason::UnparseableMaturity);

        let table = DayIndexTable::build(planting, &constant_weather(planting, 120, 25.0, 15.0), 10.0);
        let aggregation = aggregate_plots(&resolved, &table, Some(7));
        diagnostics.extend(aggregation.diagnostics);

        assert_eq!(aggregation.plots.len(), 2);
        let first = &aggregation.plots[0];
        assert_eq!(first.plot_id, good);
        assert_eq!(first.days_counted, 90);
        let second = &aggregation.plots[1];
        assert_eq!(second.emergence_source, EmergenceSource::Fallback);
        assert_eq!(second.maturity_day_offset, 70);
        assert_eq!(second.days_counted, 63);

        assert_eq!(diagnostics.len(), 2);
        assert_eq!(
            diagnostics[1].reason,
            ExclusionReason::NoWeatherInWindow { start_offset: 150, end_offset: 190 }
        );
    }

    #[test]
    fn test_offsets_beyond_limit_are_excluded() {
        let planting = date("2025-04-15");
        let typo = Uuid::new_v4();
        let good = Uuid::new_v4();
        let maturity = vec![
            RawPhenologyValue::new(typo, "20520615"),
            RawPhenologyValue::new(good, "100"),
        ];
        let emergence = vec![RawPhenologyValue::new(good, "20520101")];

        let (resolved, diagnostics) = resolve_plots(&maturity, &emergence, planting, 731);

        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].plot_id, good);
        assert_eq!(resolved[0].emergence_offset, None);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].plot_id, typo);
        assert!(matches!(
            diagnostics[0].reason,
            ExclusionReason::MaturityBeyondLimit { limit: 731, .. }
        ));
    }
}
