//! Agronomic heat-unit calculations
//!
//! Growing Degree Days (GDD) use the simple average method against a
//! crop-specific base temperature. Crop Heat Units (CHU) follow the Ontario
//! method, combining a quadratic daytime response with a linear nighttime one.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::DailyWeatherRecord;

/// Daily maximum assumed when a record carries no tmax, °C
pub const DEFAULT_TMAX_CELSIUS: f64 = 20.0;

/// Daily minimum assumed when a record carries no tmin, °C
pub const DEFAULT_TMIN_CELSIUS: f64 = 10.0;

/// Daytime CHU response threshold, °C
pub const CHU_TMAX_THRESHOLD: f64 = 10.0;

/// Nighttime CHU response threshold, °C
pub const CHU_TMIN_THRESHOLD: f64 = 4.4;

/// A temperature that was either measured or substituted
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Reading {
    Measured(f64),
    Defaulted(f64),
}

impl Reading {
    /// Use the measurement when present, otherwise the fallback
    pub fn or_default(measured: Option<f64>, fallback: f64) -> Self {
        match measured {
            Some(value) => Reading::Measured(value),
            None => Reading::Defaulted(fallback),
        }
    }

    pub fn value(&self) -> f64 {
        match self {
            Reading::Measured(v) | Reading::Defaulted(v) => *v,
        }
    }

    pub fn is_defaulted(&self) -> bool {
        matches!(self, Reading::Defaulted(_))
    }
}

/// The two temperatures a day-level index needs
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DayTemperatures {
    pub tmax: Reading,
    pub tmin: Reading,
}

impl DayTemperatures {
    /// The only place missing temperatures are filled in.
    ///
    /// A day with no tmax/tmin still counts, at 20 °C / 10 °C.
    pub fn resolve(tmax: Option<f64>, tmin: Option<f64>) -> Self {
        Self {
            tmax: Reading::or_default(tmax, DEFAULT_TMAX_CELSIUS),
            tmin: Reading::or_default(tmin, DEFAULT_TMIN_CELSIUS),
        }
    }

    pub fn from_record(record: &DailyWeatherRecord) -> Self {
        Self::resolve(record.tmax, record.tmin)
    }

    pub fn tavg(&self) -> f64 {
        (self.tmax.value() + self.tmin.value()) / 2.0
    }

    pub fn is_defaulted(&self) -> bool {
        self.tmax.is_defaulted() || self.tmin.is_defaulted()
    }
}

/// Heat units credited to a single day
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DayIndex {
    pub tavg: f64,
    pub gdd: f64,
    pub chu: f64,
}

/// GDD for one day: `max(0, (tmax + tmin) / 2 - base)`
pub fn gdd_day(tmax: f64, tmin: f64, base_temp: f64) -> f64 {
    ((tmax + tmin) / 2.0 - base_temp).max(0.0)
}

/// Ontario CHU for one day.
///
/// Only the averaged result is floored at zero; the daytime component may go
/// negative on its own above roughly 49.6 °C.
pub fn chu_day(tmax: f64, tmin: f64) -> f64 {
    let day = if tmax > CHU_TMAX_THRESHOLD {
        let excess = tmax - CHU_TMAX_THRESHOLD;
        3.33 * excess - 0.084 * excess * excess
    } else {
        0.0
    };
    let night = if tmin > CHU_TMIN_THRESHOLD {
        1.8 * (tmin - CHU_TMIN_THRESHOLD)
    } else {
        0.0
    };
    ((day + night) / 2.0).max(0.0)
}

/// Day-level GDD and CHU from resolved temperatures
pub fn day_index(temperatures: &DayTemperatures, base_temp: f64) -> DayIndex {
    let tmax = temperatures.tmax.value();
    let tmin = temperatures.tmin.value();
    DayIndex {
        tavg: temperatures.tavg(),
        gdd: gdd_day(tmax, tmin, base_temp),
        chu: chu_day(tmax, tmin),
    }
}

/// One day of an accumulated season series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyIndexResult {
    pub date: NaiveDate,
    pub tmax: f64,
    pub tmin: f64,
    pub tavg: f64,
    pub gdd_day: f64,
    pub gdd_cumulative: f64,
    pub chu_day: f64,
    pub chu_cumulative: f64,
    pub precipitation_day: f64,
    pub precipitation_cumulative: f64,
    /// Set when tmax or tmin was substituted rather than measured
    pub temperature_defaulted: bool,
}

/// Totals for one season
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SeasonTotals {
    pub days: usize,
    pub gdd_total: f64,
    pub chu_total: f64,
    pub precipitation_total: f64,
}

/// Mean of several seasons' totals
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MultiSeasonSummary {
    pub season_count: usize,
    pub total_days: usize,
    pub average_gdd: f64,
    pub average_chu: f64,
    pub average_precipitation: f64,
}

/// Running GDD/CHU/precipitation totals for one season, starting from zero.
///
/// Records are expected in ascending date order, one per day. Missing
/// precipitation adds nothing to the running total.
pub fn accumulate_season(records: &[DailyWeatherRecord], base_temp: f64) -> Vec<DailyIndexResult> {
    let mut gdd_cumulative = 0.0;
    let mut chu_cumulative = 0.0;
    let mut precipitation_cumulative = 0.0;

    records
        .iter()
        .map(|record| {
            let temperatures = DayTemperatures::from_record(record);
            let index = day_index(&temperatures, base_temp);
            let precipitation_day = record.precipitation.unwrap_or(0.0).max(0.0);

            gdd_cumulative += index.gdd;
            chu_cumulative += index.chu;
            precipitation_cumulative += precipitation_day;

            DailyIndexResult {
                date: record.date,
                tmax: temperatures.tmax.value(),
                tmin: temperatures.tmin.value(),
                tavg: index.tavg,
                gdd_day: index.gdd,
                gdd_cumulative,
                chu_day: index.chu,
                chu_cumulative,
                precipitation_day,
                precipitation_cumulative,
                temperature_defaulted: temperatures.is_defaulted(),
            }
        })
        .collect()
}

/// Totals read off the last day of an accumulated series
pub fn season_totals(series: &[DailyIndexResult]) -> SeasonTotals {
    match series.last() {
        Some(last) => SeasonTotals {
            days: series.len(),
            gdd_total: last.gdd_cumulative,
            chu_total: last.chu_cumulative,
            precipitation_total: last.precipitation_cumulative,
        },
        None => SeasonTotals::default(),
    }
}

/// Arithmetic mean of per-season totals; `None` for no seasons
pub fn summarize(seasons: &[SeasonTotals]) -> Option<MultiSeasonSummary> {
    if seasons.is_empty() {
        return None;
    }
    let count = seasons.len() as f64;
    Some(MultiSeasonSummary {
        season_count: seasons.len(),
        total_days: seasons.iter().map(|s| s.days).sum(),
        average_gdd: seasons.iter().map(|s| s.gdd_total).sum::<f64>() / count,
        average_chu: seasons.iter().map(|s| s.chu_total).sum::<f64>() / count,
        average_precipitation: seasons.iter().map(|s| s.precipitation_total).sum::<f64>() / count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WeatherSource;
    use chrono::Duration;
    use proptest::prelude::*;
    use uuid::Uuid;

    fn record(day: i64, tmax: Option<f64>, tmin: Option<f64>, rain: Option<f64>) -> DailyWeatherRecord {
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap() + Duration::days(day);
        DailyWeatherRecord::new(Uuid::nil(), date, WeatherSource::OpenMeteo)
            .with_temperatures(tmax, tmin)
            .with_precipitation(rain)
    }

    #[test]
    fn test_gdd_is_average_above_base() {
        assert_eq!(gdd_day(25.0, 15.0, 10.0), 10.0);
        assert_eq!(gdd_day(12.0, 6.0, 10.0), 0.0);
    }

    #[test]
    fn test_chu_matches_ontario_formula() {
        // day: 3.33 * 15 - 0.084 * 225 = 31.05, night: 1.8 * 10.6 = 19.08
        let expected = (31.05 + 19.08) / 2.0;
        assert!((chu_day(25.0, 15.0) - expected).abs() < 1e-9);
    }

    #[test]
    fn test_chu_components_drop_out_below_thresholds() {
        assert_eq!(chu_day(10.0, 4.4), 0.0);
        assert!((chu_day(9.0, 14.4) - 9.0).abs() < 1e-9);
    }

    #[test]
    fn test_chu_floors_only_the_average() {
        // Extreme heat drives the daytime term negative; a warm night offsets part of it
        let day: f64 = 3.33 * 50.0 - 0.084 * 2500.0;
        assert!(day < 0.0);
        let night = 1.8 * (30.0 - 4.4);
        assert!((chu_day(60.0, 30.0) - ((day + night) / 2.0).max(0.0)).abs() < 1e-9);
    }

    #[test]
    fn test_missing_temperatures_are_marked_defaulted() {
        let temps = DayTemperatures::resolve(None, Some(12.0));
        assert_eq!(temps.tmax, Reading::Defaulted(DEFAULT_TMAX_CELSIUS));
        assert_eq!(temps.tmin, Reading::Measured(12.0));
        assert!(temps.is_defaulted());

        let measured = DayTemperatures::resolve(Some(20.0), Some(10.0));
        assert!(!measured.is_defaulted());
        assert_eq!(measured.tavg(), temps.tavg() - 1.0);
    }

    #[test]
    fn test_defaulted_day_still_accumulates() {
        let series = accumulate_season(&[record(0, None, None, None)], 10.0);
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].gdd_day, 5.0);
        assert!(series[0].temperature_defaulted);
        assert_eq!(series[0].precipitation_day, 0.0);
    }

    #[test]
    fn test_season_totals_come_from_last_day() {
        let records = vec![
            record(0, Some(25.0), Some(15.0), Some(2.0)),
            record(1, Some(8.0), Some(2.0), None),
            record(2, Some(30.0), Some(20.0), Some(1.5)),
        ];
        let series = accumulate_season(&records, 10.0);
        let totals = season_totals(&series);

        assert_eq!(totals.days, 3);
        assert_eq!(totals.gdd_total, 25.0);
        assert_eq!(totals.precipitation_total, 3.5);
        assert_eq!(series[1].gdd_cumulative, 10.0);
    }

    #[test]
    fn test_summary_averages_season_totals() {
        let seasons = [
            SeasonTotals { days: 100, gdd_total: 1000.0, chu_total: 2000.0, precipitation_total: 300.0 },
            SeasonTotals { days: 50, gdd_total: 500.0, chu_total: 1000.0, precipitation_total: 100.0 },
        ];
        let summary = summarize(&seasons).unwrap();

        assert_eq!(summary.season_count, 2);
        assert_eq!(summary.total_days, 150);
        assert_eq!(summary.average_gdd, 750.0);
        assert_eq!(summary.average_chu, 1500.0);
        assert_eq!(summary.average_precipitation, 200.0);
        assert!(summarize(&[]).is_none());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn test_prop_gdd_zero_at_or_below_base(tmax in -30.0f64..45.0, tmin in -40.0f64..35.0, base in 0.0f64..15.0) {
            if (tmax + tmin) / 2.0 <= base {
                prop_assert_eq!(gdd_day(tmax, tmin, base), 0.0);
            }
        }

        #[test]
        fn test_prop_chu_never_negative(tmax in -50.0f64..70.0, tmin in -50.0f64..50.0) {
            prop_assert!(chu_day(tmax, tmin) >= 0.0);
        }

        #[test]
        fn test_prop_cumulative_non_decreasing(
            days in prop::collection::vec((prop::option::of(-10.0f64..40.0), prop::option::of(-15.0f64..30.0), prop::option::of(0.0f64..50.0)), 1..60)
        ) {
            let records: Vec<_> = days
                .into_iter()
                .enumerate()
                .map(|(i, (tmax, tmin, rain))| record(i as i64, tmax, tmin, rain))
                .collect();
            let series = accumulate_season(&records, 10.0);
            for pair in series.windows(2) {
                prop_assert!(pair[1].gdd_cumulative >= pair[0].gdd_cumulative);
                prop_assert!(pair[1].chu_cumulative >= pair[0].chu_cumulative);
                prop_assert!(pair[1].precipitation_cumulative >= pair[0].precipitation_cumulative);
            }
        }
    }
}
