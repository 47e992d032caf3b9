//! Common types used across the platform

use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// GPS coordinates
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GpsCoordinates {
    pub latitude: Decimal,
    pub longitude: Decimal,
}

impl GpsCoordinates {
    pub fn new(latitude: Decimal, longitude: Decimal) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// A field location resolved for a single request
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Location {
    pub id: Uuid,
    pub coordinates: GpsCoordinates,
}

impl Location {
    pub fn new(id: Uuid, coordinates: GpsCoordinates) -> Self {
        Self { id, coordinates }
    }
}

/// Inclusive calendar date range
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Build a range, rejecting `start > end`
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, &'static str> {
        if start > end {
            return Err("Start date must not be after end date");
        }
        Ok(Self { start, end })
    }

    /// Number of calendar days covered, both ends included
    pub fn num_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Iterate every date in the range in ascending order
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let start = self.start;
        (0..self.num_days()).map(move |offset| start + Duration::days(offset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_growing_season_has_153_days() {
        let range = DateRange::new(date("2024-05-01"), date("2024-09-30")).unwrap();
        assert_eq!(range.num_days(), 153);
        assert_eq!(range.days().count(), 153);
        assert_eq!(range.days().last(), Some(date("2024-09-30")));
    }

    #[test]
    fn test_reversed_range_is_rejected() {
        assert!(DateRange::new(date("2024-06-02"), date("2024-06-01")).is_err());
    }

    #[test]
    fn test_single_day_range() {
        let range = DateRange::new(date("2024-06-01"), date("2024-06-01")).unwrap();
        assert_eq!(range.num_days(), 1);
        assert!(range.contains(date("2024-06-01")));
        assert!(!range.contains(date("2024-06-02")));
    }
}
