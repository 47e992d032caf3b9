//! Input validation for heat-unit requests
//!
//! Every check runs before any weather is fetched, so a malformed request
//! never triggers a partial computation.

use rust_decimal::Decimal;

use crate::models::Season;
use crate::types::GpsCoordinates;

/// Longest single season accepted, in days
pub const MAX_SEASON_DAYS: i64 = 731;

/// Validate latitude/longitude are on the globe
pub fn validate_coordinates(coordinates: &GpsCoordinates) -> Result<(), &'static str> {
    if coordinates.latitude < Decimal::from(-90) || coordinates.latitude > Decimal::from(90) {
        return Err("Latitude must be between -90 and 90");
    }
    if coordinates.longitude < Decimal::from(-180) || coordinates.longitude > Decimal::from(180) {
        return Err("Longitude must be between -180 and 180");
    }
    Ok(())
}

/// Validate a GDD base temperature, °C
pub fn validate_base_temperature(base_temp: f64) -> Result<(), &'static str> {
    if !base_temp.is_finite() {
        return Err("Base temperature must be a finite number");
    }
    if !(-10.0..=30.0).contains(&base_temp) {
        return Err("Base temperature must be between -10 and 30 °C");
    }
    Ok(())
}

/// Validate the seasons of a multi-season request
pub fn validate_seasons(seasons: &[Season]) -> Result<(), &'static str> {
    if seasons.is_empty() {
        return Err("At least one season is required");
    }
    for season in seasons {
        if season.range.start > season.range.end {
            return Err("Season start date must not be after its end date");
        }
        if season.range.num_days() > MAX_SEASON_DAYS {
            return Err("A season may not span more than two years");
        }
    }
    Ok(())
}
