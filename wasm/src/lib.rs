//! WebAssembly module for the agroweather heat-unit engine
//!
//! Provides client-side computation for:
//! - Day-level GDD/CHU previews
//! - Phenology value resolution while data is being entered
//! - Season accumulation over records already on the client

use chrono::NaiveDate;
use serde::Serialize;
use wasm_bindgen::prelude::*;

use shared::agronomy::{self, DayTemperatures};
use shared::phenology::{self, RecordedFormat};
use shared::{validate_base_temperature, DailyWeatherRecord};

/// Day index with the temperatures actually used
#[derive(Debug, Serialize)]
struct DayIndexPreview {
    tmax: f64,
    tmin: f64,
    tavg: f64,
    gdd: f64,
    chu: f64,
    temperature_defaulted: bool,
}

#[derive(Debug, Serialize)]
struct OffsetPreview {
    format: RecordedFormat,
    offset: i64,
}

fn warn(message: &str) {
    #[cfg(target_arch = "wasm32")]
    web_sys::console::warn_1(&JsValue::from_str(message));
    #[cfg(not(target_arch = "wasm32"))]
    let _ = message;
}

fn to_js_error(message: String) -> JsValue {
    js_sys::Error::new(&message).into()
}

fn day_index_json(tmax: Option<f64>, tmin: Option<f64>, base_temp: f64) -> Result<String, String> {
    validate_base_temperature(base_temp)?;
    let temperatures = DayTemperatures::resolve(tmax, tmin);
    let index = agronomy::day_index(&temperatures, base_temp);
    let preview = DayIndexPreview {
        tmax: temperatures.tmax.value(),
        tmin: temperatures.tmin.value(),
        tavg: index.tavg,
        gdd: index.gdd,
        chu: index.chu,
        temperature_defaulted: temperatures.is_defaulted(),
    };
    serde_json::to_string(&preview).map_err(|e| e.to_string())
}

fn phenology_offset_json(raw: &str, planting_date: &str) -> Result<String, String> {
    let planting = NaiveDate::parse_from_str(planting_date.trim(), "%Y-%m-%d")
        .map_err(|e| format!("Invalid planting date '{}': {}", planting_date, e))?;
    let offset = phenology::resolve_day_offset(raw, planting).map_err(|e| e.to_string())?;
    let format = phenology::detect_offset(raw, planting)
        .map(|(format, _)| format)
        .ok_or_else(|| format!("Expected {}", phenology::ACCEPTED_FORMATS))?;
    serde_json::to_string(&OffsetPreview { format, offset }).map_err(|e| e.to_string())
}

fn season_json(records_json: &str, base_temp: f64) -> Result<String, String> {
    validate_base_temperature(base_temp)?;
    let mut records: Vec<DailyWeatherRecord> =
        serde_json::from_str(records_json).map_err(|e| format!("Invalid records JSON: {}", e))?;
    records.sort_by_key(|r| r.date);

    let series = agronomy::accumulate_season(&records, base_temp);
    let defaulted = series.iter().filter(|d| d.temperature_defaulted).count();
    if defaulted > 0 {
        warn(&format!("{} of {} days used default temperatures", defaulted, series.len()));
    }
    serde_json::to_string(&series).map_err(|e| e.to_string())
}

/// Initialize the WASM module
#[wasm_bindgen(start)]
pub fn init() {
    // Set up panic hook for better error messages in browser console
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// GDD and CHU for a single day; missing temperatures use 20/10 °C
#[wasm_bindgen]
pub fn calculate_day_index(tmax: Option<f64>, tmin: Option<f64>, base_temp: f64) -> Result<String, JsValue> {
    day_index_json(tmax, tmin, base_temp).map_err(to_js_error)
}

/// Days after planting for a recorded phenology value, with its detected format
#[wasm_bindgen]
pub fn resolve_phenology_offset(raw: &str, planting_date: &str) -> Result<String, JsValue> {
    phenology_offset_json(raw, planting_date).map_err(to_js_error)
}

/// Running GDD/CHU/precipitation series for a JSON array of daily records
#[wasm_bindgen]
pub fn accumulate_season(records_json: &str, base_temp: f64) -> Result<String, JsValue> {
    season_json(records_json, base_temp).map_err(to_js_error)
}
