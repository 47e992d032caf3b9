//! Shared types and calculations for the agroweather heat-unit engine
//!
//! This crate holds everything that needs no I/O: the normalized weather
//! record, source-priority merging, GDD/CHU calculations and the phenology
//! window logic. It is used by the backend and compiled to WASM for
//! client-side previews.

pub mod agronomy;
pub mod models;
pub mod phenology;
pub mod types;
pub mod validation;

pub use models::*;
pub use types::*;
pub use validation::*;
