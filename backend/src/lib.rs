//! Agroweather backend
//!
//! Multi-source weather acquisition with a source-prioritized cache, and the
//! request-level composition of the GDD/CHU calculators in `shared`.

pub mod config;
pub mod error;
pub mod external;
pub mod services;
pub mod store;

pub use config::Config;
pub use error::{AppError, AppResult};
