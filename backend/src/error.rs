//! Error handling for the agroweather backend
//!
//! Collaborator failures that can be recovered locally (a provider without
//! data, an unreachable cache) never reach this type; they are logged and the
//! caller moves on. What remains is what a caller must see.

use serde::Serialize;
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Input errors
    #[error("Validation error: {message}")]
    Validation { field: String, message: String },

    #[error("Resource not found: {0}")]
    NotFound(String),

    // Collaborator errors
    #[error("Weather provider {provider} unavailable: {message}")]
    ProviderUnavailable { provider: String, message: String },

    #[error("No weather data available for the requested range")]
    NoWeatherData,

    #[error("External service error: {0}")]
    ExternalService(String),

    // Format errors
    #[error("Unparseable phenology values: {0}")]
    UnparseablePhenology(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    // Database errors
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error detail handed to downstream consumers
#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl AppError {
    /// Build a validation error for a field
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        AppError::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }

    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation { .. } => "VALIDATION_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::ProviderUnavailable { .. } => "WEATHER_PROVIDER_UNAVAILABLE",
            AppError::NoWeatherData => "NO_WEATHER_DATA",
            AppError::ExternalService(_) => "EXTERNAL_SERVICE_ERROR",
            AppError::UnparseablePhenology(_) => "UNPARSEABLE_PHENOLOGY",
            AppError::Configuration(_) => "CONFIGURATION_ERROR",
            AppError::DatabaseError(_) => "DATABASE_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn detail(&self) -> ErrorDetail {
        let field = match self {
            AppError::Validation { field, .. } => Some(field.clone()),
            _ => None,
        };
        let message = match self {
            // Never leak driver details
            AppError::DatabaseError(_) => "A database error occurred".to_string(),
            other => other.to_string(),
        };
        ErrorDetail {
            code: self.code(),
            message,
            field,
        }
    }
}

/// Result type alias for services
pub type AppResult<T> = Result<T, AppError>;
