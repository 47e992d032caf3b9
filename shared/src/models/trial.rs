//! Field trial models read from the observation store

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Trial-level facts shared by every plot in the trial
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrialContext {
    pub trial_id: Uuid,
    pub planting_date: NaiveDate,
    pub location_id: Uuid,
}

/// A phenology observation exactly as it was recorded for a plot
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RawPhenologyValue {
    pub plot_id: Uuid,
    pub value: String,
}

impl RawPhenologyValue {
    pub fn new(plot_id: Uuid, value: impl Into<String>) -> Self {
        Self {
            plot_id,
            value: value.into(),
        }
    }
}
