//! Season models

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::DateRange;

/// A requested accumulation period, optionally labelled (usually with the year)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Season {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub range: DateRange,
}

impl Season {
    pub fn new(label: Option<String>, start: NaiveDate, end: NaiveDate) -> Result<Self, &'static str> {
        Ok(Self {
            label,
            range: DateRange::new(start, end)?,
        })
    }

    /// Label for reports, falling back to the start year
    pub fn display_label(&self) -> String {
        self.label
            .clone()
            .unwrap_or_else(|| self.range.start.format("%Y").to_string())
    }
}
