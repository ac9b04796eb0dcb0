//! Core data types for measurement datasets

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Timestamp type (UTC instant)
pub type Timestamp = DateTime<Utc>;

/// A single parsed measurement, before it is assigned to a dataset
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Measurement {
    pub timestamp: Timestamp,

    /// Execution time in seconds
    pub execution_time: f64,

    pub value: f64,
}

impl Measurement {
    pub fn new(timestamp: Timestamp, execution_time: f64, value: f64) -> Self {
        Self {
            timestamp,
            execution_time,
            value,
        }
    }

    /// Attach the owning dataset name
    pub fn tag(self, file_name: &str) -> MeasurementRecord {
        MeasurementRecord {
            file_name: file_name.to_string(),
            timestamp: self.timestamp,
            execution_time: self.execution_time,
            value: self.value,
        }
    }
}

/// Raw measurement as stored, owned by exactly one dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasurementRecord {
    pub file_name: String,
    pub timestamp: Timestamp,
    pub execution_time: f64,
    pub value: f64,
}

/// Summary statistics derived from one dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetSummary {
    /// Dataset key, unique across summaries
    pub file_name: String,

    /// Seconds between the earliest and latest timestamp
    pub time_span_seconds: f64,

    pub earliest_timestamp: Timestamp,
    pub mean_execution_time: f64,
    pub mean_value: f64,

    /// Upper median: element at index `n / 2` of the sorted values
    pub median_value: f64,

    pub max_value: f64,
    pub min_value: f64,
}

#[derive(Debug, thiserror::Error)]
pub enum TimestampError {
    #[error("Empty timestamp")]
    Empty,

    #[error("Unrecognized timestamp: {0}")]
    Unrecognized(String),
}

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Parse a timestamp as it appears in uploads and query strings.
///
/// Accepts RFC 3339, `YYYY-MM-DD[ T]HH:MM[:SS[.f]]` and bare dates. Values
/// without an offset are taken as UTC.
pub fn parse_timestamp(input: &str) -> Result<Timestamp, TimestampError> {
    let s = input.trim();
    if s.is_empty() {
        return Err(TimestampError::Empty);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| TimestampError::Unrecognized(s.to_string()))
}
