//! Table layout and row types
//!
//! Rows carry the surrogate `id`; the domain types in `tscale-core` do not.

use crate::{DbClient, DbResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use tracing::{info, instrument};
use tscale_core::{DatasetSummary, MeasurementRecord};

/// Raw measurement row
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct MeasurementRow {
    pub id: i64,
    pub file_name: String,
    pub timestamp: DateTime<Utc>,
    pub execution_time: f64,
    pub value: f64,
}

impl From<MeasurementRow> for MeasurementRecord {
    fn from(row: MeasurementRow) -> Self {
        MeasurementRecord {
            file_name: row.file_name,
            timestamp: row.timestamp,
            execution_time: row.execution_time,
            value: row.value,
        }
    }
}

/// One summary per dataset
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct SummaryRow {
    pub id: i64,
    pub file_name: String,
    pub time_span_seconds: f64,
    pub earliest_timestamp: DateTime<Utc>,
    pub mean_execution_time: f64,
    pub mean_value: f64,
    pub median_value: f64,
    pub max_value: f64,
    pub min_value: f64,
}

impl From<SummaryRow> for DatasetSummary {
    fn from(row: SummaryRow) -> Self {
        DatasetSummary {
            file_name: row.file_name,
            time_span_seconds: row.time_span_seconds,
            earliest_timestamp: row.earliest_timestamp,
            mean_execution_time: row.mean_execution_time,
            mean_value: row.mean_value,
            median_value: row.median_value,
            max_value: row.max_value,
            min_value: row.min_value,
        }
    }
}

/// Table names
pub mod tables {
    pub const MEASUREMENTS: &str = "measurements";
    pub const SUMMARIES: &str = "dataset_summaries";
}

/// Idempotent DDL, applied at startup
pub const SCHEMA_STATEMENTS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS measurements (
        id BIGSERIAL PRIMARY KEY,
        file_name TEXT NOT NULL,
        timestamp TIMESTAMPTZ NOT NULL,
        execution_time DOUBLE PRECISION NOT NULL,
        value DOUBLE PRECISION NOT NULL
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS measurements_file_name_timestamp_idx
        ON measurements (file_name, timestamp DESC)
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS dataset_summaries (
        id BIGSERIAL PRIMARY KEY,
        file_name TEXT NOT NULL UNIQUE,
        time_span_seconds DOUBLE PRECISION NOT NULL,
        earliest_timestamp TIMESTAMPTZ NOT NULL,
        mean_execution_time DOUBLE PRECISION NOT NULL,
        mean_value DOUBLE PRECISION NOT NULL,
        median_value DOUBLE PRECISION NOT NULL,
        max_value DOUBLE PRECISION NOT NULL,
        min_value DOUBLE PRECISION NOT NULL
    )
    "#,
];

impl DbClient {
    /// Create the tables and indexes if they do not exist yet
    #[instrument(skip(self))]
    pub async fn ensure_schema(&self) -> DbResult<()> {
        for statement in SCHEMA_STATEMENTS {
            sqlx::query(statement).execute(self.pool()).await?;
        }
        info!(
            "Schema ready: {}, {}",
            tables::MEASUREMENTS,
            tables::SUMMARIES
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_schema_mentions_tables() {
        assert!(SCHEMA_STATEMENTS[0].contains(tables::MEASUREMENTS));
        assert!(SCHEMA_STATEMENTS[2].contains(tables::SUMMARIES));
        assert!(SCHEMA_STATEMENTS[2].contains("file_name TEXT NOT NULL UNIQUE"));
    }

    #[test]
    fn test_row_conversion_drops_id() {
        let ts = Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap();
        let row = MeasurementRow {
            id: 7,
            file_name: "a.csv".into(),
            timestamp: ts,
            execution_time: 1.5,
            value: 2.5,
        };
        let record = MeasurementRecord::from(row);
        assert_eq!(record.file_name, "a.csv");
        assert_eq!(record.timestamp, ts);
        assert_eq!(record.value, 2.5);
    }
}
