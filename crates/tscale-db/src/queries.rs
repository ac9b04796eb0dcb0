//! Database query operations for measurement and summary tables

use crate::schema::{MeasurementRow, SummaryRow};
use crate::{DbClient, DbResult};
use sqlx::{Postgres, QueryBuilder};
use tracing::{debug, instrument};
use tscale_core::{DatasetSummary, MeasurementRecord, SummaryFilter};

/// Rows per multi-row INSERT; keeps bind parameters well under the 65535 limit
const INSERT_CHUNK: usize = 1000;

impl DbClient {
    /// Replace every row of a dataset inside one transaction.
    ///
    /// The transaction is rolled back if any statement fails or if this
    /// future is dropped before commit.
    #[instrument(skip(self, records, summary), fields(records = records.len()))]
    pub async fn replace_dataset(
        &self,
        file_name: &str,
        records: &[MeasurementRecord],
        summary: &DatasetSummary,
    ) -> DbResult<()> {
        let mut tx = self.pool().begin().await?;

        // Serializes concurrent replacements of the same dataset.
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(file_name)
            .execute(&mut *tx)
            .await?;

        let removed = sqlx::query("DELETE FROM measurements WHERE file_name = $1")
            .bind(file_name)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        sqlx::query("DELETE FROM dataset_summaries WHERE file_name = $1")
            .bind(file_name)
            .execute(&mut *tx)
            .await?;

        for chunk in records.chunks(INSERT_CHUNK) {
            let mut insert = QueryBuilder::<Postgres>::new(
                "INSERT INTO measurements (file_name, timestamp, execution_time, value) ",
            );
            insert.push_values(chunk, |mut row, record| {
                row.push_bind(file_name)
                    .push_bind(record.timestamp)
                    .push_bind(record.execution_time)
                    .push_bind(record.value);
            });
            insert.build().execute(&mut *tx).await?;
        }

        sqlx::query(
            r#"
            INSERT INTO dataset_summaries (
                file_name, time_span_seconds, earliest_timestamp,
                mean_execution_time, mean_value, median_value,
                max_value, min_value
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(file_name)
        .bind(summary.time_span_seconds)
        .bind(summary.earliest_timestamp)
        .bind(summary.mean_execution_time)
        .bind(summary.mean_value)
        .bind(summary.median_value)
        .bind(summary.max_value)
        .bind(summary.min_value)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        debug!(
            "Replaced dataset {}: removed {} rows, inserted {}",
            file_name,
            removed,
            records.len()
        );
        Ok(())
    }

    /// Summaries matching every constraint set in `filter`
    #[instrument(skip(self))]
    pub async fn find_summaries(&self, filter: &SummaryFilter) -> DbResult<Vec<DatasetSummary>> {
        let mut query = QueryBuilder::<Postgres>::new(
            r#"
            SELECT id, file_name, time_span_seconds, earliest_timestamp,
                   mean_execution_time, mean_value, median_value,
                   max_value, min_value
            FROM dataset_summaries
            WHERE TRUE
            "#,
        );

        if let Some(name) = filter.file_name() {
            query.push(" AND file_name = ").push_bind(name.to_string());
        }
        if let Some(start) = filter.start_date {
            query.push(" AND earliest_timestamp >= ").push_bind(start);
        }
        if let Some(end) = filter.end_date {
            query.push(" AND earliest_timestamp <= ").push_bind(end);
        }
        if let Some(start) = filter.start_execution_time {
            query.push(" AND mean_execution_time >= ").push_bind(start);
        }
        if let Some(end) = filter.end_execution_time {
            query.push(" AND mean_execution_time <= ").push_bind(end);
        }
        if let Some(start) = filter.start_average_value {
            query.push(" AND mean_value >= ").push_bind(start);
        }
        if let Some(end) = filter.end_average_value {
            query.push(" AND mean_value <= ").push_bind(end);
        }
        query.push(" ORDER BY file_name ASC");

        let rows = query
            .build_query_as::<SummaryRow>()
            .fetch_all(self.pool())
            .await?;

        debug!("Retrieved {} summaries", rows.len());
        Ok(rows.into_iter().map(DatasetSummary::from).collect())
    }

    /// Newest measurements of one dataset, newest first
    #[instrument(skip(self))]
    pub async fn latest_measurements(
        &self,
        file_name: &str,
        limit: usize,
    ) -> DbResult<Vec<MeasurementRecord>> {
        let rows = sqlx::query_as::<_, MeasurementRow>(
            r#"
            SELECT id, file_name, timestamp, execution_time, value
            FROM measurements
            WHERE file_name = $1
            ORDER BY timestamp DESC, id DESC
            LIMIT $2
            "#,
        )
        .bind(file_name)
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(self.pool())
        .await?;

        debug!("Retrieved {} measurements for {}", rows.len(), file_name);
        Ok(rows.into_iter().map(MeasurementRecord::from).collect())
    }

    /// Count of stored measurement rows for a dataset
    #[instrument(skip(self))]
    pub async fn count_measurements(&self, file_name: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM measurements WHERE file_name = $1")
            .bind(file_name)
            .fetch_one(self.pool())
            .await?;

        Ok(count)
    }
}
