//! Storage contract shared by the PostgreSQL and in-memory backends

use crate::{DbClient, DbResult};
use tscale_core::{DatasetSummary, MeasurementRecord, SummaryFilter};

/// Number of raw records returned by the per-file lookup
pub const LATEST_MEASUREMENTS_LIMIT: usize = 10;

/// A store holding datasets keyed by file name.
///
/// `replace_dataset` must be atomic: readers see either the old records and
/// summary or the new ones, never a mix, and a failed call leaves the old
/// dataset untouched.
#[async_trait::async_trait]
pub trait DatasetStore: Send + Sync {
    /// Backend name for logs
    fn name(&self) -> &str;

    async fn replace_dataset(
        &self,
        file_name: &str,
        records: &[MeasurementRecord],
        summary: &DatasetSummary,
    ) -> DbResult<()>;

    async fn find_summaries(&self, filter: &SummaryFilter) -> DbResult<Vec<DatasetSummary>>;

    async fn latest_measurements(
        &self,
        file_name: &str,
        limit: usize,
    ) -> DbResult<Vec<MeasurementRecord>>;
}

#[async_trait::async_trait]
impl DatasetStore for DbClient {
    fn name(&self) -> &str {
        "postgres"
    }

    async fn replace_dataset(
        &self,
        file_name: &str,
        records: &[MeasurementRecord],
        summary: &DatasetSummary,
    ) -> DbResult<()> {
        DbClient::replace_dataset(self, file_name, records, summary).await
    }

    async fn find_summaries(&self, filter: &SummaryFilter) -> DbResult<Vec<DatasetSummary>> {
        DbClient::find_summaries(self, filter).await
    }

    async fn latest_measurements(
        &self,
        file_name: &str,
        limit: usize,
    ) -> DbResult<Vec<MeasurementRecord>> {
        DbClient::latest_measurements(self, file_name, limit).await
    }
}
