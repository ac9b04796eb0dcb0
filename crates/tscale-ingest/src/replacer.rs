//! Atomic dataset replacement

use crate::{parse_measurements, IngestError, IngestResult};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, error, info, instrument};
use tscale_core::{summarize, validate_batch, DatasetSummary, Rejection, Timestamp, Verdict};
use tscale_db::DatasetStore;

/// Runs uploads through parse, validation and summary, then swaps the
/// dataset in the store as one unit.
#[derive(Clone)]
pub struct DatasetReplacer {
    store: Arc<dyn DatasetStore>,
}

impl DatasetReplacer {
    pub fn new(store: Arc<dyn DatasetStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn DatasetStore> {
        &self.store
    }

    /// Replace the dataset `file_name` with the contents of `payload`
    pub async fn replace(&self, file_name: &str, payload: &[u8]) -> IngestResult<DatasetSummary> {
        self.replace_at(file_name, payload, Utc::now()).await
    }

    /// As [`replace`](Self::replace), validating timestamps against `now`
    #[instrument(skip(self, payload, now), fields(store = self.store.name(), bytes = payload.len()))]
    pub async fn replace_at(
        &self,
        file_name: &str,
        payload: &[u8],
        now: Timestamp,
    ) -> IngestResult<DatasetSummary> {
        let batch = parse_measurements(payload)?;
        debug!("Parsed {} measurements", batch.len());

        if let Verdict::Rejected(reason) = validate_batch(&batch, now) {
            info!(%reason, "Upload rejected");
            return Err(IngestError::Rejected(reason));
        }
        debug!("Validated");

        let summary = summarize(file_name, &batch).ok_or(Rejection::CountOutOfRange)?;
        let records: Vec<_> = batch.into_iter().map(|m| m.tag(file_name)).collect();
        debug!(
            median = summary.median_value,
            span = summary.time_span_seconds,
            "Aggregated"
        );

        match self
            .store
            .replace_dataset(file_name, &records, &summary)
            .await
        {
            Ok(()) => {
                info!("Committed {} measurements", records.len());
                Ok(summary)
            }
            Err(e) => {
                error!(error = ?e, "Replace failed, transaction rolled back");
                Err(IngestError::Storage(e))
            }
        }
    }
}

/// Trimmed dataset name, or `None` when blank
pub fn require_file_name(file_name: &str) -> Option<&str> {
    let name = file_name.trim();
    (!name.is_empty()).then_some(name)
}
