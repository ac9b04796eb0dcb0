//! In-memory dataset store
//!
//! Used when no database is configured, and by tests. Each dataset is
//! swapped under a single write lock, which gives the same all-or-nothing
//! visibility as the PostgreSQL transaction.

use crate::{DatasetStore, DbResult};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tscale_core::{DatasetSummary, MeasurementRecord, SummaryFilter};

#[derive(Debug, Clone)]
struct StoredDataset {
    records: Vec<MeasurementRecord>,
    summary: DatasetSummary,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    datasets: RwLock<HashMap<String, StoredDataset>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored datasets
    pub async fn len(&self) -> usize {
        self.datasets.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.datasets.read().await.is_empty()
    }

    /// Number of raw records stored for a dataset
    pub async fn count_measurements(&self, file_name: &str) -> usize {
        self.datasets
            .read()
            .await
            .get(file_name)
            .map_or(0, |ds| ds.records.len())
    }
}

#[async_trait::async_trait]
impl DatasetStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn replace_dataset(
        &self,
        file_name: &str,
        records: &[MeasurementRecord],
        summary: &DatasetSummary,
    ) -> DbResult<()> {
        let dataset = StoredDataset {
            records: records.to_vec(),
            summary: summary.clone(),
        };
        self.datasets
            .write()
            .await
            .insert(file_name.to_string(), dataset);
        Ok(())
    }

    async fn find_summaries(&self, filter: &SummaryFilter) -> DbResult<Vec<DatasetSummary>> {
        let datasets = self.datasets.read().await;
        let mut found: Vec<DatasetSummary> = datasets
            .values()
            .map(|ds| &ds.summary)
            .filter(|s| filter.matches(s))
            .cloned()
            .collect();
        found.sort_by(|a, b| a.file_name.cmp(&b.file_name));
        Ok(found)
    }

    async fn latest_measurements(
        &self,
        file_name: &str,
        limit: usize,
    ) -> DbResult<Vec<MeasurementRecord>> {
        let datasets = self.datasets.read().await;
        let Some(ds) = datasets.get(file_name) else {
            return Ok(Vec::new());
        };

        // Stable sort: equal timestamps keep the later upload position first.
        let mut records: Vec<&MeasurementRecord> = ds.records.iter().rev().collect();
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(records.into_iter().take(limit).cloned().collect())
    }
}
