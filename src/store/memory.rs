//! In-memory record store for tests and ephemeral runs.

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::StoreError;
use crate::orders::OrderRecord;
use crate::store::RecordStore;

/// Append-only vector of records behind a mutex.
#[derive(Default)]
pub struct MemoryRecordStore {
    records: Mutex<Vec<OrderRecord>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything appended so far.
    pub async fn records(&self) -> Vec<OrderRecord> {
        self.records.lock().await.clone()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn append(&self, record: &OrderRecord) -> Result<(), StoreError> {
        self.records.lock().await.push(record.clone());
        Ok(())
    }

    async fn count_with_id_prefix(&self, prefix: &str) -> Result<u64, StoreError> {
        let records = self.records.lock().await;
        Ok(records
            .iter()
            .filter(|r| r.order_id.starts_with(prefix))
            .count() as u64)
    }
}
