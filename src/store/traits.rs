//! `RecordStore` trait — append-only tabular sink for finalized orders.

use async_trait::async_trait;

use crate::error::StoreError;
use crate::orders::OrderRecord;

/// Backend-agnostic order storage.
///
/// Records are immutable once appended. The prefix count exists for the
/// sequential order-id strategy; reading it and appending are separate
/// operations, so same-day id collisions under concurrent finalization are
/// possible by design.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Append one finalized record.
    async fn append(&self, record: &OrderRecord) -> Result<(), StoreError>;

    /// Count records whose order id starts with `prefix`.
    async fn count_with_id_prefix(&self, prefix: &str) -> Result<u64, StoreError>;
}
