//! Order-id generation.
//!
//! Two strategies, fixed per deployment via `ORDER_ID_MODE`:
//! - `Sequential`: `YYYYMMDD` + zero-padded 3-digit same-day counter,
//!   derived from the store's prefix count. Read-then-append is not atomic,
//!   so concurrent same-day finalizations can produce duplicate ids.
//! - `Random`: fixed `LDRY-` prefix + 4 random digits. Collision avoidance
//!   by sample space only.

use chrono::NaiveDate;
use rand::Rng;

use crate::error::StoreError;
use crate::store::RecordStore;

/// Order-id generation strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderIdMode {
    Sequential,
    Random,
}

/// The `YYYYMMDD` id prefix for a given day.
pub fn day_prefix(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

/// Generates order ids under the configured strategy.
pub struct OrderIdGenerator {
    mode: OrderIdMode,
}

impl OrderIdGenerator {
    pub fn new(mode: OrderIdMode) -> Self {
        Self { mode }
    }

    /// Generate the next order id.
    ///
    /// Only the sequential strategy consults the store (same-day record
    /// count); the random strategy never fails.
    pub async fn next(
        &self,
        store: &dyn RecordStore,
        today: NaiveDate,
    ) -> Result<String, StoreError> {
        match self.mode {
            OrderIdMode::Sequential => {
                let prefix = day_prefix(today);
                let count = store.count_with_id_prefix(&prefix).await?;
                Ok(format!("{prefix}{:03}", count + 1))
            }
            OrderIdMode::Random => {
                let suffix: u16 = rand::thread_rng().gen_range(0..10_000);
                Ok(format!("LDRY-{suffix:04}"))
            }
        }
    }
}
