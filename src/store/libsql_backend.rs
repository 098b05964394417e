//! libSQL backend — async `RecordStore` over a local database file.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use libsql::{Connection, Database, params};
use tracing::{debug, info};

use crate::error::StoreError;
use crate::orders::OrderRecord;
use crate::store::RecordStore;

/// The orders table mirrors the record's ordered field tuple. `order_id`
/// carries no uniqueness constraint: duplicate ids under concurrent
/// same-day finalization are accepted, not rejected.
const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS orders (
        order_id TEXT NOT NULL,
        pickup_date TEXT NOT NULL,
        customer_name TEXT NOT NULL,
        mobile TEXT NOT NULL,
        address TEXT NOT NULL,
        status TEXT NOT NULL DEFAULT 'Pending',
        created_at TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_orders_order_id ON orders(order_id);
"#;

/// libSQL record store.
///
/// Stores a single connection that is reused for all operations.
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlRecordStore {
    #[allow(dead_code)]
    db: Arc<Database>,
    conn: Connection,
}

impl LibSqlRecordStore {
    /// Open (or create) a local database file and initialize the schema.
    pub async fn new_local(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Open(format!("Failed to create database directory: {e}")))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| StoreError::Open(format!("Failed to open libSQL database: {e}")))?;
        let conn = db
            .connect()
            .map_err(|e| StoreError::Open(format!("Failed to create connection: {e}")))?;

        let store = Self {
            db: Arc::new(db),
            conn,
        };
        store.init_schema().await?;
        info!(path = %path.display(), "Order store opened");
        Ok(store)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, StoreError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| StoreError::Open(format!("Failed to create in-memory database: {e}")))?;
        let conn = db
            .connect()
            .map_err(|e| StoreError::Open(format!("Failed to create connection: {e}")))?;

        let store = Self {
            db: Arc::new(db),
            conn,
        };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), StoreError> {
        self.conn
            .execute_batch(SCHEMA)
            .await
            .map_err(|e| StoreError::Open(format!("init_schema: {e}")))?;
        Ok(())
    }
}

#[async_trait]
impl RecordStore for LibSqlRecordStore {
    async fn append(&self, record: &OrderRecord) -> Result<(), StoreError> {
        self.conn
            .execute(
                "INSERT INTO orders (order_id, pickup_date, customer_name, mobile, address, status, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    record.order_id.clone(),
                    record.pickup_date.clone(),
                    record.name.clone(),
                    record.mobile.clone(),
                    record.address.clone(),
                    record.status.clone(),
                    record.created_at.to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| StoreError::Query(format!("append: {e}")))?;

        debug!(order_id = %record.order_id, "Order appended");
        Ok(())
    }

    async fn count_with_id_prefix(&self, prefix: &str) -> Result<u64, StoreError> {
        let mut rows = self
            .conn
            .query(
                "SELECT COUNT(*) FROM orders WHERE order_id LIKE ?1",
                params![format!("{prefix}%")],
            )
            .await
            .map_err(|e| StoreError::Query(format!("count_with_id_prefix: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let count: i64 = row
                    .get(0)
                    .map_err(|e| StoreError::Query(format!("count row parse: {e}")))?;
                Ok(count as u64)
            }
            Ok(None) => Ok(0),
            Err(e) => Err(StoreError::Query(format!("count_with_id_prefix: {e}"))),
        }
    }
}
