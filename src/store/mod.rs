//! Durable order storage.

pub mod libsql_backend;
pub mod memory;
pub mod traits;

pub use libsql_backend::LibSqlRecordStore;
pub use memory::MemoryRecordStore;
pub use traits::RecordStore;
