//! Persistence boundary for warehouses, zones, stock, master data and requests.
//!
//! The engine never assumes a storage technology; it reads through
//! [`InventoryStore`] and writes atomic, version-checked [`WriteBatch`]es.

pub mod batch;
pub mod in_memory;
pub mod query;
pub mod record;
pub mod r#trait;

pub use batch::{Write, WriteBatch, WriteOp};
pub use in_memory::InMemoryInventoryStore;
pub use query::{ChangeRequestFilter, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, Page, PageRequest, Pagination, RecordFilter, TransferFilter};
pub use record::{Record, RecordKey, Versioned};
pub use r#trait::{InventoryStore, StoreError, StoreExt};
