//! Infrastructure layer: persistence boundary, lock manager, configuration and
//! the engine that composes them with the domain crates.

pub mod config;
pub mod engine;
pub mod error;
pub mod locks;
pub mod store;


pub use config::EngineConfig;
pub use engine::{CHANGE_REQUEST_AGGREGATE, Engine, TRANSFER_AGGREGATE};
pub use error::EngineError;
pub use locks::{LockError, LockGuard, LockKey, LockManager};
pub use store::{
    ChangeRequestFilter, InMemoryInventoryStore, InventoryStore, Page, PageRequest, Pagination, Record, RecordFilter,
    RecordKey, StoreError, StoreExt, TransferFilter, Versioned, WriteBatch,
};
