use std::sync::Arc;

use thiserror::Error;

use wareflow_approvals::{ChangeRequest, ChangeRequestId};
use wareflow_catalog::{CatalogRecord, EntityRef};
use wareflow_core::ExpectedVersion;
use wareflow_storage::{StockItem, StockItemId, Warehouse, WarehouseId, Zone, ZoneId};
use wareflow_transfers::{TransferId, TransferRequest};

use super::batch::WriteBatch;
use super::query::{ChangeRequestFilter, Page, Pagination, RecordFilter, TransferFilter};
use super::record::{Record, RecordKey, Versioned};

/// Store operation error.
///
/// These are infrastructure failures as opposed to domain rejections.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("optimistic concurrency check failed for {key}: expected {expected:?}, found {actual:?}")]
    Concurrency {
        key: RecordKey,
        expected: ExpectedVersion,
        actual: Option<u64>,
    },

    #[error("invalid write batch: {0}")]
    InvalidBatch(String),

    #[error("stored record {key} has an unexpected shape")]
    Corrupted { key: RecordKey },

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Persistence boundary for every record the engine owns.
///
/// ## Commit semantics
///
/// `commit()` applies a whole [`WriteBatch`] atomically:
/// - every write's `expected` version is checked against the current row version
///   before anything is applied
/// - on success each written row's version becomes `previous + 1` (1 for inserts)
/// - on any failure nothing is applied
///
/// ## List semantics
///
/// `list()` returns records matching the filter in key order, so identifiers
/// generated as UUIDv7 list oldest first.
pub trait InventoryStore: Send + Sync {
    fn get(&self, key: RecordKey) -> Result<Option<Versioned<Record>>, StoreError>;

    fn list(&self, filter: &RecordFilter, page: Pagination) -> Result<Page<Versioned<Record>>, StoreError>;

    fn commit(&self, batch: WriteBatch) -> Result<(), StoreError>;
}

impl<S> InventoryStore for Arc<S>
where
    S: InventoryStore + ?Sized,
{
    fn get(&self, key: RecordKey) -> Result<Option<Versioned<Record>>, StoreError> {
        (**self).get(key)
    }

    fn list(&self, filter: &RecordFilter, page: Pagination) -> Result<Page<Versioned<Record>>, StoreError> {
        (**self).list(filter, page)
    }

    fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
        (**self).commit(batch)
    }
}

fn typed<T>(key: RecordKey, row: Versioned<Record>) -> Result<Versioned<T>, StoreError>
where
    T: TryFrom<Record, Error = Record>,
{
    let Versioned { version, value } = row;
    T::try_from(value)
        .map(|value| Versioned::new(version, value))
        .map_err(|_| StoreError::Corrupted { key })
}

fn get_typed<S, T>(store: &S, key: RecordKey) -> Result<Option<Versioned<T>>, StoreError>
where
    S: InventoryStore + ?Sized,
    T: TryFrom<Record, Error = Record>,
{
    store.get(key)?.map(|row| typed(key, row)).transpose()
}

/// Every page of a filter, for queries that need the complete set.
fn list_all<S, T>(store: &S, filter: &RecordFilter) -> Result<Vec<Versioned<T>>, StoreError>
where
    S: InventoryStore + ?Sized,
    T: TryFrom<Record, Error = Record>,
{
    let mut out = Vec::new();
    let mut page = Pagination { limit: super::query::MAX_PAGE_SIZE, offset: 0 };
    loop {
        let batch = store.list(filter, page)?;
        for row in batch.items {
            let key = row.value.key();
            out.push(typed(key, row)?);
        }
        if !batch.has_more {
            return Ok(out);
        }
        page.offset += page.limit;
    }
}

/// Typed accessors over [`InventoryStore`].
pub trait StoreExt: InventoryStore {
    fn warehouse(&self, id: WarehouseId) -> Result<Option<Versioned<Warehouse>>, StoreError> {
        get_typed(self, RecordKey::Warehouse(id))
    }

    fn zone(&self, id: ZoneId) -> Result<Option<Versioned<Zone>>, StoreError> {
        get_typed(self, RecordKey::Zone(id))
    }

    fn stock_item(&self, id: StockItemId) -> Result<Option<Versioned<StockItem>>, StoreError> {
        get_typed(self, RecordKey::Stock(id))
    }

    fn catalog_record(&self, target: EntityRef) -> Result<Option<Versioned<CatalogRecord>>, StoreError> {
        get_typed(self, RecordKey::Catalog(target))
    }

    fn change_request(&self, id: ChangeRequestId) -> Result<Option<Versioned<ChangeRequest>>, StoreError> {
        get_typed(self, RecordKey::ChangeRequest(id))
    }

    fn transfer(&self, id: TransferId) -> Result<Option<Versioned<TransferRequest>>, StoreError> {
        get_typed(self, RecordKey::Transfer(id))
    }

    fn zones_in(&self, warehouse: WarehouseId) -> Result<Vec<Versioned<Zone>>, StoreError> {
        list_all(self, &RecordFilter::Zones { warehouse: Some(warehouse) })
    }

    fn stock_in(&self, zone: ZoneId) -> Result<Vec<Versioned<StockItem>>, StoreError> {
        list_all(self, &RecordFilter::Stock { zone: Some(zone) })
    }

    fn all_stock(&self) -> Result<Vec<Versioned<StockItem>>, StoreError> {
        list_all(self, &RecordFilter::Stock { zone: None })
    }

    fn transfers(&self, filter: &TransferFilter) -> Result<Vec<Versioned<TransferRequest>>, StoreError> {
        list_all(self, &RecordFilter::Transfers(filter.clone()))
    }

    fn catalog_records(&self, filter: &RecordFilter) -> Result<Vec<Versioned<CatalogRecord>>, StoreError> {
        list_all(self, filter)
    }

    fn pending_request_for(&self, target: EntityRef) -> Result<Option<ChangeRequestId>, StoreError> {
        let filter = RecordFilter::ChangeRequests(ChangeRequestFilter::pending_for(target));
        let page = self.list(&filter, Pagination { limit: 1, offset: 0 })?;
        Ok(page.items.into_iter().find_map(|row| match row.value {
            Record::ChangeRequest(r) => Some(r.id_typed()),
            _ => None,
        }))
    }
}

impl<S: InventoryStore + ?Sized> StoreExt for S {}
