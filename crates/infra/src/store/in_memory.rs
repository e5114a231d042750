use std::collections::{BTreeMap, BTreeSet};
use std::sync::RwLock;

use super::batch::{WriteBatch, WriteOp};
use super::query::{Page, Pagination, RecordFilter};
use super::record::{Record, RecordKey, Versioned};
use super::r#trait::{InventoryStore, StoreError};

/// In-memory store.
///
/// Intended for tests/dev. A single lock guards every table, which makes each
/// commit trivially atomic.
#[derive(Debug, Default)]
pub struct InMemoryInventoryStore {
    rows: RwLock<BTreeMap<RecordKey, Versioned<Record>>>,
}

impl InMemoryInventoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.read().map(|rows| rows.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned() -> StoreError {
    StoreError::Unavailable("lock poisoned".to_string())
}

impl InventoryStore for InMemoryInventoryStore {
    fn get(&self, key: RecordKey) -> Result<Option<Versioned<Record>>, StoreError> {
        let rows = self.rows.read().map_err(|_| poisoned())?;
        Ok(rows.get(&key).cloned())
    }

    fn list(&self, filter: &RecordFilter, page: Pagination) -> Result<Page<Versioned<Record>>, StoreError> {
        let rows = self.rows.read().map_err(|_| poisoned())?;
        let matching: Vec<&Versioned<Record>> = rows.values().filter(|row| filter.matches(&row.value)).collect();

        let total = matching.len() as u64;
        let items: Vec<Versioned<Record>> = matching
            .into_iter()
            .skip(page.offset as usize)
            .take(page.limit as usize)
            .cloned()
            .collect();
        let has_more = u64::from(page.offset) + (items.len() as u64) < total;

        Ok(Page {
            items,
            total,
            pagination: page,
            has_more,
        })
    }

    fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
        if batch.is_empty() {
            return Ok(());
        }

        let mut seen = BTreeSet::new();
        for key in batch.keys() {
            if !seen.insert(key) {
                return Err(StoreError::InvalidBatch(format!("{key} written twice")));
            }
        }

        let mut rows = self.rows.write().map_err(|_| poisoned())?;

        // Check everything before touching anything.
        for write in batch.writes() {
            let key = write.key();
            let actual = rows.get(&key).map(|row| row.version);
            if !write.expected.matches(actual) {
                return Err(StoreError::Concurrency {
                    key,
                    expected: write.expected,
                    actual,
                });
            }
        }

        for write in batch.into_writes() {
            match write.op {
                WriteOp::Put(record) => {
                    let key = record.key();
                    let version = rows.get(&key).map(|row| row.version).unwrap_or(0) + 1;
                    rows.insert(key, Versioned::new(version, record));
                }
                WriteOp::Delete(key) => {
                    rows.remove(&key);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreExt;
    use rust_decimal::Decimal;
    use wareflow_core::ExpectedVersion;
    use wareflow_storage::{NewWarehouse, Warehouse, WarehouseId};

    fn warehouse(name: &str) -> Warehouse {
        Warehouse::create(
            WarehouseId::generate(),
            NewWarehouse { name: name.into(), total_capacity: Decimal::from(100) },
        )
        .unwrap()
    }

    #[test]
    fn insert_then_update_bumps_version() {
        let store = InMemoryInventoryStore::new();
        let w = warehouse("North");

        let mut batch = WriteBatch::new();
        batch.insert(w.clone());
        store.commit(batch).unwrap();
        assert_eq!(store.warehouse(w.id_typed()).unwrap().unwrap().version, 1);

        let mut batch = WriteBatch::new();
        batch.update(w.clone(), 1);
        store.commit(batch).unwrap();
        assert_eq!(store.warehouse(w.id_typed()).unwrap().unwrap().version, 2);
    }

    #[test]
    fn stale_write_rejects_whole_batch() {
        let store = InMemoryInventoryStore::new();
        let a = warehouse("A");
        let mut batch = WriteBatch::new();
        batch.insert(a.clone());
        store.commit(batch).unwrap();

        let b = warehouse("B");
        let mut batch = WriteBatch::new();
        batch.insert(b.clone()).update(a.clone(), 7);
        let err = store.commit(batch).unwrap_err();

        assert_eq!(
            err,
            StoreError::Concurrency {
                key: RecordKey::Warehouse(a.id_typed()),
                expected: ExpectedVersion::Exact(7),
                actual: Some(1),
            }
        );
        assert!(store.warehouse(b.id_typed()).unwrap().is_none());
    }

    #[test]
    fn duplicate_insert_conflicts() {
        let store = InMemoryInventoryStore::new();
        let a = warehouse("A");
        let mut batch = WriteBatch::new();
        batch.insert(a.clone());
        store.commit(batch.clone()).unwrap();
        assert!(matches!(store.commit(batch), Err(StoreError::Concurrency { actual: Some(1), .. })));
    }

    #[test]
    fn list_pages_in_key_order() {
        let store = InMemoryInventoryStore::new();
        let mut batch = WriteBatch::new();
        for name in ["A", "B", "C", "D", "E"] {
            batch.insert(warehouse(name));
        }
        store.commit(batch).unwrap();

        let first = store.list(&RecordFilter::Warehouses, Pagination { limit: 2, offset: 0 }).unwrap();
        assert_eq!(first.total, 5);
        assert_eq!(first.items.len(), 2);
        assert!(first.has_more);

        let last = store.list(&RecordFilter::Warehouses, Pagination { limit: 2, offset: 4 }).unwrap();
        assert_eq!(last.items.len(), 1);
        assert!(!last.has_more);
    }

    #[test]
    fn delete_requires_current_version() {
        let store = InMemoryInventoryStore::new();
        let a = warehouse("A");
        let mut batch = WriteBatch::new();
        batch.insert(a.clone());
        store.commit(batch).unwrap();

        let key = RecordKey::Warehouse(a.id_typed());
        let mut stale = WriteBatch::new();
        stale.delete(key, 2);
        assert!(store.commit(stale).is_err());

        let mut ok = WriteBatch::new();
        ok.delete(key, 1);
        store.commit(ok).unwrap();
        assert!(store.is_empty());
    }
}
