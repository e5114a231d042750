//! The inventory engine.
//!
//! Every mutating operation follows the same pipeline:
//!
//! ```text
//! 1. Peek at the records to learn the full lock set
//! 2. Acquire the lock set (all or nothing)
//! 3. Re-read everything under the locks
//! 4. Validate and decide (pure domain code)
//! 5. Commit one WriteBatch, each write stamped with the row version it was read at
//! 6. Publish the lifecycle events, best effort
//! ```
//!
//! A failure at any step before 5 leaves the store untouched. Publication happens
//! after the commit and can never undo it.

mod admin;
mod approvals;
mod queries;
mod transfers;

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value as JsonValue;

use wareflow_catalog::{ApprovalState, CatalogRecord, EntityKind, EntityRef, Product};
use wareflow_core::{AggregateId, DomainError};
use wareflow_events::{Event, EventBus, EventEnvelope, publish_best_effort};
use wareflow_storage::{StockItem, StockItemId, Warehouse, WarehouseId, Zone, ZoneId};
use wareflow_transfers::MoveSet;

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::locks::{LockGuard, LockKey, LockManager};
use crate::store::{InventoryStore, PageRequest, Pagination, RecordKey, StoreExt, Versioned, WriteBatch};

pub const CHANGE_REQUEST_AGGREGATE: &str = "approvals.change_request";
pub const TRANSFER_AGGREGATE: &str = "transfers.transfer";

/// Lock key of a product's catalog row, held by every operation that places or
/// moves stock of the product so its density cannot change underneath.
pub(crate) fn product_key(product_id: AggregateId) -> LockKey {
    RecordKey::Catalog(EntityRef::new(EntityKind::Product, product_id)).into()
}

/// Approval gateway, transfer service and location administration over one store.
///
/// `S` is the persistence backend and `B` the notification sink; both are shared
/// across threads, so an `Engine` can sit behind an `Arc` and serve concurrent callers.
#[derive(Debug)]
pub struct Engine<S, B> {
    store: S,
    bus: B,
    locks: LockManager,
    config: EngineConfig,
}

impl<S, B> Engine<S, B> {
    pub fn new(store: S, bus: B, config: EngineConfig) -> Self {
        Self {
            store,
            bus,
            locks: LockManager::new(config.lock_timeout),
            config,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn page(&self, request: PageRequest) -> Pagination {
        Pagination::bounded(
            request.limit,
            request.offset,
            self.config.default_page_size,
            self.config.max_page_size,
        )
    }
}

impl<S, B> Engine<S, B>
where
    S: InventoryStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    fn lock(&self, keys: impl IntoIterator<Item = LockKey>) -> Result<LockGuard<'_>, EngineError> {
        Ok(self.locks.acquire(keys)?)
    }

    /// Publish events emitted by an aggregate that was at `prior_version` before them.
    fn publish<E>(&self, aggregate_id: AggregateId, aggregate_type: &'static str, prior_version: u64, events: &[E])
    where
        E: Event + Serialize,
    {
        for (offset, event) in events.iter().enumerate() {
            let sequence = prior_version + offset as u64 + 1;
            match EventEnvelope::from_typed(aggregate_id, aggregate_type, sequence, event) {
                Ok(envelope) => {
                    publish_best_effort(&self.bus, envelope);
                }
                Err(err) => {
                    tracing::warn!(
                        error = %err,
                        event_type = event.event_type(),
                        %aggregate_id,
                        "event could not be serialized; not published"
                    );
                }
            }
        }
    }

    fn require_zone(&self, id: ZoneId) -> Result<Versioned<Zone>, EngineError> {
        self.store
            .zone(id)?
            .ok_or_else(|| DomainError::not_found(format!("zone {id}")).into())
    }

    fn require_warehouse(&self, id: WarehouseId) -> Result<Versioned<Warehouse>, EngineError> {
        self.store
            .warehouse(id)?
            .ok_or_else(|| DomainError::not_found(format!("warehouse {id}")).into())
    }

    fn require_stock_item(&self, id: StockItemId) -> Result<Versioned<StockItem>, EngineError> {
        self.store
            .stock_item(id)?
            .ok_or_else(|| DomainError::not_found(format!("stock item {id}")).into())
    }

    /// Approved products only; stock can never refer to anything else.
    fn require_product(&self, id: AggregateId) -> Result<Product, EngineError> {
        let target = EntityRef::new(EntityKind::Product, id);
        let record = self
            .store
            .catalog_record(target)?
            .map(|row| row.value)
            .ok_or_else(|| DomainError::not_found(format!("product {id}")))?;
        match record {
            CatalogRecord::Product(product) if product.approval() == ApprovalState::Approved => {
                Ok(product)
            }
            CatalogRecord::Product(product) => Err(DomainError::validation(format!(
                "product {} is not approved",
                product.id_typed()
            ))
            .into()),
            _ => Err(EngineError::Internal(format!("{target} is stored under the wrong kind"))),
        }
    }

    /// Zones read under `guard`, failing if any was not covered by it.
    fn zones_under(&self, guard: &LockGuard<'_>, zones: Vec<Versioned<Zone>>) -> Result<Vec<Versioned<Zone>>, EngineError> {
        if let Some(stray) = zones
            .iter()
            .find(|z| !guard.covers(&RecordKey::Zone(z.value.id_typed()).into()))
        {
            return Err(EngineError::Conflict(format!(
                "zone {} appeared while the operation was starting",
                stray.value.id_typed()
            )));
        }
        Ok(zones)
    }
}

/// Row versions of the zones and stock placements an operation loaded.
///
/// Turns a [`MoveSet`] back into writes: known rows are updated at the version
/// they were read at, new placements are inserted.
#[derive(Debug, Default)]
pub(crate) struct LoadedRows {
    zones: BTreeMap<ZoneId, u64>,
    stock: BTreeMap<StockItemId, u64>,
}

impl LoadedRows {
    pub(crate) fn zone(&mut self, row: Versioned<Zone>) -> Zone {
        self.zones.insert(row.value.id_typed(), row.version);
        row.value
    }

    pub(crate) fn stock(&mut self, row: Versioned<StockItem>) -> StockItem {
        self.stock.insert(row.value.id_typed(), row.version);
        row.value
    }

    pub(crate) fn stage(&self, moves: MoveSet, batch: &mut WriteBatch) -> Result<(), EngineError> {
        for zone in moves.zones {
            let id = zone.id_typed();
            let version = self
                .zones
                .get(&id)
                .ok_or_else(|| EngineError::Internal(format!("zone {id} changed without being loaded")))?;
            batch.update(zone, *version);
        }
        for item in moves.upserted {
            match self.stock.get(&item.id_typed()) {
                Some(version) => batch.update(item, *version),
                None => batch.insert(item),
            };
        }
        for id in moves.removed {
            // A placement created and emptied within one operation was never stored.
            if let Some(version) = self.stock.get(&id) {
                batch.delete(RecordKey::Stock(id), *version);
            }
        }
        Ok(())
    }
}
