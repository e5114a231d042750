//! Read-side queries. None of these take locks; they see the last committed state.

use serde_json::Value as JsonValue;

use wareflow_approvals::{ChangeRequest, ChangeRequestId};
use wareflow_catalog::{ApprovalState, CatalogRecord, EntityKind};
use wareflow_events::{EventBus, EventEnvelope};
use wareflow_storage::{StockItem, Warehouse, WarehouseId, Zone, ZoneId};
use wareflow_transfers::{TransferId, TransferRequest};

use super::Engine;
use crate::error::EngineError;
use crate::store::{
    ChangeRequestFilter, InventoryStore, Page, PageRequest, Record, RecordFilter, StoreError, StoreExt, TransferFilter,
    Versioned,
};

fn typed_page<T>(page: Page<Versioned<Record>>) -> Result<Page<T>, StoreError>
where
    T: TryFrom<Record, Error = Record>,
{
    let Page { items, total, pagination, has_more } = page;
    let items = items
        .into_iter()
        .map(|row| {
            let key = row.value.key();
            T::try_from(row.value).map_err(|_| StoreError::Corrupted { key })
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Page { items, total, pagination, has_more })
}

impl<S, B> Engine<S, B>
where
    S: InventoryStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    fn list_typed<T>(&self, filter: RecordFilter, page: PageRequest) -> Result<Page<T>, EngineError>
    where
        T: TryFrom<Record, Error = Record>,
    {
        let rows = self.store.list(&filter, self.page(page))?;
        Ok(typed_page(rows)?)
    }

    /// Change requests, oldest first.
    pub fn list_change_requests(
        &self,
        filter: ChangeRequestFilter,
        page: PageRequest,
    ) -> Result<Page<ChangeRequest>, EngineError> {
        self.list_typed(RecordFilter::ChangeRequests(filter), page)
    }

    pub fn get_change_request(&self, id: ChangeRequestId) -> Result<Option<ChangeRequest>, EngineError> {
        Ok(self.store.change_request(id)?.map(|row| row.value))
    }

    pub fn list_transfers(&self, filter: TransferFilter, page: PageRequest) -> Result<Page<TransferRequest>, EngineError> {
        self.list_typed(RecordFilter::Transfers(filter), page)
    }

    pub fn get_transfer(&self, id: TransferId) -> Result<Option<TransferRequest>, EngineError> {
        Ok(self.store.transfer(id)?.map(|row| row.value))
    }

    pub fn list_warehouses(&self, page: PageRequest) -> Result<Page<Warehouse>, EngineError> {
        self.list_typed(RecordFilter::Warehouses, page)
    }

    pub fn list_zones(&self, warehouse_id: WarehouseId, page: PageRequest) -> Result<Page<Zone>, EngineError> {
        self.list_typed(RecordFilter::Zones { warehouse: Some(warehouse_id) }, page)
    }

    pub fn list_stock(&self, zone_id: ZoneId, page: PageRequest) -> Result<Page<StockItem>, EngineError> {
        self.list_typed(RecordFilter::Stock { zone: Some(zone_id) }, page)
    }

    /// Master-data records of one kind; `approval: None` includes pending and rejected ones.
    pub fn list_catalog(
        &self,
        kind: EntityKind,
        approval: Option<ApprovalState>,
        page: PageRequest,
    ) -> Result<Page<CatalogRecord>, EngineError> {
        self.list_typed(RecordFilter::Catalog { kind: Some(kind), approval }, page)
    }

    pub fn list_categories(&self, page: PageRequest) -> Result<Page<CatalogRecord>, EngineError> {
        self.list_catalog(EntityKind::Category, Some(ApprovalState::Approved), page)
    }

    pub fn list_suppliers(&self, page: PageRequest) -> Result<Page<CatalogRecord>, EngineError> {
        self.list_catalog(EntityKind::Supplier, Some(ApprovalState::Approved), page)
    }

    pub fn list_products(&self, page: PageRequest) -> Result<Page<CatalogRecord>, EngineError> {
        self.list_catalog(EntityKind::Product, Some(ApprovalState::Approved), page)
    }

    pub fn list_shipments(&self, page: PageRequest) -> Result<Page<CatalogRecord>, EngineError> {
        self.list_catalog(EntityKind::IncomingShipment, Some(ApprovalState::Approved), page)
    }
}
