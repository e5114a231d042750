//! Location administration and capacity views.

use rust_decimal::Decimal;
use serde_json::Value as JsonValue;
use tracing::instrument;

use wareflow_core::names_collide;
use wareflow_events::{EventBus, EventEnvelope};
use wareflow_storage::{
    NewWarehouse, NewZone, Warehouse, WarehouseCapacity, WarehouseId, Zone, ZoneCapacity, ZoneId,
    check_warehouse_allowance, validate_zone_capacity_edit,
};

use super::Engine;
use crate::error::EngineError;
use crate::locks::LockKey;
use crate::store::{InventoryStore, RecordKey, StoreExt, Versioned, WriteBatch};

impl<S, B> Engine<S, B>
where
    S: InventoryStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    #[instrument(skip(self, input), fields(name = %input.name, total = %input.total_capacity))]
    pub fn create_warehouse(&self, input: NewWarehouse) -> Result<Warehouse, EngineError> {
        let warehouse = Warehouse::create(WarehouseId::generate(), input)
            .map_err(|e| EngineError::from(e).logged("create_warehouse"))?;
        let mut batch = WriteBatch::new();
        batch.insert(warehouse.clone());
        self.store
            .commit(batch)
            .map_err(|e| EngineError::from(e).logged("create_warehouse"))?;

        tracing::info!(warehouse_id = %warehouse.id_typed(), "warehouse created");
        Ok(warehouse)
    }

    /// Add a zone; its name must be unique in the warehouse (case-insensitive) and
    /// its capacity must fit what the other zones leave of the warehouse total.
    #[instrument(skip(self, input), fields(warehouse_id = %input.warehouse_id, name = %input.name))]
    pub fn create_zone(&self, input: NewZone) -> Result<Zone, EngineError> {
        self.try_create_zone(input).map_err(|e| e.logged("create_zone"))
    }

    fn try_create_zone(&self, input: NewZone) -> Result<Zone, EngineError> {
        let warehouse_id = input.warehouse_id;
        let _guard = self.lock([LockKey::from(RecordKey::Warehouse(warehouse_id))])?;

        let warehouse = self.require_warehouse(warehouse_id)?.value;
        let siblings = self.store.zones_in(warehouse_id)?;
        if siblings.iter().any(|z| names_collide(z.value.name(), &input.name)) {
            return Err(EngineError::DuplicateZoneName {
                warehouse_id,
                name: input.name.trim().to_string(),
            });
        }
        let allocated: Decimal = siblings.iter().map(|z| z.value.total_capacity()).sum();
        check_warehouse_allowance(warehouse_id, input.total_capacity, allocated, warehouse.total_capacity())?;

        let zone = Zone::create(ZoneId::generate(), input)?;
        let mut batch = WriteBatch::new();
        batch.insert(zone.clone());
        self.store.commit(batch)?;

        tracing::info!(zone_id = %zone.id_typed(), %warehouse_id, total = %zone.total_capacity(), "zone created");
        Ok(zone)
    }

    /// Change a zone's declared total capacity.
    #[instrument(skip(self), fields(%zone_id, %new_total))]
    pub fn edit_zone_capacity(&self, zone_id: ZoneId, new_total: Decimal) -> Result<Zone, EngineError> {
        self.try_edit_zone_capacity(zone_id, new_total)
            .map_err(|e| e.logged("edit_zone_capacity"))
    }

    fn try_edit_zone_capacity(&self, zone_id: ZoneId, new_total: Decimal) -> Result<Zone, EngineError> {
        let warehouse_id = self.require_zone(zone_id)?.value.warehouse_id();
        let _guard = self.lock([
            LockKey::from(RecordKey::Warehouse(warehouse_id)),
            RecordKey::Zone(zone_id).into(),
        ])?;

        let Versioned { version, value: mut zone } = self.require_zone(zone_id)?;
        let warehouse = self.require_warehouse(warehouse_id)?.value;
        let siblings: Decimal = self
            .store
            .zones_in(warehouse_id)?
            .iter()
            .filter(|z| z.value.id_typed() != zone_id)
            .map(|z| z.value.total_capacity())
            .sum();
        validate_zone_capacity_edit(&zone, new_total, siblings, warehouse.total_capacity())?;
        zone.set_total_capacity(new_total)?;

        let mut batch = WriteBatch::new();
        batch.update(zone.clone(), version);
        self.store.commit(batch)?;

        tracing::info!(%zone_id, %new_total, "zone capacity changed");
        Ok(zone)
    }

    #[instrument(skip(self), fields(%zone_id))]
    pub fn activate_zone(&self, zone_id: ZoneId) -> Result<Zone, EngineError> {
        self.update_zone(zone_id, |zone| {
            zone.activate();
            Ok(())
        })
        .map_err(|e| e.logged("activate_zone"))
    }

    /// Fails with `ActiveInventoryPresent` while the zone holds any stock.
    #[instrument(skip(self), fields(%zone_id))]
    pub fn deactivate_zone(&self, zone_id: ZoneId) -> Result<Zone, EngineError> {
        self.update_zone(zone_id, |zone| Ok(zone.deactivate()?))
            .map_err(|e| e.logged("deactivate_zone"))
    }

    fn update_zone(
        &self,
        zone_id: ZoneId,
        change: impl FnOnce(&mut Zone) -> Result<(), EngineError>,
    ) -> Result<Zone, EngineError> {
        let _guard = self.lock([LockKey::from(RecordKey::Zone(zone_id))])?;
        let Versioned { version, value: mut zone } = self.require_zone(zone_id)?;
        change(&mut zone)?;

        let mut batch = WriteBatch::new();
        batch.update(zone.clone(), version);
        self.store.commit(batch)?;

        tracing::info!(%zone_id, status = ?zone.status(), "zone status changed");
        Ok(zone)
    }

    #[instrument(skip(self), fields(%warehouse_id))]
    pub fn activate_warehouse(&self, warehouse_id: WarehouseId) -> Result<Warehouse, EngineError> {
        self.update_warehouse(warehouse_id, |warehouse, _| {
            warehouse.activate();
            Ok(())
        })
        .map_err(|e| e.logged("activate_warehouse"))
    }

    /// Every zone of the warehouse must be empty.
    #[instrument(skip(self), fields(%warehouse_id))]
    pub fn deactivate_warehouse(&self, warehouse_id: WarehouseId) -> Result<Warehouse, EngineError> {
        self.update_warehouse(warehouse_id, |warehouse, zones| Ok(warehouse.deactivate(zones)?))
            .map_err(|e| e.logged("deactivate_warehouse"))
    }

    fn update_warehouse(
        &self,
        warehouse_id: WarehouseId,
        change: impl FnOnce(&mut Warehouse, &[Zone]) -> Result<(), EngineError>,
    ) -> Result<Warehouse, EngineError> {
        let mut keys = vec![LockKey::from(RecordKey::Warehouse(warehouse_id))];
        keys.extend(
            self.store
                .zones_in(warehouse_id)?
                .iter()
                .map(|z| LockKey::from(RecordKey::Zone(z.value.id_typed()))),
        );
        let guard = self.lock(keys)?;

        let Versioned { version, value: mut warehouse } = self.require_warehouse(warehouse_id)?;
        let zones: Vec<Zone> = self
            .zones_under(&guard, self.store.zones_in(warehouse_id)?)?
            .into_iter()
            .map(|row| row.value)
            .collect();
        change(&mut warehouse, &zones)?;

        let mut batch = WriteBatch::new();
        batch.update(warehouse.clone(), version);
        self.store.commit(batch)?;

        tracing::info!(%warehouse_id, status = ?warehouse.status(), "warehouse status changed");
        Ok(warehouse)
    }

    pub fn get_zone_capacity(&self, zone_id: ZoneId) -> Result<ZoneCapacity, EngineError> {
        let zone = self.require_zone(zone_id)?.value;
        ZoneCapacity::of(&zone).map_err(|e| EngineError::from(e).logged("get_zone_capacity"))
    }

    pub fn get_warehouse_capacity(&self, warehouse_id: WarehouseId) -> Result<WarehouseCapacity, EngineError> {
        let warehouse = self.require_warehouse(warehouse_id)?.value;
        let zones: Vec<Zone> = self
            .store
            .zones_in(warehouse_id)?
            .into_iter()
            .map(|row| row.value)
            .collect();
        WarehouseCapacity::compute(&warehouse, &zones).map_err(|e| EngineError::from(e).logged("get_warehouse_capacity"))
    }

    /// Whether the zone holds no stock and may be deactivated.
    pub fn can_zone_deactivate(&self, zone_id: ZoneId) -> Result<bool, EngineError> {
        Ok(self.require_zone(zone_id)?.value.can_deactivate())
    }
}
