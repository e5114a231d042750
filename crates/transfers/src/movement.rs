//! Working copy of the zones and stock placements touched by one operation.
//!
//! Every withdrawal and placement goes through the capacity ledger, so a
//! [`MoveSet`] produced here never leaves a zone outside `0 ..= total`. A failed
//! step leaves the working copy half-applied; callers discard it and commit nothing.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use rust_decimal::Decimal;

use wareflow_core::{AggregateId, DomainError};
use wareflow_storage::{StockItem, StockItemId, Zone, ZoneId, required_capacity};

use crate::error::TransferError;

/// The records to write back after a successful set of moves.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MoveSet {
    pub zones: Vec<Zone>,
    pub upserted: Vec<StockItem>,
    pub removed: Vec<StockItemId>,
}

#[derive(Debug, Default)]
pub struct StockMoves {
    zones: BTreeMap<ZoneId, Zone>,
    stock: BTreeMap<StockItemId, StockItem>,
    dirty_zones: BTreeSet<ZoneId>,
    dirty_stock: BTreeSet<StockItemId>,
    removed: BTreeSet<StockItemId>,
}

impl StockMoves {
    /// `stock` must include every placement of the zones a product may be placed into,
    /// so that matching lots are merged rather than duplicated.
    pub fn new(zones: impl IntoIterator<Item = Zone>, stock: impl IntoIterator<Item = StockItem>) -> Self {
        Self {
            zones: zones.into_iter().map(|z| (z.id_typed(), z)).collect(),
            stock: stock.into_iter().map(|s| (s.id_typed(), s)).collect(),
            ..Self::default()
        }
    }

    pub fn zone(&self, id: ZoneId) -> Option<&Zone> {
        self.zones.get(&id)
    }

    pub fn stock_item(&self, id: StockItemId) -> Option<&StockItem> {
        self.stock.get(&id)
    }

    /// Take `quantity` units out of a placement; an emptied placement is removed.
    pub fn withdraw(&mut self, item_id: StockItemId, quantity: u64, density: Decimal) -> Result<(), TransferError> {
        let item = self
            .stock
            .get_mut(&item_id)
            .ok_or_else(|| DomainError::not_found(format!("stock item {item_id}")))?;
        let zone = self
            .zones
            .get_mut(&item.zone_id())
            .ok_or_else(|| DomainError::not_found(format!("zone {}", item.zone_id())))?;

        let released = required_capacity(quantity, density)?;
        item.withdraw(quantity, density)?;
        zone.apply_delta(-released)?;
        self.dirty_zones.insert(zone.id_typed());

        if item.is_empty() {
            self.stock.remove(&item_id);
            self.dirty_stock.remove(&item_id);
            self.removed.insert(item_id);
        } else {
            self.dirty_stock.insert(item_id);
        }
        Ok(())
    }

    /// Put `quantity` units into `zone_id`, merging into a placement of the same lot.
    pub fn place(
        &mut self,
        zone_id: ZoneId,
        product_id: AggregateId,
        quantity: u64,
        expiry: Option<NaiveDate>,
        density: Decimal,
    ) -> Result<StockItemId, TransferError> {
        let zone = self
            .zones
            .get_mut(&zone_id)
            .ok_or_else(|| DomainError::not_found(format!("zone {zone_id}")))?;
        zone.apply_delta(required_capacity(quantity, density)?)?;
        self.dirty_zones.insert(zone_id);

        let lot = self
            .stock
            .values_mut()
            .find(|s| s.is_same_lot(zone_id, product_id, expiry));
        let id = match lot {
            Some(item) => {
                item.deposit(quantity, density)?;
                item.id_typed()
            }
            None => {
                let item = StockItem::new(StockItemId::generate(), zone_id, product_id, quantity, expiry, density)?;
                let id = item.id_typed();
                self.stock.insert(id, item);
                id
            }
        };
        self.dirty_stock.insert(id);
        Ok(id)
    }

    pub fn finish(mut self) -> MoveSet {
        MoveSet {
            zones: self
                .dirty_zones
                .iter()
                .filter_map(|id| self.zones.remove(id))
                .collect(),
            upserted: self
                .dirty_stock
                .iter()
                .filter_map(|id| self.stock.remove(id))
                .collect(),
            removed: self.removed.into_iter().collect(),
        }
    }
}
