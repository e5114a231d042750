//! Activation guard: a location holding stock cannot be switched off.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::warehouse::{LocationStatus, Warehouse, WarehouseId};
use crate::zone::{Zone, ZoneId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ActivationError {
    #[error("zone {zone_id} still holds {used} of stock and cannot be deactivated")]
    ZoneHoldsInventory { zone_id: ZoneId, used: Decimal },

    #[error("warehouse {warehouse_id} still holds {used} of stock across {zones} zone(s)")]
    WarehouseHoldsInventory {
        warehouse_id: WarehouseId,
        used: Decimal,
        zones: usize,
    },
}

impl Zone {
    pub fn can_deactivate(&self) -> bool {
        self.used_capacity.is_zero()
    }

    pub fn deactivate(&mut self) -> Result<(), ActivationError> {
        if !self.can_deactivate() {
            return Err(ActivationError::ZoneHoldsInventory {
                zone_id: self.id_typed(),
                used: self.used_capacity,
            });
        }
        self.status = LocationStatus::Inactive;
        Ok(())
    }

    /// Reactivation has no inventory-based restriction.
    pub fn activate(&mut self) {
        self.status = LocationStatus::Active;
    }
}

impl Warehouse {
    /// Every zone of the warehouse must be empty.
    pub fn can_deactivate(&self, zones: &[Zone]) -> Result<(), ActivationError> {
        let holding: Vec<&Zone> = zones
            .iter()
            .filter(|z| z.warehouse_id() == self.id_typed() && !z.can_deactivate())
            .collect();
        if holding.is_empty() {
            return Ok(());
        }
        Err(ActivationError::WarehouseHoldsInventory {
            warehouse_id: self.id_typed(),
            used: holding.iter().map(|z| z.used_capacity()).sum(),
            zones: holding.len(),
        })
    }

    pub fn deactivate(&mut self, zones: &[Zone]) -> Result<(), ActivationError> {
        self.can_deactivate(zones)?;
        self.status = LocationStatus::Inactive;
        Ok(())
    }

    pub fn activate(&mut self) {
        self.status = LocationStatus::Active;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::warehouse::NewWarehouse;
    use crate::zone::fixtures::{zone, zone_in};

    #[test]
    fn empty_zone_deactivates() {
        let mut y = zone(100, 0);
        y.deactivate().unwrap();
        assert_eq!(y.status(), LocationStatus::Inactive);
    }

    #[test]
    fn zone_with_stock_stays_active() {
        let mut z = zone(100, 5);
        let err = z.deactivate().unwrap_err();
        assert!(matches!(err, ActivationError::ZoneHoldsInventory { used, .. } if used == Decimal::from(5)));
        assert_eq!(z.status(), LocationStatus::Active);
    }

    #[test]
    fn activation_is_unconditional() {
        let mut z = zone(100, 0);
        z.deactivate().unwrap();
        z.activate();
        assert!(z.is_active());
    }

    #[test]
    fn warehouse_deactivation_requires_all_zones_empty() {
        let mut w = Warehouse::create(
            WarehouseId::generate(),
            NewWarehouse { name: "East".into(), total_capacity: Decimal::from(1000) },
        )
        .unwrap();
        let zones = vec![zone_in(w.id_typed(), 100, 0), zone_in(w.id_typed(), 100, 7)];

        let err = w.deactivate(&zones).unwrap_err();
        assert!(matches!(err, ActivationError::WarehouseHoldsInventory { zones: 1, .. }));
        assert!(w.is_active());

        w.deactivate(&zones[..1]).unwrap();
        assert_eq!(w.status(), LocationStatus::Inactive);
    }
}
