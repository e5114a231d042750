//! Capacity ledger: remaining-capacity arithmetic and its invariants.
//!
//! Every change to a zone's used capacity goes through [`Zone::apply_delta`], which
//! refuses any result outside `0 ..= total`. A zone whose stored usage already
//! exceeds its total is reported as corrupted, never clamped.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::warehouse::{LocationStatus, Warehouse, WarehouseId};
use crate::zone::{Zone, ZoneId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CapacityError {
    #[error("zone {zone_id} capacity exceeded: used {used} + {delta} exceeds total {total}")]
    CapacityExceeded {
        zone_id: ZoneId,
        total: Decimal,
        used: Decimal,
        delta: Decimal,
    },

    #[error("zone {zone_id} capacity would become negative: used {used} + {delta}")]
    NegativeCapacity {
        zone_id: ZoneId,
        used: Decimal,
        delta: Decimal,
    },

    #[error("zone {zone_id} ledger corrupted: used {used} exceeds total {total}")]
    LedgerCorrupted {
        zone_id: ZoneId,
        total: Decimal,
        used: Decimal,
    },

    #[error(
        "warehouse {warehouse_id} capacity exceeded: requested {requested}, remaining allowance {allowance}"
    )]
    WarehouseCapacityExceeded {
        warehouse_id: WarehouseId,
        requested: Decimal,
        allowance: Decimal,
    },

    #[error("capacity must be greater than zero (got {0})")]
    NonPositiveCapacity(Decimal),

    #[error("zone {zone_id} currently holds {used}; total capacity cannot drop to {requested}")]
    BelowUsedCapacity {
        zone_id: ZoneId,
        requested: Decimal,
        used: Decimal,
    },

    #[error("{quantity} units at density {density} exceed the largest representable capacity")]
    QuantityOverflow { quantity: u64, density: Decimal },

    #[error("capacity total overflowed adding {delta} to {base}")]
    TotalOverflow { base: Decimal, delta: Decimal },
}

impl CapacityError {
    /// Faults that indicate a concurrency bug or corrupted data rather than bad input.
    pub fn is_integrity_fault(&self) -> bool {
        matches!(
            self,
            CapacityError::CapacityExceeded { .. }
                | CapacityError::NegativeCapacity { .. }
                | CapacityError::LedgerCorrupted { .. }
        )
    }
}

/// Capacity consumed by `quantity` units of a product with the given density.
pub fn required_capacity(quantity: u64, density: Decimal) -> Result<Decimal, CapacityError> {
    Decimal::from(quantity)
        .checked_mul(density)
        .ok_or(CapacityError::QuantityOverflow { quantity, density })
}

/// Sum capacities without wrapping or panicking on overflow.
pub fn sum_capacity(parts: impl IntoIterator<Item = Decimal>) -> Result<Decimal, CapacityError> {
    parts.into_iter().try_fold(Decimal::ZERO, |base, delta| {
        base.checked_add(delta)
            .ok_or(CapacityError::TotalOverflow { base, delta })
    })
}

impl Zone {
    /// `total - used`. A negative result is a data-integrity fault.
    pub fn remaining_capacity(&self) -> Result<Decimal, CapacityError> {
        let remaining = self.total_capacity - self.used_capacity;
        if remaining < Decimal::ZERO || self.used_capacity < Decimal::ZERO {
            tracing::error!(
                zone_id = %self.id_typed(),
                total = %self.total_capacity,
                used = %self.used_capacity,
                "zone ledger corrupted"
            );
            return Err(CapacityError::LedgerCorrupted {
                zone_id: self.id_typed(),
                total: self.total_capacity,
                used: self.used_capacity,
            });
        }
        Ok(remaining)
    }

    pub fn can_accommodate(&self, required: Decimal) -> Result<bool, CapacityError> {
        Ok(required <= self.remaining_capacity()?)
    }

    /// Add `delta` (negative for outbound) to used capacity.
    pub fn apply_delta(&mut self, delta: Decimal) -> Result<(), CapacityError> {
        let next = self
            .used_capacity
            .checked_add(delta)
            .ok_or(CapacityError::TotalOverflow { base: self.used_capacity, delta })?;
        if next < Decimal::ZERO {
            tracing::error!(
                zone_id = %self.id_typed(),
                used = %self.used_capacity,
                delta = %delta,
                "refusing to drive zone capacity negative"
            );
            return Err(CapacityError::NegativeCapacity {
                zone_id: self.id_typed(),
                used: self.used_capacity,
                delta,
            });
        }
        if next > self.total_capacity {
            return Err(CapacityError::CapacityExceeded {
                zone_id: self.id_typed(),
                total: self.total_capacity,
                used: self.used_capacity,
                delta,
            });
        }

        self.used_capacity = next;
        Ok(())
    }

    /// Change the declared total after [`validate_zone_capacity_edit`] passed.
    pub fn set_total_capacity(&mut self, new_total: Decimal) -> Result<(), CapacityError> {
        if new_total <= Decimal::ZERO {
            return Err(CapacityError::NonPositiveCapacity(new_total));
        }
        if new_total < self.used_capacity {
            return Err(CapacityError::BelowUsedCapacity {
                zone_id: self.id_typed(),
                requested: new_total,
                used: self.used_capacity,
            });
        }
        self.total_capacity = new_total;
        Ok(())
    }
}

/// Check that a zone of `new_total` fits the warehouse budget.
///
/// `sibling_allocated` is the declared total capacity of every other zone in the
/// warehouse (the zone being edited excluded).
pub fn check_warehouse_allowance(
    warehouse_id: WarehouseId,
    new_total: Decimal,
    sibling_allocated: Decimal,
    warehouse_total: Decimal,
) -> Result<(), CapacityError> {
    if new_total <= Decimal::ZERO {
        return Err(CapacityError::NonPositiveCapacity(new_total));
    }
    let fits = new_total
        .checked_add(sibling_allocated)
        .is_some_and(|allocated| allocated <= warehouse_total);
    if !fits {
        return Err(CapacityError::WarehouseCapacityExceeded {
            warehouse_id,
            requested: new_total,
            allowance: warehouse_total - sibling_allocated,
        });
    }
    Ok(())
}

/// Validate an operator edit of a zone's declared total capacity.
pub fn validate_zone_capacity_edit(
    zone: &Zone,
    new_total: Decimal,
    sibling_allocated: Decimal,
    warehouse_total: Decimal,
) -> Result<(), CapacityError> {
    check_warehouse_allowance(zone.warehouse_id(), new_total, sibling_allocated, warehouse_total)?;
    if new_total < zone.used_capacity() {
        return Err(CapacityError::BelowUsedCapacity {
            zone_id: zone.id_typed(),
            requested: new_total,
            used: zone.used_capacity(),
        });
    }
    Ok(())
}

/// Point-in-time capacity view of one zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneCapacity {
    pub zone_id: ZoneId,
    pub warehouse_id: WarehouseId,
    pub total: Decimal,
    pub used: Decimal,
    pub remaining: Decimal,
    pub status: LocationStatus,
}

impl ZoneCapacity {
    pub fn of(zone: &Zone) -> Result<Self, CapacityError> {
        Ok(Self {
            zone_id: zone.id_typed(),
            warehouse_id: zone.warehouse_id(),
            total: zone.total_capacity(),
            used: zone.used_capacity(),
            remaining: zone.remaining_capacity()?,
            status: zone.status(),
        })
    }
}

/// Point-in-time capacity view of a warehouse, aggregated over its zones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarehouseCapacity {
    pub warehouse_id: WarehouseId,
    pub total: Decimal,
    /// Sum of the zones' declared totals.
    pub allocated: Decimal,
    /// Sum of the zones' used capacity.
    pub used: Decimal,
    /// `total - used`.
    pub remaining: Decimal,
    /// `total - allocated`: budget still available for new or larger zones.
    pub unallocated: Decimal,
    /// Remaining capacity summed over active zones only; stock can land nowhere else.
    pub placeable: Decimal,
    pub zone_count: usize,
}

impl WarehouseCapacity {
    /// Capacity an inbound move into this warehouse may consume.
    pub fn inbound_headroom(&self) -> Decimal {
        self.remaining.min(self.placeable)
    }
}

impl WarehouseCapacity {
    /// Aggregate `zones`; zones belonging to other warehouses are ignored.
    pub fn compute(warehouse: &Warehouse, zones: &[Zone]) -> Result<Self, CapacityError> {
        let mut allocated = Decimal::ZERO;
        let mut used = Decimal::ZERO;
        let mut placeable = Decimal::ZERO;
        let mut zone_count = 0;

        for zone in zones.iter().filter(|z| z.warehouse_id() == warehouse.id_typed()) {
            // Surfaces corrupted zones instead of folding them into the sum.
            let remaining = zone.remaining_capacity()?;
            if zone.is_active() {
                placeable += remaining;
            }
            allocated += zone.total_capacity();
            used += zone.used_capacity();
            zone_count += 1;
        }

        Ok(Self {
            warehouse_id: warehouse.id_typed(),
            total: warehouse.total_capacity(),
            allocated,
            used,
            remaining: warehouse.total_capacity() - used,
            unallocated: warehouse.total_capacity() - allocated,
            placeable,
            zone_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::warehouse::NewWarehouse;
    use crate::zone::fixtures::{zone, zone_in};

    fn d(v: i64) -> Decimal {
        Decimal::from(v)
    }

    #[test]
    fn remaining_is_total_minus_used() {
        assert_eq!(zone(100, 80).remaining_capacity().unwrap(), d(20));
    }

    #[test]
    fn corrupted_usage_is_reported_not_clamped() {
        let err = zone(100, 120).remaining_capacity().unwrap_err();
        assert!(err.is_integrity_fault());
        assert!(matches!(err, CapacityError::LedgerCorrupted { used, .. } if used == d(120)));
    }

    #[test]
    fn can_accommodate_is_inclusive() {
        let z = zone(100, 80);
        assert!(z.can_accommodate(d(20)).unwrap());
        assert!(!z.can_accommodate(d(30)).unwrap());
    }

    #[test]
    fn apply_delta_rejects_overflow_and_underflow() {
        let mut z = zone(100, 80);

        let over = z.apply_delta(d(21)).unwrap_err();
        assert!(matches!(over, CapacityError::CapacityExceeded { .. }));

        let under = z.apply_delta(d(-81)).unwrap_err();
        assert!(matches!(under, CapacityError::NegativeCapacity { .. }));

        assert_eq!(z.used_capacity(), d(80));

        z.apply_delta(d(-80)).unwrap();
        assert_eq!(z.used_capacity(), Decimal::ZERO);
    }

    #[test]
    fn capacity_arithmetic_refuses_to_overflow() {
        let huge = Decimal::from(10_000_000_000u64);
        assert!(matches!(
            required_capacity(u64::MAX, huge),
            Err(CapacityError::QuantityOverflow { quantity: u64::MAX, .. })
        ));
        assert_eq!(required_capacity(3, d(2)).unwrap(), d(6));

        assert!(matches!(
            sum_capacity([Decimal::MAX, d(1)]),
            Err(CapacityError::TotalOverflow { .. })
        ));
        assert_eq!(sum_capacity([d(1), d(2), d(3)]).unwrap(), d(6));

        let mut z = zone(100, 80);
        assert!(matches!(z.apply_delta(Decimal::MAX), Err(CapacityError::TotalOverflow { .. })));
        assert_eq!(z.used_capacity(), d(80));
    }

    #[test]
    fn capacity_edit_cites_remaining_allowance() {
        let z = zone(100, 10);
        let err = validate_zone_capacity_edit(&z, d(300), d(800), d(1000)).unwrap_err();
        match err {
            CapacityError::WarehouseCapacityExceeded { requested, allowance, .. } => {
                assert_eq!(requested, d(300));
                assert_eq!(allowance, d(200));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(validate_zone_capacity_edit(&z, d(200), d(800), d(1000)).is_ok());
    }

    #[test]
    fn capacity_edit_rejects_zero_and_shrinking_below_usage() {
        let z = zone(100, 40);
        assert!(matches!(
            validate_zone_capacity_edit(&z, Decimal::ZERO, d(0), d(1000)),
            Err(CapacityError::NonPositiveCapacity(_))
        ));
        assert!(matches!(
            validate_zone_capacity_edit(&z, d(39), d(0), d(1000)),
            Err(CapacityError::BelowUsedCapacity { .. })
        ));
    }

    #[test]
    fn warehouse_capacity_sums_only_its_own_zones() {
        let w = Warehouse::create(
            WarehouseId::generate(),
            NewWarehouse { name: "Main".into(), total_capacity: d(500) },
        )
        .unwrap();

        let a = zone_in(w.id_typed(), 100, 30);
        let b = zone_in(w.id_typed(), 200, 50);
        let stranger = zone(300, 300);

        let cap = WarehouseCapacity::compute(&w, &[a, b, stranger]).unwrap();
        assert_eq!(cap.allocated, d(300));
        assert_eq!(cap.used, d(80));
        assert_eq!(cap.remaining, d(420));
        assert_eq!(cap.unallocated, d(200));
        assert_eq!(cap.placeable, d(220));
        assert_eq!(cap.inbound_headroom(), d(220));
        assert_eq!(cap.zone_count, 2);
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: used capacity stays within `0 ..= total` whatever deltas are attempted.
            #[test]
            fn used_never_leaves_bounds(
                total in 1i64..1_000,
                deltas in proptest::collection::vec(-500i64..500, 0..50)
            ) {
                let mut z = zone(total, 0);
                for delta in deltas {
                    let before = z.used_capacity();
                    match z.apply_delta(Decimal::from(delta)) {
                        Ok(()) => prop_assert_eq!(z.used_capacity(), before + Decimal::from(delta)),
                        Err(_) => prop_assert_eq!(z.used_capacity(), before),
                    }
                    prop_assert!(z.used_capacity() >= Decimal::ZERO);
                    prop_assert!(z.used_capacity() <= z.total_capacity());
                }
            }

            /// Property: an accepted edit never pushes allocated zone totals past the warehouse.
            #[test]
            fn accepted_edits_respect_warehouse_total(
                warehouse_total in 1i64..10_000,
                siblings in 0i64..10_000,
                new_total in 1i64..10_000
            ) {
                let z = zone(new_total.max(1), 0);
                if validate_zone_capacity_edit(&z, d(new_total), d(siblings), d(warehouse_total)).is_ok() {
                    prop_assert!(new_total + siblings <= warehouse_total);
                }
            }
        }
    }
}
