//! Transfer validation.
//!
//! Lines are checked in order and the first failure aborts the request:
//! available stock, then storage compatibility, then the warehouse rule for the
//! transfer kind. Only when every line passes is the summed capacity compared with
//! what the destination has left.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use wareflow_catalog::Product;
use wareflow_core::{DomainError, NamedEntity};
use wareflow_storage::{
    StockItem, Warehouse, WarehouseCapacity, WarehouseId, Zone, ZoneId, sum_capacity,
};

use crate::error::TransferError;
use crate::request::{InTransitLine, TransferDestination, TransferKind, TransferRequest};

/// A requested line with the records it refers to.
#[derive(Debug, Clone, Copy)]
pub struct LineContext<'a> {
    pub stock: &'a StockItem,
    pub product: &'a Product,
    pub quantity: u64,
}

/// The destination as loaded from the store.
#[derive(Debug, Clone, Copy)]
pub enum DestinationView<'a> {
    Zone(&'a Zone),
    /// A warehouse and all of its zones.
    Warehouse { warehouse: &'a Warehouse, zones: &'a [Zone] },
}

impl DestinationView<'_> {
    fn as_destination(&self) -> TransferDestination {
        match self {
            DestinationView::Zone(z) => TransferDestination::Zone(z.id_typed()),
            DestinationView::Warehouse { warehouse, .. } => TransferDestination::Warehouse(warehouse.id_typed()),
        }
    }

    fn warehouse_id(&self) -> WarehouseId {
        match self {
            DestinationView::Zone(z) => z.warehouse_id(),
            DestinationView::Warehouse { warehouse, .. } => warehouse.id_typed(),
        }
    }

    fn is_active(&self) -> bool {
        match self {
            DestinationView::Zone(z) => z.is_active(),
            DestinationView::Warehouse { warehouse, .. } => warehouse.is_active(),
        }
    }

    /// Capacity still available to inbound stock.
    fn remaining(&self) -> Result<Decimal, TransferError> {
        Ok(match self {
            DestinationView::Zone(z) => z.remaining_capacity()?,
            DestinationView::Warehouse { warehouse, zones } => {
                WarehouseCapacity::compute(warehouse, zones)?.inbound_headroom()
            }
        })
    }

    fn check_compatibility(&self, product: &Product) -> Result<(), TransferError> {
        let reasons = match self {
            DestinationView::Zone(z) => match product.storage().check(z) {
                Ok(()) => return Ok(()),
                Err(reason) => vec![reason],
            },
            DestinationView::Warehouse { warehouse, zones } => {
                let mut reasons = Vec::new();
                for zone in zones
                    .iter()
                    .filter(|z| z.warehouse_id() == warehouse.id_typed() && z.is_active())
                {
                    match product.storage().check(zone) {
                        Ok(()) => return Ok(()),
                        Err(reason) => reasons.push(reason),
                    }
                }
                reasons
            }
        };
        Err(TransferError::IncompatibleStorage {
            product: product.name().to_string(),
            reasons,
        })
    }
}

/// Outcome of a successful validation: everything needed to execute the transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferPlan {
    pub kind: TransferKind,
    pub source_zone: ZoneId,
    pub source_warehouse: WarehouseId,
    pub destination: TransferDestination,
    pub lines: Vec<InTransitLine>,
    /// `Σ quantity × density` over all lines.
    pub required: Decimal,
}

fn check_warehouse_rule(kind: TransferKind, source: &Zone, destination: &DestinationView<'_>) -> Result<(), TransferError> {
    let source_warehouse = source.warehouse_id();
    let destination_warehouse = destination.warehouse_id();
    match kind {
        TransferKind::ZoneTransfer if source_warehouse != destination_warehouse => {
            Err(TransferError::CrossWarehouseNotAllowed {
                source_warehouse,
                destination_warehouse,
            })
        }
        TransferKind::WarehouseTransfer if source_warehouse == destination_warehouse => {
            Err(TransferError::SameWarehouseNotAllowed {
                warehouse: source_warehouse,
            })
        }
        _ => Ok(()),
    }
}

fn check_shape(kind: TransferKind, source: &Zone, destination: &DestinationView<'_>, line_count: usize) -> Result<(), DomainError> {
    match (kind, destination) {
        (TransferKind::ZoneTransfer, DestinationView::Zone(z)) => {
            if z.id_typed() == source.id_typed() {
                return Err(DomainError::validation("source and destination zone are the same"));
            }
        }
        (TransferKind::WarehouseTransfer, DestinationView::Warehouse { .. }) => {}
        (kind, _) => {
            return Err(DomainError::validation(format!(
                "{kind:?} cannot target {:?}",
                destination.as_destination()
            )));
        }
    }
    if line_count == 0 {
        return Err(DomainError::validation("transfer must contain at least one line"));
    }
    if !destination.is_active() {
        return Err(DomainError::validation(format!(
            "destination {:?} is inactive",
            destination.as_destination()
        )));
    }
    Ok(())
}

/// Validate a transfer request against current state without changing anything.
pub fn validate_transfer(
    kind: TransferKind,
    source: &Zone,
    destination: DestinationView<'_>,
    lines: &[LineContext<'_>],
) -> Result<TransferPlan, TransferError> {
    check_shape(kind, source, &destination, lines.len())?;

    let mut planned: Vec<InTransitLine> = Vec::with_capacity(lines.len());
    for line in lines {
        let stock = line.stock;
        if stock.zone_id() != source.id_typed() {
            return Err(DomainError::validation(format!(
                "stock item {} is not in source zone {}",
                stock.id_typed(),
                source.id_typed()
            ))
            .into());
        }
        if stock.product_id() != line.product.id_typed().aggregate_id() {
            return Err(DomainError::invariant(format!(
                "stock item {} does not hold product {}",
                stock.id_typed(),
                line.product.id_typed()
            ))
            .into());
        }

        // Lines may repeat a placement; they draw on the same quantity.
        let already: u64 = planned
            .iter()
            .filter(|p| p.stock_item == stock.id_typed())
            .map(|p| p.quantity)
            .sum();
        let available = stock.quantity().saturating_sub(already);
        if line.quantity == 0 || line.quantity > available {
            return Err(TransferError::InsufficientStock {
                product: line.product.name().to_string(),
                requested: line.quantity,
                available,
            });
        }

        destination.check_compatibility(line.product)?;
        check_warehouse_rule(kind, source, &destination)?;

        planned.push(InTransitLine {
            stock_item: stock.id_typed(),
            product_id: stock.product_id(),
            product_name: line.product.name().to_string(),
            quantity: line.quantity,
            expiry: stock.expiry(),
            capacity: line.product.capacity_for(line.quantity)?,
        });
    }

    let required = sum_capacity(planned.iter().map(|l| l.capacity))?;
    let remaining = destination.remaining()?;
    if required > remaining {
        tracing::debug!(%required, %remaining, "transfer exceeds destination capacity");
        return Err(TransferError::DestinationCapacityExceeded { required, remaining });
    }

    Ok(TransferPlan {
        kind,
        source_zone: source.id_typed(),
        source_warehouse: source.warehouse_id(),
        destination: destination.as_destination(),
        lines: planned,
        required,
    })
}

/// Validate placing a pending warehouse transfer into `zone`.
///
/// `products` must hold the product of every in-transit line.
pub fn validate_receipt(transfer: &TransferRequest, zone: &Zone, products: &[Product]) -> Result<(), TransferError> {
    let Some(plan) = transfer.plan() else {
        return Err(DomainError::not_found(format!("transfer {}", transfer.id_typed())).into());
    };
    if plan.destination != TransferDestination::Warehouse(zone.warehouse_id()) {
        return Err(DomainError::validation(format!(
            "zone {} is not in the destination warehouse of transfer {}",
            zone.id_typed(),
            transfer.id_typed()
        ))
        .into());
    }
    if !zone.is_active() {
        return Err(DomainError::validation(format!("zone {} is inactive", zone.id_typed())).into());
    }

    for line in &plan.lines {
        let product = products
            .iter()
            .find(|p| p.id_typed().aggregate_id() == line.product_id)
            .ok_or_else(|| DomainError::not_found(format!("product {}", line.product_id)))?;
        DestinationView::Zone(zone).check_compatibility(product)?;
    }

    let required = plan.required;
    let remaining = zone.remaining_capacity()?;
    if required > remaining {
        return Err(TransferError::DestinationCapacityExceeded { required, remaining });
    }
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use wareflow_core::UserId;

    fn one_line<'a>(stock: &'a StockItem, product: &'a Product, quantity: u64) -> [LineContext<'a>; 1] {
        [LineContext { stock, product, quantity }]
    }

    #[test]
    fn required_capacity_over_remaining_is_refused() {
        let w = warehouse(1000);
        let source = zone(w.id_typed(), (0, 10), 200, 100);
        let dest = zone(w.id_typed(), (0, 10), 100, 80);
        let milk = product("Milk", (2, 8), 2);
        let held = stock(&source, &milk, 50);

        let err = validate_transfer(
            TransferKind::ZoneTransfer,
            &source,
            DestinationView::Zone(&dest),
            &one_line(&held, &milk, 15),
        )
        .unwrap_err();

        assert_eq!(
            err,
            TransferError::DestinationCapacityExceeded { required: Decimal::from(30), remaining: Decimal::from(20) }
        );
    }

    #[test]
    fn zone_transfer_across_warehouses_is_refused() {
        let source = zone(WarehouseId::generate(), (0, 10), 200, 100);
        let dest = zone(WarehouseId::generate(), (0, 10), 200, 0);
        let milk = product("Milk", (2, 8), 1);
        let held = stock(&source, &milk, 10);

        let err = validate_transfer(
            TransferKind::ZoneTransfer,
            &source,
            DestinationView::Zone(&dest),
            &one_line(&held, &milk, 5),
        )
        .unwrap_err();
        assert!(matches!(err, TransferError::CrossWarehouseNotAllowed { .. }));
    }

    #[test]
    fn stock_is_checked_before_compatibility() {
        let w = warehouse(1000);
        let source = zone(w.id_typed(), (0, 10), 200, 100);
        let freezer = zone(w.id_typed(), (-20, -10), 200, 0);
        let milk = product("Milk", (2, 8), 1);
        let held = stock(&source, &milk, 10);

        let err = validate_transfer(
            TransferKind::ZoneTransfer,
            &source,
            DestinationView::Zone(&freezer),
            &one_line(&held, &milk, 11),
        )
        .unwrap_err();
        assert_eq!(
            err,
            TransferError::InsufficientStock { product: "Milk".into(), requested: 11, available: 10 }
        );

        let err = validate_transfer(
            TransferKind::ZoneTransfer,
            &source,
            DestinationView::Zone(&freezer),
            &one_line(&held, &milk, 10),
        )
        .unwrap_err();
        assert!(matches!(err, TransferError::IncompatibleStorage { ref reasons, .. } if reasons.len() == 1));
    }

    #[test]
    fn repeated_lines_share_the_available_quantity() {
        let w = warehouse(1000);
        let source = zone(w.id_typed(), (0, 10), 200, 100);
        let dest = zone(w.id_typed(), (0, 10), 200, 0);
        let milk = product("Milk", (2, 8), 1);
        let held = stock(&source, &milk, 10);
        let lines = [
            LineContext { stock: &held, product: &milk, quantity: 6 },
            LineContext { stock: &held, product: &milk, quantity: 6 },
        ];

        let err = validate_transfer(TransferKind::ZoneTransfer, &source, DestinationView::Zone(&dest), &lines)
            .unwrap_err();
        assert!(matches!(err, TransferError::InsufficientStock { available: 4, .. }));
    }

    #[test]
    fn warehouse_transfer_needs_one_compatible_active_zone() {
        let origin = warehouse(1000);
        let source = zone(origin.id_typed(), (0, 10), 200, 100);
        let target = warehouse(1000);
        let zones = vec![zone(target.id_typed(), (-20, -10), 300, 0), zone(target.id_typed(), (0, 10), 100, 40)];
        let milk = product("Milk", (2, 8), 2);
        let held = stock(&source, &milk, 50);

        let plan = validate_transfer(
            TransferKind::WarehouseTransfer,
            &source,
            DestinationView::Warehouse { warehouse: &target, zones: &zones },
            &one_line(&held, &milk, 20),
        )
        .unwrap();
        assert_eq!(plan.required, Decimal::from(40));
        assert_eq!(plan.destination, TransferDestination::Warehouse(target.id_typed()));

        let err = validate_transfer(
            TransferKind::WarehouseTransfer,
            &source,
            DestinationView::Warehouse { warehouse: &target, zones: &zones[..1] },
            &one_line(&held, &milk, 20),
        )
        .unwrap_err();
        assert!(matches!(err, TransferError::IncompatibleStorage { ref reasons, .. } if reasons.len() == 1));
    }

    #[test]
    fn warehouse_transfer_inside_one_warehouse_is_refused() {
        let w = warehouse(1000);
        let source = zone(w.id_typed(), (0, 10), 200, 100);
        let zones = vec![source.clone(), zone(w.id_typed(), (0, 10), 200, 0)];
        let milk = product("Milk", (2, 8), 1);
        let held = stock(&source, &milk, 10);

        let err = validate_transfer(
            TransferKind::WarehouseTransfer,
            &source,
            DestinationView::Warehouse { warehouse: &w, zones: &zones },
            &one_line(&held, &milk, 5),
        )
        .unwrap_err();
        assert_eq!(err, TransferError::SameWarehouseNotAllowed { warehouse: w.id_typed() });
    }

    #[test]
    fn receipt_is_checked_against_the_chosen_zone() {
        use crate::request::{SubmitTransfer, TransferCommand};
        use chrono::Utc;
        use wareflow_core::Aggregate;

        let origin = warehouse(1000);
        let source = zone(origin.id_typed(), (0, 10), 200, 100);
        let target = warehouse(1000);
        let roomy = zone(target.id_typed(), (0, 10), 100, 0);
        let tight = zone(target.id_typed(), (0, 10), 100, 90);
        let milk = product("Milk", (2, 8), 2);
        let held = stock(&source, &milk, 50);

        let plan = validate_transfer(
            TransferKind::WarehouseTransfer,
            &source,
            DestinationView::Warehouse { warehouse: &target, zones: &[roomy.clone(), tight.clone()] },
            &one_line(&held, &milk, 10),
        )
        .unwrap();
        let id = crate::request::TransferId::generate();
        let mut transfer = TransferRequest::empty(id);
        transfer
            .execute(&TransferCommand::Submit(SubmitTransfer {
                transfer_id: id,
                plan,
                submitted_by: UserId::new(),
                occurred_at: Utc::now(),
            }))
            .unwrap();

        let products = [milk];
        assert!(validate_receipt(&transfer, &roomy, &products).is_ok());
        assert_eq!(
            validate_receipt(&transfer, &tight, &products).unwrap_err(),
            TransferError::DestinationCapacityExceeded { required: Decimal::from(20), remaining: Decimal::from(10) }
        );
        assert!(matches!(
            validate_receipt(&transfer, &source, &products),
            Err(TransferError::Domain(DomainError::Validation(_)))
        ));
    }
}
