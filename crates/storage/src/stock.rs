use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use wareflow_core::{AggregateId, DomainError, Entity};

use crate::ledger::required_capacity;
use crate::zone::ZoneId;

wareflow_core::typed_id!(
    /// Stock placement identifier.
    StockItemId
);

/// A placement of one product lot in one zone.
///
/// The product is referenced by its raw aggregate id; this crate does not know the
/// catalog. `weight` is recomputed from the product density on every quantity change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockItem {
    id: StockItemId,
    zone_id: ZoneId,
    product_id: AggregateId,
    quantity: u64,
    expiry: Option<NaiveDate>,
    weight: Decimal,
}

impl StockItem {
    pub fn new(
        id: StockItemId,
        zone_id: ZoneId,
        product_id: AggregateId,
        quantity: u64,
        expiry: Option<NaiveDate>,
        density: Decimal,
    ) -> Result<Self, DomainError> {
        if quantity == 0 {
            return Err(DomainError::validation("stock quantity must be greater than zero"));
        }
        Ok(Self {
            id,
            zone_id,
            product_id,
            quantity,
            expiry,
            weight: weight_of(quantity, density)?,
        })
    }

    pub fn id_typed(&self) -> StockItemId {
        self.id
    }

    pub fn zone_id(&self) -> ZoneId {
        self.zone_id
    }

    pub fn product_id(&self) -> AggregateId {
        self.product_id
    }

    pub fn quantity(&self) -> u64 {
        self.quantity
    }

    pub fn expiry(&self) -> Option<NaiveDate> {
        self.expiry
    }

    pub fn weight(&self) -> Decimal {
        self.weight
    }

    pub fn is_empty(&self) -> bool {
        self.quantity == 0
    }

    /// Whether `other` stock of `product_id`/`expiry` can be merged into this placement.
    pub fn is_same_lot(&self, zone_id: ZoneId, product_id: AggregateId, expiry: Option<NaiveDate>) -> bool {
        self.zone_id == zone_id && self.product_id == product_id && self.expiry == expiry
    }

    pub fn withdraw(&mut self, quantity: u64, density: Decimal) -> Result<(), DomainError> {
        if quantity > self.quantity {
            return Err(DomainError::invariant(format!(
                "stock item {} holds {}, cannot withdraw {quantity}",
                self.id, self.quantity
            )));
        }
        let remaining = self.quantity - quantity;
        self.weight = weight_of(remaining, density)?;
        self.quantity = remaining;
        Ok(())
    }

    pub fn deposit(&mut self, quantity: u64, density: Decimal) -> Result<(), DomainError> {
        let total = self
            .quantity
            .checked_add(quantity)
            .ok_or_else(|| DomainError::validation("stock quantity overflow"))?;
        self.weight = weight_of(total, density)?;
        self.quantity = total;
        Ok(())
    }
}

fn weight_of(quantity: u64, density: Decimal) -> Result<Decimal, DomainError> {
    required_capacity(quantity, density).map_err(|e| DomainError::validation(e.to_string()))
}

impl Entity for StockItem {
    type Id = StockItemId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(qty: u64) -> StockItem {
        StockItem::new(
            StockItemId::generate(),
            ZoneId::generate(),
            AggregateId::new(),
            qty,
            None,
            Decimal::new(25, 1),
        )
        .unwrap()
    }

    #[test]
    fn weight_follows_quantity() {
        let mut s = item(10);
        assert_eq!(s.weight(), Decimal::from(25));

        s.withdraw(4, Decimal::new(25, 1)).unwrap();
        assert_eq!(s.quantity(), 6);
        assert_eq!(s.weight(), Decimal::from(15));

        s.deposit(2, Decimal::new(25, 1)).unwrap();
        assert_eq!(s.weight(), Decimal::from(20));
    }

    #[test]
    fn withdraw_more_than_held_fails_without_change() {
        let mut s = item(3);
        assert!(s.withdraw(4, Decimal::ONE).is_err());
        assert_eq!(s.quantity(), 3);
    }

    #[test]
    fn zero_quantity_placement_is_rejected() {
        let err = StockItem::new(
            StockItemId::generate(),
            ZoneId::generate(),
            AggregateId::new(),
            0,
            None,
            Decimal::ONE,
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }
}
