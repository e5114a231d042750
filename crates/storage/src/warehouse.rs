use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use wareflow_core::{DomainError, Entity};

wareflow_core::typed_id!(
    /// Warehouse identifier.
    WarehouseId
);

/// Activation status shared by warehouses and zones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LocationStatus {
    Active,
    Inactive,
}

/// Input for registering a warehouse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewWarehouse {
    pub name: String,
    pub total_capacity: Decimal,
}

/// Aggregate root: Warehouse.
///
/// Capacity usage is not stored here; it is the sum over the warehouse's zones
/// (see [`crate::WarehouseCapacity`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warehouse {
    id: WarehouseId,
    name: String,
    total_capacity: Decimal,
    pub(crate) status: LocationStatus,
}

impl Warehouse {
    pub fn create(id: WarehouseId, input: NewWarehouse) -> Result<Self, DomainError> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(DomainError::validation("warehouse name cannot be empty"));
        }
        if input.total_capacity <= Decimal::ZERO {
            return Err(DomainError::validation("warehouse capacity must be greater than zero"));
        }

        Ok(Self {
            id,
            name: name.to_string(),
            total_capacity: input.total_capacity,
            status: LocationStatus::Active,
        })
    }

    pub fn id_typed(&self) -> WarehouseId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn total_capacity(&self) -> Decimal {
        self.total_capacity
    }

    pub fn status(&self) -> LocationStatus {
        self.status
    }

    pub fn is_active(&self) -> bool {
        self.status == LocationStatus::Active
    }
}

impl Entity for Warehouse {
    type Id = WarehouseId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
