use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use wareflow_core::{DomainError, Entity, ValueObject};

use crate::warehouse::{LocationStatus, WarehouseId};

wareflow_core::typed_id!(
    /// Zone identifier.
    ZoneId
);

/// Closed temperature interval `[min, max]` in degrees Celsius.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemperatureRange {
    min: Decimal,
    max: Decimal,
}

impl ValueObject for TemperatureRange {}

impl TemperatureRange {
    /// A range with `min <= max` (a product may require one exact temperature).
    pub fn new(min: Decimal, max: Decimal) -> Result<Self, DomainError> {
        if min > max {
            return Err(DomainError::validation(format!(
                "temperature range min ({min}) must not exceed max ({max})"
            )));
        }
        Ok(Self { min, max })
    }

    /// A range with `min < max`, as zones require.
    pub fn strict(min: Decimal, max: Decimal) -> Result<Self, DomainError> {
        if min >= max {
            return Err(DomainError::validation(format!(
                "temperature range min ({min}) must be lower than max ({max})"
            )));
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> Decimal {
        self.min
    }

    pub fn max(&self) -> Decimal {
        self.max
    }

    /// Whether `other` lies entirely inside this range (bounds inclusive).
    pub fn contains(&self, other: &TemperatureRange) -> bool {
        other.min >= self.min && other.max <= self.max
    }
}

impl core::fmt::Display for TemperatureRange {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "[{}, {}]°C", self.min, self.max)
    }
}

/// Coarse storage category, independent of the numeric temperature range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageCondition {
    Ambient,
    Refrigerated,
    Frozen,
    Dry,
}

impl ValueObject for StorageCondition {}

impl core::fmt::Display for StorageCondition {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            StorageCondition::Ambient => "ambient",
            StorageCondition::Refrigerated => "refrigerated",
            StorageCondition::Frozen => "frozen",
            StorageCondition::Dry => "dry",
        };
        f.write_str(s)
    }
}

/// Input for creating a zone inside a warehouse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewZone {
    pub warehouse_id: WarehouseId,
    pub name: String,
    pub temperature: TemperatureRange,
    pub conditions: Vec<StorageCondition>,
    pub total_capacity: Decimal,
}

/// Aggregate root: Zone.
///
/// `used_capacity` is only ever changed through the ledger operations in
/// [`crate::ledger`], which keep `0 <= used <= total`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    id: ZoneId,
    warehouse_id: WarehouseId,
    name: String,
    temperature: TemperatureRange,
    conditions: Vec<StorageCondition>,
    pub(crate) total_capacity: Decimal,
    pub(crate) used_capacity: Decimal,
    pub(crate) status: LocationStatus,
}

impl Zone {
    /// Build a new, empty, active zone.
    ///
    /// Name uniqueness and the warehouse capacity budget are checked by the caller,
    /// which sees the sibling zones.
    pub fn create(id: ZoneId, input: NewZone) -> Result<Self, DomainError> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(DomainError::validation("zone name cannot be empty"));
        }
        if input.temperature.min() >= input.temperature.max() {
            return Err(DomainError::validation(format!(
                "zone temperature range {} must have min lower than max",
                input.temperature
            )));
        }
        if input.total_capacity <= Decimal::ZERO {
            return Err(DomainError::validation("zone capacity must be greater than zero"));
        }
        if input.conditions.is_empty() {
            return Err(DomainError::validation(
                "zone must support at least one storage condition",
            ));
        }

        let mut conditions: Vec<StorageCondition> = Vec::with_capacity(input.conditions.len());
        for c in input.conditions {
            if !conditions.contains(&c) {
                conditions.push(c);
            }
        }

        Ok(Self {
            id,
            warehouse_id: input.warehouse_id,
            name: name.to_string(),
            temperature: input.temperature,
            conditions,
            total_capacity: input.total_capacity,
            used_capacity: Decimal::ZERO,
            status: LocationStatus::Active,
        })
    }

    pub fn id_typed(&self) -> ZoneId {
        self.id
    }

    pub fn warehouse_id(&self) -> WarehouseId {
        self.warehouse_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn temperature(&self) -> &TemperatureRange {
        &self.temperature
    }

    pub fn conditions(&self) -> &[StorageCondition] {
        &self.conditions
    }

    pub fn total_capacity(&self) -> Decimal {
        self.total_capacity
    }

    pub fn used_capacity(&self) -> Decimal {
        self.used_capacity
    }

    pub fn status(&self) -> LocationStatus {
        self.status
    }

    pub fn is_active(&self) -> bool {
        self.status == LocationStatus::Active
    }
}

impl Entity for Zone {
    type Id = ZoneId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn range(min: i64, max: i64) -> TemperatureRange {
        TemperatureRange::new(Decimal::from(min), Decimal::from(max)).unwrap()
    }

    pub fn zone(total: i64, used: i64) -> Zone {
        zone_in(WarehouseId::generate(), total, used)
    }

    pub fn zone_in(warehouse_id: WarehouseId, total: i64, used: i64) -> Zone {
        let mut z = Zone::create(
            ZoneId::generate(),
            NewZone {
                warehouse_id,
                name: "Cold Room".into(),
                temperature: range(2, 8),
                conditions: vec![StorageCondition::Refrigerated],
                total_capacity: Decimal::from(total),
            },
        )
        .unwrap();
        z.used_capacity = Decimal::from(used);
        z
    }
}
