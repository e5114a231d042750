//! Storage locations and their capacity ledger.
//!
//! Warehouses own zones; zones hold stock placements. This crate contains the pure
//! rules for capacity arithmetic, storage compatibility and activation, with no IO.

pub mod activation;
pub mod compatibility;
pub mod ledger;
pub mod stock;
pub mod warehouse;
pub mod zone;

pub use activation::ActivationError;
pub use compatibility::{
    CompatibilityError, StorageRequirement, is_condition_compatible, is_temperature_compatible,
};
pub use ledger::{
    CapacityError, WarehouseCapacity, ZoneCapacity, check_warehouse_allowance, required_capacity,
    sum_capacity, validate_zone_capacity_edit,
};
pub use stock::{StockItem, StockItemId};
pub use warehouse::{LocationStatus, NewWarehouse, Warehouse, WarehouseId};
pub use zone::{NewZone, StorageCondition, TemperatureRange, Zone, ZoneId};
