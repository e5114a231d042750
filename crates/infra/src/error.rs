//! Caller-facing error of every engine operation.

use rust_decimal::Decimal;
use thiserror::Error;

use wareflow_approvals::{ChangeRequestError, ChangeRequestId};
use wareflow_catalog::{EntityKind, EntityRef};
use wareflow_core::DomainError;
use wareflow_storage::{ActivationError, CapacityError, CompatibilityError, WarehouseId, ZoneId};
use wareflow_transfers::TransferError;

use crate::locks::LockError;
use crate::store::StoreError;

/// Every variant up to `WarehouseCapacityExceeded` is a rejection of the caller's
/// input and carries the numbers needed to explain it. The remaining variants are
/// operational failures.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    #[error("{target} already has pending change request {pending}")]
    DuplicatePendingRequest {
        target: EntityRef,
        pending: ChangeRequestId,
    },

    #[error("a {kind} named {name:?} already exists")]
    DuplicateName { kind: EntityKind, name: String },

    #[error("a zone named {name:?} already exists in warehouse {warehouse_id}")]
    DuplicateZoneName { warehouse_id: WarehouseId, name: String },

    #[error("rejection reason must be at least {min_len} characters (got {actual_len})")]
    InvalidRejectionReason { min_len: usize, actual_len: usize },

    #[error("insufficient stock of {product}: requested {requested}, available {available}")]
    InsufficientStock {
        product: String,
        requested: u64,
        available: u64,
    },

    #[error("{product} cannot be stored at the destination")]
    IncompatibleStorage {
        product: String,
        reasons: Vec<CompatibilityError>,
    },

    #[error("zone transfers must stay inside one warehouse")]
    CrossWarehouseNotAllowed {
        source_warehouse: WarehouseId,
        destination_warehouse: WarehouseId,
    },

    #[error("warehouse transfers must leave warehouse {warehouse}")]
    SameWarehouseNotAllowed { warehouse: WarehouseId },

    #[error("destination capacity exceeded: required {required}, remaining {remaining}")]
    DestinationCapacityExceeded { required: Decimal, remaining: Decimal },

    #[error("warehouse {warehouse_id} capacity exceeded: requested {requested}, remaining allowance {allowance}")]
    WarehouseCapacityExceeded {
        warehouse_id: WarehouseId,
        requested: Decimal,
        allowance: Decimal,
    },

    #[error("{location} still holds {used} of stock")]
    ActiveInventoryPresent { location: String, used: Decimal },

    #[error("{target} cannot be changed while it is {state}")]
    EntityNotEditable { target: EntityRef, state: String },

    #[error("zone {zone_id} would exceed its capacity")]
    CapacityExceeded { zone_id: ZoneId },

    #[error("zone {zone_id} capacity would become negative")]
    NegativeCapacity { zone_id: ZoneId },

    #[error("{0} not found")]
    NotFound(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("not permitted: {0}")]
    Unauthorized(String),

    /// Another operation changed the same records first.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("store failure: {0}")]
    Store(StoreError),

    /// Data-integrity fault; details are in the logs.
    #[error("internal error: {0}")]
    Internal(String),
}

impl EngineError {
    /// Faults that point at corrupted data or a flow bug, not at caller input.
    pub fn is_integrity_fault(&self) -> bool {
        matches!(
            self,
            EngineError::CapacityExceeded { .. } | EngineError::NegativeCapacity { .. } | EngineError::Internal(_)
        ) || matches!(self, EngineError::Store(StoreError::Corrupted { .. }))
    }

    /// Text safe to show an end user.
    pub fn user_message(&self) -> String {
        if self.is_integrity_fault() {
            return "The operation could not be completed. Please contact support.".to_string();
        }
        match self {
            EngineError::Store(_) => "The inventory store is unavailable. Please try again.".to_string(),
            EngineError::Conflict(_) => "The records changed while you were working. Please reload and retry.".to_string(),
            other => other.to_string(),
        }
    }

    /// Log integrity faults at error severity and hand the error back.
    pub(crate) fn logged(self, operation: &'static str) -> Self {
        if self.is_integrity_fault() {
            tracing::error!(operation, error = %self, detail = ?self, "integrity fault");
        } else {
            tracing::debug!(operation, error = %self, "operation rejected");
        }
        self
    }
}

impl From<DomainError> for EngineError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => EngineError::Validation(msg),
            DomainError::InvariantViolation(msg) => EngineError::Internal(msg),
            DomainError::NotFound(what) => EngineError::NotFound(what),
            DomainError::Conflict(msg) => EngineError::Conflict(msg),
            DomainError::Unauthorized(msg) => EngineError::Unauthorized(msg),
        }
    }
}

impl From<StoreError> for EngineError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Concurrency { .. } => EngineError::Conflict(value.to_string()),
            other => EngineError::Store(other),
        }
    }
}

impl From<LockError> for EngineError {
    fn from(value: LockError) -> Self {
        match value {
            LockError::Timeout { .. } => EngineError::Conflict(value.to_string()),
            LockError::Poisoned => EngineError::Internal(value.to_string()),
        }
    }
}

impl From<CapacityError> for EngineError {
    fn from(value: CapacityError) -> Self {
        match value {
            CapacityError::CapacityExceeded { zone_id, .. } => EngineError::CapacityExceeded { zone_id },
            CapacityError::NegativeCapacity { zone_id, .. } => EngineError::NegativeCapacity { zone_id },
            CapacityError::LedgerCorrupted { .. } => EngineError::Internal(value.to_string()),
            CapacityError::WarehouseCapacityExceeded {
                warehouse_id,
                requested,
                allowance,
            } => EngineError::WarehouseCapacityExceeded {
                warehouse_id,
                requested,
                allowance,
            },
            CapacityError::NonPositiveCapacity(_)
            | CapacityError::BelowUsedCapacity { .. }
            | CapacityError::QuantityOverflow { .. }
            | CapacityError::TotalOverflow { .. } => {
                EngineError::Validation(value.to_string())
            }
        }
    }
}

impl From<ActivationError> for EngineError {
    fn from(value: ActivationError) -> Self {
        match value {
            ActivationError::ZoneHoldsInventory { zone_id, used } => EngineError::ActiveInventoryPresent {
                location: format!("zone {zone_id}"),
                used,
            },
            ActivationError::WarehouseHoldsInventory { warehouse_id, used, .. } => {
                EngineError::ActiveInventoryPresent {
                    location: format!("warehouse {warehouse_id}"),
                    used,
                }
            }
        }
    }
}

impl From<ChangeRequestError> for EngineError {
    fn from(value: ChangeRequestError) -> Self {
        match value {
            ChangeRequestError::DuplicatePendingRequest { target, pending } => {
                EngineError::DuplicatePendingRequest { target, pending }
            }
            ChangeRequestError::DuplicateName { kind, name } => EngineError::DuplicateName { kind, name },
            ChangeRequestError::InvalidRejectionReason { min_len, actual_len } => {
                EngineError::InvalidRejectionReason { min_len, actual_len }
            }
            ChangeRequestError::EntityNotEditable { target, approval } => EngineError::EntityNotEditable {
                target,
                state: format!("{approval:?}").to_uppercase(),
            },
            ChangeRequestError::AlreadyResolved { .. } => EngineError::Internal(value.to_string()),
            ChangeRequestError::Domain(e) => e.into(),
        }
    }
}

impl From<TransferError> for EngineError {
    fn from(value: TransferError) -> Self {
        match value {
            TransferError::InsufficientStock {
                product,
                requested,
                available,
            } => EngineError::InsufficientStock {
                product,
                requested,
                available,
            },
            TransferError::IncompatibleStorage { product, reasons } => {
                EngineError::IncompatibleStorage { product, reasons }
            }
            TransferError::CrossWarehouseNotAllowed {
                source_warehouse,
                destination_warehouse,
            } => EngineError::CrossWarehouseNotAllowed {
                source_warehouse,
                destination_warehouse,
            },
            TransferError::SameWarehouseNotAllowed { warehouse } => {
                EngineError::SameWarehouseNotAllowed { warehouse }
            }
            TransferError::DestinationCapacityExceeded { required, remaining } => {
                EngineError::DestinationCapacityExceeded { required, remaining }
            }
            TransferError::NotSubmitter { .. } => EngineError::Unauthorized(value.to_string()),
            TransferError::AlreadyResolved { .. } => EngineError::Internal(value.to_string()),
            TransferError::Capacity(e) => e.into(),
            TransferError::Domain(e) => e.into(),
        }
    }
}
