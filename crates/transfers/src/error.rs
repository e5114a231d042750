use rust_decimal::Decimal;
use thiserror::Error;

use wareflow_core::{DomainError, UserId};
use wareflow_storage::{CapacityError, CompatibilityError, WarehouseId};

use crate::request::{TransferId, TransferStatus};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransferError {
    #[error("insufficient stock of {product}: requested {requested}, available {available}")]
    InsufficientStock {
        product: String,
        requested: u64,
        available: u64,
    },

    /// One reason per destination zone checked; empty when no zone was eligible.
    #[error("{product} cannot be stored at the destination ({} zone(s) checked)", .reasons.len())]
    IncompatibleStorage {
        product: String,
        reasons: Vec<CompatibilityError>,
    },

    #[error("zone transfers must stay inside one warehouse (source {source_warehouse}, destination {destination_warehouse})")]
    CrossWarehouseNotAllowed {
        source_warehouse: WarehouseId,
        destination_warehouse: WarehouseId,
    },

    #[error("warehouse transfer source and destination are both warehouse {warehouse}")]
    SameWarehouseNotAllowed { warehouse: WarehouseId },

    #[error("destination capacity exceeded: required {required}, remaining {remaining}")]
    DestinationCapacityExceeded { required: Decimal, remaining: Decimal },

    #[error("only the submitter may withdraw transfer {transfer} (actor {actor})")]
    NotSubmitter { transfer: TransferId, actor: UserId },

    #[error("transfer {transfer} is already {status:?}")]
    AlreadyResolved {
        transfer: TransferId,
        status: TransferStatus,
    },

    #[error(transparent)]
    Capacity(#[from] CapacityError),

    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl TransferError {
    pub fn is_integrity_fault(&self) -> bool {
        match self {
            TransferError::AlreadyResolved { .. } => true,
            TransferError::Capacity(e) => e.is_integrity_fault(),
            TransferError::Domain(e) => e.is_invariant_violation(),
            _ => false,
        }
    }
}
