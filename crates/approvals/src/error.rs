use thiserror::Error;

use wareflow_catalog::{ApprovalState, EntityKind, EntityRef};
use wareflow_core::DomainError;

use crate::request::{ChangeRequestId, RequestStatus};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChangeRequestError {
    #[error("{target} already has pending change request {pending}")]
    DuplicatePendingRequest {
        target: EntityRef,
        pending: ChangeRequestId,
    },

    #[error("a {kind} named {name:?} already exists")]
    DuplicateName { kind: EntityKind, name: String },

    #[error("rejection reason must be at least {min_len} characters (got {actual_len})")]
    InvalidRejectionReason { min_len: usize, actual_len: usize },

    #[error("{target} cannot be changed while its approval state is {approval:?}")]
    EntityNotEditable {
        target: EntityRef,
        approval: ApprovalState,
    },

    /// Resolving a request that is no longer pending.
    #[error("change request {request} is already {status:?}")]
    AlreadyResolved {
        request: ChangeRequestId,
        status: RequestStatus,
    },

    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl ChangeRequestError {
    /// A second resolution of the same request means a caller bypassed the
    /// pending check; the store state is still consistent but the flow is not.
    pub fn is_integrity_fault(&self) -> bool {
        matches!(self, ChangeRequestError::AlreadyResolved { .. })
    }
}
