//! Change-request lifecycle for master data.
//!
//! One generic state machine (`PENDING -> APPROVED | REJECTED`) covers every
//! master-data kind and every operation; per-kind payload shapes live in
//! [`ChangePayload`]. Approval is the only path by which a proposal becomes
//! visible on the target record.

pub mod error;
pub mod intake;
pub mod payload;
pub mod request;

pub use error::ChangeRequestError;
pub use intake::{ensure_editable, ensure_name_available, materialize_approval, materialize_rejection};
pub use payload::{ChangePayload, Operation, Proposal};
pub use request::{
    ApproveRequest, ChangeRequest, ChangeRequestCommand, ChangeRequestEvent, ChangeRequestId,
    DEFAULT_MIN_REJECTION_REASON_LEN, RejectRequest, RejectionReason, RequestApproved,
    RequestRejected, RequestStatus, RequestSubmitted, SubmitRequest,
};
