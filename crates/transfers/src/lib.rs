//! Stock movement between zones and between warehouses.
//!
//! - [`validator`] decides whether a request may proceed and how much capacity it needs.
//! - [`movement::StockMoves`] applies the resulting withdrawals and placements to a
//!   working copy of the touched zones and stock items.
//! - [`TransferRequest`] records the lifecycle (`PENDING -> COMPLETED | REJECTED`).

pub mod error;
pub mod movement;
pub mod request;
pub mod validator;

pub use error::TransferError;
pub use movement::{MoveSet, StockMoves};
pub use request::{
    CompleteTransfer, InTransitLine, RejectTransfer, RejectionCause, SubmitTransfer, TransferCommand,
    TransferCompleted, TransferDestination, TransferEvent, TransferId, TransferKind, TransferLine,
    TransferRejected, TransferRequest, TransferStatus, TransferSubmitted,
};
pub use validator::{DestinationView, LineContext, TransferPlan, validate_receipt, validate_transfer};
