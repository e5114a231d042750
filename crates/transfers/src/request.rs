use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use wareflow_core::{Aggregate, AggregateId, AggregateRoot, DomainError, UserId};
use wareflow_events::Event;
use wareflow_storage::{StockItemId, WarehouseId, ZoneId};

use crate::error::TransferError;
use crate::validator::TransferPlan;

wareflow_core::typed_id!(
    /// Transfer request identifier.
    TransferId
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransferKind {
    /// Between two zones of the same warehouse; applied immediately.
    ZoneTransfer,
    /// To another warehouse; completes when the destination acknowledges receipt.
    WarehouseTransfer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransferDestination {
    Zone(ZoneId),
    Warehouse(WarehouseId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransferStatus {
    Pending,
    Completed,
    Rejected,
}

impl TransferStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TransferStatus::Pending)
    }
}

/// One requested movement: `quantity` units out of a source placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferLine {
    pub stock_item: StockItemId,
    pub quantity: u64,
}

/// A validated line, carrying what is needed to place or restore it later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InTransitLine {
    pub stock_item: StockItemId,
    pub product_id: AggregateId,
    pub product_name: String,
    pub quantity: u64,
    pub expiry: Option<NaiveDate>,
    pub capacity: Decimal,
}

impl InTransitLine {
    /// Capacity per unit at the time the line was withdrawn.
    ///
    /// Placing or restoring the line uses this value so the ledger moves exactly
    /// the capacity it released.
    pub fn density(&self) -> Decimal {
        if self.quantity == 0 {
            return Decimal::ZERO;
        }
        self.capacity / Decimal::from(self.quantity)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cause", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RejectionCause {
    /// The destination declined the incoming stock.
    Refused { reason: String },
    /// The submitter took the request back.
    Withdrawn,
}

/// Aggregate root: TransferRequest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    id: TransferId,
    plan: Option<TransferPlan>,
    submitted_by: Option<UserId>,
    submitted_at: Option<DateTime<Utc>>,
    status: TransferStatus,
    received_into: Option<ZoneId>,
    rejection: Option<RejectionCause>,
    resolved_by: Option<UserId>,
    resolved_at: Option<DateTime<Utc>>,
    version: u64,
}

impl TransferRequest {
    /// Create an empty, not-yet-submitted instance for rehydration.
    pub fn empty(id: TransferId) -> Self {
        Self {
            id,
            plan: None,
            submitted_by: None,
            submitted_at: None,
            status: TransferStatus::Pending,
            received_into: None,
            rejection: None,
            resolved_by: None,
            resolved_at: None,
            version: 0,
        }
    }

    pub fn id_typed(&self) -> TransferId {
        self.id
    }

    pub fn is_submitted(&self) -> bool {
        self.plan.is_some()
    }

    pub fn plan(&self) -> Option<&TransferPlan> {
        self.plan.as_ref()
    }

    pub fn kind(&self) -> Option<TransferKind> {
        self.plan.as_ref().map(|p| p.kind)
    }

    pub fn source_zone(&self) -> Option<ZoneId> {
        self.plan.as_ref().map(|p| p.source_zone)
    }

    pub fn destination(&self) -> Option<TransferDestination> {
        self.plan.as_ref().map(|p| p.destination)
    }

    pub fn lines(&self) -> &[InTransitLine] {
        self.plan.as_ref().map(|p| p.lines.as_slice()).unwrap_or_default()
    }

    pub fn submitted_by(&self) -> Option<UserId> {
        self.submitted_by
    }

    pub fn submitted_at(&self) -> Option<DateTime<Utc>> {
        self.submitted_at
    }

    pub fn status(&self) -> TransferStatus {
        self.status
    }

    pub fn is_pending(&self) -> bool {
        self.is_submitted() && self.status == TransferStatus::Pending
    }

    pub fn received_into(&self) -> Option<ZoneId> {
        self.received_into
    }

    pub fn rejection(&self) -> Option<&RejectionCause> {
        self.rejection.as_ref()
    }

    pub fn resolved_by(&self) -> Option<UserId> {
        self.resolved_by
    }

    pub fn resolved_at(&self) -> Option<DateTime<Utc>> {
        self.resolved_at
    }
}

impl AggregateRoot for TransferRequest {
    type Id = TransferId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: SubmitTransfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitTransfer {
    pub transfer_id: TransferId,
    pub plan: TransferPlan,
    pub submitted_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: CompleteTransfer (destination acknowledged receipt).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompleteTransfer {
    pub transfer_id: TransferId,
    pub received_into: ZoneId,
    pub received_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RejectTransfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectTransfer {
    pub transfer_id: TransferId,
    pub cause: RejectionCause,
    pub rejected_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferCommand {
    Submit(SubmitTransfer),
    Complete(CompleteTransfer),
    Reject(RejectTransfer),
}

/// Event: TransferSubmitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferSubmitted {
    pub transfer_id: TransferId,
    pub plan: TransferPlan,
    pub submitted_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: TransferCompleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferCompleted {
    pub transfer_id: TransferId,
    pub received_into: ZoneId,
    pub completed_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: TransferRejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRejected {
    pub transfer_id: TransferId,
    pub cause: RejectionCause,
    pub rejected_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum TransferEvent {
    TransferSubmitted(TransferSubmitted),
    TransferCompleted(TransferCompleted),
    TransferRejected(TransferRejected),
}

impl Event for TransferEvent {
    fn event_type(&self) -> &'static str {
        match self {
            TransferEvent::TransferSubmitted(_) => "transfers.transfer.submitted",
            TransferEvent::TransferCompleted(_) => "transfers.transfer.completed",
            TransferEvent::TransferRejected(_) => "transfers.transfer.rejected",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            TransferEvent::TransferSubmitted(e) => e.occurred_at,
            TransferEvent::TransferCompleted(e) => e.occurred_at,
            TransferEvent::TransferRejected(e) => e.occurred_at,
        }
    }
}

impl Aggregate for TransferRequest {
    type Command = TransferCommand;
    type Event = TransferEvent;
    type Error = TransferError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            TransferEvent::TransferSubmitted(e) => {
                self.id = e.transfer_id;
                self.plan = Some(e.plan.clone());
                self.submitted_by = Some(e.submitted_by);
                self.submitted_at = Some(e.occurred_at);
                self.status = TransferStatus::Pending;
            }
            TransferEvent::TransferCompleted(e) => {
                self.status = TransferStatus::Completed;
                self.received_into = Some(e.received_into);
                self.resolved_by = Some(e.completed_by);
                self.resolved_at = Some(e.occurred_at);
            }
            TransferEvent::TransferRejected(e) => {
                self.status = TransferStatus::Rejected;
                self.rejection = Some(e.cause.clone());
                self.resolved_by = Some(e.rejected_by);
                self.resolved_at = Some(e.occurred_at);
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            TransferCommand::Submit(cmd) => self.handle_submit(cmd),
            TransferCommand::Complete(cmd) => self.handle_complete(cmd),
            TransferCommand::Reject(cmd) => self.handle_reject(cmd),
        }
    }
}

impl TransferRequest {
    fn ensure_transfer_id(&self, transfer_id: TransferId) -> Result<(), DomainError> {
        if self.id != transfer_id {
            return Err(DomainError::invariant("transfer_id mismatch"));
        }
        Ok(())
    }

    fn ensure_pending(&self, transfer_id: TransferId) -> Result<&TransferPlan, TransferError> {
        self.ensure_transfer_id(transfer_id)?;
        let plan = self
            .plan
            .as_ref()
            .ok_or_else(|| DomainError::not_found(format!("transfer {transfer_id}")))?;
        if self.status.is_terminal() {
            return Err(TransferError::AlreadyResolved {
                transfer: self.id,
                status: self.status,
            });
        }
        Ok(plan)
    }

    /// A zone transfer is applied in the same step it is submitted.
    fn handle_submit(&self, cmd: &SubmitTransfer) -> Result<Vec<TransferEvent>, TransferError> {
        self.ensure_transfer_id(cmd.transfer_id)?;
        if self.is_submitted() {
            return Err(DomainError::conflict(format!("transfer {} already submitted", self.id)).into());
        }
        if cmd.plan.lines.is_empty() {
            return Err(DomainError::validation("transfer must contain at least one line").into());
        }

        let mut events = vec![TransferEvent::TransferSubmitted(TransferSubmitted {
            transfer_id: cmd.transfer_id,
            plan: cmd.plan.clone(),
            submitted_by: cmd.submitted_by,
            occurred_at: cmd.occurred_at,
        })];
        if let (TransferKind::ZoneTransfer, TransferDestination::Zone(zone)) = (cmd.plan.kind, cmd.plan.destination) {
            events.push(TransferEvent::TransferCompleted(TransferCompleted {
                transfer_id: cmd.transfer_id,
                received_into: zone,
                completed_by: cmd.submitted_by,
                occurred_at: cmd.occurred_at,
            }));
        }
        Ok(events)
    }

    fn handle_complete(&self, cmd: &CompleteTransfer) -> Result<Vec<TransferEvent>, TransferError> {
        let plan = self.ensure_pending(cmd.transfer_id)?;
        if plan.kind != TransferKind::WarehouseTransfer {
            return Err(DomainError::invariant(format!("transfer {} is not awaiting receipt", self.id)).into());
        }
        Ok(vec![TransferEvent::TransferCompleted(TransferCompleted {
            transfer_id: cmd.transfer_id,
            received_into: cmd.received_into,
            completed_by: cmd.received_by,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_reject(&self, cmd: &RejectTransfer) -> Result<Vec<TransferEvent>, TransferError> {
        self.ensure_pending(cmd.transfer_id)?;
        let cause = match &cmd.cause {
            RejectionCause::Withdrawn => {
                if self.submitted_by != Some(cmd.rejected_by) {
                    return Err(TransferError::NotSubmitter {
                        transfer: self.id,
                        actor: cmd.rejected_by,
                    });
                }
                RejectionCause::Withdrawn
            }
            RejectionCause::Refused { reason } => {
                let reason = reason.trim();
                if reason.is_empty() {
                    return Err(DomainError::validation("refusal reason cannot be empty").into());
                }
                RejectionCause::Refused { reason: reason.to_string() }
            }
        };
        Ok(vec![TransferEvent::TransferRejected(TransferRejected {
            transfer_id: cmd.transfer_id,
            cause,
            rejected_by: cmd.rejected_by,
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(kind: TransferKind, destination: TransferDestination) -> TransferPlan {
        TransferPlan {
            kind,
            source_zone: ZoneId::generate(),
            source_warehouse: WarehouseId::generate(),
            destination,
            lines: vec![InTransitLine {
                stock_item: StockItemId::generate(),
                product_id: AggregateId::new(),
                product_name: "Yoghurt".into(),
                quantity: 5,
                expiry: None,
                capacity: Decimal::from(10),
            }],
            required: Decimal::from(10),
        }
    }

    fn submit(kind: TransferKind, destination: TransferDestination, by: UserId) -> (TransferRequest, Vec<TransferEvent>) {
        let id = TransferId::generate();
        let mut t = TransferRequest::empty(id);
        let events = t
            .execute(&TransferCommand::Submit(SubmitTransfer {
                transfer_id: id,
                plan: plan(kind, destination),
                submitted_by: by,
                occurred_at: Utc::now(),
            }))
            .unwrap();
        (t, events)
    }

    fn withdraw(t: &TransferRequest, by: UserId) -> TransferCommand {
        TransferCommand::Reject(RejectTransfer {
            transfer_id: t.id_typed(),
            cause: RejectionCause::Withdrawn,
            rejected_by: by,
            occurred_at: Utc::now(),
        })
    }

    #[test]
    fn zone_transfer_completes_on_submit() {
        let dest = ZoneId::generate();
        let (t, events) = submit(TransferKind::ZoneTransfer, TransferDestination::Zone(dest), UserId::new());

        let types: Vec<_> = events.iter().map(|e| e.event_type()).collect();
        assert_eq!(types, ["transfers.transfer.submitted", "transfers.transfer.completed"]);
        assert_eq!(t.status(), TransferStatus::Completed);
        assert_eq!(t.received_into(), Some(dest));
        assert_eq!(t.version(), 2);
    }

    #[test]
    fn warehouse_transfer_waits_for_receipt() {
        let (mut t, events) = submit(
            TransferKind::WarehouseTransfer,
            TransferDestination::Warehouse(WarehouseId::generate()),
            UserId::new(),
        );
        assert_eq!(events.len(), 1);
        assert!(t.is_pending());

        let zone = ZoneId::generate();
        t.execute(&TransferCommand::Complete(CompleteTransfer {
            transfer_id: t.id_typed(),
            received_into: zone,
            received_by: UserId::new(),
            occurred_at: Utc::now(),
        }))
        .unwrap();
        assert_eq!(t.status(), TransferStatus::Completed);
        assert_eq!(t.received_into(), Some(zone));
    }

    #[test]
    fn only_submitter_may_withdraw() {
        let submitter = UserId::new();
        let (mut t, _) = submit(
            TransferKind::WarehouseTransfer,
            TransferDestination::Warehouse(WarehouseId::generate()),
            submitter,
        );

        let err = t.handle(&withdraw(&t, UserId::new())).unwrap_err();
        assert!(matches!(err, TransferError::NotSubmitter { .. }));

        t.execute(&withdraw(&t, submitter)).unwrap();
        assert_eq!(t.status(), TransferStatus::Rejected);
        assert_eq!(t.rejection(), Some(&RejectionCause::Withdrawn));
    }

    #[test]
    fn completed_transfer_cannot_be_withdrawn() {
        let submitter = UserId::new();
        let (t, _) = submit(TransferKind::ZoneTransfer, TransferDestination::Zone(ZoneId::generate()), submitter);

        let err = t.handle(&withdraw(&t, submitter)).unwrap_err();
        assert!(err.is_integrity_fault());
        assert!(matches!(err, TransferError::AlreadyResolved { status: TransferStatus::Completed, .. }));
    }

    #[test]
    fn refusal_requires_a_reason() {
        let (t, _) = submit(
            TransferKind::WarehouseTransfer,
            TransferDestination::Warehouse(WarehouseId::generate()),
            UserId::new(),
        );
        let err = t
            .handle(&TransferCommand::Reject(RejectTransfer {
                transfer_id: t.id_typed(),
                cause: RejectionCause::Refused { reason: "   ".into() },
                rejected_by: UserId::new(),
                occurred_at: Utc::now(),
            }))
            .unwrap_err();
        assert!(matches!(err, TransferError::Domain(DomainError::Validation(_))));
    }
}
