use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use wareflow_catalog::EntityRef;
use wareflow_core::{Aggregate, AggregateRoot, DomainError, UserId, ValueObject};
use wareflow_events::Event;

use crate::error::ChangeRequestError;
use crate::payload::{ChangePayload, Operation};

wareflow_core::typed_id!(
    /// Change request identifier.
    ChangeRequestId
);

/// Minimum trimmed length of a rejection reason unless configured otherwise.
pub const DEFAULT_MIN_REJECTION_REASON_LEN: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl RequestStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RequestStatus::Pending)
    }
}

/// A manager's explanation for turning a request down.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RejectionReason(String);

impl RejectionReason {
    /// Length is counted in characters after trimming.
    pub fn parse(raw: &str, min_len: usize) -> Result<Self, ChangeRequestError> {
        let trimmed = raw.trim();
        let actual_len = trimmed.chars().count();
        if actual_len < min_len {
            return Err(ChangeRequestError::InvalidRejectionReason { min_len, actual_len });
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl ValueObject for RejectionReason {}

/// Aggregate root: ChangeRequest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRequest {
    id: ChangeRequestId,
    target: Option<EntityRef>,
    payload: Option<ChangePayload>,
    submitted_by: Option<UserId>,
    submitted_at: Option<DateTime<Utc>>,
    status: RequestStatus,
    rejection_reason: Option<RejectionReason>,
    resolved_by: Option<UserId>,
    resolved_at: Option<DateTime<Utc>>,
    version: u64,
}

impl ChangeRequest {
    /// Create an empty, not-yet-submitted instance for rehydration.
    pub fn empty(id: ChangeRequestId) -> Self {
        Self {
            id,
            target: None,
            payload: None,
            submitted_by: None,
            submitted_at: None,
            status: RequestStatus::Pending,
            rejection_reason: None,
            resolved_by: None,
            resolved_at: None,
            version: 0,
        }
    }

    pub fn id_typed(&self) -> ChangeRequestId {
        self.id
    }

    pub fn is_submitted(&self) -> bool {
        self.version > 0
    }

    pub fn target(&self) -> Option<EntityRef> {
        self.target
    }

    pub fn payload(&self) -> Option<&ChangePayload> {
        self.payload.as_ref()
    }

    pub fn operation(&self) -> Option<Operation> {
        self.payload.as_ref().map(ChangePayload::operation)
    }

    pub fn submitted_by(&self) -> Option<UserId> {
        self.submitted_by
    }

    pub fn submitted_at(&self) -> Option<DateTime<Utc>> {
        self.submitted_at
    }

    pub fn status(&self) -> RequestStatus {
        self.status
    }

    pub fn is_pending(&self) -> bool {
        self.is_submitted() && self.status == RequestStatus::Pending
    }

    pub fn rejection_reason(&self) -> Option<&str> {
        self.rejection_reason.as_ref().map(RejectionReason::as_str)
    }

    pub fn resolved_by(&self) -> Option<UserId> {
        self.resolved_by
    }

    pub fn resolved_at(&self) -> Option<DateTime<Utc>> {
        self.resolved_at
    }
}

impl AggregateRoot for ChangeRequest {
    type Id = ChangeRequestId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: SubmitRequest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitRequest {
    pub request_id: ChangeRequestId,
    pub target: EntityRef,
    pub payload: ChangePayload,
    pub submitted_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ApproveRequest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApproveRequest {
    pub request_id: ChangeRequestId,
    pub approved_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RejectRequest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectRequest {
    pub request_id: ChangeRequestId,
    pub rejected_by: UserId,
    pub reason: String,
    pub min_reason_len: usize,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeRequestCommand {
    Submit(SubmitRequest),
    Approve(ApproveRequest),
    Reject(RejectRequest),
}

/// Event: RequestSubmitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestSubmitted {
    pub request_id: ChangeRequestId,
    pub target: EntityRef,
    pub payload: ChangePayload,
    pub submitted_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: RequestApproved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestApproved {
    pub request_id: ChangeRequestId,
    pub target: EntityRef,
    pub approved_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: RequestRejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestRejected {
    pub request_id: ChangeRequestId,
    pub target: EntityRef,
    pub rejected_by: UserId,
    pub reason: RejectionReason,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ChangeRequestEvent {
    RequestSubmitted(RequestSubmitted),
    RequestApproved(RequestApproved),
    RequestRejected(RequestRejected),
}

impl Event for ChangeRequestEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ChangeRequestEvent::RequestSubmitted(_) => "approvals.request.submitted",
            ChangeRequestEvent::RequestApproved(_) => "approvals.request.approved",
            ChangeRequestEvent::RequestRejected(_) => "approvals.request.rejected",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            ChangeRequestEvent::RequestSubmitted(e) => e.occurred_at,
            ChangeRequestEvent::RequestApproved(e) => e.occurred_at,
            ChangeRequestEvent::RequestRejected(e) => e.occurred_at,
        }
    }
}

impl Aggregate for ChangeRequest {
    type Command = ChangeRequestCommand;
    type Event = ChangeRequestEvent;
    type Error = ChangeRequestError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            ChangeRequestEvent::RequestSubmitted(e) => {
                self.id = e.request_id;
                self.target = Some(e.target);
                self.payload = Some(e.payload.clone());
                self.submitted_by = Some(e.submitted_by);
                self.submitted_at = Some(e.occurred_at);
                self.status = RequestStatus::Pending;
            }
            ChangeRequestEvent::RequestApproved(e) => {
                self.status = RequestStatus::Approved;
                self.resolved_by = Some(e.approved_by);
                self.resolved_at = Some(e.occurred_at);
            }
            ChangeRequestEvent::RequestRejected(e) => {
                self.status = RequestStatus::Rejected;
                self.rejection_reason = Some(e.reason.clone());
                self.resolved_by = Some(e.rejected_by);
                self.resolved_at = Some(e.occurred_at);
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            ChangeRequestCommand::Submit(cmd) => self.handle_submit(cmd),
            ChangeRequestCommand::Approve(cmd) => self.handle_approve(cmd),
            ChangeRequestCommand::Reject(cmd) => self.handle_reject(cmd),
        }
    }
}

impl ChangeRequest {
    fn ensure_request_id(&self, request_id: ChangeRequestId) -> Result<(), DomainError> {
        if self.id != request_id {
            return Err(DomainError::invariant("request_id mismatch"));
        }
        Ok(())
    }

    /// Resolution is only possible from PENDING; returns the target.
    fn ensure_pending(&self, request_id: ChangeRequestId) -> Result<EntityRef, ChangeRequestError> {
        self.ensure_request_id(request_id)?;
        let target = match (self.is_submitted(), self.target) {
            (true, Some(target)) => target,
            _ => return Err(DomainError::not_found(format!("change request {request_id}")).into()),
        };
        if self.status.is_terminal() {
            return Err(ChangeRequestError::AlreadyResolved {
                request: self.id,
                status: self.status,
            });
        }
        Ok(target)
    }

    fn handle_submit(&self, cmd: &SubmitRequest) -> Result<Vec<ChangeRequestEvent>, ChangeRequestError> {
        self.ensure_request_id(cmd.request_id)?;
        if self.is_submitted() {
            return Err(DomainError::conflict(format!("change request {} already submitted", self.id)).into());
        }
        if cmd.payload.kind() != cmd.target.kind {
            return Err(DomainError::validation(format!(
                "{} payload cannot target {}",
                cmd.payload.kind(),
                cmd.target
            ))
            .into());
        }
        cmd.payload.validate()?;

        Ok(vec![ChangeRequestEvent::RequestSubmitted(RequestSubmitted {
            request_id: cmd.request_id,
            target: cmd.target,
            payload: cmd.payload.clone(),
            submitted_by: cmd.submitted_by,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_approve(&self, cmd: &ApproveRequest) -> Result<Vec<ChangeRequestEvent>, ChangeRequestError> {
        let target = self.ensure_pending(cmd.request_id)?;
        Ok(vec![ChangeRequestEvent::RequestApproved(RequestApproved {
            request_id: cmd.request_id,
            target,
            approved_by: cmd.approved_by,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_reject(&self, cmd: &RejectRequest) -> Result<Vec<ChangeRequestEvent>, ChangeRequestError> {
        let target = self.ensure_pending(cmd.request_id)?;
        let reason = RejectionReason::parse(&cmd.reason, cmd.min_reason_len)?;
        Ok(vec![ChangeRequestEvent::RequestRejected(RequestRejected {
            request_id: cmd.request_id,
            target,
            rejected_by: cmd.rejected_by,
            reason,
            occurred_at: cmd.occurred_at,
        })])
    }
}
