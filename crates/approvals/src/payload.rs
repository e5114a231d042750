use serde::{Deserialize, Serialize};

use wareflow_catalog::{CatalogRecord, EntityDraft, EntityKind, EntityStatus};
use wareflow_core::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Operation {
    Create,
    Update,
    StatusChange,
}

/// What a caller asks for, before the engine captures the current state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Proposal {
    Create { fields: EntityDraft },
    Update { fields: EntityDraft },
    StatusChange { status: EntityStatus },
}

impl Proposal {
    pub fn operation(&self) -> Operation {
        match self {
            Proposal::Create { .. } => Operation::Create,
            Proposal::Update { .. } => Operation::Update,
            Proposal::StatusChange { .. } => Operation::StatusChange,
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            Proposal::Create { fields } | Proposal::Update { fields } => fields.kind(),
            Proposal::StatusChange { status } => status.kind(),
        }
    }
}

/// Stored payload of a change request.
///
/// UPDATE and STATUS_CHANGE keep the state they were proposed against so a
/// reviewer sees the diff even after the record moves on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangePayload {
    Create {
        fields: EntityDraft,
    },
    Update {
        before: EntityDraft,
        after: EntityDraft,
    },
    StatusChange {
        from: EntityStatus,
        to: EntityStatus,
    },
}

impl ChangePayload {
    /// Capture a proposal against the record it targets (`None` for CREATE).
    pub fn capture(proposal: Proposal, current: Option<&CatalogRecord>) -> Result<Self, DomainError> {
        let payload = match (proposal, current) {
            (Proposal::Create { fields }, None) => ChangePayload::Create { fields },
            (Proposal::Create { .. }, Some(record)) => {
                return Err(DomainError::conflict(format!(
                    "{} already exists",
                    record.entity_ref()
                )));
            }
            (Proposal::Update { fields }, Some(record)) => ChangePayload::Update {
                before: record.draft(),
                after: fields,
            },
            (Proposal::StatusChange { status }, Some(record)) => ChangePayload::StatusChange {
                from: record.status(),
                to: status,
            },
            (proposal, None) => {
                return Err(DomainError::not_found(format!(
                    "{} targeted by {:?}",
                    proposal.kind(),
                    proposal.operation()
                )));
            }
        };
        payload.validate()?;
        Ok(payload)
    }

    pub fn operation(&self) -> Operation {
        match self {
            ChangePayload::Create { .. } => Operation::Create,
            ChangePayload::Update { .. } => Operation::Update,
            ChangePayload::StatusChange { .. } => Operation::StatusChange,
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            ChangePayload::Create { fields } => fields.kind(),
            ChangePayload::Update { after, .. } => after.kind(),
            ChangePayload::StatusChange { to, .. } => to.kind(),
        }
    }

    /// The name the payload would claim once approved, if it introduces one.
    ///
    /// An UPDATE that keeps the current name claims nothing new.
    pub fn claimed_name(&self) -> Option<&str> {
        match self {
            ChangePayload::Create { fields } => fields.unique_name(),
            ChangePayload::Update { before, after } => match (before.unique_name(), after.unique_name()) {
                (Some(old), Some(new)) if wareflow_core::names_collide(old, new) => None,
                (_, new) => new,
            },
            ChangePayload::StatusChange { .. } => None,
        }
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        match self {
            ChangePayload::Create { fields } => fields.validate(),
            ChangePayload::Update { before, after } => {
                if before.kind() != after.kind() {
                    return Err(DomainError::validation(format!(
                        "cannot update a {} with {} fields",
                        before.kind(),
                        after.kind()
                    )));
                }
                if before == after {
                    return Err(DomainError::validation("update proposes no change"));
                }
                after.validate()
            }
            ChangePayload::StatusChange { from, to } => {
                if from.kind() != to.kind() {
                    return Err(DomainError::validation(format!(
                        "status {to:?} does not apply to a {}",
                        from.kind()
                    )));
                }
                if from == to {
                    return Err(DomainError::validation(format!("status is already {to:?}")));
                }
                Ok(())
            }
        }
    }
}
