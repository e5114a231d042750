//! Checks run before a request is accepted, and the effect of resolving one.

use wareflow_catalog::{ApprovalState, CatalogRecord, EntityRef};
use wareflow_core::DomainError;

use crate::error::ChangeRequestError;
use crate::payload::ChangePayload;
use crate::request::{ChangeRequest, ChangeRequestId};

/// Edit guard for UPDATE and STATUS_CHANGE proposals.
///
/// `pending` is the request currently pending against the record, if any.
pub fn ensure_editable(record: &CatalogRecord, pending: Option<ChangeRequestId>) -> Result<(), ChangeRequestError> {
    let target = record.entity_ref();
    if let Some(pending) = pending {
        return Err(ChangeRequestError::DuplicatePendingRequest { target, pending });
    }
    match record.approval() {
        ApprovalState::Approved => Ok(()),
        approval => Err(ChangeRequestError::EntityNotEditable { target, approval }),
    }
}

/// Reject a payload whose name collides with another non-rejected record of the same kind.
pub fn ensure_name_available<'a>(
    target: EntityRef,
    payload: &ChangePayload,
    records: impl IntoIterator<Item = &'a CatalogRecord>,
) -> Result<(), ChangeRequestError> {
    let Some(name) = payload.claimed_name() else {
        return Ok(());
    };
    let taken = records
        .into_iter()
        .filter(|r| r.kind() == target.kind && r.id() != target.id)
        .any(|r| r.claims_name(name));
    if taken {
        return Err(ChangeRequestError::DuplicateName {
            kind: target.kind,
            name: name.trim().to_string(),
        });
    }
    Ok(())
}

fn payload_of(request: &ChangeRequest) -> Result<&ChangePayload, ChangeRequestError> {
    request
        .payload()
        .ok_or_else(|| DomainError::not_found(format!("change request {}", request.id_typed())).into())
}

/// Apply an approved request's payload to its target record.
///
/// Shipment placement is not done here; the caller places the lines and then
/// marks the shipment received.
pub fn materialize_approval(request: &ChangeRequest, record: &mut CatalogRecord) -> Result<(), ChangeRequestError> {
    match payload_of(request)? {
        ChangePayload::Create { .. } => {
            if record.approval() != ApprovalState::Pending {
                return Err(DomainError::invariant(format!(
                    "{} is {:?}, expected a pending creation",
                    record.entity_ref(),
                    record.approval()
                ))
                .into());
            }
            record.set_approval(ApprovalState::Approved);
        }
        ChangePayload::Update { after, .. } => record.apply_draft(after.clone())?,
        ChangePayload::StatusChange { to, .. } => record.set_status(*to)?,
    }
    Ok(())
}

/// Effect of a rejection on the target record.
///
/// A rejected creation releases its name; other operations leave the record as it was.
pub fn materialize_rejection(request: &ChangeRequest, record: &mut CatalogRecord) -> Result<bool, ChangeRequestError> {
    match payload_of(request)? {
        ChangePayload::Create { .. } => {
            record.set_approval(ApprovalState::Rejected);
            Ok(true)
        }
        ChangePayload::Update { .. } | ChangePayload::StatusChange { .. } => Ok(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use wareflow_catalog::{ActiveStatus, CategoryDraft, EntityDraft, EntityKind, EntityStatus};
    use wareflow_core::{Aggregate, AggregateId, UserId};

    use crate::request::{ChangeRequestCommand, SubmitRequest};

    fn category(name: &str) -> EntityDraft {
        EntityDraft::Category(CategoryDraft { name: name.into(), description: None })
    }

    fn approved(name: &str) -> CatalogRecord {
        let mut r = CatalogRecord::propose(AggregateId::new(), category(name)).unwrap();
        r.set_approval(ApprovalState::Approved);
        r
    }

    fn request_for(record: &CatalogRecord, payload: ChangePayload) -> ChangeRequest {
        let id = ChangeRequestId::generate();
        let mut request = ChangeRequest::empty(id);
        request
            .execute(&ChangeRequestCommand::Submit(SubmitRequest {
                request_id: id,
                target: record.entity_ref(),
                payload,
                submitted_by: UserId::new(),
                occurred_at: Utc::now(),
            }))
            .unwrap();
        request
    }

    #[test]
    fn pending_request_blocks_edits() {
        let record = approved("Beverages");
        let pending = ChangeRequestId::generate();
        let err = ensure_editable(&record, Some(pending)).unwrap_err();
        assert_eq!(
            err,
            ChangeRequestError::DuplicatePendingRequest { target: record.entity_ref(), pending }
        );
        assert!(ensure_editable(&record, None).is_ok());
    }

    #[test]
    fn only_approved_records_are_editable() {
        let mut record = approved("Beverages");
        record.set_approval(ApprovalState::Pending);
        assert!(matches!(
            ensure_editable(&record, None),
            Err(ChangeRequestError::EntityNotEditable { approval: ApprovalState::Pending, .. })
        ));
    }

    #[test]
    fn duplicate_name_ignores_case_self_and_rejected_records() {
        let existing = approved("Beverages");
        let mut released = approved("Snacks");
        released.set_approval(ApprovalState::Rejected);
        let records = [existing.clone(), released];

        let target = EntityRef::new(EntityKind::Category, AggregateId::new());
        let err = ensure_name_available(target, &ChangePayload::Create { fields: category("BEVERAGES") }, &records)
            .unwrap_err();
        assert!(matches!(err, ChangeRequestError::DuplicateName { kind: EntityKind::Category, .. }));

        assert!(ensure_name_available(target, &ChangePayload::Create { fields: category("snacks") }, &records).is_ok());

        let own_rename = ChangePayload::Update { before: category("Beverages"), after: category("Drinks") };
        assert!(ensure_name_available(existing.entity_ref(), &own_rename, &records).is_ok());
    }

    #[test]
    fn approval_applies_update_and_status_change() {
        let mut record = approved("Dairy");
        let update = request_for(
            &record,
            ChangePayload::Update { before: category("Dairy"), after: category("Dairy & Eggs") },
        );
        materialize_approval(&update, &mut record).unwrap();
        assert_eq!(record.unique_name(), Some("Dairy & Eggs"));

        let toggle = request_for(
            &record,
            ChangePayload::StatusChange {
                from: EntityStatus::Category(ActiveStatus::Active),
                to: EntityStatus::Category(ActiveStatus::Inactive),
            },
        );
        materialize_approval(&toggle, &mut record).unwrap();
        assert_eq!(record.status(), EntityStatus::Category(ActiveStatus::Inactive));
    }

    #[test]
    fn rejection_only_touches_pending_creations() {
        let mut created = CatalogRecord::propose(AggregateId::new(), category("Frozen")).unwrap();
        let create = request_for(&created, ChangePayload::Create { fields: category("Frozen") });
        assert!(materialize_rejection(&create, &mut created).unwrap());
        assert_eq!(created.approval(), ApprovalState::Rejected);

        let mut record = approved("Dairy");
        let before = record.clone();
        let update = request_for(
            &record,
            ChangePayload::Update { before: category("Dairy"), after: category("Milk") },
        );
        assert!(!materialize_rejection(&update, &mut record).unwrap());
        assert_eq!(record, before);
    }
}
