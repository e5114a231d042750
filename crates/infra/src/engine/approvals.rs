//! Approval gateway: the only path by which master data is created or changed.

use std::collections::BTreeMap;

use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::Value as JsonValue;
use tracing::instrument;

use wareflow_approvals::{
    ApproveRequest, ChangePayload, ChangeRequest, ChangeRequestCommand, ChangeRequestId, Operation, Proposal,
    RejectRequest, SubmitRequest, ensure_editable, ensure_name_available, materialize_approval,
    materialize_rejection,
};
use wareflow_catalog::{CatalogRecord, EntityDraft, EntityKind, EntityRef, IncomingShipment};
use wareflow_core::{Aggregate, AggregateId, AggregateRoot, DomainError, NamedEntity, UserId};
use wareflow_events::{EventBus, EventEnvelope};
use wareflow_storage::{ZoneId, sum_capacity};
use wareflow_transfers::{MoveSet, StockMoves, TransferStatus};

use super::{CHANGE_REQUEST_AGGREGATE, Engine, LoadedRows, product_key};
use crate::error::EngineError;
use crate::locks::LockKey;
use crate::store::{InventoryStore, RecordFilter, RecordKey, StoreExt, TransferFilter, Versioned, WriteBatch};

fn names_key(kind: EntityKind) -> Option<LockKey> {
    kind.has_unique_name().then_some(LockKey::Names(kind))
}

/// Distinct destination zones of a shipment, in key order.
fn shipment_zones(shipment: &IncomingShipment) -> Vec<ZoneId> {
    let mut zones: Vec<ZoneId> = shipment.lines().iter().map(|l| l.zone_id).collect();
    zones.sort();
    zones.dedup();
    zones
}

impl<S, B> Engine<S, B>
where
    S: InventoryStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    /// Record a proposal as a PENDING change request.
    ///
    /// CREATE proposals also store the proposed record in the `PENDING` approval
    /// state, which reserves its name. `target` is required for UPDATE and
    /// STATUS_CHANGE; a CREATE without one gets a fresh identifier.
    #[instrument(skip(self, proposal), fields(kind = %proposal.kind(), operation = ?proposal.operation()))]
    pub fn submit_change_request(
        &self,
        proposal: Proposal,
        target: Option<AggregateId>,
        submitted_by: UserId,
    ) -> Result<ChangeRequest, EngineError> {
        self.try_submit_change_request(proposal, target, submitted_by)
            .map_err(|e| e.logged("submit_change_request"))
    }

    fn try_submit_change_request(
        &self,
        proposal: Proposal,
        target: Option<AggregateId>,
        submitted_by: UserId,
    ) -> Result<ChangeRequest, EngineError> {
        let target = match (proposal.operation(), target) {
            (Operation::Create, id) => EntityRef::new(proposal.kind(), id.unwrap_or_default()),
            (_, Some(id)) => EntityRef::new(proposal.kind(), id),
            (operation, None) => {
                return Err(DomainError::validation(format!("{operation:?} requires a target record")).into());
            }
        };

        let mut keys = vec![LockKey::from(RecordKey::Catalog(target))];
        keys.extend(names_key(target.kind));
        let _guard = self.lock(keys)?;

        let current = self.store.catalog_record(target)?.map(|row| row.value);
        if proposal.operation() != Operation::Create {
            if let Some(record) = &current {
                ensure_editable(record, self.store.pending_request_for(target)?)?;
            }
        }

        let payload = ChangePayload::capture(proposal, current.as_ref())?;
        if payload.claimed_name().is_some() {
            let filter = RecordFilter::Catalog { kind: Some(target.kind), approval: None };
            let records = self.store.catalog_records(&filter)?;
            ensure_name_available(target, &payload, records.iter().map(|row| &row.value))?;
        }

        let request_id = ChangeRequestId::generate();
        let mut request = ChangeRequest::empty(request_id);
        let events = request.execute(&ChangeRequestCommand::Submit(SubmitRequest {
            request_id,
            target,
            payload: payload.clone(),
            submitted_by,
            occurred_at: Utc::now(),
        }))?;

        let mut batch = WriteBatch::new();
        batch.insert(request.clone());
        if let ChangePayload::Create { fields } = payload {
            batch.insert(CatalogRecord::propose(target.id, fields)?);
        }
        self.store.commit(batch)?;

        tracing::info!(%request_id, %target, "change request submitted");
        self.publish(request_id.aggregate_id(), CHANGE_REQUEST_AGGREGATE, 0, &events);
        Ok(request)
    }

    /// Approve a PENDING request and materialize its payload in the same commit.
    ///
    /// Approving an incoming shipment's creation places every line into its zone;
    /// if any line does not fit, nothing changes and the request stays PENDING.
    #[instrument(skip(self), fields(%request_id))]
    pub fn approve_change_request(
        &self,
        request_id: ChangeRequestId,
        approved_by: UserId,
    ) -> Result<ChangeRequest, EngineError> {
        self.try_approve_change_request(request_id, approved_by)
            .map_err(|e| e.logged("approve_change_request"))
    }

    fn try_approve_change_request(
        &self,
        request_id: ChangeRequestId,
        approved_by: UserId,
    ) -> Result<ChangeRequest, EngineError> {
        let (peeked, target) = self.require_request(request_id)?;

        let mut keys = vec![
            LockKey::from(RecordKey::ChangeRequest(request_id)),
            RecordKey::Catalog(target).into(),
        ];
        if peeked.value.payload().and_then(ChangePayload::claimed_name).is_some() {
            keys.extend(names_key(target.kind));
        }
        if let Some(ChangePayload::Create {
            fields: EntityDraft::IncomingShipment(draft),
        }) = peeked.value.payload()
        {
            keys.extend(draft.lines.iter().map(|l| LockKey::from(RecordKey::Zone(l.zone_id))));
            keys.extend(draft.lines.iter().map(|l| product_key(l.product_id.aggregate_id())));
        }
        let _guard = self.lock(keys)?;

        let (row, _) = self.require_request(request_id)?;
        let prior_version = row.value.version();
        let mut request = row.value;
        let events = request.execute(&ChangeRequestCommand::Approve(ApproveRequest {
            request_id,
            approved_by,
            occurred_at: Utc::now(),
        }))?;

        let Versioned { version: record_version, value: mut record } = self.require_target(target)?;
        let payload = request
            .payload()
            .cloned()
            .ok_or_else(|| EngineError::Internal(format!("change request {request_id} has no payload")))?;

        if payload.claimed_name().is_some() {
            let filter = RecordFilter::Catalog { kind: Some(target.kind), approval: None };
            let records = self.store.catalog_records(&filter)?;
            ensure_name_available(target, &payload, records.iter().map(|row| &row.value))?;
        }
        if let (CatalogRecord::Product(product), ChangePayload::Update { after: EntityDraft::Product(after), .. }) =
            (&record, &payload)
        {
            if after.density != product.density() {
                self.ensure_product_unplaced(product.id_typed().aggregate_id(), product.name())?;
            }
        }

        materialize_approval(&request, &mut record)?;

        let mut batch = WriteBatch::new();
        if let CatalogRecord::IncomingShipment(shipment) = &mut record {
            if payload.operation() == Operation::Create {
                let (rows, moves) = self.place_shipment(shipment)?;
                rows.stage(moves, &mut batch)?;
                shipment.mark_received()?;
            }
        }
        batch.update(record, record_version).update(request.clone(), row.version);
        self.store.commit(batch)?;

        tracing::info!(%request_id, %target, operation = ?payload.operation(), "change request approved");
        self.publish(request_id.aggregate_id(), CHANGE_REQUEST_AGGREGATE, prior_version, &events);
        Ok(request)
    }

    /// Reject a PENDING request; the target keeps its current values.
    ///
    /// A rejected CREATE leaves its record in the `REJECTED` approval state, which
    /// releases the name it reserved.
    #[instrument(skip(self, reason), fields(%request_id))]
    pub fn reject_change_request(
        &self,
        request_id: ChangeRequestId,
        rejected_by: UserId,
        reason: &str,
    ) -> Result<ChangeRequest, EngineError> {
        self.try_reject_change_request(request_id, rejected_by, reason)
            .map_err(|e| e.logged("reject_change_request"))
    }

    fn try_reject_change_request(
        &self,
        request_id: ChangeRequestId,
        rejected_by: UserId,
        reason: &str,
    ) -> Result<ChangeRequest, EngineError> {
        let (_, target) = self.require_request(request_id)?;
        let _guard = self.lock([
            LockKey::from(RecordKey::ChangeRequest(request_id)),
            RecordKey::Catalog(target).into(),
        ])?;

        let (row, _) = self.require_request(request_id)?;
        let prior_version = row.value.version();
        let mut request = row.value;
        let events = request.execute(&ChangeRequestCommand::Reject(RejectRequest {
            request_id,
            rejected_by,
            reason: reason.to_string(),
            min_reason_len: self.config.min_rejection_reason_len,
            occurred_at: Utc::now(),
        }))?;

        let mut batch = WriteBatch::new();
        let Versioned { version: record_version, value: mut record } = self.require_target(target)?;
        if materialize_rejection(&request, &mut record)? {
            batch.update(record, record_version);
        }
        batch.update(request.clone(), row.version);
        self.store.commit(batch)?;

        tracing::info!(%request_id, %target, "change request rejected");
        self.publish(request_id.aggregate_id(), CHANGE_REQUEST_AGGREGATE, prior_version, &events);
        Ok(request)
    }

    fn require_request(
        &self,
        request_id: ChangeRequestId,
    ) -> Result<(Versioned<ChangeRequest>, EntityRef), EngineError> {
        let row = self
            .store
            .change_request(request_id)?
            .ok_or_else(|| DomainError::not_found(format!("change request {request_id}")))?;
        let target = row
            .value
            .target()
            .ok_or_else(|| DomainError::not_found(format!("change request {request_id}")))?;
        Ok((row, target))
    }

    fn require_target(&self, target: EntityRef) -> Result<Versioned<CatalogRecord>, EngineError> {
        self.store
            .catalog_record(target)?
            .ok_or_else(|| EngineError::Internal(format!("{target} is referenced by a change request but missing")))
    }

    /// Density is frozen while stock of the product exists anywhere, in transit included.
    fn ensure_product_unplaced(&self, product_id: AggregateId, name: &str) -> Result<(), EngineError> {
        let stored: u64 = self
            .store
            .all_stock()?
            .iter()
            .filter(|row| row.value.product_id() == product_id)
            .fold(0u64, |total, row| total.saturating_add(row.value.quantity()));
        let pending = TransferFilter { status: Some(TransferStatus::Pending), ..TransferFilter::default() };
        let in_transit: u64 = self
            .store
            .transfers(&pending)?
            .iter()
            .flat_map(|row| row.value.lines().iter())
            .filter(|line| line.product_id == product_id)
            .fold(0u64, |total, line| total.saturating_add(line.quantity));

        let held = stored.saturating_add(in_transit);
        if held > 0 {
            return Err(DomainError::validation(format!(
                "density of {name} cannot change while {held} unit(s) are stored or in transit"
            ))
            .into());
        }
        Ok(())
    }

    /// Place every shipment line into its zone, merging with matching lots.
    fn place_shipment(&self, shipment: &IncomingShipment) -> Result<(LoadedRows, MoveSet), EngineError> {
        let mut rows = LoadedRows::default();
        let mut zones = Vec::new();
        let mut stock = Vec::new();
        for zone_id in shipment_zones(shipment) {
            zones.push(rows.zone(self.require_zone(zone_id)?));
            for item in self.store.stock_in(zone_id)? {
                stock.push(rows.stock(item));
            }
        }

        let mut required: BTreeMap<ZoneId, Decimal> = BTreeMap::new();
        let mut placements = Vec::with_capacity(shipment.lines().len());
        for line in shipment.lines() {
            let product = self.require_product(line.product_id.aggregate_id())?;
            let zone = zones
                .iter()
                .find(|z| z.id_typed() == line.zone_id)
                .ok_or_else(|| DomainError::not_found(format!("zone {}", line.zone_id)))?;
            if !zone.is_active() {
                return Err(DomainError::validation(format!("zone {} is inactive", zone.id_typed())).into());
            }
            if let Err(reason) = product.storage().check(zone) {
                return Err(EngineError::IncompatibleStorage {
                    product: product.name().to_string(),
                    reasons: vec![reason],
                });
            }
            let needed = product.capacity_for(line.quantity)?;
            let total = required.entry(line.zone_id).or_default();
            *total = sum_capacity([*total, needed])?;
            placements.push((line, product.density()));
        }

        for (zone_id, required) in &required {
            let remaining = zones
                .iter()
                .find(|z| z.id_typed() == *zone_id)
                .map(|z| z.remaining_capacity())
                .transpose()?
                .unwrap_or_default();
            if *required > remaining {
                return Err(EngineError::DestinationCapacityExceeded {
                    required: *required,
                    remaining,
                });
            }
        }

        let mut moves = StockMoves::new(zones, stock);
        for (line, density) in placements {
            moves.place(
                line.zone_id,
                line.product_id.aggregate_id(),
                line.quantity,
                line.expiry,
                density,
            )?;
        }
        Ok((rows, moves.finish()))
    }
}
