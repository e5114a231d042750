//! Transfer service: moves stock between zones and warehouses.

use chrono::Utc;
use serde_json::Value as JsonValue;
use tracing::instrument;

use wareflow_core::{Aggregate, AggregateRoot, DomainError, UserId};
use wareflow_events::{EventBus, EventEnvelope};
use wareflow_storage::{StockItem, Zone, ZoneId, sum_capacity};
use wareflow_transfers::{
    CompleteTransfer, DestinationView, LineContext, RejectTransfer, RejectionCause, StockMoves, SubmitTransfer,
    TransferCommand, TransferDestination, TransferId, TransferKind, TransferLine, TransferRequest, validate_receipt,
    validate_transfer,
};

use super::{Engine, LoadedRows, TRANSFER_AGGREGATE, product_key};
use crate::error::EngineError;
use crate::locks::LockKey;
use crate::store::{InventoryStore, RecordKey, StoreExt, Versioned, WriteBatch};

impl<S, B> Engine<S, B>
where
    S: InventoryStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    /// Validate and execute a transfer in one atomic step.
    ///
    /// A zone transfer moves the stock and completes immediately. A warehouse
    /// transfer takes the stock out of the source zone and stays PENDING until the
    /// destination acknowledges or refuses it.
    #[instrument(skip(self, lines), fields(?kind, %source_zone, ?destination, lines = lines.len()))]
    pub fn submit_transfer(
        &self,
        kind: TransferKind,
        source_zone: ZoneId,
        destination: TransferDestination,
        lines: Vec<TransferLine>,
        submitted_by: UserId,
    ) -> Result<TransferRequest, EngineError> {
        self.try_submit_transfer(kind, source_zone, destination, lines, submitted_by)
            .map_err(|e| e.logged("submit_transfer"))
    }

    fn try_submit_transfer(
        &self,
        kind: TransferKind,
        source_zone: ZoneId,
        destination: TransferDestination,
        lines: Vec<TransferLine>,
        submitted_by: UserId,
    ) -> Result<TransferRequest, EngineError> {
        let mut keys: Vec<LockKey> = vec![RecordKey::Zone(source_zone).into()];
        keys.extend(lines.iter().map(|l| LockKey::from(RecordKey::Stock(l.stock_item))));
        for line in &lines {
            if let Some(row) = self.store.stock_item(line.stock_item)? {
                keys.push(product_key(row.value.product_id()));
            }
        }
        match destination {
            TransferDestination::Zone(zone_id) => keys.push(RecordKey::Zone(zone_id).into()),
            TransferDestination::Warehouse(warehouse_id) => {
                keys.push(RecordKey::Warehouse(warehouse_id).into());
                keys.extend(
                    self.store
                        .zones_in(warehouse_id)?
                        .iter()
                        .map(|z| LockKey::from(RecordKey::Zone(z.value.id_typed()))),
                );
            }
        }
        let guard = self.lock(keys)?;

        let mut rows = LoadedRows::default();
        let source = rows.zone(self.require_zone(source_zone)?);

        let mut stock = Vec::with_capacity(lines.len());
        let mut products = Vec::with_capacity(lines.len());
        for line in &lines {
            if stock.iter().any(|s: &StockItem| s.id_typed() == line.stock_item) {
                continue;
            }
            let item = rows.stock(self.require_stock_item(line.stock_item)?);
            products.push(self.require_product(item.product_id())?);
            stock.push(item);
        }
        let contexts = lines
            .iter()
            .map(|line| {
                let item = stock
                    .iter()
                    .find(|s| s.id_typed() == line.stock_item)
                    .ok_or_else(|| EngineError::Internal(format!("stock item {} was not loaded", line.stock_item)))?;
                let product = products
                    .iter()
                    .find(|p| p.id_typed().aggregate_id() == item.product_id())
                    .ok_or_else(|| EngineError::Internal(format!("product {} was not loaded", item.product_id())))?;
                Ok(LineContext { stock: item, product, quantity: line.quantity })
            })
            .collect::<Result<Vec<_>, EngineError>>()?;

        let (plan, destination_zone, mut destination_stock) = match destination {
            TransferDestination::Zone(zone_id) => {
                let zone = rows.zone(self.require_zone(zone_id)?);
                let plan = validate_transfer(kind, &source, DestinationView::Zone(&zone), &contexts)?;
                let resident: Vec<StockItem> =
                    self.store.stock_in(zone_id)?.into_iter().map(|row| rows.stock(row)).collect();
                (plan, Some(zone), resident)
            }
            TransferDestination::Warehouse(warehouse_id) => {
                let warehouse = self.require_warehouse(warehouse_id)?.value;
                let zones: Vec<Zone> = self
                    .zones_under(&guard, self.store.zones_in(warehouse_id)?)?
                    .into_iter()
                    .map(|row| row.value)
                    .collect();
                let view = DestinationView::Warehouse { warehouse: &warehouse, zones: &zones };
                (validate_transfer(kind, &source, view, &contexts)?, None, Vec::new())
            }
        };

        let mut zones = vec![source];
        zones.extend(destination_zone);
        destination_stock.append(&mut stock);
        let mut moves = StockMoves::new(zones, destination_stock);
        for line in &plan.lines {
            let density = products
                .iter()
                .find(|p| p.id_typed().aggregate_id() == line.product_id)
                .map(|p| p.density())
                .ok_or_else(|| EngineError::Internal(format!("product {} was not loaded", line.product_id)))?;
            moves.withdraw(line.stock_item, line.quantity, density)?;
            if let TransferDestination::Zone(zone_id) = plan.destination {
                moves.place(zone_id, line.product_id, line.quantity, line.expiry, density)?;
            }
        }

        let transfer_id = TransferId::generate();
        let mut transfer = TransferRequest::empty(transfer_id);
        let required = plan.required;
        let events = transfer.execute(&TransferCommand::Submit(SubmitTransfer {
            transfer_id,
            plan,
            submitted_by,
            occurred_at: Utc::now(),
        }))?;

        let mut batch = WriteBatch::new();
        rows.stage(moves.finish(), &mut batch)?;
        batch.insert(transfer.clone());
        self.store.commit(batch)?;

        tracing::info!(%transfer_id, %required, status = ?transfer.status(), "transfer submitted");
        self.publish(transfer_id.aggregate_id(), TRANSFER_AGGREGATE, 0, &events);
        Ok(transfer)
    }

    /// The destination accepts a PENDING warehouse transfer into one of its zones.
    #[instrument(skip(self), fields(%transfer_id, %zone_id))]
    pub fn acknowledge_receipt(
        &self,
        transfer_id: TransferId,
        zone_id: ZoneId,
        received_by: UserId,
    ) -> Result<TransferRequest, EngineError> {
        self.try_acknowledge_receipt(transfer_id, zone_id, received_by)
            .map_err(|e| e.logged("acknowledge_receipt"))
    }

    fn try_acknowledge_receipt(
        &self,
        transfer_id: TransferId,
        zone_id: ZoneId,
        received_by: UserId,
    ) -> Result<TransferRequest, EngineError> {
        let mut keys = vec![LockKey::from(RecordKey::Transfer(transfer_id)), RecordKey::Zone(zone_id).into()];
        let peeked = self.require_transfer(transfer_id)?.value;
        keys.extend(peeked.lines().iter().map(|line| product_key(line.product_id)));
        let _guard = self.lock(keys)?;

        let row = self.require_transfer(transfer_id)?;
        let prior_version = row.value.version();
        let mut transfer = row.value;
        let events = transfer.execute(&TransferCommand::Complete(CompleteTransfer {
            transfer_id,
            received_into: zone_id,
            received_by,
            occurred_at: Utc::now(),
        }))?;

        let mut rows = LoadedRows::default();
        let zone = rows.zone(self.require_zone(zone_id)?);
        let products = transfer
            .lines()
            .iter()
            .map(|line| self.require_product(line.product_id))
            .collect::<Result<Vec<_>, _>>()?;
        validate_receipt(&transfer, &zone, &products)?;

        let resident: Vec<StockItem> = self.store.stock_in(zone_id)?.into_iter().map(|r| rows.stock(r)).collect();
        let mut moves = StockMoves::new([zone], resident);
        for line in transfer.lines() {
            moves.place(zone_id, line.product_id, line.quantity, line.expiry, line.density())?;
        }

        let mut batch = WriteBatch::new();
        rows.stage(moves.finish(), &mut batch)?;
        batch.update(transfer.clone(), row.version);
        self.store.commit(batch)?;

        tracing::info!(%transfer_id, %zone_id, "transfer received");
        self.publish(transfer_id.aggregate_id(), TRANSFER_AGGREGATE, prior_version, &events);
        Ok(transfer)
    }

    /// The destination declines a PENDING warehouse transfer; the stock returns to its source zone.
    #[instrument(skip(self, reason), fields(%transfer_id))]
    pub fn refuse_receipt(
        &self,
        transfer_id: TransferId,
        refused_by: UserId,
        reason: &str,
    ) -> Result<TransferRequest, EngineError> {
        let cause = RejectionCause::Refused { reason: reason.trim().to_string() };
        self.reject_transfer(transfer_id, cause, refused_by)
            .map_err(|e| e.logged("refuse_receipt"))
    }

    /// The submitter takes back a PENDING transfer; the stock returns to its source zone.
    #[instrument(skip(self), fields(%transfer_id))]
    pub fn withdraw_transfer(&self, transfer_id: TransferId, withdrawn_by: UserId) -> Result<TransferRequest, EngineError> {
        self.reject_transfer(transfer_id, RejectionCause::Withdrawn, withdrawn_by)
            .map_err(|e| e.logged("withdraw_transfer"))
    }

    fn reject_transfer(
        &self,
        transfer_id: TransferId,
        cause: RejectionCause,
        rejected_by: UserId,
    ) -> Result<TransferRequest, EngineError> {
        let peeked = self.require_transfer(transfer_id)?.value;
        let source_zone = peeked
            .source_zone()
            .ok_or_else(|| DomainError::not_found(format!("transfer {transfer_id}")))?;
        let mut keys = vec![LockKey::from(RecordKey::Transfer(transfer_id)), RecordKey::Zone(source_zone).into()];
        keys.extend(peeked.lines().iter().map(|line| product_key(line.product_id)));
        let _guard = self.lock(keys)?;

        let row = self.require_transfer(transfer_id)?;
        let prior_version = row.value.version();
        let mut transfer = row.value;
        let events = transfer.execute(&TransferCommand::Reject(RejectTransfer {
            transfer_id,
            cause,
            rejected_by,
            occurred_at: Utc::now(),
        }))?;

        let mut rows = LoadedRows::default();
        let zone = rows.zone(self.require_zone(source_zone)?);
        if !zone.is_active() {
            return Err(DomainError::validation(format!(
                "zone {source_zone} is inactive; reactivate it before returning stock"
            ))
            .into());
        }
        let required = sum_capacity(transfer.lines().iter().map(|l| l.capacity))?;
        let remaining = zone.remaining_capacity()?;
        if required > remaining {
            return Err(EngineError::DestinationCapacityExceeded { required, remaining });
        }

        let resident: Vec<StockItem> = self.store.stock_in(source_zone)?.into_iter().map(|r| rows.stock(r)).collect();
        let mut moves = StockMoves::new([zone], resident);
        for line in transfer.lines() {
            moves.place(source_zone, line.product_id, line.quantity, line.expiry, line.density())?;
        }

        let mut batch = WriteBatch::new();
        rows.stage(moves.finish(), &mut batch)?;
        batch.update(transfer.clone(), row.version);
        self.store.commit(batch)?;

        tracing::info!(%transfer_id, %source_zone, cause = ?transfer.rejection(), "transfer rejected; stock restored");
        self.publish(transfer_id.aggregate_id(), TRANSFER_AGGREGATE, prior_version, &events);
        Ok(transfer)
    }

    fn require_transfer(&self, transfer_id: TransferId) -> Result<Versioned<TransferRequest>, EngineError> {
        self.store
            .transfer(transfer_id)?
            .ok_or_else(|| DomainError::not_found(format!("transfer {transfer_id}")).into())
    }
}
