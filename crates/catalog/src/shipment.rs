use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use wareflow_core::{DomainError, Entity};
use wareflow_storage::ZoneId;

use crate::product::ProductId;
use crate::record::ApprovalState;
use crate::supplier::SupplierId;

wareflow_core::typed_id!(
    /// Incoming shipment identifier.
    ShipmentId
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShipmentStatus {
    /// Proposed; nothing has been placed yet.
    Expected,
    /// Approved; every line was placed into its zone.
    Received,
    Archived,
}

/// One product lot of a shipment and the zone it is destined for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipmentLine {
    pub product_id: ProductId,
    pub zone_id: ZoneId,
    pub quantity: u64,
    pub expiry: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipmentDraft {
    pub supplier_id: SupplierId,
    pub reference: String,
    pub lines: Vec<ShipmentLine>,
}

impl ShipmentDraft {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.reference.trim().is_empty() {
            return Err(DomainError::validation("shipment reference cannot be empty"));
        }
        if self.lines.is_empty() {
            return Err(DomainError::validation("shipment must contain at least one line"));
        }
        if let Some(idx) = self.lines.iter().position(|l| l.quantity == 0) {
            return Err(DomainError::validation(format!(
                "shipment line {idx} has zero quantity"
            )));
        }
        Ok(())
    }
}

/// Stock arriving from a supplier, placed into zones when its creation is approved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomingShipment {
    id: ShipmentId,
    supplier_id: SupplierId,
    reference: String,
    lines: Vec<ShipmentLine>,
    pub(crate) status: ShipmentStatus,
    pub(crate) approval: ApprovalState,
}

impl IncomingShipment {
    pub fn propose(id: ShipmentId, draft: ShipmentDraft) -> Result<Self, DomainError> {
        draft.validate()?;
        Ok(Self {
            id,
            supplier_id: draft.supplier_id,
            reference: draft.reference.trim().to_string(),
            lines: draft.lines,
            status: ShipmentStatus::Expected,
            approval: ApprovalState::Pending,
        })
    }

    /// Once received, the placed lines are fixed; only the reference may change.
    pub fn apply(&mut self, draft: ShipmentDraft) -> Result<(), DomainError> {
        draft.validate()?;
        if self.status != ShipmentStatus::Expected
            && (draft.lines != self.lines || draft.supplier_id != self.supplier_id)
        {
            return Err(DomainError::validation(
                "lines and supplier of a received shipment cannot change",
            ));
        }
        self.supplier_id = draft.supplier_id;
        self.reference = draft.reference.trim().to_string();
        self.lines = draft.lines;
        Ok(())
    }

    pub fn draft(&self) -> ShipmentDraft {
        ShipmentDraft {
            supplier_id: self.supplier_id,
            reference: self.reference.clone(),
            lines: self.lines.clone(),
        }
    }

    pub fn id_typed(&self) -> ShipmentId {
        self.id
    }

    pub fn supplier_id(&self) -> SupplierId {
        self.supplier_id
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }

    pub fn lines(&self) -> &[ShipmentLine] {
        &self.lines
    }

    pub fn status(&self) -> ShipmentStatus {
        self.status
    }

    pub fn approval(&self) -> ApprovalState {
        self.approval
    }

    /// Record that every line has been placed into its zone.
    pub fn mark_received(&mut self) -> Result<(), DomainError> {
        if self.status != ShipmentStatus::Expected {
            return Err(DomainError::invariant(format!(
                "shipment {} was already {:?}",
                self.id, self.status
            )));
        }
        self.status = ShipmentStatus::Received;
        Ok(())
    }
}

impl Entity for IncomingShipment {
    type Id = ShipmentId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(lines: Vec<ShipmentLine>) -> ShipmentDraft {
        ShipmentDraft {
            supplier_id: SupplierId::generate(),
            reference: "PO-1001".into(),
            lines,
        }
    }

    fn line(quantity: u64) -> ShipmentLine {
        ShipmentLine {
            product_id: ProductId::generate(),
            zone_id: ZoneId::generate(),
            quantity,
            expiry: NaiveDate::from_ymd_opt(2027, 1, 31),
        }
    }

    #[test]
    fn empty_or_zero_lines_are_rejected() {
        assert!(draft(vec![]).validate().is_err());
        assert!(draft(vec![line(3), line(0)]).validate().is_err());
        assert!(draft(vec![line(3)]).validate().is_ok());
    }

    #[test]
    fn received_shipment_lines_are_frozen() {
        let mut s = IncomingShipment::propose(ShipmentId::generate(), draft(vec![line(3)])).unwrap();
        s.mark_received().unwrap();
        assert!(s.mark_received().is_err());

        let mut renamed = s.draft();
        renamed.reference = "PO-1001-A".into();
        s.apply(renamed).unwrap();
        assert_eq!(s.reference(), "PO-1001-A");

        let mut relined = s.draft();
        relined.lines.push(line(1));
        assert!(s.apply(relined).is_err());
    }
}
