//! Type-erased view over every master-data record kind.
//!
//! Change requests target records generically through [`EntityRef`] and carry
//! payloads as [`EntityDraft`] / [`EntityStatus`]; [`CatalogRecord`] is what they
//! are materialized onto.

use serde::{Deserialize, Serialize};

use wareflow_core::{AggregateId, DomainError, NamedEntity};

use crate::category::{Category, CategoryDraft, CategoryId};
use crate::product::{Product, ProductDraft, ProductId, ProductStatus};
use crate::shipment::{IncomingShipment, ShipmentDraft, ShipmentId, ShipmentStatus};
use crate::supplier::{Supplier, SupplierDraft, SupplierId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityKind {
    Category,
    Supplier,
    Product,
    IncomingShipment,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Category => "category",
            EntityKind::Supplier => "supplier",
            EntityKind::Product => "product",
            EntityKind::IncomingShipment => "incoming_shipment",
        }
    }

    /// Kinds whose names must be unique (case-insensitive) among non-rejected records.
    pub fn has_unique_name(&self) -> bool {
        !matches!(self, EntityKind::IncomingShipment)
    }
}

impl core::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Weak reference to a master-data record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityRef {
    pub kind: EntityKind,
    pub id: AggregateId,
}

impl EntityRef {
    pub fn new(kind: EntityKind, id: impl Into<AggregateId>) -> Self {
        Self { kind, id: id.into() }
    }
}

impl core::fmt::Display for EntityRef {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// Outcome of the most recent proposal affecting a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApprovalState {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActiveStatus {
    Active,
    Inactive,
}

/// Operational status of a record, tagged by kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityStatus {
    Category(ActiveStatus),
    Supplier(ActiveStatus),
    Product(ProductStatus),
    IncomingShipment(ShipmentStatus),
}

impl EntityStatus {
    pub fn kind(&self) -> EntityKind {
        match self {
            EntityStatus::Category(_) => EntityKind::Category,
            EntityStatus::Supplier(_) => EntityKind::Supplier,
            EntityStatus::Product(_) => EntityKind::Product,
            EntityStatus::IncomingShipment(_) => EntityKind::IncomingShipment,
        }
    }
}

/// Proposed field values for a record, tagged by kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "fields", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityDraft {
    Category(CategoryDraft),
    Supplier(SupplierDraft),
    Product(ProductDraft),
    IncomingShipment(ShipmentDraft),
}

impl EntityDraft {
    pub fn kind(&self) -> EntityKind {
        match self {
            EntityDraft::Category(_) => EntityKind::Category,
            EntityDraft::Supplier(_) => EntityKind::Supplier,
            EntityDraft::Product(_) => EntityKind::Product,
            EntityDraft::IncomingShipment(_) => EntityKind::IncomingShipment,
        }
    }

    /// The name that must stay unique, for kinds that have one.
    pub fn unique_name(&self) -> Option<&str> {
        match self {
            EntityDraft::Category(d) => Some(&d.name),
            EntityDraft::Supplier(d) => Some(&d.name),
            EntityDraft::Product(d) => Some(&d.name),
            EntityDraft::IncomingShipment(_) => None,
        }
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        match self {
            EntityDraft::Category(d) => d.validate(),
            EntityDraft::Supplier(d) => d.validate(),
            EntityDraft::Product(d) => d.validate(),
            EntityDraft::IncomingShipment(d) => d.validate(),
        }
    }
}

/// Any master-data record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "record", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CatalogRecord {
    Category(Category),
    Supplier(Supplier),
    Product(Product),
    IncomingShipment(IncomingShipment),
}

impl CatalogRecord {
    /// Build the pending record a CREATE proposal stands for.
    pub fn propose(id: AggregateId, draft: EntityDraft) -> Result<Self, DomainError> {
        Ok(match draft {
            EntityDraft::Category(d) => CatalogRecord::Category(Category::propose(CategoryId::new(id), d)?),
            EntityDraft::Supplier(d) => CatalogRecord::Supplier(Supplier::propose(SupplierId::new(id), d)?),
            EntityDraft::Product(d) => CatalogRecord::Product(Product::propose(ProductId::new(id), d)?),
            EntityDraft::IncomingShipment(d) => {
                CatalogRecord::IncomingShipment(IncomingShipment::propose(ShipmentId::new(id), d)?)
            }
        })
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            CatalogRecord::Category(_) => EntityKind::Category,
            CatalogRecord::Supplier(_) => EntityKind::Supplier,
            CatalogRecord::Product(_) => EntityKind::Product,
            CatalogRecord::IncomingShipment(_) => EntityKind::IncomingShipment,
        }
    }

    pub fn id(&self) -> AggregateId {
        match self {
            CatalogRecord::Category(r) => r.id_typed().aggregate_id(),
            CatalogRecord::Supplier(r) => r.id_typed().aggregate_id(),
            CatalogRecord::Product(r) => r.id_typed().aggregate_id(),
            CatalogRecord::IncomingShipment(r) => r.id_typed().aggregate_id(),
        }
    }

    pub fn entity_ref(&self) -> EntityRef {
        EntityRef::new(self.kind(), self.id())
    }

    pub fn unique_name(&self) -> Option<&str> {
        match self {
            CatalogRecord::Category(r) => Some(r.name()),
            CatalogRecord::Supplier(r) => Some(r.name()),
            CatalogRecord::Product(r) => Some(r.name()),
            CatalogRecord::IncomingShipment(_) => None,
        }
    }

    pub fn approval(&self) -> ApprovalState {
        match self {
            CatalogRecord::Category(r) => r.approval,
            CatalogRecord::Supplier(r) => r.approval,
            CatalogRecord::Product(r) => r.approval,
            CatalogRecord::IncomingShipment(r) => r.approval,
        }
    }

    pub fn set_approval(&mut self, state: ApprovalState) {
        match self {
            CatalogRecord::Category(r) => r.approval = state,
            CatalogRecord::Supplier(r) => r.approval = state,
            CatalogRecord::Product(r) => r.approval = state,
            CatalogRecord::IncomingShipment(r) => r.approval = state,
        }
    }

    pub fn status(&self) -> EntityStatus {
        match self {
            CatalogRecord::Category(r) => EntityStatus::Category(r.status),
            CatalogRecord::Supplier(r) => EntityStatus::Supplier(r.status),
            CatalogRecord::Product(r) => EntityStatus::Product(r.status),
            CatalogRecord::IncomingShipment(r) => EntityStatus::IncomingShipment(r.status),
        }
    }

    pub fn set_status(&mut self, status: EntityStatus) -> Result<(), DomainError> {
        if status == self.status() {
            return Err(DomainError::validation(format!(
                "{} {} already has status {status:?}",
                self.kind(),
                self.id()
            )));
        }
        match (self, status) {
            (CatalogRecord::Category(r), EntityStatus::Category(s)) => r.status = s,
            (CatalogRecord::Supplier(r), EntityStatus::Supplier(s)) => r.status = s,
            (CatalogRecord::Product(r), EntityStatus::Product(s)) => r.status = s,
            (CatalogRecord::IncomingShipment(r), EntityStatus::IncomingShipment(s)) => {
                // Receipt happens through approval only; archiving requires a received shipment.
                if s != ShipmentStatus::Archived || r.status != ShipmentStatus::Received {
                    return Err(DomainError::validation(format!(
                        "shipment {} cannot move from {:?} to {s:?}",
                        r.id_typed(),
                        r.status
                    )));
                }
                r.status = s;
            }
            (record, status) => {
                return Err(DomainError::validation(format!(
                    "status {status:?} does not apply to a {}",
                    record.kind()
                )));
            }
        }
        Ok(())
    }

    pub fn draft(&self) -> EntityDraft {
        match self {
            CatalogRecord::Category(r) => EntityDraft::Category(r.draft()),
            CatalogRecord::Supplier(r) => EntityDraft::Supplier(r.draft()),
            CatalogRecord::Product(r) => EntityDraft::Product(r.draft()),
            CatalogRecord::IncomingShipment(r) => EntityDraft::IncomingShipment(r.draft()),
        }
    }

    pub fn apply_draft(&mut self, draft: EntityDraft) -> Result<(), DomainError> {
        match (self, draft) {
            (CatalogRecord::Category(r), EntityDraft::Category(d)) => r.apply(d),
            (CatalogRecord::Supplier(r), EntityDraft::Supplier(d)) => r.apply(d),
            (CatalogRecord::Product(r), EntityDraft::Product(d)) => r.apply(d),
            (CatalogRecord::IncomingShipment(r), EntityDraft::IncomingShipment(d)) => r.apply(d),
            (record, draft) => Err(DomainError::validation(format!(
                "{} fields cannot be applied to a {}",
                draft.kind(),
                record.kind()
            ))),
        }
    }

    /// Whether this record competes for `name` within its kind.
    ///
    /// Rejected records release their name.
    pub fn claims_name(&self, name: &str) -> bool {
        self.approval() != ApprovalState::Rejected
            && self.unique_name().is_some_and(|n| wareflow_core::names_collide(n, name))
    }

    pub fn as_product(&self) -> Option<&Product> {
        match self {
            CatalogRecord::Product(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_shipment(&self) -> Option<&IncomingShipment> {
        match self {
            CatalogRecord::IncomingShipment(s) => Some(s),
            _ => None,
        }
    }
}
