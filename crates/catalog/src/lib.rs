//! Master data: categories, suppliers, products and incoming shipments.
//!
//! Records here are only created or changed by approving a change request. Each
//! carries an [`ApprovalState`] telling whether its latest proposal was accepted.

pub mod category;
pub mod product;
pub mod record;
pub mod shipment;
pub mod supplier;

pub use category::{Category, CategoryDraft, CategoryId};
pub use product::{Product, ProductDraft, ProductId, ProductStatus};
pub use record::{
    ActiveStatus, ApprovalState, CatalogRecord, EntityDraft, EntityKind, EntityRef, EntityStatus,
};
pub use shipment::{IncomingShipment, ShipmentDraft, ShipmentId, ShipmentLine, ShipmentStatus};
pub use supplier::{Supplier, SupplierDraft, SupplierId};
