use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use wareflow_core::{DomainError, Entity, NamedEntity};
use wareflow_storage::{CapacityError, StorageRequirement, required_capacity};

use crate::category::CategoryId;
use crate::record::ApprovalState;

wareflow_core::typed_id!(
    /// Product identifier.
    ProductId
);

/// Product status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductStatus {
    Available,
    Discontinued,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDraft {
    pub name: String,
    pub category_id: CategoryId,
    pub storage: StorageRequirement,
    /// Capacity consumed by one unit.
    pub density: Decimal,
}

impl ProductDraft {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("product name cannot be empty"));
        }
        if self.density <= Decimal::ZERO {
            return Err(DomainError::validation(format!(
                "product density must be greater than zero (got {})",
                self.density
            )));
        }
        Ok(())
    }
}

/// Catalog product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    id: ProductId,
    name: String,
    category_id: CategoryId,
    storage: StorageRequirement,
    density: Decimal,
    pub(crate) status: ProductStatus,
    pub(crate) approval: ApprovalState,
}

impl Product {
    pub fn propose(id: ProductId, draft: ProductDraft) -> Result<Self, DomainError> {
        draft.validate()?;
        Ok(Self {
            id,
            name: draft.name.trim().to_string(),
            category_id: draft.category_id,
            storage: draft.storage,
            density: draft.density,
            status: ProductStatus::Available,
            approval: ApprovalState::Pending,
        })
    }

    pub fn apply(&mut self, draft: ProductDraft) -> Result<(), DomainError> {
        draft.validate()?;
        self.name = draft.name.trim().to_string();
        self.category_id = draft.category_id;
        self.storage = draft.storage;
        self.density = draft.density;
        Ok(())
    }

    pub fn draft(&self) -> ProductDraft {
        ProductDraft {
            name: self.name.clone(),
            category_id: self.category_id,
            storage: self.storage,
            density: self.density,
        }
    }

    pub fn id_typed(&self) -> ProductId {
        self.id
    }

    pub fn category_id(&self) -> CategoryId {
        self.category_id
    }

    pub fn storage(&self) -> &StorageRequirement {
        &self.storage
    }

    pub fn density(&self) -> Decimal {
        self.density
    }

    pub fn status(&self) -> ProductStatus {
        self.status
    }

    pub fn approval(&self) -> ApprovalState {
        self.approval
    }

    /// Capacity consumed by `quantity` units.
    pub fn capacity_for(&self, quantity: u64) -> Result<Decimal, CapacityError> {
        required_capacity(quantity, self.density)
    }
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl NamedEntity for Product {
    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use wareflow_storage::{StorageCondition, TemperatureRange};

    pub fn chilled_draft(name: &str, density: i64) -> ProductDraft {
        ProductDraft {
            name: name.to_string(),
            category_id: CategoryId::generate(),
            storage: StorageRequirement {
                temperature: TemperatureRange::new(Decimal::from(2), Decimal::from(6)).unwrap(),
                condition: StorageCondition::Refrigerated,
            },
            density: Decimal::from(density),
        }
    }
}
