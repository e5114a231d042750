use serde::{Deserialize, Serialize};

use wareflow_core::{DomainError, Entity, NamedEntity};

use crate::record::{ActiveStatus, ApprovalState};

wareflow_core::typed_id!(
    /// Category identifier.
    CategoryId
);

/// Proposed category fields (CREATE payload or UPDATE new-data).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryDraft {
    pub name: String,
    pub description: Option<String>,
}

impl CategoryDraft {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("category name cannot be empty"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    id: CategoryId,
    name: String,
    description: Option<String>,
    pub(crate) status: ActiveStatus,
    pub(crate) approval: ApprovalState,
}

impl Category {
    /// A freshly proposed category, awaiting approval.
    pub fn propose(id: CategoryId, draft: CategoryDraft) -> Result<Self, DomainError> {
        draft.validate()?;
        Ok(Self {
            id,
            name: draft.name.trim().to_string(),
            description: draft.description,
            status: ActiveStatus::Active,
            approval: ApprovalState::Pending,
        })
    }

    pub fn apply(&mut self, draft: CategoryDraft) -> Result<(), DomainError> {
        draft.validate()?;
        self.name = draft.name.trim().to_string();
        self.description = draft.description;
        Ok(())
    }

    pub fn draft(&self) -> CategoryDraft {
        CategoryDraft {
            name: self.name.clone(),
            description: self.description.clone(),
        }
    }

    pub fn id_typed(&self) -> CategoryId {
        self.id
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn status(&self) -> ActiveStatus {
        self.status
    }

    pub fn approval(&self) -> ApprovalState {
        self.approval
    }
}

impl Entity for Category {
    type Id = CategoryId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl NamedEntity for Category {
    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proposal_starts_pending_and_active() {
        let c = Category::propose(
            CategoryId::generate(),
            CategoryDraft { name: " Beverages ".into(), description: None },
        )
        .unwrap();
        assert_eq!(c.name(), "Beverages");
        assert_eq!(c.approval(), ApprovalState::Pending);
        assert_eq!(c.status(), ActiveStatus::Active);
        assert!(c.name_matches("BEVERAGES"));
    }

    #[test]
    fn blank_name_is_rejected() {
        let err = Category::propose(
            CategoryId::generate(),
            CategoryDraft { name: "  ".into(), description: None },
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }
}
