use serde::{Deserialize, Serialize};

use wareflow_core::{DomainError, Entity, NamedEntity};

use crate::record::{ActiveStatus, ApprovalState};

wareflow_core::typed_id!(
    /// Supplier identifier.
    SupplierId
);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplierDraft {
    pub name: String,
    pub contact_email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

impl SupplierDraft {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("supplier name cannot be empty"));
        }
        if let Some(email) = &self.contact_email {
            let email = email.trim();
            let well_formed = email
                .split_once('@')
                .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
            if !well_formed {
                return Err(DomainError::validation(format!(
                    "supplier contact email '{email}' is malformed"
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Supplier {
    id: SupplierId,
    name: String,
    contact_email: Option<String>,
    phone: Option<String>,
    address: Option<String>,
    pub(crate) status: ActiveStatus,
    pub(crate) approval: ApprovalState,
}

impl Supplier {
    pub fn propose(id: SupplierId, draft: SupplierDraft) -> Result<Self, DomainError> {
        draft.validate()?;
        Ok(Self {
            id,
            name: draft.name.trim().to_string(),
            contact_email: draft.contact_email,
            phone: draft.phone,
            address: draft.address,
            status: ActiveStatus::Active,
            approval: ApprovalState::Pending,
        })
    }

    pub fn apply(&mut self, draft: SupplierDraft) -> Result<(), DomainError> {
        draft.validate()?;
        self.name = draft.name.trim().to_string();
        self.contact_email = draft.contact_email;
        self.phone = draft.phone;
        self.address = draft.address;
        Ok(())
    }

    pub fn draft(&self) -> SupplierDraft {
        SupplierDraft {
            name: self.name.clone(),
            contact_email: self.contact_email.clone(),
            phone: self.phone.clone(),
            address: self.address.clone(),
        }
    }

    pub fn id_typed(&self) -> SupplierId {
        self.id
    }

    pub fn contact_email(&self) -> Option<&str> {
        self.contact_email.as_deref()
    }

    pub fn status(&self) -> ActiveStatus {
        self.status
    }

    pub fn approval(&self) -> ApprovalState {
        self.approval
    }

    /// Shipments may only be recorded against approved, active suppliers.
    pub fn can_supply(&self) -> bool {
        self.approval == ApprovalState::Approved && self.status == ActiveStatus::Active
    }
}

impl Entity for Supplier {
    type Id = SupplierId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl NamedEntity for Supplier {
    fn name(&self) -> &str {
        &self.name
    }
}
