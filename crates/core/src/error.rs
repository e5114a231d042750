//! Shared error for checks that carry no numeric context.

use thiserror::Error;

pub type DomainResult<T> = Result<T, DomainError>;

/// Failures common to every wareflow crate.
///
/// Capacity, compatibility, approval and transfer failures that must report
/// quantities live in their own crates; this enum covers blank names, unknown
/// records, stale versions and broken invariants.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Caller input was rejected (blank name, empty shipment, zero quantity).
    #[error("validation failed: {0}")]
    Validation(String),

    /// Stored state contradicts itself; never caused by caller input.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    #[error("invalid identifier: {0}")]
    InvalidId(String),

    #[error("{0} not found")]
    NotFound(String),

    /// The record moved on since it was read.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The acting user is not the one the operation requires.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, DomainError::InvariantViolation(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_failure() {
        assert_eq!(DomainError::not_found("zone z1").to_string(), "zone z1 not found");
        assert_eq!(
            DomainError::validation("shipment must contain at least one line").to_string(),
            "validation failed: shipment must contain at least one line"
        );
        assert!(DomainError::invariant("used > total").is_invariant_violation());
        assert!(!DomainError::conflict("stale").is_invariant_violation());
    }
}
