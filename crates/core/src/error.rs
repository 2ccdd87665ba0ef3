//! Errors shared by the order, invoice and catalog domains.

use thiserror::Error;

pub type DomainResult<T> = Result<T, DomainError>;

/// Business-rule failure raised while deciding a command.
///
/// These are deterministic: replaying the same command against the same
/// order or invoice fails the same way, so callers never retry them. Event
/// store, catalog and bus failures are reported by `openb2b-infra` instead.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Rejected input: a zero quantity, a negative price, tax rate or
    /// discount amount, an empty item set, a malformed currency code.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The command addresses an order or invoice it does not belong to
    /// (another org, another aggregate id).
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// An org, customer or aggregate id could not be parsed.
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// No order or invoice with that id exists in the caller's org.
    #[error("not found")]
    NotFound,

    /// The order or invoice already exists, or a version token is stale.
    #[error("conflict: {0}")]
    Conflict(String),
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

    pub fn not_found() -> Self {
        Self::NotFound
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_the_rejected_detail() {
        let err = DomainError::validation("quantity must be at least 1");
        assert_eq!(err.to_string(), "validation failed: quantity must be at least 1");

        assert_eq!(DomainError::invariant("org mismatch").to_string(), "invariant violated: org mismatch");
        assert_eq!(DomainError::not_found().to_string(), "not found");
    }
}
