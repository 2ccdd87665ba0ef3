use thiserror::Error;

use openb2b_core::DomainError;
use openb2b_products::VariantId;

use crate::lifecycle::OrderStatus;

/// Errors raised by the orders domain.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OrderError {
    /// An item request referenced a variant absent from the supplied snapshot
    /// map. The whole batch is rejected.
    #[error("variant {0} not found")]
    VariantNotFound(VariantId),

    /// Mutation attempted on an order that has left `Pending`.
    #[error("cannot update order: order is {status}, not pending")]
    NotPending { status: OrderStatus },

    #[error("cannot change order status from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl OrderError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Domain(DomainError::validation(msg))
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::Domain(DomainError::invariant(msg))
    }
}
