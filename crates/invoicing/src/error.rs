use thiserror::Error;

use openb2b_core::DomainError;

use crate::invoice::InvoiceStatus;

/// Errors raised by the invoicing domain.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvoiceError {
    #[error("cannot invoice a cancelled order")]
    OrderCancelled,

    #[error("cannot invoice an order without items")]
    EmptyOrder,

    /// Paid and cancelled invoices are closed.
    #[error("invoice is {status} and can no longer change")]
    Closed { status: InvoiceStatus },

    #[error("cannot change invoice status from {from} to {to}")]
    InvalidTransition { from: InvoiceStatus, to: InvoiceStatus },

    #[error(transparent)]
    Domain(#[from] DomainError),
}
