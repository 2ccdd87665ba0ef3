//! Invoicing domain module (event-sourced).
//!
//! An invoice is a frozen financial snapshot of a priced order plus its own
//! small status lifecycle. Pure domain logic (no IO, no HTTP, no storage).

pub mod error;
pub mod invoice;

pub use error::InvoiceError;
pub use invoice::{
    BillTo, ChangeInvoiceStatus, DraftInvoice, Invoice, InvoiceCommand, InvoiceDrafted, InvoiceEvent,
    InvoiceId, InvoiceLine, InvoiceRevised, InvoiceStatus, InvoiceStatusChanged, InvoiceTotals,
    ReviseInvoice,
};
