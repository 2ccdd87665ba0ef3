//! Human-facing document numbers (`ORD-…`, `INV-…`).

use uuid::Uuid;

/// Generate a unique, time-sortable document number with the given prefix,
/// e.g. `ORD-0192A4C1E5B07D4C9E3F1A2B3C4D5E6F`.
pub fn document_number(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::now_v7().simple()).to_uppercase()
}
