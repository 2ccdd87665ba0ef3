//! Catalog types the ordering core reads.
//!
//! Products and variants are managed elsewhere; this crate only defines the
//! read-only variant snapshot that order items copy their price and tax rate
//! from.

pub mod variant;

pub use variant::{ProductId, Variant, VariantId};
