use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use openb2b_core::{AggregateId, OrgId, ValueObject};

/// Product identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub AggregateId);

impl ProductId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for ProductId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Variant (SKU-level) identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariantId(pub AggregateId);

impl VariantId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for VariantId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// A purchasable variant as seen at the moment an order item is built.
///
/// Order items copy `price` and `tax_rate` out of this value; later catalog
/// changes never reach existing items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variant {
    pub id: VariantId,
    pub product_id: ProductId,
    pub org_id: OrgId,
    pub sku: String,
    /// Unit price in currency units (e.g. `49.99`).
    pub price: Decimal,
    /// Tax rate as a fraction (`0.075` = 7.5%).
    pub tax_rate: Decimal,
}

impl ValueObject for Variant {}
