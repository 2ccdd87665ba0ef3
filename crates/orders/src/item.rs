use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use openb2b_core::{DomainError, DomainResult};
use openb2b_products::{ProductId, Variant, VariantId};

use crate::discount::DiscountSpec;

/// One requested line as submitted by a client: which variant, how many, and
/// an optional per-line discount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemRequest {
    pub variant_id: VariantId,
    pub quantity: u32,
    #[serde(default)]
    pub discount: DiscountSpec,
    #[serde(default)]
    pub notes: String,
}

impl ItemRequest {
    pub fn new(variant_id: VariantId, quantity: u32) -> Self {
        Self {
            variant_id,
            quantity,
            discount: DiscountSpec::none(),
            notes: String::new(),
        }
    }

    pub fn with_discount(mut self, discount: DiscountSpec) -> Self {
        self.discount = discount;
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.quantity == 0 {
            return Err(DomainError::validation(format!(
                "quantity for variant {} must be at least 1",
                self.variant_id
            )));
        }
        self.discount.validate()
    }
}

/// A priced order line.
///
/// Price, tax rate, product and SKU are copied from the variant when the line
/// is built. The `applied_*`, `tax_amount` and `line_total` fields are written
/// only by [`crate::totals::compute`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub variant_id: VariantId,
    pub product_id: ProductId,
    pub sku: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub tax_rate: Decimal,
    pub discount: DiscountSpec,
    pub notes: String,

    pub(crate) applied_discount: Decimal,
    pub(crate) applied_order_discount: Decimal,
    pub(crate) tax_amount: Decimal,
    pub(crate) line_total: Decimal,
}

impl OrderItem {
    /// Build an unpriced line from a request and the variant it references.
    pub fn from_variant(request: &ItemRequest, variant: &Variant) -> Self {
        Self {
            variant_id: request.variant_id,
            product_id: variant.product_id,
            sku: variant.sku.clone(),
            quantity: request.quantity,
            unit_price: variant.price,
            tax_rate: variant.tax_rate,
            discount: request.discount.clone(),
            notes: request.notes.clone(),
            applied_discount: Decimal::ZERO,
            applied_order_discount: Decimal::ZERO,
            tax_amount: Decimal::ZERO,
            line_total: Decimal::ZERO,
        }
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.quantity == 0 {
            return Err(DomainError::validation(format!(
                "quantity for variant {} must be at least 1",
                self.variant_id
            )));
        }
        if self.unit_price < Decimal::ZERO || self.tax_rate < Decimal::ZERO {
            return Err(DomainError::validation(format!(
                "variant {} has a negative price or tax rate",
                self.variant_id
            )));
        }
        self.discount.validate()
    }

    /// `unit_price * quantity`, unrounded, before any discount or tax.
    /// Saturates at `Decimal::MAX`.
    pub fn subtotal(&self) -> Decimal {
        self.unit_price.saturating_mul(Decimal::from(self.quantity))
    }

    /// Item-level discount actually applied, in currency.
    pub fn applied_discount(&self) -> Decimal {
        self.applied_discount
    }

    /// This line's share of the order-level discount.
    pub fn applied_order_discount(&self) -> Decimal {
        self.applied_order_discount
    }

    pub fn tax_amount(&self) -> Decimal {
        self.tax_amount
    }

    /// Taxable amount plus tax.
    pub fn line_total(&self) -> Decimal {
        self.line_total
    }
}
