//! Order pricing engine.
//!
//! Turns resolved order items plus item-level and order-level discount rules
//! into a fully priced order. The computation runs in a fixed sequence:
//!
//! 1. item discounts (clamped to the line subtotal) and the order subtotal
//! 2. order-level discount, capped so total discount never exceeds subtotal
//! 3. proportional allocation of the order discount across lines, the last
//!    line absorbing the rounding remainder
//! 4. per-line tax and line total on the discounted, zero-floored base
//! 5. order tax total and grand total
//!
//! Every amount is rounded to cents where it is finalized. Item order is
//! significant: it decides which line takes the allocation remainder.
//!
//! Products, sums and the tax step saturate at `Decimal::MAX` instead of
//! overflowing, so pricing cannot panic on any input.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use openb2b_core::{non_negative, round2};

use crate::discount::DiscountSpec;
use crate::item::OrderItem;

/// Order-level derived amounts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderTotals {
    /// Σ unit price × quantity, before discounts and tax.
    pub subtotal: Decimal,
    /// Σ item-level discounts.
    pub item_discount_total: Decimal,
    /// Order-level discount actually applied (after the cap).
    pub applied_discount: Decimal,
    /// `item_discount_total + applied_discount`.
    pub discount_total: Decimal,
    pub tax_total: Decimal,
    /// Σ line totals; the payable amount.
    pub total: Decimal,
}

/// Price `items` in place and return the order-level totals.
///
/// Total over every input; it never fails or panics. An empty item list
/// yields all-zero totals.
pub fn compute(items: &mut [OrderItem], order_discount: &DiscountSpec) -> OrderTotals {
    if items.is_empty() {
        return OrderTotals::default();
    }

    let (subtotal, item_discount_total) = apply_item_discounts(items);

    let applied_discount = order_discount_amount(order_discount, subtotal, item_discount_total);
    allocate_order_discount(items, subtotal, applied_discount);

    for item in items.iter_mut() {
        apply_tax(item);
    }

    let tax_total = round2(saturating_sum(items.iter().map(OrderItem::tax_amount)));
    let total = round2(saturating_sum(items.iter().map(OrderItem::line_total)));

    OrderTotals {
        subtotal,
        item_discount_total,
        applied_discount,
        discount_total: round2(item_discount_total.saturating_add(applied_discount)),
        tax_total,
        total,
    }
}

/// Returns `(subtotal, item_discount_total)`, each rounded once after the
/// full accumulation.
fn apply_item_discounts(items: &mut [OrderItem]) -> (Decimal, Decimal) {
    let mut subtotal = Decimal::ZERO;
    let mut discount_total = Decimal::ZERO;

    for item in items.iter_mut() {
        let line_subtotal = item.subtotal();
        let discount = non_negative(item.discount.nominal(line_subtotal).min(line_subtotal));

        item.applied_discount = round2(discount);
        subtotal = subtotal.saturating_add(line_subtotal);
        discount_total = discount_total.saturating_add(item.applied_discount);
    }

    (round2(subtotal), round2(discount_total))
}

fn order_discount_amount(spec: &DiscountSpec, subtotal: Decimal, item_discount_total: Decimal) -> Decimal {
    let cap = non_negative(subtotal.saturating_sub(item_discount_total));
    round2(non_negative(spec.nominal(subtotal)).min(cap))
}

/// Split `applied` across items in proportion to each line's pre-discount
/// subtotal. Leading lines get their rounded share, never more than what is
/// still unallocated; the last line gets exactly the remainder, so the shares
/// always sum to `applied`.
fn allocate_order_discount(items: &mut [OrderItem], subtotal: Decimal, applied: Decimal) {
    if applied <= Decimal::ZERO || subtotal <= Decimal::ZERO {
        for item in items.iter_mut() {
            item.applied_order_discount = Decimal::ZERO;
        }
        return;
    }

    let Some((last, leading)) = items.split_last_mut() else {
        return;
    };

    let mut remaining = applied;
    for item in leading {
        let ratio = item.subtotal().checked_div(subtotal).unwrap_or(Decimal::MAX);
        let share = non_negative(round2(ratio.saturating_mul(applied))).min(remaining);
        item.applied_order_discount = share;
        remaining -= share;
    }
    last.applied_order_discount = remaining;
}

fn apply_tax(item: &mut OrderItem) {
    let taxable = non_negative(
        item.subtotal()
            .saturating_sub(item.applied_discount)
            .saturating_sub(item.applied_order_discount),
    );
    item.tax_amount = round2(taxable.saturating_mul(item.tax_rate));
    item.line_total = round2(taxable.saturating_add(item.tax_amount));
}

fn saturating_sum(amounts: impl Iterator<Item = Decimal>) -> Decimal {
    amounts.fold(Decimal::ZERO, Decimal::saturating_add)
}
