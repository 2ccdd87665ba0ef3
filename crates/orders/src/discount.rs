use core::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use openb2b_core::{DomainError, DomainResult, ValueObject};

/// How a discount amount is interpreted.
///
/// `None` is the zero value of an omitted discount. Any other spelling is
/// rejected at parse time instead of silently meaning "no discount".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscountKind {
    #[default]
    None,
    /// `amount` is a percentage of the base (`10` = 10%).
    Percentage,
    /// `amount` is a currency amount.
    Fixed,
}

impl DiscountKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DiscountKind::None => "none",
            DiscountKind::Percentage => "percentage",
            DiscountKind::Fixed => "fixed",
        }
    }
}

impl core::fmt::Display for DiscountKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DiscountKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "none" => Ok(DiscountKind::None),
            "percentage" => Ok(DiscountKind::Percentage),
            "fixed" => Ok(DiscountKind::Fixed),
            other => Err(DomainError::validation(format!(
                "unknown discount kind '{other}' (expected percentage or fixed)"
            ))),
        }
    }
}

/// Discount rule, used both per item and per order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountSpec {
    pub kind: DiscountKind,
    pub amount: Decimal,
}

impl ValueObject for DiscountSpec {}

impl DiscountSpec {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn percentage(amount: Decimal) -> Self {
        Self {
            kind: DiscountKind::Percentage,
            amount,
        }
    }

    pub fn fixed(amount: Decimal) -> Self {
        Self {
            kind: DiscountKind::Fixed,
            amount,
        }
    }

    /// Reject negative amounts. Percentages above 100 are allowed here; the
    /// pricing engine caps every discount at what it is applied to.
    pub fn validate(&self) -> DomainResult<()> {
        if self.amount < Decimal::ZERO {
            return Err(DomainError::validation(format!(
                "{} discount amount must not be negative",
                self.kind
            )));
        }
        Ok(())
    }

    /// Unrounded discount this rule yields against `base`. Percentages are
    /// clamped into `[0, 100]`, so a percentage discount never exceeds the
    /// magnitude of its base.
    pub fn nominal(&self, base: Decimal) -> Decimal {
        match self.kind {
            DiscountKind::Percentage => {
                base * (self.amount.clamp(Decimal::ZERO, Decimal::ONE_HUNDRED) / Decimal::ONE_HUNDRED)
            }
            DiscountKind::Fixed => self.amount,
            DiscountKind::None => Decimal::ZERO,
        }
    }
}
