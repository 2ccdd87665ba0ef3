//! Configuration loading.
//!
//! | variable                   | default | meaning                                   |
//! |----------------------------|---------|-------------------------------------------|
//! | `OPENB2B_CURRENCY`         | `NGN`   | ISO 4217 code stamped on new invoices     |
//! | `OPENB2B_INVOICE_DUE_DAYS` | unset   | days from drafting to the invoice due date |
//!
//! Due days are bounded by [`MAX_INVOICE_DUE_DAYS`].

use anyhow::{Context, bail};

pub const CURRENCY_ENV: &str = "OPENB2B_CURRENCY";
pub const INVOICE_DUE_DAYS_ENV: &str = "OPENB2B_INVOICE_DUE_DAYS";

pub const DEFAULT_CURRENCY: &str = "NGN";

/// Ten years.
pub const MAX_INVOICE_DUE_DAYS: u32 = 3650;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfraConfig {
    pub currency: String,
    /// `None` leaves new invoices without a due date.
    pub invoice_due_days: Option<u32>,
}

impl Default for InfraConfig {
    fn default() -> Self {
        Self {
            currency: DEFAULT_CURRENCY.to_string(),
            invoice_due_days: None,
        }
    }
}

impl InfraConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let currency = match get(CURRENCY_ENV) {
            Some(code) => {
                let code = code.to_ascii_uppercase();
                if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
                    bail!("{CURRENCY_ENV}='{code}' is not a three-letter currency code");
                }
                code
            }
            None => DEFAULT_CURRENCY.to_string(),
        };

        let invoice_due_days = match get(INVOICE_DUE_DAYS_ENV) {
            Some(raw) => {
                let days = raw
                    .parse::<u32>()
                    .with_context(|| format!("{INVOICE_DUE_DAYS_ENV}='{raw}' is not a whole number of days"))?;
                if days > MAX_INVOICE_DUE_DAYS {
                    bail!("{INVOICE_DUE_DAYS_ENV}={days} exceeds the maximum of {MAX_INVOICE_DUE_DAYS} days");
                }
                Some(days)
            }
            None => None,
        };

        Ok(Self {
            currency,
            invoice_due_days,
        })
    }
}
