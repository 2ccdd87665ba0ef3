use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use openb2b_core::{DomainError, DomainResult, ValueObject};

use crate::lifecycle::DeliveryStatus;

/// Postal address for delivery.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub address: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub zip: String,
}

impl ValueObject for Address {}

/// Delivery details supplied when an order is placed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryDetails {
    pub address: Address,
    /// Informational; not part of the order total.
    pub transport_fare: Decimal,
    pub date: Option<DateTime<Utc>>,
}

/// Partial delivery update (pending orders only). `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryChange {
    pub address: Option<Address>,
    pub transport_fare: Option<Decimal>,
    pub date: Option<DateTime<Utc>>,
}

impl DeliveryChange {
    pub fn validate(&self) -> DomainResult<()> {
        if let Some(fare) = self.transport_fare {
            ensure_fare(fare)?;
        }
        Ok(())
    }
}

impl DeliveryDetails {
    pub fn validate(&self) -> DomainResult<()> {
        ensure_fare(self.transport_fare)
    }
}

fn ensure_fare(fare: Decimal) -> DomainResult<()> {
    if fare < Decimal::ZERO {
        return Err(DomainError::validation("transport fare must not be negative"));
    }
    Ok(())
}

/// Delivery state held on an order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryInfo {
    pub address: Option<Address>,
    pub transport_fare: Decimal,
    pub status: DeliveryStatus,
    pub date: Option<DateTime<Utc>>,
    /// When the delivery was marked delivered. Set once, never overwritten.
    pub delivered_at: Option<DateTime<Utc>>,
}

impl ValueObject for DeliveryInfo {}

impl DeliveryInfo {
    pub fn from_details(details: DeliveryDetails) -> Self {
        Self {
            address: Some(details.address),
            transport_fare: details.transport_fare,
            status: DeliveryStatus::Pending,
            date: details.date,
            delivered_at: None,
        }
    }

    /// Copy of `self` with `change` applied.
    pub fn revised(&self, change: &DeliveryChange) -> Self {
        let mut next = self.clone();
        if let Some(address) = &change.address {
            next.address = Some(address.clone());
        }
        if let Some(fare) = change.transport_fare {
            next.transport_fare = fare;
        }
        if let Some(date) = change.date {
            next.date = Some(date);
        }
        next
    }

    /// Timestamp `delivered_at` should hold after moving to `status` at `now`.
    pub fn delivered_at_after(&self, status: DeliveryStatus, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match (status, self.delivered_at) {
            (DeliveryStatus::Delivered, None) => Some(now),
            (_, existing) => existing,
        }
    }
}
