use serde::{Deserialize, Serialize};
use uuid::Uuid;

use openb2b_core::{AggregateId, OrgId};

/// A committed order or invoice event as subscribers see it.
///
/// Subscribers (customer mail, accounting export) filter on `org_id` and
/// `event_type` (`orders.order.placed`, `invoicing.invoice.drafted`, ...)
/// without decoding the payload. `sequence_number` is the order's or
/// invoice's version right after this event, so a subscriber can detect a
/// gap or a redelivery per aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope<E> {
    event_id: Uuid,
    org_id: OrgId,

    aggregate_id: AggregateId,
    aggregate_type: String,
    event_type: String,

    sequence_number: u64,

    payload: E,
}

impl<E> EventEnvelope<E> {
    pub fn new(
        event_id: Uuid,
        org_id: OrgId,
        aggregate_id: AggregateId,
        aggregate_type: impl Into<String>,
        event_type: impl Into<String>,
        sequence_number: u64,
        payload: E,
    ) -> Self {
        Self {
            event_id,
            org_id,
            aggregate_id,
            aggregate_type: aggregate_type.into(),
            event_type: event_type.into(),
            sequence_number,
            payload,
        }
    }

    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn org_id(&self) -> OrgId {
        self.org_id
    }

    pub fn aggregate_id(&self) -> AggregateId {
        self.aggregate_id
    }

    pub fn aggregate_type(&self) -> &str {
        &self.aggregate_type
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn sequence_number(&self) -> u64 {
        self.sequence_number
    }

    pub fn payload(&self) -> &E {
        &self.payload
    }

    pub fn into_payload(self) -> E {
        self.payload
    }

    /// Whether this envelope follows `previous` directly in one stream.
    pub fn follows<P>(&self, previous: &EventEnvelope<P>) -> bool {
        self.org_id == previous.org_id
            && self.aggregate_id == previous.aggregate_id
            && previous.sequence_number.checked_add(1) == Some(self.sequence_number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(
        org_id: OrgId,
        aggregate_id: AggregateId,
        sequence_number: u64,
        event_type: &str,
    ) -> EventEnvelope<&'static str> {
        EventEnvelope::new(
            Uuid::now_v7(),
            org_id,
            aggregate_id,
            "orders.order",
            event_type,
            sequence_number,
            "payload",
        )
    }

    #[test]
    fn exposes_routing_fields() {
        let org_id = OrgId::new();
        let order_id = AggregateId::new();
        let placed = envelope(org_id, order_id, 1, "orders.order.placed");

        assert_eq!(placed.org_id(), org_id);
        assert_eq!(placed.aggregate_id(), order_id);
        assert_eq!(placed.aggregate_type(), "orders.order");
        assert_eq!(placed.event_type(), "orders.order.placed");
        assert_eq!(placed.sequence_number(), 1);
        assert_eq!(*placed.payload(), "payload");
        assert_eq!(placed.into_payload(), "payload");
    }

    #[test]
    fn follows_only_the_previous_event_of_the_same_stream() {
        let org_id = OrgId::new();
        let order_id = AggregateId::new();
        let placed = envelope(org_id, order_id, 1, "orders.order.placed");
        let revised = envelope(org_id, order_id, 2, "orders.order.revised");

        assert!(revised.follows(&placed));
        assert!(!placed.follows(&revised));
        assert!(!envelope(org_id, order_id, 3, "orders.order.revised").follows(&placed));
        assert!(!envelope(OrgId::new(), order_id, 2, "orders.order.revised").follows(&placed));
        assert!(!envelope(org_id, AggregateId::new(), 2, "orders.order.revised").follows(&placed));
    }
}
