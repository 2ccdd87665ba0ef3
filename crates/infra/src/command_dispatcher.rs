//! Command execution pipeline for event-sourced aggregates.
//!
//! ```text
//! Command
//!   ↓
//! 1. Load events from store (org-scoped)
//!   ↓
//! 2. Rehydrate aggregate (apply historical events to rebuild state)
//!   ↓
//! 3. Check the caller's expected version against the rehydrated version
//!   ↓
//! 4. Handle command (pure decision logic, produces events)
//!   ↓
//! 5. Persist events (append-only, exact expected version)
//!   ↓
//! 6. Publish committed events to the bus
//! ```
//!
//! Nothing is published unless the append succeeded. If publication fails
//! after the append, the events stay committed and the error is returned, so
//! delivery is at-least-once.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use thiserror::Error;
use uuid::Uuid;

use openb2b_core::{Aggregate, AggregateId, AggregateRoot, ExpectedVersion, OrgId};
use openb2b_events::{EventBus, EventEnvelope};

use crate::event_store::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};

/// Failure while dispatching a command. `E` is the aggregate's own error type.
#[derive(Debug, Error)]
pub enum DispatchError<E> {
    /// The aggregate rejected the command (deterministic; never retried).
    #[error("command rejected: {0}")]
    Rejected(E),

    /// Optimistic concurrency failure (stale token or concurrent append).
    #[error("optimistic concurrency check failed: {0}")]
    Concurrency(String),

    /// Org isolation violation (cross-org or cross-aggregate stream mixing).
    #[error("org isolation violation: {0}")]
    OrgIsolation(String),

    /// Historical payload could not be decoded into the aggregate event type.
    #[error("failed to deserialize stored event: {0}")]
    Deserialize(String),

    #[error("event store failure: {0}")]
    Store(EventStoreError),

    /// Publication failed after a successful append.
    #[error("event publication failed: {0}")]
    Publish(String),
}

impl<E> From<EventStoreError> for DispatchError<E> {
    fn from(value: EventStoreError) -> Self {
        match value {
            EventStoreError::Concurrency(msg) => DispatchError::Concurrency(msg),
            EventStoreError::OrgIsolation(msg) => DispatchError::OrgIsolation(msg),
            other => DispatchError::Store(other),
        }
    }
}

/// Reusable command execution engine for event-sourced aggregates.
///
/// Generic over the store `S` and bus `B` so tests run against the in-memory
/// implementations and deployments can swap in real backends.
#[derive(Debug)]
pub struct CommandDispatcher<S, B> {
    store: S,
    bus: B,
}

impl<S, B> CommandDispatcher<S, B> {
    pub fn new(store: S, bus: B) -> Self {
        Self { store, bus }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn into_parts(self) -> (S, B) {
        (self.store, self.bus)
    }
}

impl<S, B> CommandDispatcher<S, B>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    /// Load and rehydrate an aggregate. A stream that does not exist yields
    /// the fresh instance from `make_aggregate` at version 0.
    pub fn load<A>(
        &self,
        org_id: OrgId,
        aggregate_id: AggregateId,
        make_aggregate: impl FnOnce(OrgId, AggregateId) -> A,
    ) -> Result<A, DispatchError<A::Error>>
    where
        A: Aggregate,
        A::Event: DeserializeOwned,
    {
        let history = self.store.load_stream(org_id, aggregate_id)?;
        validate_loaded_stream(org_id, aggregate_id, &history)?;

        let mut aggregate = make_aggregate(org_id, aggregate_id);
        apply_history(&mut aggregate, &history)?;
        Ok(aggregate)
    }

    /// Dispatch a command through the full pipeline.
    ///
    /// `expected` is checked against the rehydrated version before the
    /// command is handled, and the append always uses the exact loaded
    /// version, so a write that raced with this one is rejected as
    /// [`DispatchError::Concurrency`].
    ///
    /// Returns the committed events with their sequence numbers.
    pub fn dispatch<A>(
        &self,
        org_id: OrgId,
        aggregate_id: AggregateId,
        aggregate_type: impl Into<String>,
        command: &A::Command,
        expected: ExpectedVersion,
        make_aggregate: impl FnOnce(OrgId, AggregateId) -> A,
    ) -> Result<Vec<StoredEvent>, DispatchError<A::Error>>
    where
        A: Aggregate,
        A::Event: openb2b_events::Event + Serialize + DeserializeOwned,
    {
        let aggregate = self.load(org_id, aggregate_id, make_aggregate)?;
        let current = aggregate.version();

        if !expected.matches(current) {
            return Err(DispatchError::Concurrency(format!(
                "expected {expected:?}, found {current}"
            )));
        }

        let decided = aggregate.handle(command).map_err(DispatchError::Rejected)?;
        if decided.is_empty() {
            return Ok(vec![]);
        }

        let aggregate_type = aggregate_type.into();
        let uncommitted = decided
            .iter()
            .map(|ev| {
                UncommittedEvent::from_typed(org_id, aggregate_id, aggregate_type.clone(), Uuid::now_v7(), ev)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let committed = self.store.append(uncommitted, ExpectedVersion::Exact(current))?;

        for stored in &committed {
            self.bus
                .publish(stored.to_envelope())
                .map_err(|e| DispatchError::Publish(format!("{e:?}")))?;
        }

        tracing::debug!(
            %org_id,
            %aggregate_id,
            aggregate_type = %aggregate_type,
            from_version = current,
            events = committed.len(),
            "events committed"
        );

        Ok(committed)
    }
}

fn validate_loaded_stream<E>(
    org_id: OrgId,
    aggregate_id: AggregateId,
    stream: &[StoredEvent],
) -> Result<(), DispatchError<E>> {
    // Enforce org isolation even if a buggy backend returns cross-org data.
    let mut last = 0u64;
    for (idx, e) in stream.iter().enumerate() {
        if e.org_id != org_id {
            return Err(DispatchError::OrgIsolation(format!(
                "loaded stream contains wrong org_id at index {idx}"
            )));
        }
        if e.aggregate_id != aggregate_id {
            return Err(DispatchError::OrgIsolation(format!(
                "loaded stream contains wrong aggregate_id at index {idx}"
            )));
        }
        if e.sequence_number <= last {
            return Err(DispatchError::Store(EventStoreError::InvalidAppend(format!(
                "non-monotonic sequence_number in loaded stream (last={last}, found={})",
                e.sequence_number
            ))));
        }
        last = e.sequence_number;
    }
    Ok(())
}

fn apply_history<A>(aggregate: &mut A, history: &[StoredEvent]) -> Result<(), DispatchError<A::Error>>
where
    A: Aggregate,
    A::Event: DeserializeOwned,
{
    for stored in history {
        let ev: A::Event = serde_json::from_value(stored.payload.clone())
            .map_err(|e| DispatchError::Deserialize(e.to_string()))?;
        aggregate.apply(&ev);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use openb2b_core::CustomerId;
    use openb2b_events::InMemoryEventBus;
    use openb2b_orders::{
        ChangeOrderStatus, DeliveryDetails, DiscountSpec, ItemRequest, Order, OrderCommand, OrderError,
        OrderId, OrderItem, OrderStatus, PlaceOrder,
    };
    use openb2b_products::{ProductId, Variant, VariantId};
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    use crate::event_store::InMemoryEventStore;

    type Bus = Arc<InMemoryEventBus<EventEnvelope<JsonValue>>>;

    fn dispatcher() -> CommandDispatcher<InMemoryEventStore, Bus> {
        CommandDispatcher::new(InMemoryEventStore::new(), Arc::new(InMemoryEventBus::new()))
    }

    fn item(org_id: OrgId) -> OrderItem {
        let variant = Variant {
            id: VariantId::new(AggregateId::new()),
            product_id: ProductId::new(AggregateId::new()),
            org_id,
            sku: "SKU".to_string(),
            price: dec!(40),
            tax_rate: dec!(0.1),
        };
        OrderItem::from_variant(&ItemRequest::new(variant.id, 1), &variant)
    }

    fn place(org_id: OrgId, order_id: OrderId) -> OrderCommand {
        OrderCommand::PlaceOrder(PlaceOrder {
            org_id,
            order_id,
            order_number: "ORD-T".to_string(),
            customer_id: CustomerId::new(),
            items: vec![item(org_id)],
            discount: DiscountSpec::none(),
            delivery: DeliveryDetails::default(),
            notes: String::new(),
            occurred_at: Utc::now(),
        })
    }

    fn make_order(_org: OrgId, id: AggregateId) -> Order {
        Order::empty(OrderId::new(id))
    }

    #[test]
    fn dispatch_persists_then_publishes() {
        let d = dispatcher();
        let sub = d.bus().subscribe();
        let org_id = OrgId::new();
        let id = AggregateId::new();

        let committed = d
            .dispatch(org_id, id, "orders.order", &place(org_id, OrderId::new(id)), ExpectedVersion::Exact(0), make_order)
            .unwrap();
        assert_eq!(committed.len(), 1);
        assert_eq!(committed[0].sequence_number, 1);

        let published = sub.drain();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].event_type(), "orders.order.placed");
        assert_eq!(published[0].org_id(), org_id);

        let order: Order = d.load(org_id, id, make_order).unwrap();
        assert_eq!(order.version(), 1);
        assert_eq!(order.totals().total, dec!(44));
    }

    #[test]
    fn stale_expected_version_is_a_conflict() {
        let d = dispatcher();
        let org_id = OrgId::new();
        let id = AggregateId::new();
        d.dispatch(org_id, id, "orders.order", &place(org_id, OrderId::new(id)), ExpectedVersion::Any, make_order)
            .unwrap();

        let approve = OrderCommand::ChangeOrderStatus(ChangeOrderStatus {
            org_id,
            order_id: OrderId::new(id),
            to: OrderStatus::Approved,
            occurred_at: Utc::now(),
        });
        let err = d
            .dispatch(org_id, id, "orders.order", &approve, ExpectedVersion::Exact(0), make_order)
            .unwrap_err();
        assert!(matches!(err, DispatchError::Concurrency(_)));
    }

    #[test]
    fn rejected_command_appends_nothing() {
        let d = dispatcher();
        let sub = d.bus().subscribe();
        let org_id = OrgId::new();
        let id = AggregateId::new();

        let approve = OrderCommand::ChangeOrderStatus(ChangeOrderStatus {
            org_id,
            order_id: OrderId::new(id),
            to: OrderStatus::Approved,
            occurred_at: Utc::now(),
        });
        let err = d
            .dispatch(org_id, id, "orders.order", &approve, ExpectedVersion::Any, make_order)
            .unwrap_err();

        assert!(matches!(err, DispatchError::Rejected(OrderError::Domain(_))));
        assert!(d.store().load_stream(org_id, id).unwrap().is_empty());
        assert!(sub.drain().is_empty());
    }
}
