use chrono::{DateTime, Utc};

/// A typed domain event emitted by an aggregate.
///
/// Events are facts: immutable, append-only and versioned so stored payloads
/// can evolve. They carry the outcome of a decision (e.g. the priced item set
/// of an order), so replaying a stream never re-runs business rules.
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Stable event name, e.g. `"orders.order.placed"`.
    fn event_type(&self) -> &'static str;

    /// Schema version for this event type.
    fn version(&self) -> u32;

    /// Business time at which the event occurred.
    fn occurred_at(&self) -> DateTime<Utc>;
}
