//! Domain events and their distribution.
//!
//! Aggregates emit typed events; infrastructure wraps them in org-scoped
//! envelopes and fans them out over an [`EventBus`] after they are stored.
//! Side effects such as emailing a customer belong to bus subscribers, never
//! to the aggregates.

pub mod bus;
pub mod envelope;
pub mod event;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use envelope::EventEnvelope;
pub use event::Event;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
