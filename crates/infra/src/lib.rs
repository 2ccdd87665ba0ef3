//! Infrastructure layer: event store, command dispatch, variant lookup,
//! configuration and the order workflow built on top of them.

pub mod catalog;
pub mod command_dispatcher;
pub mod config;
pub mod event_store;
pub mod order_service;

pub use catalog::{CatalogError, InMemoryVariantCatalog, VariantCatalog};
pub use command_dispatcher::{CommandDispatcher, DispatchError};
pub use config::InfraConfig;
pub use event_store::{EventStore, EventStoreError, InMemoryEventStore, StoredEvent, UncommittedEvent};
pub use order_service::{
    DraftInvoiceRequest, OrderService, PlaceOrderRequest, ReviseOrderRequest, WorkflowError,
};
