//! Orders domain module (event-sourced).
//!
//! Business rules for B2B orders, implemented purely as deterministic domain
//! logic (no IO, no HTTP, no storage):
//!
//! - [`resolver`]: turns client item requests plus a variant snapshot map into
//!   order items, all-or-nothing.
//! - [`totals`]: the pricing engine (discounts, proportional order-discount
//!   allocation, tax, totals).
//! - [`lifecycle`]: order status state machine and the pending-only mutation
//!   guard.
//! - [`order`]: the `Order` aggregate tying the three together.

pub mod delivery;
pub mod discount;
pub mod error;
pub mod item;
pub mod lifecycle;
pub mod order;
pub mod resolver;
pub mod totals;

pub use delivery::{Address, DeliveryChange, DeliveryDetails, DeliveryInfo};
pub use discount::{DiscountKind, DiscountSpec};
pub use error::OrderError;
pub use item::{ItemRequest, OrderItem};
pub use lifecycle::{DeliveryStatus, OrderStatus, ensure_mutable, ensure_transition};
pub use order::{
    ChangeDeliveryStatus, ChangeOrderStatus, DeliveryStatusChanged, Order, OrderCommand, OrderEvent,
    OrderId, OrderPlaced, OrderRevised, OrderStatusChanged, PlaceOrder, ReviseOrder,
};
pub use resolver::resolve;
pub use totals::{OrderTotals, compute};
