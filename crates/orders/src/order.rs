use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use openb2b_core::{Aggregate, AggregateId, AggregateRoot, CustomerId, DomainError, OrgId};
use openb2b_events::Event;

use crate::delivery::{DeliveryChange, DeliveryDetails, DeliveryInfo};
use crate::discount::DiscountSpec;
use crate::error::OrderError;
use crate::item::OrderItem;
use crate::lifecycle::{DeliveryStatus, OrderStatus, ensure_mutable, ensure_transition};
use crate::totals::{OrderTotals, compute};

/// Order identifier (org-scoped via `org_id` fields in events/commands).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub AggregateId);

impl OrderId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for OrderId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Aggregate root: Order.
///
/// Items and totals are whatever the last `OrderPlaced`/`OrderRevised` event
/// carried; replay never re-runs the pricing engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    id: OrderId,
    org_id: Option<OrgId>,
    order_number: String,
    customer_id: Option<CustomerId>,
    status: OrderStatus,
    delivery: DeliveryInfo,
    notes: String,
    discount: DiscountSpec,
    items: Vec<OrderItem>,
    totals: OrderTotals,
    placed_at: Option<DateTime<Utc>>,
    version: u64,
    created: bool,
}

impl Order {
    /// Create an empty, not-yet-placed aggregate instance for rehydration.
    pub fn empty(id: OrderId) -> Self {
        Self {
            id,
            org_id: None,
            order_number: String::new(),
            customer_id: None,
            status: OrderStatus::Pending,
            delivery: DeliveryInfo::default(),
            notes: String::new(),
            discount: DiscountSpec::none(),
            items: Vec::new(),
            totals: OrderTotals::default(),
            placed_at: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> OrderId {
        self.id
    }

    pub fn org_id(&self) -> Option<OrgId> {
        self.org_id
    }

    pub fn order_number(&self) -> &str {
        &self.order_number
    }

    pub fn customer_id(&self) -> Option<CustomerId> {
        self.customer_id
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn delivery(&self) -> &DeliveryInfo {
        &self.delivery
    }

    pub fn notes(&self) -> &str {
        &self.notes
    }

    pub fn discount(&self) -> &DiscountSpec {
        &self.discount
    }

    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    pub fn totals(&self) -> &OrderTotals {
        &self.totals
    }

    pub fn placed_at(&self) -> Option<DateTime<Utc>> {
        self.placed_at
    }

    pub fn is_created(&self) -> bool {
        self.created
    }
}

impl AggregateRoot for Order {
    type Id = OrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: PlaceOrder.
///
/// `items` are already resolved against a variant snapshot; the aggregate
/// prices them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceOrder {
    pub org_id: OrgId,
    pub order_id: OrderId,
    pub order_number: String,
    pub customer_id: CustomerId,
    pub items: Vec<OrderItem>,
    pub discount: DiscountSpec,
    pub delivery: DeliveryDetails,
    pub notes: String,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ReviseOrder. `None` fields keep their current value; `items`
/// replaces the whole item set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviseOrder {
    pub org_id: OrgId,
    pub order_id: OrderId,
    pub customer_id: Option<CustomerId>,
    pub items: Option<Vec<OrderItem>>,
    pub discount: Option<DiscountSpec>,
    pub delivery: Option<DeliveryChange>,
    pub notes: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ChangeOrderStatus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeOrderStatus {
    pub org_id: OrgId,
    pub order_id: OrderId,
    pub to: OrderStatus,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ChangeDeliveryStatus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeDeliveryStatus {
    pub org_id: OrgId,
    pub order_id: OrderId,
    pub status: DeliveryStatus,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderCommand {
    PlaceOrder(PlaceOrder),
    ReviseOrder(ReviseOrder),
    ChangeOrderStatus(ChangeOrderStatus),
    ChangeDeliveryStatus(ChangeDeliveryStatus),
}

/// Event: OrderPlaced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPlaced {
    pub org_id: OrgId,
    pub order_id: OrderId,
    pub order_number: String,
    pub customer_id: CustomerId,
    pub items: Vec<OrderItem>,
    pub discount: DiscountSpec,
    pub totals: OrderTotals,
    pub delivery: DeliveryInfo,
    pub notes: String,
    pub occurred_at: DateTime<Utc>,
}

/// Event: OrderRevised. Carries the complete post-revision state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRevised {
    pub org_id: OrgId,
    pub order_id: OrderId,
    pub customer_id: CustomerId,
    pub items: Vec<OrderItem>,
    pub discount: DiscountSpec,
    pub totals: OrderTotals,
    pub delivery: DeliveryInfo,
    pub notes: String,
    pub occurred_at: DateTime<Utc>,
}

/// Event: OrderStatusChanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderStatusChanged {
    pub org_id: OrgId,
    pub order_id: OrderId,
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub occurred_at: DateTime<Utc>,
}

/// Event: DeliveryStatusChanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryStatusChanged {
    pub org_id: OrgId,
    pub order_id: OrderId,
    pub status: DeliveryStatus,
    pub delivered_at: Option<DateTime<Utc>>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderEvent {
    OrderPlaced(OrderPlaced),
    OrderRevised(OrderRevised),
    OrderStatusChanged(OrderStatusChanged),
    DeliveryStatusChanged(DeliveryStatusChanged),
}

impl Event for OrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::OrderPlaced(_) => "orders.order.placed",
            OrderEvent::OrderRevised(_) => "orders.order.revised",
            OrderEvent::OrderStatusChanged(_) => "orders.order.status_changed",
            OrderEvent::DeliveryStatusChanged(_) => "orders.order.delivery_status_changed",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            OrderEvent::OrderPlaced(e) => e.occurred_at,
            OrderEvent::OrderRevised(e) => e.occurred_at,
            OrderEvent::OrderStatusChanged(e) => e.occurred_at,
            OrderEvent::DeliveryStatusChanged(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Order {
    type Command = OrderCommand;
    type Event = OrderEvent;
    type Error = OrderError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            OrderEvent::OrderPlaced(e) => {
                self.id = e.order_id;
                self.org_id = Some(e.org_id);
                self.order_number = e.order_number.clone();
                self.customer_id = Some(e.customer_id);
                self.status = OrderStatus::Pending;
                self.items = e.items.clone();
                self.discount = e.discount.clone();
                self.totals = e.totals.clone();
                self.delivery = e.delivery.clone();
                self.notes = e.notes.clone();
                self.placed_at = Some(e.occurred_at);
                self.created = true;
            }
            OrderEvent::OrderRevised(e) => {
                self.customer_id = Some(e.customer_id);
                self.items = e.items.clone();
                self.discount = e.discount.clone();
                self.totals = e.totals.clone();
                self.delivery = e.delivery.clone();
                self.notes = e.notes.clone();
            }
            OrderEvent::OrderStatusChanged(e) => {
                self.status = e.to;
            }
            OrderEvent::DeliveryStatusChanged(e) => {
                self.delivery.status = e.status;
                self.delivery.delivered_at = e.delivered_at;
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            OrderCommand::PlaceOrder(cmd) => self.handle_place(cmd),
            OrderCommand::ReviseOrder(cmd) => self.handle_revise(cmd),
            OrderCommand::ChangeOrderStatus(cmd) => self.handle_change_status(cmd),
            OrderCommand::ChangeDeliveryStatus(cmd) => self.handle_change_delivery_status(cmd),
        }
    }
}

impl Order {
    fn ensure_placed(&self, org_id: OrgId, order_id: OrderId) -> Result<(), OrderError> {
        if !self.created {
            return Err(DomainError::not_found().into());
        }
        if self.org_id != Some(org_id) {
            return Err(OrderError::invariant("org mismatch"));
        }
        if self.id != order_id {
            return Err(OrderError::invariant("order_id mismatch"));
        }
        Ok(())
    }

    fn handle_place(&self, cmd: &PlaceOrder) -> Result<Vec<OrderEvent>, OrderError> {
        if self.created {
            return Err(DomainError::conflict("order already exists").into());
        }
        if self.id != cmd.order_id {
            return Err(OrderError::invariant("order_id mismatch"));
        }
        if cmd.order_number.trim().is_empty() {
            return Err(OrderError::validation("order_number cannot be empty"));
        }
        validate_items(&cmd.items)?;
        cmd.discount.validate()?;
        cmd.delivery.validate()?;

        let mut items = cmd.items.clone();
        let totals = compute(&mut items, &cmd.discount);

        Ok(vec![OrderEvent::OrderPlaced(OrderPlaced {
            org_id: cmd.org_id,
            order_id: cmd.order_id,
            order_number: cmd.order_number.clone(),
            customer_id: cmd.customer_id,
            items,
            discount: cmd.discount.clone(),
            totals,
            delivery: DeliveryInfo::from_details(cmd.delivery.clone()),
            notes: cmd.notes.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_revise(&self, cmd: &ReviseOrder) -> Result<Vec<OrderEvent>, OrderError> {
        self.ensure_placed(cmd.org_id, cmd.order_id)?;
        ensure_mutable(self.status)?;

        if let Some(items) = &cmd.items {
            validate_items(items)?;
        }
        if let Some(discount) = &cmd.discount {
            discount.validate()?;
        }
        if let Some(change) = &cmd.delivery {
            change.validate()?;
        }

        let mut items = cmd.items.clone().unwrap_or_else(|| self.items.clone());
        let discount = cmd.discount.clone().unwrap_or_else(|| self.discount.clone());
        let totals = compute(&mut items, &discount);

        let delivery = match &cmd.delivery {
            Some(change) => self.delivery.revised(change),
            None => self.delivery.clone(),
        };
        let customer_id = match (cmd.customer_id, self.customer_id) {
            (Some(id), _) | (None, Some(id)) => id,
            (None, None) => return Err(OrderError::invariant("placed order has no customer")),
        };

        Ok(vec![OrderEvent::OrderRevised(OrderRevised {
            org_id: cmd.org_id,
            order_id: cmd.order_id,
            customer_id,
            items,
            discount,
            totals,
            delivery,
            notes: cmd.notes.clone().unwrap_or_else(|| self.notes.clone()),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_change_status(&self, cmd: &ChangeOrderStatus) -> Result<Vec<OrderEvent>, OrderError> {
        self.ensure_placed(cmd.org_id, cmd.order_id)?;
        ensure_transition(self.status, cmd.to)?;

        Ok(vec![OrderEvent::OrderStatusChanged(OrderStatusChanged {
            org_id: cmd.org_id,
            order_id: cmd.order_id,
            from: self.status,
            to: cmd.to,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_change_delivery_status(
        &self,
        cmd: &ChangeDeliveryStatus,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        self.ensure_placed(cmd.org_id, cmd.order_id)?;

        Ok(vec![OrderEvent::DeliveryStatusChanged(DeliveryStatusChanged {
            org_id: cmd.org_id,
            order_id: cmd.order_id,
            status: cmd.status,
            delivered_at: self.delivery.delivered_at_after(cmd.status, cmd.occurred_at),
            occurred_at: cmd.occurred_at,
        })])
    }
}

fn validate_items(items: &[OrderItem]) -> Result<(), OrderError> {
    if items.is_empty() {
        return Err(OrderError::validation("order must contain at least one item"));
    }
    for item in items {
        item.validate()?;
    }
    Ok(())
}
