//! Order workflow: the synchronous orchestration around the pricing core.
//!
//! ```text
//! request ─► load order ─► version token ─► lifecycle guard
//!         ─► one batch variant lookup ─► resolve ─► dispatch (exact version)
//! ```
//!
//! The aggregate prices items while handling the command, so every persisted
//! `OrderPlaced`/`OrderRevised` event already carries the computed totals.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

use openb2b_core::{AggregateId, AggregateRoot, CustomerId, DomainError, ExpectedVersion, OrgId, document_number};
use openb2b_events::{EventBus, EventEnvelope};
use openb2b_invoicing::{
    BillTo, ChangeInvoiceStatus, DraftInvoice, Invoice, InvoiceCommand, InvoiceError, InvoiceId, InvoiceStatus,
};
use openb2b_orders::{
    ChangeDeliveryStatus, ChangeOrderStatus, DeliveryChange, DeliveryDetails, DeliveryStatus, DiscountSpec,
    ItemRequest, Order, OrderCommand, OrderError, OrderId, OrderItem, OrderStatus, PlaceOrder, ReviseOrder,
    ensure_mutable, resolve,
};
use openb2b_products::VariantId;

use crate::catalog::{CatalogError, VariantCatalog};
use crate::command_dispatcher::{CommandDispatcher, DispatchError};
use crate::config::InfraConfig;
use crate::event_store::EventStore;

pub const ORDER_AGGREGATE: &str = "orders.order";
pub const INVOICE_AGGREGATE: &str = "invoicing.invoice";

/// Failure surfaced by the order workflow.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Order(#[from] OrderError),

    #[error(transparent)]
    Invoice(#[from] InvoiceError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// Stale version token or a concurrent write won the race.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("infrastructure failure: {0}")]
    Infrastructure(String),
}

impl<E> From<DispatchError<E>> for WorkflowError
where
    E: Into<WorkflowError>,
{
    fn from(value: DispatchError<E>) -> Self {
        match value {
            DispatchError::Rejected(e) => e.into(),
            DispatchError::Concurrency(msg) => WorkflowError::Conflict(msg),
            DispatchError::OrgIsolation(msg) => WorkflowError::Infrastructure(format!("org isolation: {msg}")),
            DispatchError::Deserialize(msg) => WorkflowError::Infrastructure(format!("deserialize: {msg}")),
            DispatchError::Store(err) => WorkflowError::Infrastructure(err.to_string()),
            DispatchError::Publish(msg) => WorkflowError::Infrastructure(format!("publish: {msg}")),
        }
    }
}

impl WorkflowError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, WorkflowError::Conflict(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            WorkflowError::Order(OrderError::Domain(DomainError::NotFound))
                | WorkflowError::Invoice(InvoiceError::Domain(DomainError::NotFound))
        )
    }
}

/// Input for placing a new order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    pub customer_id: CustomerId,
    pub items: Vec<ItemRequest>,
    #[serde(default)]
    pub discount: DiscountSpec,
    #[serde(default)]
    pub delivery: DeliveryDetails,
    #[serde(default)]
    pub notes: String,
}

/// Input for revising a pending order. Omitted fields keep their value;
/// `items` replaces the whole item set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviseOrderRequest {
    /// Version the caller last saw. `None` skips the check.
    pub version: Option<u64>,
    pub customer_id: Option<CustomerId>,
    pub items: Option<Vec<ItemRequest>>,
    pub discount: Option<DiscountSpec>,
    pub delivery: Option<DeliveryChange>,
    pub notes: Option<String>,
}

/// Invoice details the order does not carry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftInvoiceRequest {
    #[serde(default)]
    pub bill_to: BillTo,
    #[serde(default)]
    pub notes: String,
    /// Overrides the configured due-date offset.
    pub due_date: Option<DateTime<Utc>>,
}

/// Order workflow service.
pub struct OrderService<S, B, C> {
    dispatcher: CommandDispatcher<S, B>,
    catalog: C,
    config: InfraConfig,
}

impl<S, B, C> OrderService<S, B, C> {
    pub fn new(dispatcher: CommandDispatcher<S, B>, catalog: C, config: InfraConfig) -> Self {
        Self {
            dispatcher,
            catalog,
            config,
        }
    }

    pub fn dispatcher(&self) -> &CommandDispatcher<S, B> {
        &self.dispatcher
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    pub fn config(&self) -> &InfraConfig {
        &self.config
    }
}

impl<S, B, C> OrderService<S, B, C>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
    C: VariantCatalog,
{
    pub fn load_order(&self, org_id: OrgId, order_id: OrderId) -> Result<Order, WorkflowError> {
        let order: Order = self
            .dispatcher
            .load(org_id, order_id.0, |_, id| Order::empty(OrderId::new(id)))?;
        if !order.is_created() {
            return Err(OrderError::from(DomainError::not_found()).into());
        }
        Ok(order)
    }

    pub fn load_invoice(&self, org_id: OrgId, invoice_id: InvoiceId) -> Result<Invoice, WorkflowError> {
        let invoice: Invoice = self
            .dispatcher
            .load(org_id, invoice_id.0, |_, id| Invoice::empty(InvoiceId::new(id)))?;
        if !invoice.is_created() {
            return Err(InvoiceError::from(DomainError::not_found()).into());
        }
        Ok(invoice)
    }

    /// Resolve, price and persist a new order. Returns it at version 1.
    pub fn place_order(&self, org_id: OrgId, request: PlaceOrderRequest) -> Result<Order, WorkflowError> {
        let items = self.resolve_items(org_id, &request.items)?;
        let order_id = OrderId::new(AggregateId::new());

        let command = OrderCommand::PlaceOrder(PlaceOrder {
            org_id,
            order_id,
            order_number: document_number("ORD"),
            customer_id: request.customer_id,
            items,
            discount: request.discount,
            delivery: request.delivery,
            notes: request.notes,
            occurred_at: Utc::now(),
        });
        self.dispatch_order(org_id, order_id, &command, ExpectedVersion::Exact(0))?;

        let order = self.load_order(org_id, order_id)?;
        tracing::info!(
            %org_id,
            %order_id,
            order_number = order.order_number(),
            items = order.items().len(),
            total = %order.totals().total,
            "order placed"
        );
        Ok(order)
    }

    /// Revise a pending order and re-price it.
    ///
    /// The version token and the lifecycle guard are both checked before any
    /// variant lookup; a rejected revision leaves the stored order untouched.
    pub fn revise_order(
        &self,
        org_id: OrgId,
        order_id: OrderId,
        request: ReviseOrderRequest,
    ) -> Result<Order, WorkflowError> {
        let order = self.load_order(org_id, order_id)?;
        let version = order.version();

        if let Err(err) = ExpectedVersion::from_token(request.version).check(version) {
            tracing::warn!(%org_id, %order_id, token = ?request.version, version, "stale order revision rejected");
            return Err(WorkflowError::Conflict(err.to_string()));
        }

        if let Err(err) = ensure_mutable(order.status()) {
            tracing::warn!(%org_id, %order_id, status = %order.status(), "revision of non-pending order rejected");
            return Err(err.into());
        }

        let items = match &request.items {
            Some(requests) => Some(self.resolve_items(org_id, requests)?),
            None => None,
        };

        let command = OrderCommand::ReviseOrder(ReviseOrder {
            org_id,
            order_id,
            customer_id: request.customer_id,
            items,
            discount: request.discount,
            delivery: request.delivery,
            notes: request.notes,
            occurred_at: Utc::now(),
        });
        self.dispatch_order(org_id, order_id, &command, ExpectedVersion::Exact(version))?;

        let revised = self.load_order(org_id, order_id)?;
        tracing::info!(
            %org_id,
            %order_id,
            version = revised.version(),
            total = %revised.totals().total,
            "order revised"
        );
        Ok(revised)
    }

    pub fn change_status(
        &self,
        org_id: OrgId,
        order_id: OrderId,
        to: OrderStatus,
        version: Option<u64>,
    ) -> Result<Order, WorkflowError> {
        let command = OrderCommand::ChangeOrderStatus(ChangeOrderStatus {
            org_id,
            order_id,
            to,
            occurred_at: Utc::now(),
        });
        self.dispatch_order(org_id, order_id, &command, ExpectedVersion::from_token(version))?;

        tracing::info!(%org_id, %order_id, status = %to, "order status changed");
        self.load_order(org_id, order_id)
    }

    pub fn change_delivery_status(
        &self,
        org_id: OrgId,
        order_id: OrderId,
        status: DeliveryStatus,
        version: Option<u64>,
    ) -> Result<Order, WorkflowError> {
        let command = OrderCommand::ChangeDeliveryStatus(ChangeDeliveryStatus {
            org_id,
            order_id,
            status,
            occurred_at: Utc::now(),
        });
        self.dispatch_order(org_id, order_id, &command, ExpectedVersion::from_token(version))?;

        tracing::info!(%org_id, %order_id, delivery_status = %status, "delivery status changed");
        self.load_order(org_id, order_id)
    }

    /// Draft an invoice from the order's current priced snapshot.
    pub fn draft_invoice(
        &self,
        org_id: OrgId,
        order_id: OrderId,
        request: DraftInvoiceRequest,
    ) -> Result<Invoice, WorkflowError> {
        let order = self.load_order(org_id, order_id)?;
        let invoice_id = InvoiceId::new(AggregateId::new());
        let now = Utc::now();

        let due_date = match request.due_date {
            Some(due) => Some(due),
            None => self.configured_due_date(now)?,
        };

        let mut draft = DraftInvoice::from_order(&order, invoice_id, document_number("INV"), now)?;
        draft.currency = self.config.currency.clone();
        draft.bill_to = request.bill_to;
        draft.notes = request.notes;
        draft.due_date = due_date;

        self.dispatcher.dispatch(
            org_id,
            invoice_id.0,
            INVOICE_AGGREGATE,
            &InvoiceCommand::DraftInvoice(draft),
            ExpectedVersion::Exact(0),
            |_, id| Invoice::empty(InvoiceId::new(id)),
        )?;

        let invoice = self.load_invoice(org_id, invoice_id)?;
        tracing::info!(
            %org_id,
            %order_id,
            %invoice_id,
            invoice_number = invoice.invoice_number(),
            total = %invoice.totals().total,
            "invoice drafted"
        );
        Ok(invoice)
    }

    pub fn change_invoice_status(
        &self,
        org_id: OrgId,
        invoice_id: InvoiceId,
        to: InvoiceStatus,
    ) -> Result<Invoice, WorkflowError> {
        let command = InvoiceCommand::ChangeInvoiceStatus(ChangeInvoiceStatus {
            org_id,
            invoice_id,
            to,
            occurred_at: Utc::now(),
        });
        self.dispatcher.dispatch(
            org_id,
            invoice_id.0,
            INVOICE_AGGREGATE,
            &command,
            ExpectedVersion::Any,
            |_, id| Invoice::empty(InvoiceId::new(id)),
        )?;

        tracing::info!(%org_id, %invoice_id, status = %to, "invoice status changed");
        self.load_invoice(org_id, invoice_id)
    }

    fn dispatch_order(
        &self,
        org_id: OrgId,
        order_id: OrderId,
        command: &OrderCommand,
        expected: ExpectedVersion,
    ) -> Result<(), WorkflowError> {
        self.dispatcher.dispatch(
            org_id,
            order_id.0,
            ORDER_AGGREGATE,
            command,
            expected,
            |_, id| Order::empty(OrderId::new(id)),
        )?;
        Ok(())
    }

    fn configured_due_date(&self, issued_at: DateTime<Utc>) -> Result<Option<DateTime<Utc>>, WorkflowError> {
        let Some(days) = self.config.invoice_due_days else {
            return Ok(None);
        };
        issued_at
            .checked_add_signed(Duration::days(i64::from(days)))
            .map(Some)
            .ok_or_else(|| {
                WorkflowError::Infrastructure(format!("invoice due date {days} days after {issued_at} is out of range"))
            })
    }

    /// Validate requests, fetch every referenced variant in one lookup and
    /// resolve them into unpriced order items.
    fn resolve_items(&self, org_id: OrgId, requests: &[ItemRequest]) -> Result<Vec<OrderItem>, WorkflowError> {
        if requests.is_empty() {
            return Err(OrderError::validation("order must contain at least one item").into());
        }
        for request in requests {
            request.validate().map_err(OrderError::from)?;
        }

        let mut seen = HashSet::new();
        let ids: Vec<VariantId> = requests
            .iter()
            .map(|r| r.variant_id)
            .filter(|id| seen.insert(*id))
            .collect();

        let variants = self.catalog.variants_by_ids(org_id, &ids)?;
        resolve(requests, &variants).map_err(|err| {
            tracing::warn!(%org_id, error = %err, "item resolution failed");
            err.into()
        })
    }
}
