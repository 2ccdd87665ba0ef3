use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use openb2b_core::{Aggregate, AggregateId, AggregateRoot, DomainError, OrgId, ValueObject, round2};
use openb2b_events::Event;
use openb2b_orders::{Address, Order, OrderId, OrderItem, OrderStatus, OrderTotals};
use openb2b_products::VariantId;

use crate::error::InvoiceError;

/// Invoice identifier (org-scoped via `org_id` fields in events/commands).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvoiceId(pub AggregateId);

impl InvoiceId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for InvoiceId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Invoice status lifecycle.
///
/// ```text
/// Draft ──► ProForma ──► Issued ──► PartiallyPaid ──► Paid
///                           │            ▲   │
///                           └──► Overdue ┘   │
/// ```
///
/// Any non-terminal status may also move to `Cancelled`. `Paid` and
/// `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    /// Internal and editable; not sent to the customer.
    #[default]
    Draft,
    /// Sent to the customer for review; not a legal invoice.
    ProForma,
    Issued,
    Paid,
    PartiallyPaid,
    Overdue,
    Cancelled,
}

impl InvoiceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::ProForma => "pro_forma",
            InvoiceStatus::Issued => "issued",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::PartiallyPaid => "partially_paid",
            InvoiceStatus::Overdue => "overdue",
            InvoiceStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, InvoiceStatus::Paid | InvoiceStatus::Cancelled)
    }

    pub fn can_transition_to(self, next: InvoiceStatus) -> bool {
        use InvoiceStatus::*;
        if self.is_terminal() {
            return false;
        }
        match next {
            Cancelled => true,
            ProForma => self == Draft,
            Issued => matches!(self, Draft | ProForma),
            Overdue => matches!(self, Issued | PartiallyPaid),
            PartiallyPaid | Paid => matches!(self, Issued | PartiallyPaid | Overdue),
            Draft => false,
        }
    }
}

impl core::fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who the invoice is addressed to. Supplied by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillTo {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: Option<Address>,
}

impl ValueObject for BillTo {}

/// One invoice line, copied from a priced order item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceLine {
    pub variant_id: VariantId,
    pub sku: String,
    pub notes: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub tax_amount: Decimal,
    pub line_total: Decimal,
    /// Unit price × quantity, before discounts and tax.
    pub subtotal: Decimal,
}

impl InvoiceLine {
    pub fn from_item(item: &OrderItem) -> Self {
        Self {
            variant_id: item.variant_id,
            sku: item.sku.clone(),
            notes: item.notes.clone(),
            quantity: item.quantity,
            unit_price: item.unit_price,
            tax_amount: item.tax_amount(),
            line_total: item.line_total(),
            subtotal: round2(item.subtotal()),
        }
    }
}

/// Financial snapshot taken when the invoice is drafted. Never changes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceTotals {
    pub subtotal: Decimal,
    pub tax_total: Decimal,
    pub discount_total: Decimal,
    pub total: Decimal,
}

impl From<&OrderTotals> for InvoiceTotals {
    fn from(totals: &OrderTotals) -> Self {
        Self {
            subtotal: totals.subtotal,
            tax_total: totals.tax_total,
            discount_total: totals.discount_total,
            total: totals.total,
        }
    }
}

/// Aggregate root: Invoice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invoice {
    id: InvoiceId,
    org_id: Option<OrgId>,
    order_id: Option<OrderId>,
    invoice_number: String,
    status: InvoiceStatus,
    issued_at: Option<DateTime<Utc>>,
    due_date: Option<DateTime<Utc>>,
    currency: String,
    bill_to: BillTo,
    totals: InvoiceTotals,
    lines: Vec<InvoiceLine>,
    notes: String,
    version: u64,
    created: bool,
}

impl Invoice {
    /// Create an empty, not-yet-drafted aggregate instance for rehydration.
    pub fn empty(id: InvoiceId) -> Self {
        Self {
            id,
            org_id: None,
            order_id: None,
            invoice_number: String::new(),
            status: InvoiceStatus::Draft,
            issued_at: None,
            due_date: None,
            currency: String::new(),
            bill_to: BillTo::default(),
            totals: InvoiceTotals::default(),
            lines: Vec::new(),
            notes: String::new(),
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> InvoiceId {
        self.id
    }

    pub fn org_id(&self) -> Option<OrgId> {
        self.org_id
    }

    pub fn order_id(&self) -> Option<OrderId> {
        self.order_id
    }

    pub fn invoice_number(&self) -> &str {
        &self.invoice_number
    }

    pub fn status(&self) -> InvoiceStatus {
        self.status
    }

    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        self.issued_at
    }

    pub fn due_date(&self) -> Option<DateTime<Utc>> {
        self.due_date
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn bill_to(&self) -> &BillTo {
        &self.bill_to
    }

    pub fn totals(&self) -> &InvoiceTotals {
        &self.totals
    }

    pub fn lines(&self) -> &[InvoiceLine] {
        &self.lines
    }

    pub fn notes(&self) -> &str {
        &self.notes
    }

    pub fn is_created(&self) -> bool {
        self.created
    }
}

impl AggregateRoot for Invoice {
    type Id = InvoiceId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: DraftInvoice.
///
/// Carries the order facts the invoice snapshots; build it with
/// [`DraftInvoice::from_order`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftInvoice {
    pub org_id: OrgId,
    pub invoice_id: InvoiceId,
    pub invoice_number: String,
    pub order_id: OrderId,
    pub order_status: OrderStatus,
    pub order_items: Vec<OrderItem>,
    pub order_totals: OrderTotals,
    pub currency: String,
    pub bill_to: BillTo,
    pub due_date: Option<DateTime<Utc>>,
    pub notes: String,
    pub occurred_at: DateTime<Utc>,
}

impl DraftInvoice {
    /// Snapshot `order` into a draft command. Invoice-specific fields start
    /// empty and are filled in by the caller.
    pub fn from_order(
        order: &Order,
        invoice_id: InvoiceId,
        invoice_number: String,
        occurred_at: DateTime<Utc>,
    ) -> Result<Self, InvoiceError> {
        let org_id = order.org_id().ok_or(DomainError::NotFound)?;
        Ok(Self {
            org_id,
            invoice_id,
            invoice_number,
            order_id: order.id_typed(),
            order_status: order.status(),
            order_items: order.items().to_vec(),
            order_totals: order.totals().clone(),
            currency: String::new(),
            bill_to: BillTo::default(),
            due_date: None,
            notes: String::new(),
            occurred_at,
        })
    }
}

/// Command: ChangeInvoiceStatus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeInvoiceStatus {
    pub org_id: OrgId,
    pub invoice_id: InvoiceId,
    pub to: InvoiceStatus,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ReviseInvoice. Only notes and due date are editable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviseInvoice {
    pub org_id: OrgId,
    pub invoice_id: InvoiceId,
    pub notes: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvoiceCommand {
    DraftInvoice(DraftInvoice),
    ChangeInvoiceStatus(ChangeInvoiceStatus),
    ReviseInvoice(ReviseInvoice),
}

/// Event: InvoiceDrafted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceDrafted {
    pub org_id: OrgId,
    pub invoice_id: InvoiceId,
    pub invoice_number: String,
    pub order_id: OrderId,
    pub currency: String,
    pub bill_to: BillTo,
    pub totals: InvoiceTotals,
    pub lines: Vec<InvoiceLine>,
    pub due_date: Option<DateTime<Utc>>,
    pub notes: String,
    pub occurred_at: DateTime<Utc>,
}

/// Event: InvoiceStatusChanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceStatusChanged {
    pub org_id: OrgId,
    pub invoice_id: InvoiceId,
    pub from: InvoiceStatus,
    pub to: InvoiceStatus,
    pub occurred_at: DateTime<Utc>,
}

/// Event: InvoiceRevised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceRevised {
    pub org_id: OrgId,
    pub invoice_id: InvoiceId,
    pub notes: String,
    pub due_date: Option<DateTime<Utc>>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvoiceEvent {
    InvoiceDrafted(InvoiceDrafted),
    InvoiceStatusChanged(InvoiceStatusChanged),
    InvoiceRevised(InvoiceRevised),
}

impl Event for InvoiceEvent {
    fn event_type(&self) -> &'static str {
        match self {
            InvoiceEvent::InvoiceDrafted(_) => "invoicing.invoice.drafted",
            InvoiceEvent::InvoiceStatusChanged(_) => "invoicing.invoice.status_changed",
            InvoiceEvent::InvoiceRevised(_) => "invoicing.invoice.revised",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            InvoiceEvent::InvoiceDrafted(e) => e.occurred_at,
            InvoiceEvent::InvoiceStatusChanged(e) => e.occurred_at,
            InvoiceEvent::InvoiceRevised(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Invoice {
    type Command = InvoiceCommand;
    type Event = InvoiceEvent;
    type Error = InvoiceError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            InvoiceEvent::InvoiceDrafted(e) => {
                self.id = e.invoice_id;
                self.org_id = Some(e.org_id);
                self.order_id = Some(e.order_id);
                self.invoice_number = e.invoice_number.clone();
                self.status = InvoiceStatus::Draft;
                self.issued_at = Some(e.occurred_at);
                self.due_date = e.due_date;
                self.currency = e.currency.clone();
                self.bill_to = e.bill_to.clone();
                self.totals = e.totals.clone();
                self.lines = e.lines.clone();
                self.notes = e.notes.clone();
                self.created = true;
            }
            InvoiceEvent::InvoiceStatusChanged(e) => {
                self.status = e.to;
            }
            InvoiceEvent::InvoiceRevised(e) => {
                self.notes = e.notes.clone();
                self.due_date = e.due_date;
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            InvoiceCommand::DraftInvoice(cmd) => self.handle_draft(cmd),
            InvoiceCommand::ChangeInvoiceStatus(cmd) => self.handle_change_status(cmd),
            InvoiceCommand::ReviseInvoice(cmd) => self.handle_revise(cmd),
        }
    }
}

impl Invoice {
    fn ensure_drafted(&self, org_id: OrgId, invoice_id: InvoiceId) -> Result<(), InvoiceError> {
        if !self.created {
            return Err(DomainError::not_found().into());
        }
        if self.org_id != Some(org_id) {
            return Err(DomainError::invariant("org mismatch").into());
        }
        if self.id != invoice_id {
            return Err(DomainError::invariant("invoice_id mismatch").into());
        }
        Ok(())
    }

    fn ensure_open(&self) -> Result<(), InvoiceError> {
        if self.status.is_terminal() {
            return Err(InvoiceError::Closed { status: self.status });
        }
        Ok(())
    }

    fn handle_draft(&self, cmd: &DraftInvoice) -> Result<Vec<InvoiceEvent>, InvoiceError> {
        if self.created {
            return Err(DomainError::conflict("invoice already exists").into());
        }
        if self.id != cmd.invoice_id {
            return Err(DomainError::invariant("invoice_id mismatch").into());
        }
        if cmd.order_status == OrderStatus::Cancelled {
            return Err(InvoiceError::OrderCancelled);
        }
        if cmd.order_items.is_empty() {
            return Err(InvoiceError::EmptyOrder);
        }
        if cmd.invoice_number.trim().is_empty() {
            return Err(DomainError::validation("invoice_number cannot be empty").into());
        }
        if cmd.currency.len() != 3 || !cmd.currency.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(DomainError::validation(format!(
                "currency '{}' must be a three-letter ISO code",
                cmd.currency
            ))
            .into());
        }
        if cmd.due_date.is_some_and(|due| due < cmd.occurred_at) {
            return Err(DomainError::validation("due date cannot precede the issue date").into());
        }

        Ok(vec![InvoiceEvent::InvoiceDrafted(InvoiceDrafted {
            org_id: cmd.org_id,
            invoice_id: cmd.invoice_id,
            invoice_number: cmd.invoice_number.clone(),
            order_id: cmd.order_id,
            currency: cmd.currency.clone(),
            bill_to: cmd.bill_to.clone(),
            totals: InvoiceTotals::from(&cmd.order_totals),
            lines: cmd.order_items.iter().map(InvoiceLine::from_item).collect(),
            due_date: cmd.due_date,
            notes: cmd.notes.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_change_status(
        &self,
        cmd: &ChangeInvoiceStatus,
    ) -> Result<Vec<InvoiceEvent>, InvoiceError> {
        self.ensure_drafted(cmd.org_id, cmd.invoice_id)?;
        self.ensure_open()?;

        if !self.status.can_transition_to(cmd.to) {
            return Err(InvoiceError::InvalidTransition {
                from: self.status,
                to: cmd.to,
            });
        }

        Ok(vec![InvoiceEvent::InvoiceStatusChanged(InvoiceStatusChanged {
            org_id: cmd.org_id,
            invoice_id: cmd.invoice_id,
            from: self.status,
            to: cmd.to,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_revise(&self, cmd: &ReviseInvoice) -> Result<Vec<InvoiceEvent>, InvoiceError> {
        self.ensure_drafted(cmd.org_id, cmd.invoice_id)?;
        self.ensure_open()?;

        Ok(vec![InvoiceEvent::InvoiceRevised(InvoiceRevised {
            org_id: cmd.org_id,
            invoice_id: cmd.invoice_id,
            notes: cmd.notes.clone().unwrap_or_else(|| self.notes.clone()),
            due_date: cmd.due_date.or(self.due_date),
            occurred_at: cmd.occurred_at,
        })])
    }
}
