//! End-to-end order workflow: catalog → resolver → aggregate/pricing →
//! event store → bus, plus invoicing from the priced order.

use std::sync::Arc;
use std::thread;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::Value as JsonValue;

use openb2b_core::{AggregateId, AggregateRoot, CustomerId, OrgId};
use openb2b_events::{EventBus, EventEnvelope, InMemoryEventBus};
use openb2b_infra::{
    CommandDispatcher, DraftInvoiceRequest, InMemoryEventStore, InMemoryVariantCatalog, InfraConfig, OrderService,
    PlaceOrderRequest, ReviseOrderRequest, WorkflowError,
};
use openb2b_invoicing::{BillTo, InvoiceError, InvoiceStatus};
use openb2b_orders::{
    DeliveryChange, DeliveryDetails, DeliveryStatus, DiscountSpec, ItemRequest, OrderError, OrderId, OrderStatus,
};
use openb2b_products::{ProductId, Variant, VariantId};

type Bus = Arc<InMemoryEventBus<EventEnvelope<JsonValue>>>;
type Service = OrderService<InMemoryEventStore, Bus, Arc<InMemoryVariantCatalog>>;

struct Fixture {
    svc: Arc<Service>,
    catalog: Arc<InMemoryVariantCatalog>,
    org_id: OrgId,
}

fn setup_with(config: InfraConfig) -> Fixture {
    openb2b_observability::init();

    let catalog = Arc::new(InMemoryVariantCatalog::new());
    let bus: Bus = Arc::new(InMemoryEventBus::new());
    let dispatcher = CommandDispatcher::new(InMemoryEventStore::new(), bus);
    Fixture {
        svc: Arc::new(OrderService::new(dispatcher, Arc::clone(&catalog), config)),
        catalog,
        org_id: OrgId::new(),
    }
}

fn setup() -> Fixture {
    setup_with(InfraConfig::default())
}

impl Fixture {
    fn variant(&self, price: Decimal, tax_rate: Decimal) -> Variant {
        let variant = Variant {
            id: VariantId::new(AggregateId::new()),
            product_id: ProductId::new(AggregateId::new()),
            org_id: self.org_id,
            sku: format!("SKU-{price}"),
            price,
            tax_rate,
        };
        self.catalog.upsert(variant.clone()).unwrap();
        variant
    }

    fn place(&self, items: Vec<ItemRequest>, discount: DiscountSpec) -> Result<openb2b_orders::Order, WorkflowError> {
        self.svc.place_order(
            self.org_id,
            PlaceOrderRequest {
                customer_id: CustomerId::new(),
                items,
                discount,
                delivery: DeliveryDetails::default(),
                notes: String::new(),
            },
        )
    }
}

#[test]
fn places_order_without_discounts() {
    let fx = setup();
    let a = fx.variant(dec!(100), dec!(0.1));
    let b = fx.variant(dec!(50), dec!(0.05));

    let order = fx
        .place(vec![ItemRequest::new(a.id, 1), ItemRequest::new(b.id, 2)], DiscountSpec::none())
        .unwrap();

    assert!(order.order_number().starts_with("ORD-"));
    assert_eq!(order.status(), OrderStatus::Pending);
    assert_eq!(order.version(), 1);
    assert_eq!(order.totals().subtotal, dec!(200));
    assert_eq!(order.totals().tax_total, dec!(15));
    assert_eq!(order.totals().total, dec!(215));
}

#[test]
fn revision_applies_order_discount_by_share() {
    let fx = setup();
    let a = fx.variant(dec!(100), dec!(0.1));
    let b = fx.variant(dec!(50), dec!(0.05));
    let order = fx
        .place(vec![ItemRequest::new(a.id, 2), ItemRequest::new(b.id, 1)], DiscountSpec::none())
        .unwrap();

    let revised = fx
        .svc
        .revise_order(
            fx.org_id,
            order.id_typed(),
            ReviseOrderRequest {
                version: Some(order.version()),
                discount: Some(DiscountSpec::percentage(dec!(10))),
                ..ReviseOrderRequest::default()
            },
        )
        .unwrap();

    assert_eq!(revised.version(), 2);
    assert_eq!(revised.totals().applied_discount, dec!(25));
    assert_eq!(revised.totals().discount_total, dec!(25));
    assert_eq!(revised.items()[0].applied_order_discount(), dec!(20));
    assert_eq!(revised.items()[1].applied_order_discount(), dec!(5));
}

#[test]
fn item_and_order_discounts_combine() {
    let fx = setup();
    let a = fx.variant(dec!(200), dec!(0.1));
    let b = fx.variant(dec!(100), dec!(0.05));

    let order = fx
        .place(
            vec![
                ItemRequest::new(a.id, 1).with_discount(DiscountSpec::fixed(dec!(20))),
                ItemRequest::new(b.id, 1).with_discount(DiscountSpec::percentage(dec!(10))),
            ],
            DiscountSpec::fixed(dec!(30)),
        )
        .unwrap();

    let totals = order.totals();
    assert_eq!(totals.item_discount_total, dec!(30));
    assert_eq!(totals.applied_discount, dec!(30));
    assert_eq!(totals.discount_total, dec!(60));
    assert_eq!(order.items()[0].applied_order_discount(), dec!(20));
    assert_eq!(order.items()[1].applied_order_discount(), dec!(10));
    // (200-20-20)*1.1 + (100-10-10)*1.05
    assert_eq!(totals.total, dec!(260));
}

#[test]
fn missing_variant_creates_nothing() {
    let fx = setup();
    let sub = fx.svc.dispatcher().bus().subscribe();
    let known = fx.variant(dec!(10), dec!(0));
    let missing = VariantId::new(AggregateId::new());

    let err = fx
        .place(vec![ItemRequest::new(known.id, 1), ItemRequest::new(missing, 1)], DiscountSpec::none())
        .unwrap_err();

    assert!(matches!(err, WorkflowError::Order(OrderError::VariantNotFound(id)) if id == missing));
    assert!(sub.drain().is_empty());
}

#[test]
fn variants_of_another_org_are_not_found() {
    let fx = setup();
    let foreign = Variant {
        id: VariantId::new(AggregateId::new()),
        product_id: ProductId::new(AggregateId::new()),
        org_id: OrgId::new(),
        sku: "FOREIGN".to_string(),
        price: dec!(5),
        tax_rate: dec!(0),
    };
    fx.catalog.upsert(foreign.clone()).unwrap();

    let err = fx.place(vec![ItemRequest::new(foreign.id, 1)], DiscountSpec::none()).unwrap_err();

    assert!(matches!(err, WorkflowError::Order(OrderError::VariantNotFound(_))));
}

#[test]
fn price_changes_reach_only_replaced_items() {
    let fx = setup();
    let mut v = fx.variant(dec!(50), dec!(0));
    let order = fx.place(vec![ItemRequest::new(v.id, 1)], DiscountSpec::none()).unwrap();

    v.price = dec!(80);
    fx.catalog.upsert(v.clone()).unwrap();

    let notes_only = fx
        .svc
        .revise_order(
            fx.org_id,
            order.id_typed(),
            ReviseOrderRequest {
                notes: Some("leave at gate".to_string()),
                ..ReviseOrderRequest::default()
            },
        )
        .unwrap();
    assert_eq!(notes_only.items()[0].unit_price, dec!(50));
    assert_eq!(notes_only.totals().total, dec!(50));

    let replaced = fx
        .svc
        .revise_order(
            fx.org_id,
            order.id_typed(),
            ReviseOrderRequest {
                items: Some(vec![ItemRequest::new(v.id, 2)]),
                ..ReviseOrderRequest::default()
            },
        )
        .unwrap();
    assert_eq!(replaced.items().len(), 1);
    assert_eq!(replaced.items()[0].unit_price, dec!(80));
    assert_eq!(replaced.totals().total, dec!(160));
}

#[test]
fn stale_token_is_rejected_and_order_is_unchanged() {
    let fx = setup();
    let v = fx.variant(dec!(10), dec!(0));
    let order = fx.place(vec![ItemRequest::new(v.id, 1)], DiscountSpec::none()).unwrap();

    fx.svc
        .revise_order(
            fx.org_id,
            order.id_typed(),
            ReviseOrderRequest {
                version: Some(1),
                notes: Some("first".to_string()),
                ..ReviseOrderRequest::default()
            },
        )
        .unwrap();

    let err = fx
        .svc
        .revise_order(
            fx.org_id,
            order.id_typed(),
            ReviseOrderRequest {
                version: Some(1),
                discount: Some(DiscountSpec::fixed(dec!(5))),
                ..ReviseOrderRequest::default()
            },
        )
        .unwrap_err();
    assert!(err.is_conflict());

    let current = fx.svc.load_order(fx.org_id, order.id_typed()).unwrap();
    assert_eq!(current.version(), 2);
    assert_eq!(current.notes(), "first");
    assert_eq!(current.totals().applied_discount, dec!(0));
}

#[test]
fn concurrent_revisions_with_the_same_token_have_one_winner() {
    let fx = setup();
    let v = fx.variant(dec!(100), dec!(0.1));
    let order = fx.place(vec![ItemRequest::new(v.id, 1)], DiscountSpec::none()).unwrap();
    let order_id = order.id_typed();
    let org_id = fx.org_id;

    let handles: Vec<_> = (1..=8)
        .map(|i| {
            let svc = Arc::clone(&fx.svc);
            thread::spawn(move || {
                svc.revise_order(
                    org_id,
                    order_id,
                    ReviseOrderRequest {
                        version: Some(1),
                        discount: Some(DiscountSpec::fixed(Decimal::from(i))),
                        ..ReviseOrderRequest::default()
                    },
                )
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let winners = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1);
    assert!(results.iter().filter_map(|r| r.as_ref().err()).all(WorkflowError::is_conflict));

    let current = fx.svc.load_order(org_id, order_id).unwrap();
    assert_eq!(current.version(), 2);
}

#[test]
fn approved_order_cannot_be_revised() {
    let fx = setup();
    let v = fx.variant(dec!(40), dec!(0.1));
    let order = fx.place(vec![ItemRequest::new(v.id, 1)], DiscountSpec::none()).unwrap();
    fx.svc
        .change_status(fx.org_id, order.id_typed(), OrderStatus::Approved, Some(1))
        .unwrap();
    let lookups_before = fx.catalog.lookups();

    let err = fx
        .svc
        .revise_order(
            fx.org_id,
            order.id_typed(),
            ReviseOrderRequest {
                items: Some(vec![ItemRequest::new(v.id, 5)]),
                ..ReviseOrderRequest::default()
            },
        )
        .unwrap_err();

    assert!(matches!(
        err,
        WorkflowError::Order(OrderError::NotPending {
            status: OrderStatus::Approved
        })
    ));
    assert_eq!(fx.catalog.lookups(), lookups_before);
    let current = fx.svc.load_order(fx.org_id, order.id_typed()).unwrap();
    assert_eq!(current.totals(), order.totals());
}

#[test]
fn lifecycle_and_delivery_tracking() {
    let fx = setup();
    let v = fx.variant(dec!(15), dec!(0));
    let order = fx.place(vec![ItemRequest::new(v.id, 1)], DiscountSpec::none()).unwrap();
    let id = order.id_typed();

    let err = fx.svc.change_status(fx.org_id, id, OrderStatus::Delivered, None).unwrap_err();
    assert!(matches!(err, WorkflowError::Order(OrderError::InvalidTransition { .. })));

    fx.svc.change_status(fx.org_id, id, OrderStatus::Approved, None).unwrap();
    fx.svc
        .change_delivery_status(fx.org_id, id, DeliveryStatus::Shipped, None)
        .unwrap();
    let delivered = fx
        .svc
        .change_delivery_status(fx.org_id, id, DeliveryStatus::Delivered, None)
        .unwrap();
    let stamped = delivered.delivery().delivered_at;
    assert!(stamped.is_some());

    let done = fx.svc.change_status(fx.org_id, id, OrderStatus::Delivered, None).unwrap();
    assert_eq!(done.status(), OrderStatus::Delivered);

    let again = fx
        .svc
        .change_delivery_status(fx.org_id, id, DeliveryStatus::Delivered, None)
        .unwrap();
    assert_eq!(again.delivery().delivered_at, stamped);

    let err = fx.svc.change_status(fx.org_id, id, OrderStatus::Cancelled, None).unwrap_err();
    assert!(matches!(err, WorkflowError::Order(OrderError::InvalidTransition { .. })));
}

#[test]
fn delivery_details_are_revised_while_pending() {
    let fx = setup();
    let v = fx.variant(dec!(15), dec!(0));
    let order = fx.place(vec![ItemRequest::new(v.id, 1)], DiscountSpec::none()).unwrap();

    let revised = fx
        .svc
        .revise_order(
            fx.org_id,
            order.id_typed(),
            ReviseOrderRequest {
                delivery: Some(DeliveryChange {
                    transport_fare: Some(dec!(12.5)),
                    ..DeliveryChange::default()
                }),
                ..ReviseOrderRequest::default()
            },
        )
        .unwrap();

    assert_eq!(revised.delivery().transport_fare, dec!(12.5));
    assert_eq!(revised.totals().total, dec!(15));
}

#[test]
fn events_are_published_in_order() {
    let fx = setup();
    let sub = fx.svc.dispatcher().bus().subscribe();
    let v = fx.variant(dec!(10), dec!(0));
    let order = fx.place(vec![ItemRequest::new(v.id, 1)], DiscountSpec::none()).unwrap();
    fx.svc
        .change_status(fx.org_id, order.id_typed(), OrderStatus::Approved, None)
        .unwrap();

    let published = sub.drain();
    let types: Vec<&str> = published.iter().map(|e| e.event_type()).collect();
    assert_eq!(types, vec!["orders.order.placed", "orders.order.status_changed"]);
    assert_eq!(published[1].sequence_number(), 2);
    assert!(published[1].follows(&published[0]));
    assert!(published.iter().all(|e| e.org_id() == fx.org_id));
}

#[test]
fn orders_are_invisible_to_other_orgs() {
    let fx = setup();
    let v = fx.variant(dec!(10), dec!(0));
    let order = fx.place(vec![ItemRequest::new(v.id, 1)], DiscountSpec::none()).unwrap();

    let err = fx.svc.load_order(OrgId::new(), order.id_typed()).unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn invoice_snapshots_priced_order() {
    let fx = setup_with(InfraConfig {
        currency: "USD".to_string(),
        invoice_due_days: Some(14),
    });
    let a = fx.variant(dec!(100), dec!(0.1));
    let b = fx.variant(dec!(50), dec!(0.05));
    let order = fx
        .place(vec![ItemRequest::new(a.id, 1), ItemRequest::new(b.id, 2)], DiscountSpec::none())
        .unwrap();

    let invoice = fx
        .svc
        .draft_invoice(
            fx.org_id,
            order.id_typed(),
            DraftInvoiceRequest {
                bill_to: BillTo {
                    name: "Kano Wholesale".to_string(),
                    ..BillTo::default()
                },
                ..DraftInvoiceRequest::default()
            },
        )
        .unwrap();

    assert!(invoice.invoice_number().starts_with("INV-"));
    assert_eq!(invoice.status(), InvoiceStatus::Draft);
    assert_eq!(invoice.currency(), "USD");
    assert_eq!(invoice.order_id(), Some(order.id_typed()));
    assert_eq!(invoice.totals().total, dec!(215));
    assert_eq!(invoice.totals().tax_total, dec!(15));
    assert_eq!(invoice.lines().len(), 2);
    let (issued, due) = (invoice.issued_at().unwrap(), invoice.due_date().unwrap());
    assert_eq!((due - issued).num_days(), 14);

    let issued_invoice = fx
        .svc
        .change_invoice_status(fx.org_id, invoice.id_typed(), InvoiceStatus::Issued)
        .unwrap();
    assert_eq!(issued_invoice.status(), InvoiceStatus::Issued);
    assert_eq!(issued_invoice.totals(), invoice.totals());
}

#[test]
fn cancelled_order_cannot_be_invoiced() {
    let fx = setup();
    let v = fx.variant(dec!(10), dec!(0));
    let order = fx.place(vec![ItemRequest::new(v.id, 1)], DiscountSpec::none()).unwrap();
    fx.svc
        .change_status(fx.org_id, order.id_typed(), OrderStatus::Cancelled, None)
        .unwrap();

    let err = fx
        .svc
        .draft_invoice(fx.org_id, order.id_typed(), DraftInvoiceRequest::default())
        .unwrap_err();
    assert!(matches!(err, WorkflowError::Invoice(InvoiceError::OrderCancelled)));
}

#[test]
fn unknown_order_cannot_be_revised() {
    let fx = setup();
    let err = fx
        .svc
        .revise_order(
            fx.org_id,
            OrderId::new(AggregateId::new()),
            ReviseOrderRequest::default(),
        )
        .unwrap_err();
    assert!(err.is_not_found());
}
