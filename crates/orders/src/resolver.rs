//! Item resolution: client item requests → order items.

use std::collections::HashMap;

use openb2b_products::{Variant, VariantId};

use crate::error::OrderError;
use crate::item::{ItemRequest, OrderItem};

/// Build order items from `requests`, snapshotting each referenced variant.
///
/// All-or-nothing: the first request whose variant is missing from
/// `variants` fails the whole batch and no items are returned. Request order
/// is preserved and repeated variant ids produce separate lines.
///
/// Callers fetch every referenced variant in one lookup before calling this,
/// so all lines of an order share one consistent price snapshot.
pub fn resolve(
    requests: &[ItemRequest],
    variants: &HashMap<VariantId, Variant>,
) -> Result<Vec<OrderItem>, OrderError> {
    requests
        .iter()
        .map(|request| {
            variants
                .get(&request.variant_id)
                .map(|variant| OrderItem::from_variant(request, variant))
                .ok_or(OrderError::VariantNotFound(request.variant_id))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discount::DiscountSpec;
    use openb2b_core::{AggregateId, OrgId};
    use openb2b_products::ProductId;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn variant(price: Decimal, tax_rate: Decimal) -> Variant {
        Variant {
            id: VariantId::new(AggregateId::new()),
            product_id: ProductId::new(AggregateId::new()),
            org_id: OrgId::new(),
            sku: "SKU-1".to_string(),
            price,
            tax_rate,
        }
    }

    fn catalog(variants: &[Variant]) -> HashMap<VariantId, Variant> {
        variants.iter().map(|v| (v.id, v.clone())).collect()
    }

    #[test]
    fn snapshots_price_tax_and_product_from_variant() {
        let v = variant(dec!(100), dec!(0.1));
        let request = ItemRequest::new(v.id, 3)
            .with_discount(DiscountSpec::fixed(dec!(5)))
            .with_notes("gift wrap");

        let items = resolve(&[request], &catalog(&[v.clone()])).unwrap();

        assert_eq!(items.len(), 1);
        let item = &items[0];
        assert_eq!(item.variant_id, v.id);
        assert_eq!(item.product_id, v.product_id);
        assert_eq!(item.sku, v.sku);
        assert_eq!(item.quantity, 3);
        assert_eq!(item.unit_price, dec!(100));
        assert_eq!(item.tax_rate, dec!(0.1));
        assert_eq!(item.discount, DiscountSpec::fixed(dec!(5)));
        assert_eq!(item.notes, "gift wrap");
        assert_eq!(item.line_total(), Decimal::ZERO);
    }

    #[test]
    fn missing_variant_fails_the_whole_batch() {
        let known = variant(dec!(10), dec!(0));
        let missing = VariantId::new(AggregateId::new());
        let requests = vec![ItemRequest::new(known.id, 1), ItemRequest::new(missing, 1)];

        let err = resolve(&requests, &catalog(&[known])).unwrap_err();

        assert_eq!(err, OrderError::VariantNotFound(missing));
    }

    #[test]
    fn single_unknown_variant_yields_no_items() {
        let missing = VariantId::new(AggregateId::new());
        let result = resolve(&[ItemRequest::new(missing, 2)], &HashMap::new());
        assert!(matches!(result, Err(OrderError::VariantNotFound(id)) if id == missing));
    }

    #[test]
    fn repeated_variant_becomes_separate_lines_in_request_order() {
        let v = variant(dec!(20), dec!(0.05));
        let requests = vec![
            ItemRequest::new(v.id, 1).with_notes("first"),
            ItemRequest::new(v.id, 4).with_notes("second"),
        ];

        let items = resolve(&requests, &catalog(&[v])).unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].notes, "first");
        assert_eq!(items[0].quantity, 1);
        assert_eq!(items[1].notes, "second");
        assert_eq!(items[1].quantity, 4);
    }

    #[test]
    fn later_variant_price_changes_do_not_reach_resolved_items() {
        let mut v = variant(dec!(50), dec!(0.1));
        let mut variants = catalog(&[v.clone()]);
        let items = resolve(&[ItemRequest::new(v.id, 1)], &variants).unwrap();

        v.price = dec!(75);
        variants.insert(v.id, v);

        assert_eq!(items[0].unit_price, dec!(50));
    }

    #[test]
    fn retry_after_supplying_the_variant_succeeds() {
        let v = variant(dec!(9.99), dec!(0));
        let requests = [ItemRequest::new(v.id, 1)];

        assert!(resolve(&requests, &HashMap::new()).is_err());
        assert_eq!(resolve(&requests, &catalog(&[v])).unwrap().len(), 1);
    }
}
