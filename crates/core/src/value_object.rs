//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects carry no identity and are compared by their attributes
/// (`DiscountSpec`, `Address`, `DeliveryInfo`, a variant snapshot). To change
/// one, build a new value.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
