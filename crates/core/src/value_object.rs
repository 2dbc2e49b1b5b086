//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects have **no identity**: two instances with the same attribute
/// values are the same value. In this workspace that covers prices and the
/// book snapshot embedded into a cart line (a copy of catalog data taken at
/// add-time, never updated in place).
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
