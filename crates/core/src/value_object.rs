//! Value object trait: equality by value, not identity.
//!
//! Value objects are domain objects defined entirely by their attribute
//! values. Two value objects with the same values are equal; "modifying" one
//! means constructing a new one. `AuditInfo` and the inventory crate's
//! `QuantityEffect` are the canonical instances here.

/// Marker trait for immutable, value-compared domain objects.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
