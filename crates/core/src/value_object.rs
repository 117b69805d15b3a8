//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value**. To "modify" one,
/// build a new value. `Email` is the canonical example in this workspace: two
/// addresses that normalize to the same string are the same address.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
