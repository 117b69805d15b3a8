//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Users and the student/professor profiles are entities: their attributes
/// (names, phone, linked user) change, their identifier never does.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Copy + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> Self::Id;
}
