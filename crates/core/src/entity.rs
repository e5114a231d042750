//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Master-data records (categories, suppliers, products, shipments) are entities:
/// they are addressed by identifier and mutated only through approved change requests.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}

/// An entity whose display name must be unique among its peers.
pub trait NamedEntity: Entity {
    fn name(&self) -> &str;

    /// Case-insensitive, whitespace-trimmed name comparison.
    fn name_matches(&self, other: &str) -> bool {
        names_collide(self.name(), other)
    }
}

/// Whether two display names collide (case-insensitive, surrounding whitespace ignored).
pub fn names_collide(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}
