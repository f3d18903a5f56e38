//! Entity trait: identity that persists across state changes.

/// Minimal interface for domain entities.
///
/// Entities are distinguished by identifier, not by attribute values. The
/// product collaborator is the one entity at this system's boundary; batch
/// rows are keyed projections, not entities.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
