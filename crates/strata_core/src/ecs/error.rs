use crate::containers::ContainerError;
use crate::ecs::{EntityId, Fingerprint};
use thiserror::Error;

/// Boxed error produced by a user-supplied component constructor.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors surfaced by [`Archetype`](crate::ecs::Archetype) operations.
///
/// Failed insertions are rolled back before any of these is returned, so the
/// archetype is always left with aligned component stores.
#[derive(Debug, Error)]
pub enum ArchetypeError {
    #[error("component storage allocation failed: {0}")]
    Allocation(#[from] ContainerError),

    #[error("constructing component {component} at position {position} failed: {source}")]
    ComponentConstructionFailure {
        component: &'static str,
        position: usize,
        source: BoxError,
    },

    #[error("archetype {fingerprint} has no component {component}")]
    MissingComponent {
        component: &'static str,
        fingerprint: Fingerprint,
    },

    #[error("entity {entity} is out of bounds for an archetype with {count} entities")]
    EntityOutOfBounds { entity: EntityId, count: usize },

    #[error("component {component} is declared more than once")]
    DuplicateComponent { component: &'static str },
}
