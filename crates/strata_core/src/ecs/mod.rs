//! Archetype storage.
//!
//! Entities sharing one set of component types live in an [`Archetype`],
//! which keeps one chunked [`ComponentStore`] per component type and grows
//! them all in lockstep. Archetypes are identified by their [`Fingerprint`].

mod archetype;
mod component;
mod component_set;
mod entity;
mod error;
mod fingerprint;
pub mod storage;

pub use archetype::Archetype;
pub use component::{meta_of, name_of, register, Component, ComponentId, ComponentMeta};
pub use component_set::{ComponentAt, ComponentBuilders, ComponentSet};
pub use entity::EntityId;
pub use error::{ArchetypeError, BoxError};
pub use fingerprint::Fingerprint;
pub use storage::{ComponentStore, ErasedStore};
