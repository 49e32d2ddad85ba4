//! Strata Core
//!
//! Storage core of the entity component system:
//! - Chunked containers with stable item addresses
//! - Per-component chunked stores
//! - Archetypes with fingerprints and transactional entity creation

pub mod containers;
pub mod ecs;

pub use glam;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
