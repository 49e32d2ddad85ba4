// component.rs - Component type identifiers
//
// Every Rust type used as a component gets a small sequential u32 id the
// first time it is seen. Ids are stable for the lifetime of the process.

use once_cell::sync::Lazy;
use std::any::{type_name, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::mem::{align_of, size_of};
use std::sync::RwLock;

/// Plain value type stored one-per-entity inside an archetype.
///
/// Implemented for every `'static + Send + Sync` type; there is nothing to
/// derive.
pub trait Component: 'static + Send + Sync {}

impl<T: 'static + Send + Sync> Component for T {}

/// Process-wide identifier of a component type.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ComponentId(u32);

impl ComponentId {
    /// Identifier of `T`, registering it on first use.
    pub fn of<T: Component>() -> Self {
        register::<T>().id
    }

    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Metadata describing a registered component type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComponentMeta {
    pub id: ComponentId,
    pub name: &'static str,
    pub size: usize,
    pub align: usize,
}

#[derive(Default)]
struct Registry {
    by_type: HashMap<TypeId, ComponentMeta>,
    by_id: Vec<ComponentMeta>,
}

static REGISTRY: Lazy<RwLock<Registry>> = Lazy::new(|| RwLock::new(Registry::default()));

/// Register `T` (idempotent) and return its metadata.
pub fn register<T: Component>() -> ComponentMeta {
    let key = TypeId::of::<T>();
    {
        let registry = REGISTRY.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(meta) = registry.by_type.get(&key) {
            return meta.clone();
        }
    }

    let mut registry = REGISTRY.write().unwrap_or_else(|poisoned| poisoned.into_inner());
    // Another thread may have won the race between the two locks.
    if let Some(meta) = registry.by_type.get(&key) {
        return meta.clone();
    }
    let raw = u32::try_from(registry.by_id.len()).expect("component id space exhausted");
    let meta = ComponentMeta {
        id: ComponentId(raw),
        name: type_name::<T>(),
        size: size_of::<T>(),
        align: align_of::<T>(),
    };
    registry.by_type.insert(key, meta.clone());
    registry.by_id.push(meta.clone());
    tracing::debug!(id = raw, name = meta.name, "component registered");
    meta
}

/// Look up component metadata by id.
pub fn meta_of(id: ComponentId) -> Option<ComponentMeta> {
    REGISTRY
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .by_id
        .get(id.0 as usize)
        .cloned()
}

/// Human-readable name for diagnostics; falls back to the raw id.
pub fn name_of(id: ComponentId) -> String {
    meta_of(id)
        .map(|meta| meta.name.to_string())
        .unwrap_or_else(|| format!("<component {id}>"))
}
