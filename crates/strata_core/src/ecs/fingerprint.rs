// fingerprint.rs - Component composition of an archetype
//
// A fingerprint is the set of component ids that make up an archetype.
// Query layers match archetypes against a requested set with `satisfies`.

use crate::ecs::ComponentId;
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Set of component ids describing one archetype.
///
/// Ids are kept sorted and deduplicated, so equality and hashing do not
/// depend on the order components were declared in.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    components: Vec<ComponentId>,
}

impl Fingerprint {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a fingerprint from any list of ids; duplicates collapse.
    pub fn from_components<I>(components: I) -> Self
    where
        I: IntoIterator<Item = ComponentId>,
    {
        let mut components: Vec<ComponentId> = components.into_iter().collect();
        components.sort_unstable();
        components.dedup();
        Self { components }
    }

    /// Insert a component id. Returns `false` if it was already present.
    pub fn add_trait(&mut self, id: ComponentId) -> bool {
        match self.components.binary_search(&id) {
            Ok(_) => false,
            Err(pos) => {
                self.components.insert(pos, id);
                true
            }
        }
    }

    pub fn contains(&self, id: ComponentId) -> bool {
        self.components.binary_search(&id).is_ok()
    }

    /// Whether every component of `query` is present in `self`.
    pub fn satisfies(&self, query: &Fingerprint) -> bool {
        query.is_subset_of(self)
    }

    /// Whether every component of `self` is present in `other`.
    pub fn is_subset_of(&self, other: &Fingerprint) -> bool {
        if self.components.len() > other.components.len() {
            return false;
        }
        // Both sides are sorted: a single merge pass is enough.
        let mut theirs = other.components.iter();
        'outer: for id in &self.components {
            for candidate in theirs.by_ref() {
                if candidate == id {
                    continue 'outer;
                }
                if candidate > id {
                    return false;
                }
            }
            return false;
        }
        true
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = ComponentId> + '_ {
        self.components.iter().copied()
    }

    /// Stable 64-bit identifier derived from the sorted ids.
    pub fn hash_id(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        for id in &self.components {
            id.hash(&mut hasher);
        }
        hasher.finish()
    }
}

impl FromIterator<ComponentId> for Fingerprint {
    fn from_iter<I: IntoIterator<Item = ComponentId>>(iter: I) -> Self {
        Self::from_components(iter)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, id) in self.components.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{id}")?;
        }
        f.write_str("}")
    }
}
