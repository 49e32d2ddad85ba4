//! Entity handles.
//!
//! An entity is a row of one archetype. The id is the row index inside that
//! archetype and means nothing to any other archetype.

use std::fmt;

/// Row index of an entity within its owning archetype.
///
/// Rows are only ever appended, so an id stays valid for the lifetime of the
/// archetype that issued it.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityId(usize);

impl EntityId {
    #[inline]
    pub const fn from_row(row: usize) -> Self {
        Self(row)
    }

    #[inline]
    pub const fn row(self) -> usize {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
