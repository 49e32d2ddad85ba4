use super::ContainerError;
use std::ops::{Index, IndexMut};

/// A fixed-capacity segment of up to `N` items.
///
/// Storage is reserved once for exactly `N` items and never grown, so the
/// address of an item stays valid for as long as the chunk lives.
pub struct Chunk<T, const N: usize> {
    items: Vec<T>,
}

impl<T, const N: usize> Chunk<T, N> {
    /// Reserve room for `N` items, reporting allocator failure instead of aborting.
    pub(crate) fn try_new() -> Result<Self, ContainerError> {
        let mut items = Vec::new();
        items
            .try_reserve_exact(N)
            .map_err(|_| ContainerError::AllocationFailure { requested: N })?;
        Ok(Self { items })
    }

    #[inline]
    pub const fn capacity(&self) -> usize {
        N
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.items.len() == N
    }

    /// Append an item, returning its slot, or hand the value back if the chunk is full.
    #[inline]
    pub fn push(&mut self, value: T) -> Result<usize, T> {
        if self.is_full() {
            return Err(value);
        }
        let slot = self.items.len();
        self.items.push(value);
        Ok(slot)
    }

    #[inline]
    pub fn pop(&mut self) -> Option<T> {
        self.items.pop()
    }

    #[inline]
    pub fn get(&self, slot: usize) -> Option<&T> {
        self.items.get(slot)
    }

    #[inline]
    pub fn get_mut(&mut self, slot: usize) -> Option<&mut T> {
        self.items.get_mut(slot)
    }

    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.items
    }
}

impl<T, const N: usize> Index<usize> for Chunk<T, N> {
    type Output = T;

    fn index(&self, slot: usize) -> &T {
        &self.items[slot]
    }
}

impl<T, const N: usize> IndexMut<usize> for Chunk<T, N> {
    fn index_mut(&mut self, slot: usize) -> &mut T {
        &mut self.items[slot]
    }
}
