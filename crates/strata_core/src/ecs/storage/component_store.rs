use crate::containers::{Chunk, ChunkedList, ContainerError, NodeId, DEFAULT_CHUNK_SIZE};
use crate::ecs::{Component, ComponentId};
use rayon::prelude::*;
use std::fmt;
use std::ops::{Index, IndexMut};

/// Chunked value store for a single component type.
///
/// Rows form a flat index space `0..item_count()`; row `i` lives in chunk
/// `i / N` at slot `i % N`. Items are only appended at the tail chunk and
/// never move afterwards.
pub struct ComponentStore<T, const N: usize = DEFAULT_CHUNK_SIZE> {
    list: ChunkedList<T, N>,
    // Node ids in row order; lets row lookups skip the list walk.
    directory: Vec<NodeId>,
    item_count: usize,
    component_id: ComponentId,
}

impl<T: Component, const N: usize> ComponentStore<T, N> {
    pub fn new() -> Self {
        Self {
            list: ChunkedList::new(),
            directory: Vec::new(),
            item_count: 0,
            component_id: ComponentId::of::<T>(),
        }
    }
}

impl<T: Component, const N: usize> Default for ComponentStore<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const N: usize> ComponentStore<T, N> {
    /// Append one item, allocating a chunk first if the tail is full.
    ///
    /// Returns the row of the new item. On allocation failure the store is
    /// left untouched and `value` is dropped.
    pub fn create_item(&mut self, value: T) -> Result<usize, ContainerError> {
        let tail = match self.directory.last().copied() {
            Some(id) if !self.chunk(id).is_full() => id,
            _ => {
                self.directory
                    .try_reserve(1)
                    .map_err(|_| ContainerError::AllocationFailure { requested: 1 })?;
                let id = self.list.create_node()?;
                self.directory.push(id);
                id
            }
        };

        if self.chunk_mut(tail).push(value).is_err() {
            panic!("tail chunk {tail} reported free space but rejected an item");
        }
        let row = self.item_count;
        self.item_count += 1;
        Ok(row)
    }

    pub fn create_default(&mut self) -> Result<usize, ContainerError>
    where
        T: Default,
    {
        self.create_item(T::default())
    }

    /// Remove the last item, releasing the tail chunk once it empties.
    pub fn pop_item(&mut self) -> Option<T> {
        let tail = *self.directory.last()?;
        let chunk = self.chunk_mut(tail);
        let value = match chunk.pop() {
            Some(value) => value,
            None => panic!("tail chunk {tail} of a non-empty store holds no items"),
        };
        let drained = chunk.is_empty();
        self.item_count -= 1;

        if drained {
            self.directory.pop();
            if let Err(err) = self.list.delete_node(tail) {
                panic!("store directory out of sync with its chunk list: {err}");
            }
        }
        Some(value)
    }

    /// Total filled slots across all chunks.
    #[inline]
    pub fn item_count(&self) -> usize {
        self.item_count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.item_count == 0
    }

    #[inline]
    pub fn chunk_count(&self) -> usize {
        self.list.len()
    }

    #[inline]
    pub fn component_id(&self) -> ComponentId {
        self.component_id
    }

    pub fn get(&self, row: usize) -> Option<&T> {
        if row >= self.item_count {
            return None;
        }
        let id = *self.directory.get(row / N)?;
        self.list.get(id)?.get(row % N)
    }

    pub fn get_mut(&mut self, row: usize) -> Option<&mut T> {
        if row >= self.item_count {
            return None;
        }
        let id = *self.directory.get(row / N)?;
        self.list.get_mut(id)?.get_mut(row % N)
    }

    /// Items in row order.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.chunks().flat_map(|chunk| chunk.iter())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> + '_ {
        self.list
            .iter_mut()
            .flat_map(|(_, chunk)| chunk.as_mut_slice().iter_mut())
    }

    /// One slice per chunk, in row order.
    pub fn chunks(&self) -> impl Iterator<Item = &[T]> + '_ {
        self.list.iter().map(|(_, chunk)| chunk.as_slice())
    }

    /// Visit every chunk in parallel with the row of its first item.
    pub fn par_for_each_chunk<F>(&self, f: F)
    where
        T: Sync,
        F: Fn(usize, &[T]) + Send + Sync,
    {
        let chunks: Vec<&[T]> = self.chunks().collect();
        chunks
            .into_par_iter()
            .enumerate()
            .for_each(|(i, slice)| f(i * N, slice));
    }

    fn chunk(&self, id: NodeId) -> &Chunk<T, N> {
        match self.list.get(id) {
            Some(chunk) => chunk,
            None => panic!("store directory references released chunk {id}"),
        }
    }

    fn chunk_mut(&mut self, id: NodeId) -> &mut Chunk<T, N> {
        match self.list.get_mut(id) {
            Some(chunk) => chunk,
            None => panic!("store directory references released chunk {id}"),
        }
    }
}

impl<T, const N: usize> Index<usize> for ComponentStore<T, N> {
    type Output = T;

    fn index(&self, row: usize) -> &T {
        match self.get(row) {
            Some(value) => value,
            None => panic!("row {row} out of bounds for store of {} items", self.item_count),
        }
    }
}

impl<T, const N: usize> IndexMut<usize> for ComponentStore<T, N> {
    fn index_mut(&mut self, row: usize) -> &mut T {
        let count = self.item_count;
        match self.get_mut(row) {
            Some(value) => value,
            None => panic!("row {row} out of bounds for store of {count} items"),
        }
    }
}

impl<T, const N: usize> fmt::Debug for ComponentStore<T, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentStore")
            .field("component", &self.component_id)
            .field("items", &self.item_count)
            .field("chunks", &self.list.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Clone, Copy, Debug, Default, PartialEq)]
    struct Health(i32);

    #[test]
    fn rows_are_sequential_across_chunks() {
        let mut store = ComponentStore::<Health, 4>::new();
        for i in 0..10 {
            assert_eq!(store.create_item(Health(i)).unwrap(), i as usize);
        }
        assert_eq!(store.item_count(), 10);
        assert_eq!(store.chunk_count(), 3);
        for i in 0..10 {
            assert_eq!(store[i as usize], Health(i));
        }
        assert_eq!(store.get(10), None);
    }

    #[test]
    fn partial_tail_chunk_is_bounded_by_its_fill_level() {
        let mut store = ComponentStore::<Health, 4>::new();
        for i in 0..5 {
            store.create_item(Health(i)).unwrap();
        }
        // Row 5 would land in slot 1 of the second chunk, which is unfilled.
        assert!(store.get(5).is_none());
        assert_eq!(store.get(4), Some(&Health(4)));
        let sizes: Vec<usize> = store.chunks().map(|c| c.len()).collect();
        assert_eq!(sizes, vec![4, 1]);
    }

    #[test]
    fn default_items_and_mutation() {
        let mut store = ComponentStore::<Health, 2>::new();
        store.create_default().unwrap();
        store.create_default().unwrap();
        store[1].0 = 9;
        for item in store.iter_mut() {
            item.0 += 1;
        }
        let values: Vec<i32> = store.iter().map(|h| h.0).collect();
        assert_eq!(values, vec![1, 10]);
    }

    #[test]
    fn pop_releases_drained_tail_chunk() {
        let mut store = ComponentStore::<Health, 2>::new();
        for i in 0..3 {
            store.create_item(Health(i)).unwrap();
        }
        assert_eq!(store.chunk_count(), 2);
        assert_eq!(store.pop_item(), Some(Health(2)));
        assert_eq!(store.chunk_count(), 1);
        assert_eq!(store.item_count(), 2);

        // The next append opens a fresh chunk again.
        assert_eq!(store.create_item(Health(7)).unwrap(), 2);
        assert_eq!(store[2], Health(7));

        while store.pop_item().is_some() {}
        assert!(store.is_empty());
        assert_eq!(store.chunk_count(), 0);
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn indexing_past_the_end_panics() {
        let store = ComponentStore::<Health, 2>::new();
        let _value: Health = store[0];
    }

    #[test]
    fn allocation_failure_leaves_the_store_untouched() {
        let mut store = ComponentStore::<u64, { usize::MAX / 4 }>::new();
        assert!(matches!(
            store.create_item(7),
            Err(ContainerError::AllocationFailure { .. })
        ));
        assert_eq!(store.item_count(), 0);
        assert_eq!(store.chunk_count(), 0);
        assert!(store.get(0).is_none());
    }

    #[test]
    fn component_id_matches_registry() {
        let store = ComponentStore::<Health>::new();
        assert_eq!(store.component_id(), ComponentId::of::<Health>());
    }

    #[test]
    fn parallel_chunk_walk_sees_every_row() {
        let mut store = ComponentStore::<Health, 8>::new();
        for i in 0..100 {
            store.create_item(Health(i)).unwrap();
        }
        let rows = AtomicUsize::new(0);
        let sum = AtomicUsize::new(0);
        store.par_for_each_chunk(|first_row, slice| {
            assert_eq!(first_row % 8, 0);
            assert_eq!(slice[0].0 as usize, first_row);
            rows.fetch_add(slice.len(), Ordering::Relaxed);
            let total: i32 = slice.iter().map(|h| h.0).sum();
            sum.fetch_add(total as usize, Ordering::Relaxed);
        });
        assert_eq!(rows.load(Ordering::Relaxed), 100);
        assert_eq!(sum.load(Ordering::Relaxed), (0..100).sum::<usize>());
    }

    #[test]
    fn dropping_the_store_drops_every_item() {
        struct Tracked(Arc<AtomicUsize>);
        impl Drop for Tracked {
            fn drop(&mut self) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let drops = Arc::new(AtomicUsize::new(0));
        {
            let mut store = ComponentStore::<Tracked, 3>::new();
            for _ in 0..7 {
                store.create_item(Tracked(drops.clone())).unwrap();
            }
        }
        assert_eq!(drops.load(Ordering::SeqCst), 7);
    }
}
