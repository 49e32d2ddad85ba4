use super::{Chunk, ContainerError};
use std::fmt;
use std::iter::FusedIterator;
use std::marker::PhantomData;

/// Handle to a node of a [`ChunkedList`].
///
/// Format: [32-bit slot index | 32-bit generation]. Deleting a node bumps the
/// generation of its slot, so handles to deleted nodes are rejected instead of
/// aliasing whatever node reuses the slot.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl NodeId {
    #[inline]
    pub fn index(self) -> u32 {
        self.index
    }

    #[inline]
    pub fn generation(self) -> u32 {
        self.generation
    }

    fn stale(self) -> ContainerError {
        ContainerError::StaleNode {
            index: self.index,
            generation: self.generation,
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

struct Node<T, const N: usize> {
    chunk: Chunk<T, N>,
    prev: Option<u32>,
    next: Option<u32>,
}

enum Entry<T, const N: usize> {
    Occupied(Node<T, N>),
    Vacant { next_free: Option<u32> },
}

struct Slot<T, const N: usize> {
    generation: u32,
    entry: Entry<T, N>,
}

/// Doubly-linked list of fixed-capacity chunks, stored in an arena.
///
/// Nodes live in a dense slot array; links are slot indices and deleted slots
/// go onto a free list for reuse. Appending and removing a node are O(1) and
/// never move the chunks of other nodes.
///
/// Mutation takes `&mut self` and traversal borrows the list, so a node cannot
/// be deleted while a walk over the list is in progress.
pub struct ChunkedList<T, const N: usize> {
    slots: Vec<Slot<T, N>>,
    free_head: Option<u32>,
    head: Option<u32>,
    tail: Option<u32>,
    len: usize,
}

impl<T, const N: usize> ChunkedList<T, N> {
    pub fn new() -> Self {
        assert!(N > 0, "chunk size must be non-zero");
        Self {
            slots: Vec::new(),
            free_head: None,
            head: None,
            tail: None,
            len: 0,
        }
    }

    /// Number of live nodes.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Slots held by the arena, live or waiting on the free list.
    #[inline]
    pub fn arena_slots(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn head(&self) -> Option<NodeId> {
        self.head.map(|index| self.id_of(index))
    }

    #[inline]
    pub fn tail(&self) -> Option<NodeId> {
        self.tail.map(|index| self.id_of(index))
    }

    pub fn get(&self, id: NodeId) -> Option<&Chunk<T, N>> {
        self.live_node(id).map(|node| &node.chunk)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Chunk<T, N>> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        match &mut slot.entry {
            Entry::Occupied(node) => Some(&mut node.chunk),
            Entry::Vacant { .. } => None,
        }
    }

    /// The node after `id`, if any.
    pub fn next(&self, id: NodeId) -> Option<NodeId> {
        self.live_node(id)?.next.map(|index| self.id_of(index))
    }

    /// The node before `id`, if any.
    pub fn prev(&self, id: NodeId) -> Option<NodeId> {
        self.live_node(id)?.prev.map(|index| self.id_of(index))
    }

    /// Allocate a new chunk and link it at the tail.
    pub fn create_node(&mut self) -> Result<NodeId, ContainerError> {
        let chunk = Chunk::try_new()?;
        let node = Node {
            chunk,
            prev: self.tail,
            next: None,
        };

        let index = match self.free_head {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                let next_free = match slot.entry {
                    Entry::Vacant { next_free } => next_free,
                    Entry::Occupied(_) => panic!("free list points at live slot {index}"),
                };
                slot.entry = Entry::Occupied(node);
                self.free_head = next_free;
                index
            }
            None => {
                let index = u32::try_from(self.slots.len())
                    .map_err(|_| ContainerError::AllocationFailure { requested: 1 })?;
                self.slots
                    .try_reserve(1)
                    .map_err(|_| ContainerError::AllocationFailure { requested: 1 })?;
                self.slots.push(Slot {
                    generation: 0,
                    entry: Entry::Occupied(node),
                });
                index
            }
        };

        let prev = self.tail;
        match prev {
            Some(tail) => self.node_mut(tail).next = Some(index),
            None => self.head = Some(index),
        }
        self.tail = Some(index);
        self.len += 1;

        let id = self.id_of(index);
        tracing::trace!(node = %id, len = self.len, "chunk allocated");
        self.debug_check_link(prev, Some(index));
        self.debug_check_link(Some(index), None);
        Ok(id)
    }

    /// Unlink `id` and hand its chunk back to the caller.
    ///
    /// Dropping the returned chunk releases its items. `id` is stale afterwards.
    pub fn delete_node(&mut self, id: NodeId) -> Result<Chunk<T, N>, ContainerError> {
        let free_head = self.free_head;
        let slot = self
            .slots
            .get_mut(id.index as usize)
            .ok_or_else(|| id.stale())?;
        if slot.generation != id.generation || !matches!(slot.entry, Entry::Occupied(_)) {
            return Err(id.stale());
        }

        let node = match std::mem::replace(&mut slot.entry, Entry::Vacant { next_free: free_head }) {
            Entry::Occupied(node) => node,
            Entry::Vacant { .. } => unreachable!("slot checked as occupied"),
        };
        slot.generation = slot.generation.wrapping_add(1);
        self.free_head = Some(id.index);

        match node.prev {
            Some(prev) => self.node_mut(prev).next = node.next,
            None => self.head = node.next,
        }
        match node.next {
            Some(next) => self.node_mut(next).prev = node.prev,
            None => self.tail = node.prev,
        }
        self.len -= 1;

        tracing::trace!(node = %id, len = self.len, "chunk released");
        self.debug_check_link(node.prev, node.next);
        Ok(node.chunk)
    }

    /// Delete every node, head first.
    pub fn clear(&mut self) {
        while let Some(head) = self.head() {
            // The head of a consistent list is always live.
            if self.delete_node(head).is_err() {
                panic!("head {head} of chunked list is stale");
            }
        }
    }

    /// Walk live nodes head to tail in insertion order.
    pub fn iter(&self) -> Iter<'_, T, N> {
        Iter {
            list: self,
            cursor: self.head,
            remaining: self.len,
        }
    }

    /// Walk live nodes head to tail with mutable access to each chunk.
    pub fn iter_mut(&mut self) -> IterMut<'_, T, N> {
        IterMut {
            slots: self.slots.as_mut_ptr(),
            cursor: self.head,
            remaining: self.len,
            _list: PhantomData,
        }
    }

    /// Apply `visitor` to every live node head to tail.
    ///
    /// The visitor only gets shared access; the list cannot be mutated until
    /// the walk returns.
    pub fn for_each<F>(&self, mut visitor: F)
    where
        F: FnMut(NodeId, &Chunk<T, N>),
    {
        for (id, chunk) in self.iter() {
            visitor(id, chunk);
        }
    }

    /// Verify the head/tail/len bookkeeping and every link.
    ///
    /// Walks the whole list and arena. Mutations only re-check the links
    /// they touched (in debug builds); call this for a full audit.
    ///
    /// # Panics
    /// On any violation; a broken list is a bug in this module.
    pub fn check_invariants(&self) {
        assert_eq!(
            self.head.is_none(),
            self.len == 0,
            "head presence disagrees with len {}",
            self.len
        );
        assert_eq!(
            self.tail.is_none(),
            self.len == 0,
            "tail presence disagrees with len {}",
            self.len
        );

        let mut visited = 0usize;
        let mut prev = None;
        let mut cursor = self.head;
        while let Some(index) = cursor {
            let node = self.node(index);
            assert_eq!(node.prev, prev, "node {index} has a broken back link");
            visited += 1;
            assert!(visited <= self.len, "chunked list links form a cycle");
            prev = Some(index);
            cursor = node.next;
        }
        assert_eq!(prev, self.tail, "walk ended away from the tail");
        assert_eq!(visited, self.len, "live node count disagrees with len");

        let occupied = self
            .slots
            .iter()
            .filter(|slot| matches!(slot.entry, Entry::Occupied(_)))
            .count();
        assert_eq!(occupied, self.len, "arena holds unlinked nodes");
    }

    /// Check the link between two adjacent positions after a mutation.
    ///
    /// `None` on either side stands for the list end, so the head/tail
    /// bookkeeping is covered too. Constant time.
    #[inline]
    fn debug_check_link(&self, prev: Option<u32>, next: Option<u32>) {
        if !cfg!(debug_assertions) {
            return;
        }
        assert_eq!(
            self.head.is_none(),
            self.len == 0,
            "head presence disagrees with len {}",
            self.len
        );
        assert_eq!(
            self.tail.is_none(),
            self.len == 0,
            "tail presence disagrees with len {}",
            self.len
        );
        match prev {
            Some(index) => assert_eq!(
                self.node(index).next,
                next,
                "node {index} has a broken forward link"
            ),
            None => assert_eq!(self.head, next, "head does not match the first node"),
        }
        match next {
            Some(index) => assert_eq!(
                self.node(index).prev,
                prev,
                "node {index} has a broken back link"
            ),
            None => assert_eq!(self.tail, prev, "tail does not match the last node"),
        }
    }

    #[inline]
    fn id_of(&self, index: u32) -> NodeId {
        NodeId {
            index,
            generation: self.slots[index as usize].generation,
        }
    }

    fn live_node(&self, id: NodeId) -> Option<&Node<T, N>> {
        let slot = self.slots.get(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        match &slot.entry {
            Entry::Occupied(node) => Some(node),
            Entry::Vacant { .. } => None,
        }
    }

    fn node(&self, index: u32) -> &Node<T, N> {
        match &self.slots[index as usize].entry {
            Entry::Occupied(node) => node,
            Entry::Vacant { .. } => panic!("link points at vacant slot {index}"),
        }
    }

    fn node_mut(&mut self, index: u32) -> &mut Node<T, N> {
        match &mut self.slots[index as usize].entry {
            Entry::Occupied(node) => node,
            Entry::Vacant { .. } => panic!("link points at vacant slot {index}"),
        }
    }
}

impl<T, const N: usize> Default for ChunkedList<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Head-to-tail walk over a [`ChunkedList`].
pub struct Iter<'a, T, const N: usize> {
    list: &'a ChunkedList<T, N>,
    cursor: Option<u32>,
    remaining: usize,
}

impl<'a, T, const N: usize> Iterator for Iter<'a, T, N> {
    type Item = (NodeId, &'a Chunk<T, N>);

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.cursor?;
        let node = self.list.node(index);
        self.cursor = node.next;
        self.remaining -= 1;
        Some((self.list.id_of(index), &node.chunk))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T, const N: usize> ExactSizeIterator for Iter<'_, T, N> {}

impl<T, const N: usize> FusedIterator for Iter<'_, T, N> {}

/// Head-to-tail walk over a [`ChunkedList`] with mutable chunk access.
pub struct IterMut<'a, T, const N: usize> {
    slots: *mut Slot<T, N>,
    cursor: Option<u32>,
    remaining: usize,
    _list: PhantomData<&'a mut ChunkedList<T, N>>,
}

impl<'a, T, const N: usize> Iterator for IterMut<'a, T, N> {
    type Item = (NodeId, &'a mut Chunk<T, N>);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let index = self.cursor?;
        // SAFETY: `slots` comes from the exclusively borrowed list and
        // `index` is a live link, so it is in bounds. The links form an
        // acyclic chain of `len` nodes, so every slot is yielded at most once
        // and the returned borrows never alias.
        let slot = unsafe { &mut *self.slots.add(index as usize) };
        let node = match &mut slot.entry {
            Entry::Occupied(node) => node,
            Entry::Vacant { .. } => panic!("link points at vacant slot {index}"),
        };
        self.cursor = node.next;
        self.remaining -= 1;
        let id = NodeId {
            index,
            generation: slot.generation,
        };
        Some((id, &mut node.chunk))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T, const N: usize> ExactSizeIterator for IterMut<'_, T, N> {}

impl<T, const N: usize> FusedIterator for IterMut<'_, T, N> {}

impl<'a, T, const N: usize> IntoIterator for &'a ChunkedList<T, N> {
    type Item = (NodeId, &'a Chunk<T, N>);
    type IntoIter = Iter<'a, T, N>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
