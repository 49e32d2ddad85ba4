//! Chunked containers backing all component storage.
//!
//! A [`ChunkedList`] strings fixed-capacity [`Chunk`]s together so that
//! growth never relocates items that are already stored.

mod chunk;
mod chunked_list;

pub use chunk::Chunk;
pub use chunked_list::{ChunkedList, Iter, IterMut, NodeId};

use thiserror::Error;

/// Default number of items held by one chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContainerError {
    #[error("failed to allocate storage for {requested} items")]
    AllocationFailure { requested: usize },

    #[error("node {index} (generation {generation}) is not part of this list")]
    StaleNode { index: u32, generation: u32 },
}
