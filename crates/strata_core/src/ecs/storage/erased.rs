use crate::ecs::storage::ComponentStore;
use crate::ecs::{Component, ComponentId};
use std::any::Any;

/// Type-erased view of a [`ComponentStore`].
///
/// This is the capability set an archetype needs without knowing the
/// component type: identify the store, count its rows, and drop the last
/// row when an insertion has to be undone.
pub trait ErasedStore: Send + Sync {
    fn component_id(&self) -> ComponentId;

    fn item_count(&self) -> usize;

    fn chunk_count(&self) -> usize;

    /// Drop the last item. Returns `false` if the store was empty.
    fn discard_last(&mut self) -> bool;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Component, const N: usize> ErasedStore for ComponentStore<T, N> {
    fn component_id(&self) -> ComponentId {
        ComponentStore::component_id(self)
    }

    fn item_count(&self) -> usize {
        ComponentStore::item_count(self)
    }

    fn chunk_count(&self) -> usize {
        ComponentStore::chunk_count(self)
    }

    fn discard_last(&mut self) -> bool {
        self.pop_item().is_some()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl<'a> dyn ErasedStore + 'a {
    /// Recover the typed store, if this is a store of `T` with chunk size `N`.
    pub fn downcast_ref<T: Component, const N: usize>(&self) -> Option<&ComponentStore<T, N>> {
        self.as_any().downcast_ref()
    }

    pub fn downcast_mut<T: Component, const N: usize>(
        &mut self,
    ) -> Option<&mut ComponentStore<T, N>> {
        self.as_any_mut().downcast_mut()
    }
}
