// mod.rs - Storage module exports

mod component_store;
mod erased;

pub use component_store::ComponentStore;
pub use erased::ErasedStore;
