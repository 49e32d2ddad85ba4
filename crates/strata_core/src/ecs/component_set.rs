//! Compile-time component lists.
//!
//! An archetype is parameterised by a tuple of component types. The traits
//! here are implemented for tuples of one to eight components:
//!
//! - [`ComponentSet`]: the tuple of component values itself; knows how to
//!   build one store per component and append a row to them.
//! - [`ComponentBuilders`]: a tuple of fallible constructors, one per
//!   component, consumed in declaration order.
//! - [`ComponentAt`]: positional lookup of the store for component `I`.

use crate::ecs::error::{ArchetypeError, BoxError};
use crate::ecs::storage::{ComponentStore, ErasedStore};
use crate::ecs::{Component, ComponentId};
use std::any::type_name;
use std::convert::Infallible;

/// A tuple of component types making up one archetype.
pub trait ComponentSet: Sized + 'static {
    /// One [`ComponentStore`] per component, in declaration order.
    type Stores: Send + Sync;

    fn component_ids() -> Vec<ComponentId>;

    fn component_names() -> Vec<&'static str>;

    fn new_stores() -> Self::Stores;

    fn erased(stores: &Self::Stores) -> Vec<&dyn ErasedStore>;

    fn erased_mut(stores: &mut Self::Stores) -> Vec<&mut dyn ErasedStore>;

    fn erased_at(stores: &Self::Stores, position: usize) -> Option<&dyn ErasedStore>;

    fn erased_at_mut(stores: &mut Self::Stores, position: usize) -> Option<&mut dyn ErasedStore>;

    /// Append `self` as one row. Either every store grows by one item or none do.
    fn insert(self, stores: &mut Self::Stores) -> Result<(), ArchetypeError>;
}

/// A tuple of constructors producing one row of `S`.
///
/// Each element is a `FnOnce() -> Result<T, E>` for the component at the same
/// position. Constructors run in order; if one fails, the components already
/// appended for the row are dropped again.
pub trait ComponentBuilders<S: ComponentSet> {
    fn build_into(self, stores: &mut S::Stores) -> Result<(), ArchetypeError>;
}

/// Positional access to the store of component `I`.
pub trait ComponentAt<const I: usize>: ComponentSet {
    type Component: Component;

    fn store(stores: &Self::Stores) -> &ComponentStore<Self::Component>;

    fn store_mut(stores: &mut Self::Stores) -> &mut ComponentStore<Self::Component>;
}

/// Drop the last item of every store in `written`, newest first.
fn rollback(written: &mut [&mut dyn ErasedStore]) {
    for store in written.iter_mut().rev() {
        if !store.discard_last() {
            panic!(
                "rollback found component store {} already empty",
                store.component_id()
            );
        }
    }
}

macro_rules! impl_component_set {
    ($(($T:ident, $F:ident, $E:ident, $idx:tt)),+) => {
        impl<$($T: Component),+> ComponentSet for ($($T,)+) {
            type Stores = ($(ComponentStore<$T>,)+);

            fn component_ids() -> Vec<ComponentId> {
                vec![$(ComponentId::of::<$T>()),+]
            }

            fn component_names() -> Vec<&'static str> {
                vec![$(type_name::<$T>()),+]
            }

            fn new_stores() -> Self::Stores {
                ($(ComponentStore::<$T>::new(),)+)
            }

            fn erased(stores: &Self::Stores) -> Vec<&dyn ErasedStore> {
                vec![$(&stores.$idx as &dyn ErasedStore),+]
            }

            fn erased_mut(stores: &mut Self::Stores) -> Vec<&mut dyn ErasedStore> {
                vec![$(&mut stores.$idx as &mut dyn ErasedStore),+]
            }

            fn erased_at(stores: &Self::Stores, position: usize) -> Option<&dyn ErasedStore> {
                match position {
                    $($idx => Some(&stores.$idx as &dyn ErasedStore),)+
                    _ => None,
                }
            }

            fn erased_at_mut(
                stores: &mut Self::Stores,
                position: usize,
            ) -> Option<&mut dyn ErasedStore> {
                match position {
                    $($idx => Some(&mut stores.$idx as &mut dyn ErasedStore),)+
                    _ => None,
                }
            }

            fn insert(self, stores: &mut Self::Stores) -> Result<(), ArchetypeError> {
                let builders = ($(move || Ok::<$T, Infallible>(self.$idx),)+);
                ComponentBuilders::<Self>::build_into(builders, stores)
            }
        }

        impl<$($T, $F, $E),+> ComponentBuilders<($($T,)+)> for ($($F,)+)
        where
            $(
                $T: Component,
                $F: FnOnce() -> Result<$T, $E>,
                $E: Into<BoxError>,
            )+
        {
            #[allow(unused_assignments)]
            fn build_into(
                self,
                stores: &mut <($($T,)+) as ComponentSet>::Stores,
            ) -> Result<(), ArchetypeError> {
                let undo = |stores: &mut <($($T,)+) as ComponentSet>::Stores, written: usize| {
                    let mut erased = <($($T,)+) as ComponentSet>::erased_mut(stores);
                    rollback(&mut erased[..written]);
                };

                let mut written = 0usize;
                $(
                    let value = match (self.$idx)() {
                        Ok(value) => value,
                        Err(err) => {
                            undo(stores, written);
                            return Err(ArchetypeError::ComponentConstructionFailure {
                                component: type_name::<$T>(),
                                position: $idx,
                                source: err.into(),
                            });
                        }
                    };
                    if let Err(err) = stores.$idx.create_item(value) {
                        undo(stores, written);
                        return Err(err.into());
                    }
                    written += 1;
                )+
                Ok(())
            }
        }
    };
}

macro_rules! impl_component_at {
    ($all:tt; $($idx:tt => $T:ident),+) => {
        $(impl_component_at!(@one $all; $idx => $T);)+
    };
    (@one [$($A:ident),+]; $idx:tt => $T:ident) => {
        impl<$($A: Component),+> ComponentAt<$idx> for ($($A,)+) {
            type Component = $T;

            fn store(stores: &Self::Stores) -> &ComponentStore<$T> {
                &stores.$idx
            }

            fn store_mut(stores: &mut Self::Stores) -> &mut ComponentStore<$T> {
                &mut stores.$idx
            }
        }
    };
}

impl_component_set!((A, FA, EA, 0));
impl_component_set!((A, FA, EA, 0), (B, FB, EB, 1));
impl_component_set!((A, FA, EA, 0), (B, FB, EB, 1), (C, FC, EC, 2));
impl_component_set!((A, FA, EA, 0), (B, FB, EB, 1), (C, FC, EC, 2), (D, FD, ED, 3));
impl_component_set!(
    (A, FA, EA, 0),
    (B, FB, EB, 1),
    (C, FC, EC, 2),
    (D, FD, ED, 3),
    (E, FE, EE, 4)
);
impl_component_set!(
    (A, FA, EA, 0),
    (B, FB, EB, 1),
    (C, FC, EC, 2),
    (D, FD, ED, 3),
    (E, FE, EE, 4),
    (F, FF, EF, 5)
);
impl_component_set!(
    (A, FA, EA, 0),
    (B, FB, EB, 1),
    (C, FC, EC, 2),
    (D, FD, ED, 3),
    (E, FE, EE, 4),
    (F, FF, EF, 5),
    (G, FG, EG, 6)
);
impl_component_set!(
    (A, FA, EA, 0),
    (B, FB, EB, 1),
    (C, FC, EC, 2),
    (D, FD, ED, 3),
    (E, FE, EE, 4),
    (F, FF, EF, 5),
    (G, FG, EG, 6),
    (H, FH, EH, 7)
);

impl_component_at!([A]; 0 => A);
impl_component_at!([A, B]; 0 => A, 1 => B);
impl_component_at!([A, B, C]; 0 => A, 1 => B, 2 => C);
impl_component_at!([A, B, C, D]; 0 => A, 1 => B, 2 => C, 3 => D);
impl_component_at!([A, B, C, D, E]; 0 => A, 1 => B, 2 => C, 3 => D, 4 => E);
impl_component_at!([A, B, C, D, E, F]; 0 => A, 1 => B, 2 => C, 3 => D, 4 => E, 5 => F);
impl_component_at!(
    [A, B, C, D, E, F, G];
    0 => A, 1 => B, 2 => C, 3 => D, 4 => E, 5 => F, 6 => G
);
impl_component_at!(
    [A, B, C, D, E, F, G, H];
    0 => A, 1 => B, 2 => C, 3 => D, 4 => E, 5 => F, 6 => G, 7 => H
);
