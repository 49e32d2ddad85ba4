// archetype.rs - Row storage for one fixed combination of component types
//
// An archetype owns one chunked store per component type and appends rows to
// all of them in lockstep. Every store always holds exactly `entities_count()`
// items.

use crate::containers::DEFAULT_CHUNK_SIZE;
use crate::ecs::component::name_of;
use crate::ecs::{
    ArchetypeError, Component, ComponentAt, ComponentBuilders, ComponentId, ComponentSet,
    ComponentStore, EntityId, ErasedStore, Fingerprint,
};
use std::any::type_name;
use std::collections::HashMap;
use std::fmt;

/// Storage for all entities sharing the component types of `S`.
///
/// `S` is a tuple of component types, e.g. `Archetype<(Position, Velocity)>`.
/// Rows are appended with [`create_entity`](Self::create_entity) and never
/// removed.
///
/// Mutating calls take `&mut self` and reads take `&self`, so one writer
/// excludes all readers. Many readers may share an archetype across threads.
pub struct Archetype<S: ComponentSet> {
    stores: S::Stores,
    fingerprint: Fingerprint,
    positions: HashMap<ComponentId, usize>,
    entities: usize,
}

impl<S: ComponentSet> Archetype<S> {
    /// Create an empty archetype.
    ///
    /// # Panics
    /// If `S` names the same component type twice.
    pub fn new() -> Self {
        match Self::try_new() {
            Ok(archetype) => archetype,
            Err(err) => panic!("invalid archetype {}: {err}", type_name::<S>()),
        }
    }

    /// Create an empty archetype, rejecting duplicate component types.
    pub fn try_new() -> Result<Self, ArchetypeError> {
        let ids = S::component_ids();
        let mut fingerprint = Fingerprint::new();
        let mut positions = HashMap::with_capacity(ids.len());
        for (position, (id, name)) in ids.into_iter().zip(S::component_names()).enumerate() {
            if !fingerprint.add_trait(id) {
                return Err(ArchetypeError::DuplicateComponent { component: name });
            }
            positions.insert(id, position);
        }

        tracing::debug!(
            fingerprint = %fingerprint,
            hash = fingerprint.hash_id(),
            components = positions.len(),
            "archetype created"
        );

        Ok(Self {
            stores: S::new_stores(),
            fingerprint,
            positions,
            entities: 0,
        })
    }

    /// Append one entity, one value per component in declaration order.
    ///
    /// On failure every component already appended for the row is dropped
    /// again and the entity count is unchanged.
    pub fn create_entity(&mut self, components: S) -> Result<EntityId, ArchetypeError> {
        let result = components.insert(&mut self.stores);
        self.finish_insert(result)
    }

    /// Append one entity with every component default-constructed.
    pub fn create_default_entity(&mut self) -> Result<EntityId, ArchetypeError>
    where
        S: Default,
    {
        self.create_entity(S::default())
    }

    /// Append one entity from a tuple of fallible constructors.
    ///
    /// ```ignore
    /// let id = archetype.try_create_entity((
    ///     || Ok::<_, Infallible>(Position::default()),
    ///     || Velocity::parse(input),
    /// ))?;
    /// ```
    pub fn try_create_entity<B>(&mut self, builders: B) -> Result<EntityId, ArchetypeError>
    where
        B: ComponentBuilders<S>,
    {
        let result = builders.build_into(&mut self.stores);
        self.finish_insert(result)
    }

    /// Number of rows; equal to the item count of every store.
    #[inline]
    pub fn entities_count(&self) -> usize {
        self.entities
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entities == 0
    }

    /// Ids of every entity, in row order.
    pub fn entities(&self) -> impl Iterator<Item = EntityId> {
        (0..self.entities).map(EntityId::from_row)
    }

    #[inline]
    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    /// Component ids in declaration order.
    pub fn component_ids(&self) -> Vec<ComponentId> {
        S::component_ids()
    }

    pub fn has_component<T: Component>(&self) -> bool {
        self.fingerprint.contains(ComponentId::of::<T>())
    }

    /// Type-erased views of every store, in declaration order.
    pub fn stores(&self) -> Vec<&dyn ErasedStore> {
        S::erased(&self.stores)
    }

    /// The store holding component `T`, looked up by component id.
    pub fn get_component<T: Component>(&self) -> Result<&ComponentStore<T>, ArchetypeError> {
        let store = self
            .position_of::<T>()
            .and_then(|position| S::erased_at(&self.stores, position))
            .and_then(|store| store.downcast_ref::<T, DEFAULT_CHUNK_SIZE>());
        store.ok_or_else(|| self.missing::<T>())
    }

    pub fn get_component_mut<T: Component>(
        &mut self,
    ) -> Result<&mut ComponentStore<T>, ArchetypeError> {
        let missing = self.missing::<T>();
        let Some(position) = self.position_of::<T>() else {
            return Err(missing);
        };
        S::erased_at_mut(&mut self.stores, position)
            .and_then(|store| store.downcast_mut::<T, DEFAULT_CHUNK_SIZE>())
            .ok_or(missing)
    }

    /// The store of the component declared at position `I`, resolved at compile time.
    pub fn component_at<const I: usize>(&self) -> &ComponentStore<<S as ComponentAt<I>>::Component>
    where
        S: ComponentAt<I>,
    {
        <S as ComponentAt<I>>::store(&self.stores)
    }

    pub fn component_at_mut<const I: usize>(
        &mut self,
    ) -> &mut ComponentStore<<S as ComponentAt<I>>::Component>
    where
        S: ComponentAt<I>,
    {
        <S as ComponentAt<I>>::store_mut(&mut self.stores)
    }

    /// Component `T` of one entity.
    pub fn row<T: Component>(&self, entity: EntityId) -> Result<&T, ArchetypeError> {
        self.check_entity(entity)?;
        let count = self.entities;
        self.get_component::<T>()?
            .get(entity.row())
            .ok_or(ArchetypeError::EntityOutOfBounds { entity, count })
    }

    pub fn row_mut<T: Component>(&mut self, entity: EntityId) -> Result<&mut T, ArchetypeError> {
        self.check_entity(entity)?;
        let count = self.entities;
        self.get_component_mut::<T>()?
            .get_mut(entity.row())
            .ok_or(ArchetypeError::EntityOutOfBounds { entity, count })
    }

    /// Verify every store holds exactly `entities_count()` items.
    ///
    /// # Panics
    /// On any mismatch. Misaligned stores mean the insertion protocol itself
    /// is broken.
    pub fn check_alignment(&self) {
        for store in S::erased(&self.stores) {
            assert_eq!(
                store.item_count(),
                self.entities,
                "component store {} holds {} rows but archetype {} has {} entities",
                name_of(store.component_id()),
                store.item_count(),
                self.fingerprint,
                self.entities
            );
        }
    }

    fn finish_insert(&mut self, result: Result<(), ArchetypeError>) -> Result<EntityId, ArchetypeError> {
        match result {
            Ok(()) => {
                self.entities += 1;
                self.check_alignment();
                Ok(EntityId::from_row(self.entities - 1))
            }
            Err(err) => {
                self.check_alignment();
                tracing::warn!(
                    fingerprint = %self.fingerprint,
                    error = %err,
                    "entity creation rolled back"
                );
                Err(err)
            }
        }
    }

    fn check_entity(&self, entity: EntityId) -> Result<(), ArchetypeError> {
        if entity.row() < self.entities {
            Ok(())
        } else {
            Err(ArchetypeError::EntityOutOfBounds {
                entity,
                count: self.entities,
            })
        }
    }

    fn position_of<T: Component>(&self) -> Option<usize> {
        self.positions.get(&ComponentId::of::<T>()).copied()
    }

    fn missing<T: Component>(&self) -> ArchetypeError {
        ArchetypeError::MissingComponent {
            component: type_name::<T>(),
            fingerprint: self.fingerprint.clone(),
        }
    }
}

impl<S: ComponentSet> Default for Archetype<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: ComponentSet> fmt::Debug for Archetype<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Archetype")
            .field("fingerprint", &self.fingerprint)
            .field("entities", &self.entities)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rayon::prelude::*;
    use std::convert::Infallible;
    use std::io;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Clone, Copy, Debug, Default, PartialEq)]
    struct Position {
        x: i32,
        y: i32,
    }

    #[derive(Clone, Copy, Debug, Default, PartialEq)]
    struct Velocity {
        x: i32,
        y: i32,
    }

    #[derive(Clone, Copy, Debug, Default, PartialEq)]
    struct Health(u32);

    struct Tracked(Arc<AtomicUsize>);

    impl Drop for Tracked {
        fn drop(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn position_velocity_scenario() {
        let mut archetype = Archetype::<(Position, Velocity)>::new();
        let id0 = archetype
            .create_entity((Position { x: 0, y: 0 }, Velocity { x: 1, y: 1 }))
            .unwrap();
        let id1 = archetype
            .create_entity((Position { x: 5, y: 5 }, Velocity { x: 0, y: 0 }))
            .unwrap();

        assert_eq!(id0, EntityId::from_row(0));
        assert_eq!(id1, EntityId::from_row(1));
        assert_eq!(archetype.entities_count(), 2);
        assert_eq!(
            archetype.get_component::<Position>().unwrap()[1],
            Position { x: 5, y: 5 }
        );
        assert_eq!(
            archetype.row::<Velocity>(id0).unwrap(),
            &Velocity { x: 1, y: 1 }
        );
    }

    #[test]
    fn every_store_grows_with_the_entity_count() {
        let mut archetype = Archetype::<(Position, Velocity, Health)>::new();
        for i in 0..(DEFAULT_CHUNK_SIZE * 3 + 5) {
            let id = archetype
                .create_entity((
                    Position { x: i as i32, y: 0 },
                    Velocity::default(),
                    Health(i as u32),
                ))
                .unwrap();
            assert_eq!(id.row(), i);
        }

        let n = archetype.entities_count();
        assert_eq!(n, DEFAULT_CHUNK_SIZE * 3 + 5);
        for store in archetype.stores() {
            assert_eq!(store.item_count(), n);
            assert_eq!(store.chunk_count(), 4);
        }
        assert_eq!(archetype.entities().count(), n);
    }

    #[test]
    fn written_values_read_back_at_their_row() {
        let mut archetype = Archetype::<(Position, Health)>::new();
        let ids: Vec<EntityId> = (0..100)
            .map(|i| {
                archetype
                    .create_entity((Position { x: i, y: -i }, Health(i as u32 * 3)))
                    .unwrap()
            })
            .collect();

        for (i, id) in ids.into_iter().enumerate() {
            let i = i as i32;
            assert_eq!(archetype.row::<Position>(id).unwrap(), &Position { x: i, y: -i });
            assert_eq!(archetype.row::<Health>(id).unwrap(), &Health(i as u32 * 3));
        }
    }

    #[test]
    fn fingerprint_ignores_declaration_order() {
        let a = Archetype::<(Position, Velocity)>::new();
        let b = Archetype::<(Velocity, Position)>::new();
        let c = Archetype::<(Position, Health)>::new();
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
        assert!(a.has_component::<Velocity>());
        assert!(!a.has_component::<Health>());
    }

    #[test]
    fn query_fingerprint_selects_matching_archetypes() {
        let moving = Archetype::<(Position, Velocity, Health)>::new();
        let still = Archetype::<(Position, Health)>::new();
        let query = Fingerprint::from_components([
            ComponentId::of::<Position>(),
            ComponentId::of::<Velocity>(),
        ]);
        assert!(moving.fingerprint().satisfies(&query));
        assert!(!still.fingerprint().satisfies(&query));
    }

    #[test]
    fn failing_constructor_rolls_back_the_row() {
        let drops = Arc::new(AtomicUsize::new(0));
        let mut archetype = Archetype::<(Tracked, Velocity, Health)>::new();
        archetype
            .create_entity((Tracked(drops.clone()), Velocity::default(), Health(1)))
            .unwrap();

        let tracked = drops.clone();
        let err = archetype
            .try_create_entity((
                move || Ok::<_, Infallible>(Tracked(tracked)),
                || Err::<Velocity, _>(io::Error::new(io::ErrorKind::InvalidData, "bad velocity")),
                || Ok::<_, Infallible>(Health(2)),
            ))
            .unwrap_err();

        match err {
            ArchetypeError::ComponentConstructionFailure {
                component,
                position,
                source,
            } => {
                assert!(component.ends_with("Velocity"));
                assert_eq!(position, 1);
                assert_eq!(source.to_string(), "bad velocity");
            }
            other => panic!("unexpected error: {other}"),
        }

        assert_eq!(archetype.entities_count(), 1);
        for store in archetype.stores() {
            assert_eq!(store.item_count(), 1);
        }
        // The first component of the failed row was dropped during rollback.
        assert_eq!(drops.load(Ordering::SeqCst), 1);

        let next = archetype
            .create_entity((Tracked(drops.clone()), Velocity { x: 3, y: 3 }, Health(3)))
            .unwrap();
        assert_eq!(next, EntityId::from_row(1));
        assert_eq!(archetype.component_at::<2>()[1], Health(3));
    }

    #[test]
    fn rollback_releases_a_freshly_opened_chunk() {
        let mut archetype = Archetype::<(Position, Health)>::new();
        for _ in 0..DEFAULT_CHUNK_SIZE {
            archetype.create_default_entity().unwrap();
        }
        let result = archetype.try_create_entity((
            || Ok::<_, Infallible>(Position::default()),
            || Err::<Health, _>("out of range"),
        ));
        assert!(result.is_err());
        for store in archetype.stores() {
            assert_eq!(store.chunk_count(), 1);
        }
    }

    #[test]
    fn builders_can_succeed() {
        let mut archetype = Archetype::<(Position, Health)>::new();
        let id = archetype
            .try_create_entity((
                || Ok::<_, Infallible>(Position { x: 2, y: 4 }),
                || "7".parse::<u32>().map(Health),
            ))
            .unwrap();
        assert_eq!(archetype.row::<Health>(id).unwrap(), &Health(7));
    }

    #[test]
    fn default_entities_use_component_defaults() {
        let mut archetype = Archetype::<(Position, Velocity)>::new();
        let id = archetype.create_default_entity().unwrap();
        assert_eq!(id.row(), 0);
        assert_eq!(archetype.component_at::<0>()[0], Position::default());
        assert_eq!(archetype.component_at::<1>()[0], Velocity::default());
    }

    #[test]
    fn positional_and_typed_access_agree() {
        let mut archetype = Archetype::<(Position, Velocity)>::new();
        archetype
            .create_entity((Position { x: 1, y: 2 }, Velocity { x: 3, y: 4 }))
            .unwrap();

        archetype.component_at_mut::<1>()[0].x = 30;
        assert_eq!(
            archetype.get_component::<Velocity>().unwrap()[0],
            Velocity { x: 30, y: 4 }
        );

        archetype.get_component_mut::<Position>().unwrap()[0].y = 20;
        *archetype.row_mut::<Position>(EntityId::from_row(0)).unwrap() = Position { x: 10, y: 20 };
        assert_eq!(archetype.component_at::<0>()[0], Position { x: 10, y: 20 });
    }

    #[test]
    fn missing_component_and_unknown_entity_are_errors() {
        let mut archetype = Archetype::<(Position,)>::new();
        archetype.create_default_entity().unwrap();

        assert!(matches!(
            archetype.get_component::<Health>(),
            Err(ArchetypeError::MissingComponent { .. })
        ));
        assert!(matches!(
            archetype.get_component_mut::<Health>(),
            Err(ArchetypeError::MissingComponent { .. })
        ));
        assert!(matches!(
            archetype.row::<Position>(EntityId::from_row(1)),
            Err(ArchetypeError::EntityOutOfBounds { count: 1, .. })
        ));
    }

    #[test]
    fn duplicate_component_types_are_rejected() {
        assert!(matches!(
            Archetype::<(Position, Health, Position)>::try_new(),
            Err(ArchetypeError::DuplicateComponent { .. })
        ));
    }

    #[test]
    #[should_panic(expected = "declared more than once")]
    fn new_panics_on_duplicate_components() {
        let _ = Archetype::<(Health, Health)>::new();
    }

    #[test]
    fn dropping_the_archetype_drops_every_component() {
        let drops = Arc::new(AtomicUsize::new(0));
        {
            let mut archetype = Archetype::<(Tracked, Position)>::new();
            for _ in 0..(DEFAULT_CHUNK_SIZE + 1) {
                archetype
                    .create_entity((Tracked(drops.clone()), Position::default()))
                    .unwrap();
            }
            assert_eq!(drops.load(Ordering::SeqCst), 0);
            for store in archetype.stores() {
                assert_eq!(store.chunk_count(), 2);
            }
        }
        assert_eq!(drops.load(Ordering::SeqCst), DEFAULT_CHUNK_SIZE + 1);
    }

    #[test]
    fn readers_can_share_an_archetype_across_threads() {
        let mut archetype = Archetype::<(Position, Velocity)>::new();
        for i in 0..500 {
            archetype
                .create_entity((Position { x: i, y: i }, Velocity { x: 1, y: 0 }))
                .unwrap();
        }

        let archetype = &archetype;
        let total: i64 = (0..archetype.entities_count())
            .into_par_iter()
            .map(|row| {
                let id = EntityId::from_row(row);
                archetype.row::<Position>(id).unwrap().x as i64
                    + archetype.row::<Velocity>(id).unwrap().x as i64
            })
            .sum();
        assert_eq!(total, (0..500i64).sum::<i64>() + 500);
    }
}
