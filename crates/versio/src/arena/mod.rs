//! Entity arena: the in-memory persistence context translators read from
//! and write to.
//!
//! Invariants:
//! - Slots are assigned on insert and never reused, except slots discarded
//!   by a rolled-back write.
//! - Relations between entities are stored as slots, never as references.
//! - Typed access is a checked downcast against the stored type.

mod key;
mod relation;

pub use key::{Key, Slot};
pub use relation::RelationField;

use crate::{
    error::{ErrorClass, ErrorOrigin, InternalError},
    traits::Entity,
};
use std::any::Any;
use thiserror::Error as ThisError;

///
/// ArenaError
///

#[derive(Debug, Eq, PartialEq, ThisError)]
pub enum ArenaError {
    #[error("arena slot space exhausted")]
    Full,

    #[error("no entity stored at slot {0}")]
    MissingSlot(Slot),

    #[error("slot {slot} holds '{found}', expected '{expected}'")]
    TypeMismatch {
        slot: Slot,
        expected: &'static str,
        found: &'static str,
    },
}

impl ArenaError {
    pub(crate) const fn class(&self) -> ErrorClass {
        match self {
            Self::Full => ErrorClass::Internal,
            Self::MissingSlot(_) => ErrorClass::NotFound,
            Self::TypeMismatch { .. } => ErrorClass::InvariantViolation,
        }
    }
}

impl From<ArenaError> for InternalError {
    fn from(err: ArenaError) -> Self {
        Self::new(err.class(), ErrorOrigin::Arena, err.to_string())
    }
}

///
/// EntityGraph
///
/// Read-only view of a persistence context, as seen by cascade discovery.
/// The surrounding unit-of-work may implement this over its own storage.
///

pub trait EntityGraph {
    /// Entity name stored at `slot`, if any.
    fn entity_name(&self, slot: Slot) -> Option<&'static str>;

    /// Slots held by `field` of the entity at `slot`. `None` when the slot is
    /// empty or the field is not a relation of that entity.
    fn relation_targets(&self, slot: Slot, field: &str) -> Option<Vec<Slot>>;
}

///
/// EntityGraphMut
///

pub trait EntityGraphMut: EntityGraph {
    /// Rewrite every relation slot held by the entity at `slot`.
    /// Returns false when nothing is stored there.
    fn remap_relations(&mut self, slot: Slot, remap: &mut dyn FnMut(Slot) -> Slot) -> bool;
}

// Object-safe storage surface over any `Entity`.
trait StoredEntity: Any + Send + Sync {
    fn entity_name(&self) -> &'static str;
    fn relation_targets(&self, field: &str) -> Option<Vec<Slot>>;
    fn remap_relations(&mut self, remap: &mut dyn FnMut(Slot) -> Slot);
    fn boxed_clone(&self) -> Box<dyn StoredEntity>;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<E: Entity> StoredEntity for E {
    fn entity_name(&self) -> &'static str {
        E::ENTITY_NAME
    }

    fn relation_targets(&self, field: &str) -> Option<Vec<Slot>> {
        Entity::relation_targets(self, field)
    }

    fn remap_relations(&mut self, remap: &mut dyn FnMut(Slot) -> Slot) {
        Entity::remap_relations(self, remap);
    }

    fn boxed_clone(&self) -> Box<dyn StoredEntity> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

///
/// EntityArena
///
/// Owns every entity instance of one persistence context: originals loaded
/// by the unit-of-work and clones created during versioning.
///

#[derive(Default)]
pub struct EntityArena {
    entries: Vec<Box<dyn StoredEntity>>,
}

impl EntityArena {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn next_slot(&self) -> Result<Slot, ArenaError> {
        u32::try_from(self.entries.len())
            .map(Slot::new)
            .map_err(|_| ArenaError::Full)
    }

    fn entry(&self, slot: Slot) -> Result<&(dyn StoredEntity + 'static), ArenaError> {
        self.entries
            .get(slot.as_index())
            .map(|entry| &**entry)
            .ok_or(ArenaError::MissingSlot(slot))
    }

    fn entry_mut(&mut self, slot: Slot) -> Result<&mut (dyn StoredEntity + 'static), ArenaError> {
        self.entries
            .get_mut(slot.as_index())
            .map(|entry| &mut **entry)
            .ok_or(ArenaError::MissingSlot(slot))
    }

    /// Store a new instance and return its key.
    pub fn insert<E: Entity>(&mut self, entity: E) -> Result<Key<E>, ArenaError> {
        let slot = self.next_slot()?;
        self.entries.push(Box::new(entity));

        Ok(Key::from_slot(slot))
    }

    pub fn get<E: Entity>(&self, key: Key<E>) -> Result<&E, ArenaError> {
        let entry = self.entry(key.slot())?;
        let found = entry.entity_name();

        entry
            .as_any()
            .downcast_ref::<E>()
            .ok_or(ArenaError::TypeMismatch {
                slot: key.slot(),
                expected: E::ENTITY_NAME,
                found,
            })
    }

    pub fn get_mut<E: Entity>(&mut self, key: Key<E>) -> Result<&mut E, ArenaError> {
        let entry = self.entry_mut(key.slot())?;
        let found = entry.entity_name();

        entry
            .as_any_mut()
            .downcast_mut::<E>()
            .ok_or(ArenaError::TypeMismatch {
                slot: key.slot(),
                expected: E::ENTITY_NAME,
                found,
            })
    }

    /// Overwrite the instance at `key`, returning the previous value.
    pub fn replace<E: Entity>(&mut self, key: Key<E>, entity: E) -> Result<E, ArenaError> {
        let current = self.get_mut(key)?;

        Ok(std::mem::replace(current, entity))
    }

    /// Store a structural copy of the instance at `slot` under a new slot.
    /// Relations are copied as-is and still point at the originals' targets.
    pub fn duplicate(&mut self, slot: Slot) -> Result<Slot, ArenaError> {
        let copy = self.entry(slot)?.boxed_clone();
        let next = self.next_slot()?;
        self.entries.push(copy);

        Ok(next)
    }

    /// Drop every instance stored at or after slot index `len`.
    pub(crate) fn truncate(&mut self, len: usize) {
        self.entries.truncate(len);
    }

    /// Iterate every instance of `E` in slot order.
    pub fn iter<E: Entity>(&self) -> impl Iterator<Item = (Key<E>, &E)> + '_ {
        self.entries.iter().enumerate().filter_map(|(index, entry)| {
            let entity = entry.as_any().downcast_ref::<E>()?;
            let slot = Slot::new(u32::try_from(index).ok()?);

            Some((Key::from_slot(slot), entity))
        })
    }

    #[must_use]
    pub fn contains(&self, slot: Slot) -> bool {
        slot.as_index() < self.entries.len()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl EntityGraph for EntityArena {
    fn entity_name(&self, slot: Slot) -> Option<&'static str> {
        self.entry(slot).ok().map(|entry| entry.entity_name())
    }

    fn relation_targets(&self, slot: Slot, field: &str) -> Option<Vec<Slot>> {
        self.entry(slot).ok()?.relation_targets(field)
    }
}

impl EntityGraphMut for EntityArena {
    fn remap_relations(&mut self, slot: Slot, remap: &mut dyn FnMut(Slot) -> Slot) -> bool {
        match self.entry_mut(slot) {
            Ok(entry) => {
                entry.remap_relations(remap);
                true
            }
            Err(_) => false,
        }
    }
}

///
/// TESTS
///
