use crate::{arena::Slot, model::EntityModel};
use std::fmt::Debug;

// ============================================================================
// FOUNDATIONAL KINDS
// ============================================================================
//
// These traits define *what an entity is*, not how it is stored
// or translated at runtime.
//

///
/// Path
/// Fully-qualified registry path.
///

pub trait Path {
    const PATH: &'static str;
}

///
/// EntityIdentity
///
/// Stable entity name used as the type tag in the navigation index and the
/// clone trace cache. Kept separate from `Entity::MODEL` so relation models
/// can name their targets without evaluating the target's model.
///

pub trait EntityIdentity {
    const ENTITY_NAME: &'static str;
}

///
/// Entity
///
/// One persisted business record type. Relation fields hold `Key<T>` handles
/// into the owning arena, never direct references.
/// Implemented by the `entity!` macro.
///

pub trait Entity: EntityIdentity + Path + Clone + Debug + Send + Sync + 'static {
    const MODEL: &'static EntityModel;

    /// Model accessor usable as a function pointer in relation metadata.
    #[must_use]
    fn model() -> &'static EntityModel {
        Self::MODEL
    }

    /// Slots currently held by one relation field, or `None` when the field
    /// is not a relation of this entity.
    fn relation_targets(&self, field: &str) -> Option<Vec<Slot>>;

    /// Rewrite every slot held by relation fields.
    fn remap_relations(&mut self, remap: &mut dyn FnMut(Slot) -> Slot);
}
