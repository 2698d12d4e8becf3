use crate::{
    arena::{Key, Slot},
    model::Cardinality,
    traits::Entity,
};
use std::collections::BTreeMap;

///
/// RelationField
///
/// Shapes a field may take to count as a navigation property.
/// The `entity!` macro reads `Target` and `CARDINALITY` at compile time.
///

pub trait RelationField {
    type Target: Entity;
    const CARDINALITY: Cardinality;

    /// Slots held right now, in field order.
    fn slots(&self) -> Vec<Slot>;

    fn remap(&mut self, remap: &mut dyn FnMut(Slot) -> Slot);
}

fn remap_key<T>(key: &mut Key<T>, remap: &mut dyn FnMut(Slot) -> Slot) {
    *key = Key::from_slot(remap(key.slot()));
}

impl<T: Entity> RelationField for Key<T> {
    type Target = T;
    const CARDINALITY: Cardinality = Cardinality::One;

    fn slots(&self) -> Vec<Slot> {
        vec![self.slot()]
    }

    fn remap(&mut self, remap: &mut dyn FnMut(Slot) -> Slot) {
        remap_key(self, remap);
    }
}

impl<T: Entity> RelationField for Option<Key<T>> {
    type Target = T;
    const CARDINALITY: Cardinality = Cardinality::Opt;

    fn slots(&self) -> Vec<Slot> {
        self.iter().map(|key| key.slot()).collect()
    }

    fn remap(&mut self, remap: &mut dyn FnMut(Slot) -> Slot) {
        if let Some(key) = self.as_mut() {
            remap_key(key, remap);
        }
    }
}

impl<T: Entity> RelationField for Vec<Key<T>> {
    type Target = T;
    const CARDINALITY: Cardinality = Cardinality::Many;

    fn slots(&self) -> Vec<Slot> {
        self.iter().map(|key| key.slot()).collect()
    }

    fn remap(&mut self, remap: &mut dyn FnMut(Slot) -> Slot) {
        for key in self {
            remap_key(key, remap);
        }
    }
}

impl<K: Ord, T: Entity> RelationField for BTreeMap<K, Key<T>> {
    type Target = T;
    const CARDINALITY: Cardinality = Cardinality::Keyed;

    fn slots(&self) -> Vec<Slot> {
        self.values().map(|key| key.slot()).collect()
    }

    fn remap(&mut self, remap: &mut dyn FnMut(Slot) -> Slot) {
        for key in self.values_mut() {
            remap_key(key, remap);
        }
    }
}
