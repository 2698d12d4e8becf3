use derive_more::{Display, From};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{
    cmp::Ordering,
    fmt,
    hash::{Hash, Hasher},
    marker::PhantomData,
};

///
/// Slot
///
/// Untyped, stable arena index. Identity of one entity instance within one
/// persistence context; two instances with equal field values still have
/// distinct slots.
///

#[derive(
    Clone, Copy, Debug, Deserialize, Display, Eq, From, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
#[display("#{_0}")]
#[serde(transparent)]
pub struct Slot(u32);

impl Slot {
    #[must_use]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }

    pub(crate) const fn as_index(self) -> usize {
        self.0 as usize
    }
}

///
/// Key
///
/// Typed handle to one entity instance. Carries no ownership; the arena
/// owns the instance and resolves the key with a checked downcast.
///

pub struct Key<E> {
    slot: Slot,
    _marker: PhantomData<fn() -> E>,
}

impl<E> Key<E> {
    #[must_use]
    pub const fn from_slot(slot: Slot) -> Self {
        Self {
            slot,
            _marker: PhantomData,
        }
    }

    #[must_use]
    pub const fn slot(self) -> Slot {
        self.slot
    }
}

// Manual impls keep the marker parameter free of trait bounds.

impl<E> Clone for Key<E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E> Copy for Key<E> {}

impl<E> PartialEq for Key<E> {
    fn eq(&self, other: &Self) -> bool {
        self.slot == other.slot
    }
}

impl<E> Eq for Key<E> {}

impl<E> PartialOrd for Key<E> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<E> Ord for Key<E> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.slot.cmp(&other.slot)
    }
}

impl<E> Hash for Key<E> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.slot.hash(state);
    }
}

impl<E> fmt::Debug for Key<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = std::any::type_name::<E>();
        let short = name.rsplit("::").next().unwrap_or(name);
        write!(f, "Key<{short}>({})", self.slot)
    }
}

impl<E> fmt::Display for Key<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.slot, f)
    }
}

impl<E> From<Key<E>> for Slot {
    fn from(key: Key<E>) -> Self {
        key.slot
    }
}

impl<E> Serialize for Key<E> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.slot.serialize(serializer)
    }
}

impl<'de, E> Deserialize<'de> for Key<E> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Slot::deserialize(deserializer).map(Self::from_slot)
    }
}

///
/// TESTS
///
