//! Clone tracing for one logical versioning operation.
//!
//! Invariants:
//! - `original` and `clone` of one record are distinct slots.
//! - An original appears in at most one record per cache lifetime, pruned
//!   records included. A second registration is rejected, never merged.
//! - A slot is the clone of at most one record, and a clone is never the
//!   original of another record.
//! - The cache is never shared between operations.

mod cache;
mod cascade;
mod rewire;

pub use cache::CloneTraceCache;

use crate::{
    arena::{Key, Slot},
    error::{ErrorClass, ErrorOrigin, InternalError},
    model::NavigationError,
};
use thiserror::Error as ThisError;

///
/// TraceError
///

#[derive(Debug, Eq, PartialEq, ThisError)]
pub enum TraceError {
    #[error("cascade exceeded {cap} rounds without reaching a fixpoint")]
    CascadeRoundCap { cap: usize },

    #[error("{entity} {clone} is the clone of {original} in this operation; it cannot be versioned again")]
    ChainedClone {
        entity: &'static str,
        clone: Slot,
        original: Slot,
    },

    #[error("slot {clone} is already traced; it cannot become the clone of {entity} {original}")]
    CloneAlreadyTraced {
        entity: &'static str,
        original: Slot,
        clone: Slot,
    },

    #[error("{entity} {original} was already cloned to {existing} in this operation")]
    DuplicateOriginal {
        entity: &'static str,
        original: Slot,
        existing: Slot,
    },

    #[error("{entity} at {slot} does not expose relation field '{field}'")]
    FieldMissing {
        entity: &'static str,
        field: &'static str,
        slot: Slot,
    },

    #[error(transparent)]
    Navigation(#[from] NavigationError),

    #[error("{entity} {slot} cannot be recorded as its own clone")]
    SameInstance { entity: &'static str, slot: Slot },

    #[error("no entity stored at slot {0}")]
    UnknownEntity(Slot),
}

impl TraceError {
    pub(crate) const fn class(&self) -> ErrorClass {
        match self {
            Self::ChainedClone { .. }
            | Self::CloneAlreadyTraced { .. }
            | Self::DuplicateOriginal { .. } => ErrorClass::Conflict,
            Self::CascadeRoundCap { .. }
            | Self::FieldMissing { .. }
            | Self::SameInstance { .. } => ErrorClass::InvariantViolation,
            Self::Navigation(err) => err.class(),
            Self::UnknownEntity(_) => ErrorClass::NotFound,
        }
    }
}

impl From<TraceError> for InternalError {
    fn from(err: TraceError) -> Self {
        match err.class() {
            ErrorClass::InvariantViolation => Self::trace_invariant(err.to_string()),
            class => Self::new(class, ErrorOrigin::Trace, err.to_string()),
        }
    }
}

///
/// CloneTrace
///
/// One clone event. `sequence` is the registration order across the whole
/// cache, so callers relying on first-wins semantics can replay it.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct CloneTrace {
    pub entity: &'static str,
    pub original: Slot,
    pub clone: Slot,
    pub processed: bool,
    pub must_be_kept: bool,
    pub sequence: u64,
}

///
/// TypedTrace
/// Typed projection of a `CloneTrace` for one entity type.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TypedTrace<E> {
    pub original: Key<E>,
    pub clone: Key<E>,
    pub processed: bool,
    pub must_be_kept: bool,
}

impl<E> From<&CloneTrace> for TypedTrace<E> {
    fn from(trace: &CloneTrace) -> Self {
        Self {
            original: Key::from_slot(trace.original),
            clone: Key::from_slot(trace.clone),
            processed: trace.processed,
            must_be_kept: trace.must_be_kept,
        }
    }
}
