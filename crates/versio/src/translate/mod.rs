//! Entity <-> view model translation.
//!
//! Translators are looked up by `(entity, view)` type pair and always run
//! through a `TranslateContext`, which owns nesting depth, processed marking,
//! and the clone side effect of new-version writes.

mod context;
mod definition;
mod lookup;
mod path;
mod registry;

pub use context::{TranslateContext, VersionMode};
pub use definition::{ToEntity, ToView, Translation};
pub use lookup::{CodeTable, LookupError};
pub use path::{Issues, PathSegment, render_path};
pub use registry::TranslatorRegistry;

use crate::{
    arena::{ArenaError, Key},
    error::{ErrorClass, ErrorOrigin, InternalError},
    trace::TraceError,
    traits::Entity,
};
use derive_more::Display;
use std::any::type_name;
use thiserror::Error as ThisError;

///
/// Direction
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub enum Direction {
    #[display("to_view")]
    ToView,

    #[display("to_entity")]
    ToEntity,
}

///
/// Translator
///
/// Bidirectional mapping for one entity/view pair. Holds no per-call state.
/// A direction that is not overridden reports `Unsupported`, which aborts
/// the surrounding operation.
///
/// `to_entity` must store its result through `TranslateContext::persist`.
///

pub trait Translator: Send + Sync + 'static {
    type Entity: Entity;
    type View: 'static;

    fn to_view(
        &self,
        _key: Key<Self::Entity>,
        _entity: &Self::Entity,
        _ctx: &mut TranslateContext<'_>,
    ) -> Result<Self::View, TranslateError> {
        Err(TranslateError::unsupported::<Self::Entity, Self::View>(
            Direction::ToView,
        ))
    }

    fn to_entity(
        &self,
        _view: &Self::View,
        _ctx: &mut TranslateContext<'_>,
    ) -> Result<Key<Self::Entity>, TranslateError> {
        Err(TranslateError::unsupported::<Self::Entity, Self::View>(
            Direction::ToEntity,
        ))
    }
}

///
/// TranslateError
///

#[derive(Debug, Eq, PartialEq, ThisError)]
pub enum TranslateError {
    #[error("translator for {entity} <-> {view} already registered")]
    AlreadyRegistered {
        entity: &'static str,
        view: &'static str,
    },

    #[error(transparent)]
    Arena(#[from] ArenaError),

    #[error("translation nested deeper than {max_depth} levels")]
    DepthExceeded { max_depth: u32 },

    #[error("skipped: depends on failed field '{dependency}'")]
    DependencyFailed { dependency: &'static str },

    #[error("invalid value: {0}")]
    Invalid(String),

    #[error("{0}")]
    Issues(Issues),

    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error("no translator registered for {entity} <-> {view}")]
    NotRegistered {
        entity: &'static str,
        view: &'static str,
    },

    #[error(transparent)]
    Trace(#[from] TraceError),

    #[error("field '{field}' requires '{dependency}', which is not declared before it")]
    UnknownDependency {
        field: &'static str,
        dependency: &'static str,
    },

    #[error("{direction} is not supported for {entity} <-> {view}")]
    Unsupported {
        direction: Direction,
        entity: &'static str,
        view: &'static str,
    },
}

impl TranslateError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid(message.into())
    }

    #[must_use]
    pub fn unsupported<E: Entity, V>(direction: Direction) -> Self {
        Self::Unsupported {
            direction,
            entity: E::ENTITY_NAME,
            view: type_name::<V>(),
        }
    }

    /// Fatal errors abort the whole translation; the rest are collected per
    /// field and reported together.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Self::DependencyFailed { .. } | Self::Invalid(_) | Self::Issues(_) | Self::Lookup(_)
        )
    }

    pub(crate) const fn class(&self) -> ErrorClass {
        match self {
            Self::AlreadyRegistered { .. }
            | Self::DepthExceeded { .. }
            | Self::UnknownDependency { .. } => ErrorClass::InvariantViolation,
            Self::Arena(err) => err.class(),
            Self::DependencyFailed { .. } | Self::Invalid(_) | Self::Issues(_) => {
                ErrorClass::Validation
            }
            Self::Lookup(err) => err.class(),
            Self::NotRegistered { .. } => ErrorClass::NotFound,
            Self::Trace(err) => err.class(),
            Self::Unsupported { .. } => ErrorClass::Unsupported,
        }
    }
}

impl From<TranslateError> for InternalError {
    fn from(err: TranslateError) -> Self {
        match err {
            TranslateError::Arena(err) => err.into(),
            TranslateError::Trace(err) => err.into(),
            TranslateError::Unsupported { .. } => Self::translate_unsupported(err.to_string()),
            err => Self::new(err.class(), ErrorOrigin::Translate, err.to_string()),
        }
    }
}

///
/// TESTS
///
