//! Versio core: clone-aware translation between versioned registry entities
//! and their view models.
//!
//! The crate is built from four layers, leaves first:
//! - `model` holds the static relation metadata and the navigation index
//! - `translate` maps entities to view models and back through registered translators
//! - `trace` records which clone belongs to which original within one operation
//! - `versioning` ties the above into a single-operation scope
#![warn(unreachable_pub)]

#[macro_use]
mod macros;

// public exports are one module level down
pub mod arena;
pub mod config;
pub mod error;
pub mod model;
pub mod obs;
pub mod trace;
pub mod traits;
pub mod translate;
pub mod versioning;

// test
#[cfg(test)]
pub(crate) mod test_support;

///
/// CONSTANTS
///

/// Default nesting limit for recursive translator calls.
pub const DEFAULT_MAX_TRANSLATE_DEPTH: u32 = 64;

///
/// Prelude
///
/// Prelude contains only domain vocabulary.
/// No errors, stores, or helpers are re-exported here.
///

pub mod prelude {
    pub use crate::{
        arena::{EntityArena, Key, Slot},
        model::{EntityModel, NavigationIndex},
        trace::CloneTraceCache,
        traits::{Entity, EntityIdentity, Path},
        translate::{TranslateContext, Translator, TranslatorRegistry, VersionMode},
        versioning::{ClonePolicy, Operation},
    };
}
