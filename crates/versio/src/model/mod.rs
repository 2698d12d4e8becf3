//! Runtime relation metadata.
//!
//! Types in `model` are the runtime projection of every entity's
//! reference-valued fields. The `entity!` macro defines *what exists*;
//! the navigation index built here is what the trace cache walks.
mod entity;
mod navigation;
mod relation;

pub use entity::EntityModel;
pub use navigation::{
    IndexFingerprint, Navigation, NavigationError, NavigationIndex, NavigationIndexBuilder,
    Referrer,
};
pub use relation::{Cardinality, RelationModel};
