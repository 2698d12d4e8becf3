use crate::model::EntityModel;
use derive_more::Display;
use serde::{Deserialize, Serialize};

///
/// Cardinality
///

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Cardinality {
    One,
    Opt,
    Many,
    /// Map keyed by language or category.
    Keyed,
}

///
/// RelationModel
///
/// One reference-valued field: its name, the referenced entity, and an
/// accessor for the referenced model so reachable types can be collected
/// without a global type table.
///

#[derive(Debug)]
pub struct RelationModel {
    pub field: &'static str,
    pub target: &'static str,
    pub target_model: fn() -> &'static EntityModel,
    pub cardinality: Cardinality,
}

impl RelationModel {
    #[must_use]
    pub const fn new(
        field: &'static str,
        target: &'static str,
        target_model: fn() -> &'static EntityModel,
        cardinality: Cardinality,
    ) -> Self {
        Self {
            field,
            target,
            target_model,
            cardinality,
        }
    }
}
