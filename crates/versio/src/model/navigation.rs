//! Navigation metadata index.
//!
//! Invariants:
//! - Built once from a closed set of entity models; read-only afterwards.
//! - Every indexed entity has a forward and a backward table, possibly empty.
//! - Lookups for an entity outside the set fail; they never default to "no relations".

use crate::{
    error::{ErrorClass, ErrorOrigin, InternalError},
    model::{Cardinality, EntityModel},
    traits::Entity,
};
use sha2::{Digest, Sha256};
use std::{
    collections::{BTreeMap, BTreeSet, VecDeque},
    fmt,
};
use thiserror::Error as ThisError;

///
/// NavigationError
///

#[derive(Debug, Eq, PartialEq, ThisError)]
pub enum NavigationError {
    #[error("entity '{entity}' registered by two models: {first} and {second}")]
    DuplicateEntity {
        entity: &'static str,
        first: &'static str,
        second: &'static str,
    },

    #[error("entity '{entity}' declares relation field '{field}' more than once")]
    DuplicateField {
        entity: &'static str,
        field: &'static str,
    },

    #[error("entity '{entity}' has no relation field '{field}'")]
    UnknownField { entity: String, field: String },

    #[error("relation target outside the indexed set: {entity}.{field} -> {target}")]
    UnknownTarget {
        entity: &'static str,
        field: &'static str,
        target: &'static str,
    },

    #[error("entity '{0}' has no navigation metadata")]
    Unindexed(String),
}

impl NavigationError {
    pub(crate) const fn class(&self) -> ErrorClass {
        match self {
            Self::DuplicateEntity { .. }
            | Self::DuplicateField { .. }
            | Self::UnknownTarget { .. } => ErrorClass::InvariantViolation,
            Self::UnknownField { .. } | Self::Unindexed(_) => ErrorClass::Internal,
        }
    }
}

impl From<NavigationError> for InternalError {
    fn from(err: NavigationError) -> Self {
        Self::new(err.class(), ErrorOrigin::Model, err.to_string())
    }
}

///
/// Navigation
/// One forward edge: `field` on the owning entity references `target`.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Navigation {
    pub field: &'static str,
    pub target: &'static str,
    pub cardinality: Cardinality,
}

///
/// Referrer
/// One backward edge: `source.field` references the indexed entity.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Referrer {
    pub source: &'static str,
    pub field: &'static str,
    pub cardinality: Cardinality,
}

///
/// IndexFingerprint
/// SHA-256 over the canonical forward table.
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct IndexFingerprint([u8; 32]);

impl IndexFingerprint {
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for IndexFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

///
/// NavigationIndexBuilder
///
/// Collects the closed set of entity models. Registration is idempotent for
/// the same model; conflicting models under one name are reported by `build`.
///

#[derive(Default)]
pub struct NavigationIndexBuilder {
    models: BTreeMap<&'static str, &'static EntityModel>,
    errors: Vec<NavigationError>,
}

impl NavigationIndexBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `E` and every entity reachable from it through relations.
    #[must_use]
    pub fn root<E: Entity>(self) -> Self {
        self.root_model(E::MODEL)
    }

    /// Register one model and its reachable closure.
    #[must_use]
    pub fn root_model(mut self, model: &'static EntityModel) -> Self {
        let mut queue = VecDeque::from([model]);

        while let Some(next) = queue.pop_front() {
            if !self.insert(next) {
                continue;
            }
            for relation in next.relations {
                queue.push_back((relation.target_model)());
            }
        }

        self
    }

    /// Register exactly one model; its relation targets must be registered too.
    #[must_use]
    pub fn model(mut self, model: &'static EntityModel) -> Self {
        self.insert(model);
        self
    }

    // Returns true when the model was newly added.
    fn insert(&mut self, model: &'static EntityModel) -> bool {
        match self.models.get(model.entity_name) {
            None => {
                self.models.insert(model.entity_name, model);
                true
            }
            Some(existing) if std::ptr::eq(*existing, model) || existing.path == model.path => {
                false
            }
            Some(existing) => {
                self.errors.push(NavigationError::DuplicateEntity {
                    entity: model.entity_name,
                    first: existing.path,
                    second: model.path,
                });
                false
            }
        }
    }

    /// Validate the closed set and freeze it into an index.
    pub fn build(mut self) -> Result<NavigationIndex, NavigationError> {
        if !self.errors.is_empty() {
            return Err(self.errors.remove(0));
        }

        let mut forward = BTreeMap::new();
        let mut backward: BTreeMap<&'static str, Vec<Referrer>> = self
            .models
            .keys()
            .map(|name| (*name, Vec::new()))
            .collect();

        for (&name, model) in &self.models {
            let mut seen = BTreeSet::new();
            let mut navigations = Vec::with_capacity(model.relations.len());

            for relation in model.relations {
                if !seen.insert(relation.field) {
                    return Err(NavigationError::DuplicateField {
                        entity: name,
                        field: relation.field,
                    });
                }

                let Some(referrers) = backward.get_mut(relation.target) else {
                    return Err(NavigationError::UnknownTarget {
                        entity: name,
                        field: relation.field,
                        target: relation.target,
                    });
                };

                referrers.push(Referrer {
                    source: name,
                    field: relation.field,
                    cardinality: relation.cardinality,
                });
                navigations.push(Navigation {
                    field: relation.field,
                    target: relation.target,
                    cardinality: relation.cardinality,
                });
            }

            forward.insert(name, navigations);
        }

        let paths = self
            .models
            .iter()
            .map(|(name, model)| (*name, model.path))
            .collect();
        let fingerprint = fingerprint(&forward);

        tracing::info!(
            entities = forward.len(),
            fingerprint = %fingerprint,
            "navigation index built"
        );

        Ok(NavigationIndex {
            forward,
            backward,
            paths,
            fingerprint,
        })
    }
}

// Hash the forward table in its canonical (name-sorted, declaration-ordered) form.
fn fingerprint(forward: &BTreeMap<&'static str, Vec<Navigation>>) -> IndexFingerprint {
    let mut hasher = Sha256::new();

    for (name, navigations) in forward {
        hasher.update(name.as_bytes());
        hasher.update(b"\n");
        for navigation in navigations {
            hasher.update(navigation.field.as_bytes());
            hasher.update(b"\0");
            hasher.update(navigation.target.as_bytes());
            hasher.update(b"\0");
            hasher.update(navigation.cardinality.to_string().as_bytes());
            hasher.update(b"\n");
        }
    }

    IndexFingerprint(hasher.finalize().into())
}

///
/// NavigationIndex
///
/// Process-wide, read-only table of every entity's reference-valued fields,
/// plus the precomputed reverse table. Share it as `Arc<NavigationIndex>`.
///

#[derive(Debug)]
pub struct NavigationIndex {
    forward: BTreeMap<&'static str, Vec<Navigation>>,
    backward: BTreeMap<&'static str, Vec<Referrer>>,
    paths: BTreeMap<&'static str, &'static str>,
    fingerprint: IndexFingerprint,
}

impl NavigationIndex {
    #[must_use]
    pub fn builder() -> NavigationIndexBuilder {
        NavigationIndexBuilder::new()
    }

    /// Forward navigations of one entity. Fails for entities outside the set.
    pub fn index_for(&self, entity_name: &str) -> Result<&[Navigation], NavigationError> {
        self.try_index_for(entity_name)
            .ok_or_else(|| NavigationError::Unindexed(entity_name.to_string()))
    }

    /// Capability probe: `None` when the entity is not indexed.
    #[must_use]
    pub fn try_index_for(&self, entity_name: &str) -> Option<&[Navigation]> {
        self.forward.get(entity_name).map(Vec::as_slice)
    }

    /// Typed form of [`Self::index_for`].
    pub fn navigations<E: Entity>(&self) -> Result<&[Navigation], NavigationError> {
        self.index_for(E::ENTITY_NAME)
    }

    /// Look up one forward navigation by field name.
    pub fn navigation(&self, entity_name: &str, field: &str) -> Result<Navigation, NavigationError> {
        self.index_for(entity_name)?
            .iter()
            .find(|navigation| navigation.field == field)
            .copied()
            .ok_or_else(|| NavigationError::UnknownField {
                entity: entity_name.to_string(),
                field: field.to_string(),
            })
    }

    /// Every `(source, field)` pair that references `entity_name`.
    pub fn referrers_of(&self, entity_name: &str) -> Result<&[Referrer], NavigationError> {
        self.backward
            .get(entity_name)
            .map(Vec::as_slice)
            .ok_or_else(|| NavigationError::Unindexed(entity_name.to_string()))
    }

    #[must_use]
    pub fn contains(&self, entity_name: &str) -> bool {
        self.forward.contains_key(entity_name)
    }

    #[must_use]
    pub fn path_of(&self, entity_name: &str) -> Option<&'static str> {
        self.paths.get(entity_name).copied()
    }

    /// Indexed entity names in canonical order.
    pub fn entity_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.forward.keys().copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.forward.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    #[must_use]
    pub const fn fingerprint(&self) -> IndexFingerprint {
        self.fingerprint
    }
}

///
/// TESTS
///
