//! One logical versioning operation.
//!
//! An `Operation` owns a fresh clone trace cache for its whole lifetime and
//! borrows the persistence context's arena. Dropping or finishing it discards
//! the cache.

use crate::{
    arena::{EntityArena, EntityGraph, Key, Slot},
    config::VersioConfig,
    error::InternalError,
    model::NavigationIndex,
    obs::sink::{self, MetricsEvent},
    trace::{CloneTraceCache, TraceError},
    traits::Entity,
    translate::{TranslateContext, TranslatorRegistry, VersionMode},
};
use std::{
    collections::{BTreeSet, VecDeque},
    sync::Arc,
};

///
/// ClonePolicy
///
/// Which navigations `clone_subgraph` follows from the root.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub enum ClonePolicy {
    /// Follow every forward navigation.
    #[default]
    All,

    /// Follow only the listed `(entity, field)` navigations.
    Only(Vec<(&'static str, &'static str)>),
}

impl ClonePolicy {
    #[must_use]
    pub fn follows(&self, entity: &str, field: &str) -> bool {
        match self {
            Self::All => true,
            Self::Only(pairs) => pairs.iter().any(|&(e, f)| e == entity && f == field),
        }
    }
}

///
/// Operation
///

pub struct Operation<'a> {
    arena: &'a mut EntityArena,
    cache: CloneTraceCache,
    registry: Arc<TranslatorRegistry>,
    config: VersioConfig,
    roots: Vec<Slot>,
}

impl<'a> Operation<'a> {
    pub fn new(
        arena: &'a mut EntityArena,
        index: Arc<NavigationIndex>,
        registry: Arc<TranslatorRegistry>,
        config: VersioConfig,
    ) -> Self {
        let cache = CloneTraceCache::with_config(index, config.trace.clone());

        Self {
            arena,
            cache,
            registry,
            config,
            roots: Vec::new(),
        }
    }

    #[must_use]
    pub fn arena(&self) -> &EntityArena {
        self.arena
    }

    #[must_use]
    pub const fn cache(&self) -> &CloneTraceCache {
        &self.cache
    }

    /// Slots the pending cascade is computed from.
    #[must_use]
    pub fn roots(&self) -> &[Slot] {
        &self.roots
    }

    pub fn add_root(&mut self, root: impl Into<Slot>) {
        let root = root.into();
        if !self.roots.contains(&root) {
            self.roots.push(root);
        }
    }

    pub fn mark_processed(&mut self, clone: impl Into<Slot>) -> bool {
        self.cache.mark_processed(clone)
    }

    ///
    /// CLONING
    ///

    /// Structurally copy every entity reachable forward from `root` under
    /// `policy`, recording each `(original, clone)` pair. Originals already
    /// cloned in this operation are reused. The root's clone becomes an
    /// operation root.
    pub fn clone_subgraph<E: Entity>(
        &mut self,
        root: Key<E>,
        policy: &ClonePolicy,
    ) -> Result<Key<E>, InternalError> {
        let mut queue = VecDeque::from([root.slot()]);
        let mut visited = BTreeSet::new();
        let mut cloned = 0usize;

        while let Some(original) = queue.pop_front() {
            if !visited.insert(original) || self.cache.trace_of_clone(original).is_some() {
                continue;
            }

            let entity = self
                .arena
                .entity_name(original)
                .ok_or(TraceError::UnknownEntity(original))?;
            let navigations = self.cache.index().index_for(entity)?.to_vec();

            if self.cache.trace_of_original(original).is_none() {
                let clone = self.arena.duplicate(original)?;
                self.cache.record_slots(entity, original, clone)?;
                cloned += 1;
            }

            for navigation in navigations
                .iter()
                .filter(|navigation| policy.follows(entity, navigation.field))
            {
                let targets = self
                    .arena
                    .relation_targets(original, navigation.field)
                    .ok_or(TraceError::FieldMissing {
                        entity,
                        field: navigation.field,
                        slot: original,
                    })?;
                queue.extend(targets);
            }
        }

        let clone = self.cache.clone_of(root).unwrap_or(root);
        self.add_root(clone);
        tracing::debug!(
            entity = E::ENTITY_NAME,
            root = %root.slot(),
            clone = %clone.slot(),
            cloned,
            "subgraph cloned"
        );

        Ok(clone)
    }

    /// Point every relation held by a clone at the clone of its target,
    /// where the target was cloned in this operation. Returns the number of
    /// rewritten references.
    pub fn rewire(&mut self) -> Result<usize, InternalError> {
        let references = self.cache.rewire(&mut *self.arena)?;
        sink::record(MetricsEvent::Rewire {
            clones: self.cache.len() as u64,
            references: references as u64,
        });

        Ok(references)
    }

    ///
    /// TRANSLATION
    ///

    fn context(&mut self, mode: VersionMode) -> TranslateContext<'_> {
        TranslateContext::new(
            self.arena,
            &mut self.cache,
            &self.registry,
            &self.config.translate,
            mode,
        )
    }

    pub fn to_view<E, V>(&mut self, key: Key<E>) -> Result<V, InternalError>
    where
        E: Entity,
        V: 'static,
    {
        Ok(self.context(VersionMode::Update).view_of(key)?)
    }

    /// Write a view back. The written key becomes an operation root.
    /// A failed write leaves the arena and the cache as they were.
    pub fn to_entity<E, V>(&mut self, view: &V, mode: VersionMode) -> Result<Key<E>, InternalError>
    where
        E: Entity,
        V: 'static,
    {
        let key = self.context(mode).entity_of(view)?;
        self.add_root(key);

        Ok(key)
    }

    ///
    /// COMPLETION
    ///

    /// Unprocessed clones connected to the operation roots.
    pub fn cascade(&self) -> Result<Vec<Slot>, InternalError> {
        Ok(self.cache.cascade_from(&*self.arena, &self.roots)?)
    }

    /// End the operation and return the clones that still need to be
    /// persisted alongside the roots.
    pub fn finish(self) -> Result<Vec<Slot>, InternalError> {
        let pending = self.cascade()?;
        tracing::info!(
            roots = self.roots.len(),
            traced = self.cache.len(),
            pending = pending.len(),
            "versioning operation finished"
        );

        Ok(pending)
    }
}

///
/// TESTS
///
