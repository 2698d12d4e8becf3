use crate::{
    arena::{Key, Slot},
    config::TraceConfig,
    model::NavigationIndex,
    obs::sink::{self, MetricsEvent},
    trace::{CloneTrace, TraceError, TypedTrace},
    traits::Entity,
};
use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

// Position of one record inside the per-entity sequences.
#[derive(Clone, Copy, Debug)]
struct Location {
    entity: &'static str,
    position: usize,
}

///
/// CloneTraceCache
///
/// Original-to-clone correspondence for one logical operation.
/// Holds slots only; the entities themselves stay owned by the arena.
/// Not synchronized: create one per operation and drop it afterwards.
///

pub struct CloneTraceCache {
    index: Arc<NavigationIndex>,
    config: TraceConfig,
    traces: BTreeMap<&'static str, Vec<CloneTrace>>,
    by_original: HashMap<Slot, Location>,
    by_clone: HashMap<Slot, Location>,
    // originals of pruned records, mapped to the clone they had
    retired: HashMap<Slot, Slot>,
    next_sequence: u64,
}

impl CloneTraceCache {
    #[must_use]
    pub fn new(index: Arc<NavigationIndex>) -> Self {
        Self::with_config(index, TraceConfig::default())
    }

    #[must_use]
    pub fn with_config(index: Arc<NavigationIndex>, config: TraceConfig) -> Self {
        Self {
            index,
            config,
            traces: BTreeMap::new(),
            by_original: HashMap::new(),
            by_clone: HashMap::new(),
            retired: HashMap::new(),
            next_sequence: 0,
        }
    }

    #[must_use]
    pub fn index(&self) -> &Arc<NavigationIndex> {
        &self.index
    }

    #[must_use]
    pub const fn config(&self) -> &TraceConfig {
        &self.config
    }

    ///
    /// REGISTRATION
    ///

    /// Record that `clone` was created from `original`.
    ///
    /// Duplicate registrations are rejected and leave the cache unchanged.
    pub fn record_clone<E: Entity>(
        &mut self,
        original: Key<E>,
        clone: Key<E>,
    ) -> Result<(), TraceError> {
        self.record_slots(E::ENTITY_NAME, original.slot(), clone.slot())
    }

    pub(crate) fn record_slots(
        &mut self,
        entity: &'static str,
        original: Slot,
        clone: Slot,
    ) -> Result<(), TraceError> {
        if let Err(err) = self.check_registration(entity, original, clone) {
            tracing::warn!(entity, %original, %clone, error = %err, "clone registration rejected");
            sink::record(MetricsEvent::CloneRejected { entity });

            return Err(err);
        }

        let traces = self.traces.entry(entity).or_default();
        let location = Location {
            entity,
            position: traces.len(),
        };
        traces.push(CloneTrace {
            entity,
            original,
            clone,
            processed: false,
            must_be_kept: false,
            sequence: self.next_sequence,
        });
        self.next_sequence += 1;
        self.by_original.insert(original, location);
        self.by_clone.insert(clone, location);

        tracing::debug!(entity, %original, %clone, "clone recorded");
        sink::record(MetricsEvent::CloneRecorded { entity });

        Ok(())
    }

    /// Whether `original` may still be versioned in this operation: the type
    /// is indexed, it has no record (live or pruned), and it is not itself
    /// a clone.
    pub(crate) fn check_original(
        &self,
        entity: &'static str,
        original: Slot,
    ) -> Result<(), TraceError> {
        self.index.index_for(entity)?;

        let existing = self
            .by_original
            .get(&original)
            .map(|location| self.trace_at(*location).clone)
            .or_else(|| self.retired.get(&original).copied());
        if let Some(existing) = existing {
            return Err(TraceError::DuplicateOriginal {
                entity,
                original,
                existing,
            });
        }

        if let Some(trace) = self.trace_of_clone(original) {
            return Err(TraceError::ChainedClone {
                entity,
                clone: original,
                original: trace.original,
            });
        }

        Ok(())
    }

    fn check_registration(
        &self,
        entity: &'static str,
        original: Slot,
        clone: Slot,
    ) -> Result<(), TraceError> {
        if original == clone {
            self.index.index_for(entity)?;
            return Err(TraceError::SameInstance {
                entity,
                slot: original,
            });
        }

        self.check_original(entity, original)?;

        if self.by_clone.contains_key(&clone)
            || self.by_original.contains_key(&clone)
            || self.retired.contains_key(&clone)
        {
            return Err(TraceError::CloneAlreadyTraced {
                entity,
                original,
                clone,
            });
        }

        Ok(())
    }

    ///
    /// LOOKUP
    ///

    fn trace_at(&self, location: Location) -> &CloneTrace {
        &self.traces[location.entity][location.position]
    }

    fn trace_at_mut(&mut self, location: Location) -> Option<&mut CloneTrace> {
        self.traces
            .get_mut(location.entity)?
            .get_mut(location.position)
    }

    /// Typed records for `E`, in registration order.
    pub fn traces_for<E: Entity>(&self) -> impl Iterator<Item = TypedTrace<E>> + '_ {
        self.traces_for_entity(E::ENTITY_NAME)
            .iter()
            .map(TypedTrace::from)
    }

    /// Records for one entity name, in registration order. Empty when none.
    #[must_use]
    pub fn traces_for_entity(&self, entity: &str) -> &[CloneTrace] {
        self.traces.get(entity).map_or(&[], Vec::as_slice)
    }

    /// Every record across all entity types, in registration order.
    pub fn traces(&self) -> impl Iterator<Item = &CloneTrace> + '_ {
        let mut all = self.traces.values().flatten().collect::<Vec<_>>();
        all.sort_by_key(|trace| trace.sequence);

        all.into_iter()
    }

    /// Record whose clone is `clone`.
    #[must_use]
    pub fn trace_of_clone(&self, clone: impl Into<Slot>) -> Option<&CloneTrace> {
        self.by_clone
            .get(&clone.into())
            .map(|location| self.trace_at(*location))
    }

    /// Record whose original is `original`.
    #[must_use]
    pub fn trace_of_original(&self, original: impl Into<Slot>) -> Option<&CloneTrace> {
        self.by_original
            .get(&original.into())
            .map(|location| self.trace_at(*location))
    }

    #[must_use]
    pub fn clone_of<E: Entity>(&self, original: Key<E>) -> Option<Key<E>> {
        self.trace_of_original(original)
            .filter(|trace| trace.entity == E::ENTITY_NAME)
            .map(|trace| Key::from_slot(trace.clone))
    }

    #[must_use]
    pub fn original_of<E: Entity>(&self, clone: Key<E>) -> Option<Key<E>> {
        self.trace_of_clone(clone)
            .filter(|trace| trace.entity == E::ENTITY_NAME)
            .map(|trace| Key::from_slot(trace.original))
    }

    /// `Some(processed)` for traced clones, `None` otherwise.
    #[must_use]
    pub fn is_processed(&self, clone: impl Into<Slot>) -> Option<bool> {
        self.trace_of_clone(clone).map(|trace| trace.processed)
    }

    /// Clones not yet visited by a translator, in registration order.
    #[must_use]
    pub fn pending(&self) -> Vec<Slot> {
        self.traces()
            .filter(|trace| !trace.processed)
            .map(|trace| trace.clone)
            .collect()
    }

    pub(crate) fn pending_count(&self) -> usize {
        self.traces
            .values()
            .flatten()
            .filter(|trace| !trace.processed)
            .count()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_clone.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_clone.is_empty()
    }

    ///
    /// MARKING
    ///

    /// Flag the record whose clone is `clone` as visited by a translator.
    /// Returns whether a record matched; an untraced entity is not an error.
    pub fn mark_processed(&mut self, clone: impl Into<Slot>) -> bool {
        self.update_clone(clone.into(), |trace| trace.processed = true)
    }

    /// Flag the record whose clone is `clone` as surviving `prune`.
    pub fn mark_kept(&mut self, clone: impl Into<Slot>) -> bool {
        self.update_clone(clone.into(), |trace| trace.must_be_kept = true)
    }

    pub(crate) fn unmark_processed(&mut self, clone: Slot) -> bool {
        self.update_clone(clone, |trace| trace.processed = false)
    }

    fn update_clone(&mut self, clone: Slot, update: impl FnOnce(&mut CloneTrace)) -> bool {
        let Some(location) = self.by_clone.get(&clone).copied() else {
            return false;
        };

        match self.trace_at_mut(location) {
            Some(trace) => {
                update(trace);
                true
            }
            None => false,
        }
    }

    /// Drop processed records that are not marked `must_be_kept`.
    /// Pruned originals stay blocked from re-registration.
    pub fn prune(&mut self) -> usize {
        let mut removed = 0;

        for traces in self.traces.values_mut() {
            traces.retain(|trace| {
                let drop = trace.processed && !trace.must_be_kept;
                if drop {
                    self.retired.insert(trace.original, trace.clone);
                    removed += 1;
                }
                !drop
            });
        }
        self.traces.retain(|_, traces| !traces.is_empty());
        self.rebuild_lookups();

        tracing::debug!(removed, remaining = self.len(), "clone trace cache pruned");

        removed
    }

    ///
    /// CHECKPOINTS
    ///

    /// Sequence number the next record will get. Records at or after it
    /// can be discarded with `roll_back`.
    pub(crate) const fn checkpoint(&self) -> u64 {
        self.next_sequence
    }

    /// Discard every record registered at or after `checkpoint`.
    pub(crate) fn roll_back(&mut self, checkpoint: u64) -> usize {
        let before = self.len();

        for traces in self.traces.values_mut() {
            traces.retain(|trace| trace.sequence < checkpoint);
        }
        self.traces.retain(|_, traces| !traces.is_empty());
        self.rebuild_lookups();

        let removed = before - self.len();
        if removed > 0 {
            tracing::debug!(removed, remaining = self.len(), "clone records rolled back");
        }

        removed
    }

    fn rebuild_lookups(&mut self) {
        self.by_original.clear();
        self.by_clone.clear();

        for (&entity, traces) in &self.traces {
            for (position, trace) in traces.iter().enumerate() {
                let location = Location { entity, position };
                self.by_original.insert(trace.original, location);
                self.by_clone.insert(trace.clone, location);
            }
        }
    }
}

///
/// TESTS
///
