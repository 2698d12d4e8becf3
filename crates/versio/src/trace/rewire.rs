//! Pointing clones at each other.
//!
//! A freshly duplicated or translated clone still holds the relations of its
//! original. Rewiring replaces every held slot that is the original of a
//! record with that record's clone.

use crate::{
    arena::{EntityGraphMut, Slot},
    trace::{CloneTraceCache, TraceError},
};
use std::collections::BTreeMap;

impl CloneTraceCache {
    /// Rewire every clone in the cache. Returns the number of rewritten
    /// references.
    pub fn rewire<G>(&self, graph: &mut G) -> Result<usize, TraceError>
    where
        G: EntityGraphMut + ?Sized,
    {
        self.rewire_since(graph, 0)
    }

    /// Rewire clones registered at or after `checkpoint`. Targets resolve
    /// against every record, so new clones also pick up clones made earlier
    /// in the operation.
    pub(crate) fn rewire_since<G>(&self, graph: &mut G, checkpoint: u64) -> Result<usize, TraceError>
    where
        G: EntityGraphMut + ?Sized,
    {
        let remap = self
            .traces()
            .map(|trace| (trace.original, trace.clone))
            .collect::<BTreeMap<Slot, Slot>>();
        let clones = self
            .traces()
            .filter(|trace| trace.sequence >= checkpoint)
            .map(|trace| trace.clone)
            .collect::<Vec<_>>();

        let mut references = 0usize;
        for &clone in &clones {
            let present = graph.remap_relations(clone, &mut |slot| {
                remap.get(&slot).map_or(slot, |&target| {
                    references += 1;
                    target
                })
            });
            if !present {
                return Err(TraceError::UnknownEntity(clone));
            }
        }

        tracing::debug!(clones = clones.len(), references, "clones rewired");

        Ok(references)
    }
}

///
/// TESTS
///
