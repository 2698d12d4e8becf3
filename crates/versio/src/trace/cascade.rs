//! Cascade discovery over the clone trace cache.
//!
//! Each round expands the frontier in two phases:
//! - forward: relations held by frontier instances that resolve to a pending record
//! - backward: pending records of referring types whose clone points at the frontier
//!
//! A record matches by its clone or by its original, so the walk works both
//! before and after clones have been rewired onto each other.

use crate::{
    arena::{EntityGraph, Slot},
    obs::sink::{self, MetricsEvent},
    trace::{CloneTrace, CloneTraceCache, TraceError},
};
use std::collections::{BTreeMap, BTreeSet};

impl CloneTraceCache {
    /// Every unprocessed clone transitively connected to `roots`, in discovery
    /// order. Roots themselves are never part of the result.
    pub fn cascade_from<G>(&self, graph: &G, roots: &[Slot]) -> Result<Vec<Slot>, TraceError>
    where
        G: EntityGraph + ?Sized,
    {
        let mut seen = BTreeSet::new();
        let mut frontier = Vec::with_capacity(roots.len());
        for &root in roots {
            graph
                .entity_name(root)
                .ok_or(TraceError::UnknownEntity(root))?;
            if seen.insert(root) {
                frontier.push(root);
            }
        }

        let cap = self.cascade_round_cap();
        let mut found = Vec::new();
        let mut rounds = 0;

        while !frontier.is_empty() {
            if rounds == cap {
                return Err(TraceError::CascadeRoundCap { cap });
            }
            rounds += 1;

            let discovered = self.expand(graph, &frontier, &mut seen)?;
            tracing::trace!(
                round = rounds,
                frontier = frontier.len(),
                discovered = discovered.len(),
                "cascade round"
            );

            found.extend_from_slice(&discovered);
            frontier = discovered;
        }

        tracing::debug!(
            roots = roots.len(),
            found = found.len(),
            rounds,
            "cascade complete"
        );
        sink::record(MetricsEvent::Cascade {
            roots: roots.len() as u64,
            found: found.len() as u64,
            rounds: rounds as u64,
        });

        Ok(found)
    }

    /// Round limit for `cascade_from`. Without a configured cap every round
    /// but the last must surface a pending record, so `pending + 1` suffices.
    #[must_use]
    pub fn cascade_round_cap(&self) -> usize {
        self.config().cascade_round_cap.map_or_else(
            || self.pending_count() + 1,
            |cap| usize::try_from(cap).unwrap_or(usize::MAX),
        )
    }

    fn expand<G>(
        &self,
        graph: &G,
        frontier: &[Slot],
        seen: &mut BTreeSet<Slot>,
    ) -> Result<Vec<Slot>, TraceError>
    where
        G: EntityGraph + ?Sized,
    {
        let mut groups: BTreeMap<&'static str, Vec<Slot>> = BTreeMap::new();
        for &slot in frontier {
            let entity = graph
                .entity_name(slot)
                .ok_or(TraceError::UnknownEntity(slot))?;
            groups.entry(entity).or_default().push(slot);
        }

        let mut discovered = Vec::new();

        for (&entity, members) in &groups {
            // forward
            for navigation in self.index().index_for(entity)? {
                for &member in members {
                    for target in held(graph, entity, member, navigation.field)? {
                        let Some(trace) = self.pending_trace(target, navigation.target) else {
                            continue;
                        };
                        if seen.insert(trace.clone) {
                            discovered.push(trace.clone);
                        }
                    }
                }
            }

            // backward
            let identities = members
                .iter()
                .flat_map(|&member| self.identities(member))
                .collect::<BTreeSet<_>>();

            for referrer in self.index().referrers_of(entity)? {
                for trace in self.traces_for_entity(referrer.source) {
                    if trace.processed || seen.contains(&trace.clone) {
                        continue;
                    }

                    let targets = held(graph, referrer.source, trace.clone, referrer.field)?;
                    if targets.iter().any(|target| identities.contains(target)) {
                        seen.insert(trace.clone);
                        discovered.push(trace.clone);
                    }
                }
            }
        }

        Ok(discovered)
    }

    // Slots that stand for the same logical instance: itself, plus its
    // original when it is a traced clone.
    fn identities(&self, slot: Slot) -> impl Iterator<Item = Slot> {
        let original = self.trace_of_clone(slot).map(|trace| trace.original);

        std::iter::once(slot).chain(original)
    }

    // Unprocessed record of `entity` whose clone or original is `slot`.
    fn pending_trace(&self, slot: Slot, entity: &str) -> Option<&CloneTrace> {
        self.trace_of_clone(slot)
            .or_else(|| self.trace_of_original(slot))
            .filter(|trace| trace.entity == entity && !trace.processed)
    }
}

fn held<G>(
    graph: &G,
    entity: &'static str,
    slot: Slot,
    field: &'static str,
) -> Result<Vec<Slot>, TraceError>
where
    G: EntityGraph + ?Sized,
{
    match graph.relation_targets(slot, field) {
        Some(targets) => Ok(targets),
        None if graph.entity_name(slot).is_none() => Err(TraceError::UnknownEntity(slot)),
        None => Err(TraceError::FieldMissing {
            entity,
            field,
            slot,
        }),
    }
}

///
/// TESTS
///
