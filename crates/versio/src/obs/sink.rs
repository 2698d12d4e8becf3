//! Metrics sink boundary.
//!
//! Tracing and translation code MUST NOT touch `obs::metrics` directly.
//! All instrumentation flows through `MetricsEvent` and `MetricsSink`.

use crate::{error::ErrorClass, obs::metrics, translate::Direction};
use std::{cell::RefCell, rc::Rc};

thread_local! {
    static SINK_OVERRIDE: RefCell<Option<Rc<dyn MetricsSink>>> = RefCell::new(None);
}

///
/// MetricsEvent
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MetricsEvent {
    CloneRecorded {
        entity: &'static str,
    },
    CloneRejected {
        entity: &'static str,
    },
    Translate {
        direction: Direction,
        entity: &'static str,
    },
    TranslateFailed {
        direction: Direction,
        entity: &'static str,
        class: ErrorClass,
    },
    Cascade {
        roots: u64,
        found: u64,
        rounds: u64,
    },
    Rewire {
        clones: u64,
        references: u64,
    },
}

///
/// MetricsSink
///

pub trait MetricsSink {
    fn record(&self, event: MetricsEvent);
}

///
/// GlobalMetricsSink
/// Default thread-local sink; used when no scoped override is installed.
///

pub(crate) struct GlobalMetricsSink;

impl MetricsSink for GlobalMetricsSink {
    fn record(&self, event: MetricsEvent) {
        match event {
            MetricsEvent::CloneRecorded { entity } => metrics::with_state_mut(|m| {
                m.ops.clones_recorded = m.ops.clones_recorded.saturating_add(1);
                let entry = m.entities.entry(entity.to_string()).or_default();
                entry.clones_recorded = entry.clones_recorded.saturating_add(1);
            }),

            MetricsEvent::CloneRejected { entity } => metrics::with_state_mut(|m| {
                m.ops.clones_rejected = m.ops.clones_rejected.saturating_add(1);
                let entry = m.entities.entry(entity.to_string()).or_default();
                entry.clones_rejected = entry.clones_rejected.saturating_add(1);
            }),

            MetricsEvent::Translate { direction, entity } => metrics::with_state_mut(|m| {
                let entry = m.entities.entry(entity.to_string()).or_default();
                match direction {
                    Direction::ToView => {
                        m.ops.translations_to_view = m.ops.translations_to_view.saturating_add(1);
                        entry.translations_to_view = entry.translations_to_view.saturating_add(1);
                    }
                    Direction::ToEntity => {
                        m.ops.translations_to_entity =
                            m.ops.translations_to_entity.saturating_add(1);
                        entry.translations_to_entity =
                            entry.translations_to_entity.saturating_add(1);
                    }
                }
            }),

            MetricsEvent::TranslateFailed { entity, .. } => metrics::with_state_mut(|m| {
                m.ops.translation_failures = m.ops.translation_failures.saturating_add(1);
                let entry = m.entities.entry(entity.to_string()).or_default();
                entry.translation_failures = entry.translation_failures.saturating_add(1);
            }),

            MetricsEvent::Cascade {
                found, rounds, ..
            } => metrics::with_state_mut(|m| {
                m.ops.cascades = m.ops.cascades.saturating_add(1);
                m.ops.cascade_found = m.ops.cascade_found.saturating_add(found);
                m.ops.cascade_rounds_max = m.ops.cascade_rounds_max.max(rounds);
            }),

            MetricsEvent::Rewire { references, .. } => metrics::with_state_mut(|m| {
                m.ops.rewires = m.ops.rewires.saturating_add(1);
                m.ops.rewired_references = m.ops.rewired_references.saturating_add(references);
            }),
        }
    }
}

pub(crate) fn record(event: MetricsEvent) {
    let override_sink = SINK_OVERRIDE.with(|cell| cell.borrow().clone());

    match override_sink {
        Some(sink) => sink.record(event),
        None => GlobalMetricsSink.record(event),
    }
}

/// Snapshot the current thread's metrics.
#[must_use]
pub fn metrics_report() -> metrics::EventReport {
    metrics::report()
}

/// Reset all metrics state.
pub fn metrics_reset_all() {
    metrics::reset_all();
}

/// Run a closure with a temporary metrics sink override.
/// The previous sink is restored on every exit, including unwinding.
pub fn with_metrics_sink<T>(sink: Rc<dyn MetricsSink>, f: impl FnOnce() -> T) -> T {
    struct Guard(Option<Rc<dyn MetricsSink>>);

    impl Drop for Guard {
        fn drop(&mut self) {
            let previous = self.0.take();
            SINK_OVERRIDE.with(|cell| {
                *cell.borrow_mut() = previous;
            });
        }
    }

    let previous = SINK_OVERRIDE.with(|cell| cell.borrow_mut().replace(sink));
    let _guard = Guard(previous);

    f()
}

///
/// TESTS
///
