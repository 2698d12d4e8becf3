use serde::{Deserialize, Serialize};
use std::{cell::RefCell, collections::BTreeMap};

///
/// EventState
/// Ephemeral, in-memory counters for translation and clone tracing.
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub(crate) struct EventState {
    pub(crate) ops: EventOps,
    pub(crate) entities: BTreeMap<String, EntityCounters>,
}

///
/// EventOps
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct EventOps {
    // Clone tracing
    pub clones_recorded: u64,
    pub clones_rejected: u64,

    // Translation
    pub translations_to_view: u64,
    pub translations_to_entity: u64,
    pub translation_failures: u64,

    // Cascade discovery
    pub cascades: u64,
    pub cascade_found: u64,
    pub cascade_rounds_max: u64,

    // Rewiring
    pub rewires: u64,
    pub rewired_references: u64,
}

///
/// EntityCounters
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct EntityCounters {
    pub clones_recorded: u64,
    pub clones_rejected: u64,
    pub translations_to_view: u64,
    pub translations_to_entity: u64,
    pub translation_failures: u64,
}

///
/// EventReport
/// Point-in-time snapshot of all counters.
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct EventReport {
    pub ops: EventOps,
    pub entities: BTreeMap<String, EntityCounters>,
}

thread_local! {
    static EVENT_STATE: RefCell<EventState> = RefCell::new(EventState::default());
}

/// Borrow metrics immutably.
pub(crate) fn with_state<R>(f: impl FnOnce(&EventState) -> R) -> R {
    EVENT_STATE.with(|m| f(&m.borrow()))
}

/// Borrow metrics mutably.
pub(crate) fn with_state_mut<R>(f: impl FnOnce(&mut EventState) -> R) -> R {
    EVENT_STATE.with(|m| f(&mut m.borrow_mut()))
}

/// Reset all counters (useful in tests).
pub(crate) fn reset_all() {
    with_state_mut(|m| *m = EventState::default());
}

/// Snapshot the current counters.
pub(crate) fn report() -> EventReport {
    with_state(|m| EventReport {
        ops: m.ops.clone(),
        entities: m.entities.clone(),
    })
}
