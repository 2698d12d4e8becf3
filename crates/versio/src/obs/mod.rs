//! Observability: runtime counters and the sink boundary.
//!
//! Instrumentation never changes translation or cascade results.

pub(crate) mod metrics;
pub(crate) mod sink;

pub use metrics::{EntityCounters, EventOps, EventReport};
pub use sink::{MetricsEvent, MetricsSink, metrics_report, metrics_reset_all, with_metrics_sink};
