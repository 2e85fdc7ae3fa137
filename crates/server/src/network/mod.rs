//! Per-tab network observation: the ordered request log, filtered
//! projections, and wait predicates.

mod tracker;
mod wait;

pub use tracker::{LogEntry, RequestFilter, RequestTracker, ResponseFilter, TrackerEvent};
pub use wait::{WaitKind, WaitOutcome};
