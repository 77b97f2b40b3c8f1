//! Batch Job Pipeline
//!
//! Wires the calendar generator, snapshot engine and hierarchy walker to
//! the warehouse: one runner per job kind, each returning a run report.

pub mod orchestrator;
pub mod types;

pub use orchestrator::JobOrchestrator;
#[allow(unused_imports)]
pub use types::{JobKind, RunResult};
