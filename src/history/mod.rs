//! SCD Type 2 History Module
//!
//! The heart of DimFlow - turning point-in-time extracts into a full change
//! history. This module provides:
//! - Content fingerprints over the tracked columns (change detection)
//! - The snapshot engine (which versions to open, which to close)
//! - The historized store (atomic application, current-row projection)

pub mod engine;
pub mod fingerprint;
pub mod store;

pub use engine::{SnapshotEngine, SnapshotOptions};
#[allow(unused_imports)]
pub use engine::{PlanSummary, SnapshotPlan};
#[allow(unused_imports)]
pub use fingerprint::compute_fingerprint;
pub use store::{HistorizedRecord, HistoryStore};
