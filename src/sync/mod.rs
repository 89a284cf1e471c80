//! Incremental synchronization from the stats provider into the local store.
//!
//! Work is split into (team, season) units. Each unit moves through
//! `never_synced -> partial -> complete | failed`; a failed unit never stops
//! the rest of the run, and whatever it wrote before failing stays queryable.

pub mod locks;
pub mod orchestrator;
pub mod plan;
pub mod report;


pub use locks::{CancelFlag, UnitLocks};
pub use orchestrator::{SyncOrchestrator, SyncSettings};
pub use plan::{missing_ranges, reopen_from, requested_range, SyncRequest};
pub use report::{SkipReason, SyncReport, UnitReport, UnitStatus};
