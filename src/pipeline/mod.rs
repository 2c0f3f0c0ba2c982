//! Pipeline entry points for discovery cycles.
//!
//! - `run_cycle`: one load → fetch → diff → persist → notify pass
//! - `Scheduler`: repeats cycles at a fixed interval

pub mod cycle;
pub mod diff;
pub mod retention;
pub mod schedule;

pub use cycle::{CyclePhase, CycleReport, Orchestrator};
pub use diff::new_records;
pub use retention::prune;
pub use schedule::Scheduler;
