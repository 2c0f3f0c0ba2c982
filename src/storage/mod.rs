//! Storage abstractions for the competition checkpoint.
//!
//! The checkpoint is the full set of competitions observed by the last
//! completed cycle. It is only ever replaced as a whole document, so an
//! interrupted cycle leaves either the old or the new checkpoint behind.

pub mod local;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::CompetitionRecord;

// Re-export for convenience
pub use local::LocalStorage;

/// Trait for checkpoint storage backends.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Load the last checkpoint. A checkpoint that was never written is empty.
    async fn load(&self) -> Result<Vec<CompetitionRecord>>;

    /// Replace the checkpoint with `records`.
    async fn save(&self, records: &[CompetitionRecord]) -> Result<()>;

    /// Human-readable location, for logs.
    fn location(&self) -> String;
}
