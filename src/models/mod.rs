// src/models/mod.rs

//! Domain models for the notifier.

mod competition;
mod config;

// Re-export all public types
pub use competition::{CompetitionRecord, Platform, deadline_format};
pub use config::{
    Config, DaconConfig, DaconSelectors, HttpConfig, KaggleConfig, LoggingConfig, ScheduleConfig,
    SlackConfig, StorageConfig,
};
