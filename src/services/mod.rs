//! Service layer for the notifier.
//!
//! This module contains the business logic for:
//! - Kaggle API discovery (`KaggleSource`)
//! - Dacon listing scraping (`DaconSource`)
//! - Best-effort page field extraction (`extract`)
//! - Message rendering and Slack delivery (`Notifier`, `SlackSink`)

mod dacon;
pub mod extract;
mod kaggle;
mod notify;

use std::collections::HashSet;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{CompetitionRecord, Platform};

pub use dacon::{DaconSource, ListingEntry, parse_listing};
pub use kaggle::{KaggleCompetition, KaggleSource, format_reward, parse_deadline};
pub use notify::{
    MessageSink, NOTHING_NEW_TEXT, Notifier, PLACEHOLDER, SlackMessage, SlackSink, render_competition,
    render_nothing_new,
};

/// A platform that publishes currently open competitions.
#[async_trait]
pub trait CompetitionSource: Send + Sync {
    /// Platform every returned record belongs to.
    fn platform(&self) -> Platform;

    /// Fetch and normalize the platform's open competitions.
    async fn fetch(&self) -> Result<Vec<CompetitionRecord>>;

    /// Fetch, degrading any source-level failure to an empty result.
    ///
    /// Duplicate identities within the result are dropped, keeping the first.
    async fn fetch_or_empty(&self) -> Vec<CompetitionRecord> {
        match self.fetch().await {
            Ok(records) => {
                let records = dedup_by_identity(records);
                log::info!("{}: {} open competitions", self.platform(), records.len());
                records
            }
            Err(e) => {
                log::error!("{}: fetch failed, continuing without it: {}", self.platform(), e);
                Vec::new()
            }
        }
    }
}

/// Keep the first record for each identity, preserving order.
pub fn dedup_by_identity(records: Vec<CompetitionRecord>) -> Vec<CompetitionRecord> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|record| seen.insert(record.identity.clone()))
        .collect()
}
