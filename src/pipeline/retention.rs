//! Checkpoint retention.

use chrono::{DateTime, Utc};

use crate::models::CompetitionRecord;

/// Drop records whose deadline is at or before `now`.
///
/// Records without a deadline are kept: their platform only lists open
/// competitions, so there is nothing here to judge staleness by.
pub fn prune(records: Vec<CompetitionRecord>, now: DateTime<Utc>) -> Vec<CompetitionRecord> {
    records
        .into_iter()
        .filter(|record| match record.deadline {
            Some(deadline) => deadline > now,
            None => true,
        })
        .collect()
}
