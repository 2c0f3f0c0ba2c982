//! Competition record, the unit of data flowing through a cycle.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Platform a competition was discovered on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Platform {
    Kaggle,
    Dacon,
}

impl Platform {
    /// Display name used in logs and messages.
    pub fn name(&self) -> &'static str {
        match self {
            Platform::Kaggle => "Kaggle",
            Platform::Dacon => "Dacon",
        }
    }

    /// Whether records from this platform carry an absolute deadline.
    ///
    /// Platforms that don't expose one publish a free-text schedule window instead.
    pub fn exposes_deadline(&self) -> bool {
        matches!(self, Platform::Kaggle)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A competition observed on one of the platforms.
///
/// Two records are the same competition iff their `identity` matches; every
/// other field may drift between cycles.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CompetitionRecord {
    pub platform: Platform,

    /// Normalized absolute URL, the deduplication key
    #[serde(rename = "url")]
    pub identity: String,

    /// Display name
    #[serde(rename = "name")]
    pub title: String,

    /// Fixed end instant (Kaggle only)
    #[serde(default, with = "deadline_format")]
    pub deadline: Option<DateTime<Utc>>,

    /// Human-authored "start ~ end" text (Dacon only)
    #[serde(default, rename = "period")]
    pub schedule_window: Option<String>,

    /// Category (Kaggle) or keywords (Dacon)
    #[serde(default, rename = "tags", alias = "category", alias = "keywords")]
    pub tags: Option<String>,

    #[serde(default)]
    pub reward: Option<String>,

    /// Full description; only the renderer truncates it
    #[serde(default)]
    pub description: Option<String>,

    #[serde(default, rename = "image_url")]
    pub thumbnail_url: Option<String>,
}

impl CompetitionRecord {
    /// Create a record with only the required fields set.
    pub fn new(platform: Platform, identity: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            platform,
            identity: identity.into(),
            title: title.into(),
            deadline: None,
            schedule_window: None,
            tags: None,
            reward: None,
            description: None,
            thumbnail_url: None,
        }
    }

    /// Deadline rendered the way it is persisted.
    pub fn deadline_display(&self) -> Option<String> {
        self.deadline.map(deadline_format::format)
    }
}

/// Serde adapter persisting deadlines as `YYYY-MM-DD HH:MM:SS UTC`.
pub mod deadline_format {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

    pub fn format(deadline: DateTime<Utc>) -> String {
        deadline.format(FORMAT).to_string()
    }

    pub fn parse(s: &str) -> Option<DateTime<Utc>> {
        NaiveDateTime::parse_from_str(s.trim(), FORMAT)
            .ok()
            .map(|naive| naive.and_utc())
    }

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(deadline) => serializer.serialize_str(&format(*deadline)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw {
            None => Ok(None),
            Some(s) => parse(&s)
                .map(Some)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid deadline '{s}'"))),
        }
    }
}
