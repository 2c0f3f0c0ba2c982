// src/services/kaggle.rs

//! Kaggle competition source.
//!
//! Lists competitions through the Kaggle REST API, keeps those whose deadline
//! is still ahead, and visits each competition page once to find a thumbnail.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use futures::stream::{self, StreamExt};
use reqwest::{Client, StatusCode};
use scraper::Html;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::models::{CompetitionRecord, Config, HttpConfig, KaggleConfig, Platform};
use crate::services::CompetitionSource;
use crate::services::extract::extract_thumbnail;
use crate::utils::http::fetch_text;
use crate::utils::normalize_competition_url;

/// One entry of `GET /competitions/list`.
#[derive(Debug, Clone, Deserialize)]
pub struct KaggleCompetition {
    /// Slug, or on newer API versions the full competition URL
    #[serde(rename = "ref")]
    pub reference: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub deadline: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    /// Either a display string ("$25,000", "Knowledge") or a bare number
    #[serde(default)]
    pub reward: Option<Value>,
}

impl KaggleCompetition {
    /// Decode one list item; a malformed item is a parse mismatch of its own.
    pub fn from_value(value: Value) -> Result<Self> {
        let reference = value
            .get("ref")
            .and_then(Value::as_str)
            .unwrap_or("<unknown>")
            .to_string();
        serde_json::from_value(value).map_err(|e| {
            AppError::parse_mismatch(format!("kaggle list item '{reference}'"), e.to_string())
        })
    }

    /// Convert into a record if the competition is still open at `now`.
    ///
    /// Returns `Ok(None)` for closed competitions and a parse mismatch when the
    /// deadline is missing or unreadable.
    pub fn into_record(
        self,
        competition_base: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<CompetitionRecord>> {
        let raw_deadline = self.deadline.as_deref().unwrap_or_default();
        let deadline = parse_deadline(raw_deadline).ok_or_else(|| {
            AppError::parse_mismatch(
                format!("kaggle deadline of '{}'", self.reference),
                format!("unreadable value '{raw_deadline}'"),
            )
        })?;

        if deadline <= now {
            return Ok(None);
        }

        Ok(Some(CompetitionRecord {
            deadline: Some(deadline),
            tags: self.category.filter(|c| !c.trim().is_empty()),
            reward: Some(format_reward(self.reward.as_ref())),
            description: self.description,
            ..CompetitionRecord::new(
                Platform::Kaggle,
                normalize_competition_url(competition_base, &self.reference),
                self.title,
            )
        }))
    }
}

/// Parse the API's deadline, which may or may not carry a zone (UTC assumed).
pub fn parse_deadline(raw: &str) -> Option<DateTime<Utc>> {
    const NAIVE_FORMATS: &[&str] = &[
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M:%S UTC",
    ];

    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc())
}

/// Render a reward with a currency prefix, even when it is zero or missing.
pub fn format_reward(raw: Option<&Value>) -> String {
    let text = match raw {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    };

    if text.is_empty() {
        "$0".to_string()
    } else if text.starts_with('$') {
        text
    } else {
        format!("${text}")
    }
}

/// Competition source backed by the Kaggle API.
pub struct KaggleSource {
    config: KaggleConfig,
    http: HttpConfig,
    client: Client,
}

impl KaggleSource {
    /// Create a Kaggle source sharing the given HTTP client.
    pub fn new(config: &Config, client: Client) -> Self {
        Self {
            config: config.kaggle.clone(),
            http: config.http.clone(),
            client,
        }
    }

    fn credentials(&self) -> Result<(&str, &str)> {
        match (self.config.username.as_deref(), self.config.key.as_deref()) {
            (Some(user), Some(key)) => Ok((user, key)),
            _ => Err(AppError::source_unavailable(
                Platform::Kaggle.name(),
                "KAGGLE_USERNAME / KAGGLE_KEY not configured",
            )),
        }
    }

    /// Read one page of the competition list.
    async fn fetch_page(&self, page: u32) -> Result<Vec<Value>> {
        let (user, key) = self.credentials()?;
        let url = format!(
            "{}/competitions/list",
            self.config.api_base.trim_end_matches('/')
        );

        let response = self
            .client
            .get(&url)
            .basic_auth(user, Some(key))
            .query(&[("page", page)])
            .send()
            .await
            .map_err(|e| AppError::source_unavailable(Platform::Kaggle.name(), e))?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(AppError::source_unavailable(
                    Platform::Kaggle.name(),
                    format!("authentication rejected ({})", response.status()),
                ));
            }
            status if !status.is_success() => {
                return Err(AppError::source_unavailable(
                    Platform::Kaggle.name(),
                    format!("list request returned {status}"),
                ));
            }
            _ => {}
        }

        Ok(response.json().await?)
    }

    /// Read up to `max_pages` list pages, stopping at the first empty one.
    async fn fetch_listing(&self) -> Result<Vec<Value>> {
        let mut items = Vec::new();
        for page in 1..=self.config.max_pages.max(1) {
            match self.fetch_page(page).await {
                Ok(batch) if batch.is_empty() => break,
                Ok(batch) => items.extend(batch),
                Err(e) if page == 1 => return Err(e),
                Err(e) => {
                    log::warn!("Kaggle: stopping at page {page}: {e}");
                    break;
                }
            }
        }
        Ok(items)
    }

    /// Attach a thumbnail found on the competition page, if any.
    async fn with_thumbnail(&self, mut record: CompetitionRecord) -> CompetitionRecord {
        if self.http.request_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.http.request_delay_ms)).await;
        }

        match fetch_text(&self.client, &record.identity).await {
            Ok(body) => {
                record.thumbnail_url = thumbnail_from_page(&body, &self.config.site_base);
                if record.thumbnail_url.is_none() {
                    log::warn!("Kaggle: no thumbnail found for {}", record.title);
                }
            }
            Err(e) => {
                log::warn!("Kaggle: competition page {} unavailable: {}", record.identity, e);
            }
        }
        record
    }
}

fn thumbnail_from_page(body: &str, site_base: &str) -> Option<String> {
    let document = Html::parse_document(body);
    extract_thumbnail(&document, site_base)
}

#[async_trait]
impl CompetitionSource for KaggleSource {
    fn platform(&self) -> Platform {
        Platform::Kaggle
    }

    async fn fetch(&self) -> Result<Vec<CompetitionRecord>> {
        let listing = self.fetch_listing().await?;
        let now = Utc::now();

        let mut open = Vec::new();
        for item in listing {
            let converted = KaggleCompetition::from_value(item)
                .and_then(|competition| competition.into_record(&self.config.competition_base, now));
            match converted {
                Ok(Some(record)) => {
                    log::debug!("Kaggle: found {}", record.title);
                    open.push(record);
                }
                Ok(None) => {}
                Err(e) => log::warn!("Kaggle: skipping entry: {e}"),
            }
        }

        let concurrency = self.http.max_concurrent.max(1);
        let records = stream::iter(open)
            .map(|record| self.with_thumbnail(record))
            .buffered(concurrency)
            .collect::<Vec<_>>()
            .await;

        Ok(records)
    }
}
