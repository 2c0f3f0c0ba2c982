// src/services/dacon.rs

//! Dacon competition source.
//!
//! Dacon has no public API, so the competition listing page is scraped with
//! CSS selectors and each open competition's schedule page is visited for
//! its period text.

use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};

use crate::error::{AppError, Result};
use crate::models::{CompetitionRecord, Config, DaconConfig, HttpConfig, Platform};
use crate::services::CompetitionSource;
use crate::services::extract::extract_period;
use crate::utils::http::fetch_text;
use crate::utils::{append_segment, has_scheme, resolve};

/// An open competition as it appears on the listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    pub title: String,
    pub keywords: String,
    pub url: String,
    pub schedule_url: String,
    pub thumbnail_url: Option<String>,
}

struct ListingSelectors {
    entry: Selector,
    status: Selector,
    title: Selector,
    keywords: Selector,
    link: Selector,
    image: Selector,
}

impl ListingSelectors {
    fn from_config(config: &DaconConfig) -> Result<Self> {
        let s = &config.selectors;
        Ok(Self {
            entry: parse_selector(&s.entry)?,
            status: parse_selector(&s.status)?,
            title: parse_selector(&s.title)?,
            keywords: parse_selector(&s.keywords)?,
            link: parse_selector(&s.link)?,
            image: parse_selector(&s.image)?,
        })
    }
}

fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}

fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parse the listing page into entries that are still accepting participants.
///
/// Entries with a missing title, keyword line or link are logged and skipped;
/// only an unusable selector fails the whole listing.
pub fn parse_listing(html: &str, config: &DaconConfig) -> Result<Vec<ListingEntry>> {
    let selectors = ListingSelectors::from_config(config)?;
    let document = Html::parse_document(html);

    let mut entries = Vec::new();
    for (position, block) in document.select(&selectors.entry).enumerate() {
        match parse_entry(block, &selectors, config) {
            Ok(Some(entry)) => entries.push(entry),
            Ok(None) => {}
            Err(e) => log::warn!("Dacon: skipping listing entry #{position}: {e}"),
        }
    }
    Ok(entries)
}

fn parse_entry(
    block: ElementRef<'_>,
    selectors: &ListingSelectors,
    config: &DaconConfig,
) -> Result<Option<ListingEntry>> {
    let is_open = block
        .select(&selectors.status)
        .next()
        .is_some_and(|status| element_text(status).contains(config.open_status.as_str()));
    if !is_open {
        return Ok(None);
    }

    let required_text = |selector: &Selector, field: &str| {
        block
            .select(selector)
            .next()
            .map(element_text)
            .filter(|text| !text.is_empty())
            .ok_or_else(|| AppError::parse_mismatch("dacon entry", format!("missing {field}")))
    };

    let title = required_text(&selectors.title, "title")?;
    let keywords = required_text(&selectors.keywords, "keywords")?;

    let href = block
        .select(&selectors.link)
        .find_map(|a| a.value().attr("href"))
        .filter(|href| !href.trim().is_empty())
        .ok_or_else(|| AppError::parse_mismatch("dacon entry", format!("no link for '{title}'")))?;
    let url = resolve(&config.base_url, href.trim())
        .ok_or_else(|| AppError::parse_mismatch("dacon entry", format!("bad link '{href}'")))?;
    let schedule_url = append_segment(&url, &config.schedule_path);

    let thumbnail_url = block.select(&selectors.image).next().and_then(|img| {
        let src = img
            .value()
            .attr("src")
            .or_else(|| img.value().attr("data-src"))
            .map(str::trim)
            .filter(|src| !src.is_empty())?;
        if has_scheme(src) {
            Some(src.to_string())
        } else {
            resolve(&config.base_url, src)
        }
    });

    Ok(Some(ListingEntry {
        title,
        keywords,
        url,
        schedule_url,
        thumbnail_url,
    }))
}

fn period_from_page(body: &str, label: &str) -> String {
    let document = Html::parse_document(body);
    extract_period(&document, label)
}

/// Competition source scraping the Dacon website.
pub struct DaconSource {
    config: DaconConfig,
    http: HttpConfig,
    client: Client,
}

impl DaconSource {
    /// Create a Dacon source sharing the given HTTP client.
    pub fn new(config: &Config, client: Client) -> Self {
        Self {
            config: config.dacon.clone(),
            http: config.http.clone(),
            client,
        }
    }

    /// Fetch the period text for one competition.
    ///
    /// `None` means the schedule page could not be read; a page without a
    /// period line yields the not-found sentinel instead.
    async fn fetch_period(&self, schedule_url: &str) -> Option<String> {
        if self.http.request_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.http.request_delay_ms)).await;
        }

        match fetch_text(&self.client, schedule_url).await {
            Ok(body) => Some(period_from_page(&body, &self.config.period_label)),
            Err(e) => {
                log::error!("Dacon: schedule page {schedule_url} unavailable: {e}");
                None
            }
        }
    }

    async fn complete_entry(&self, entry: ListingEntry) -> CompetitionRecord {
        let period = self.fetch_period(&entry.schedule_url).await;
        if entry.thumbnail_url.is_none() {
            log::warn!("Dacon: no thumbnail found for {}", entry.title);
        }

        CompetitionRecord {
            schedule_window: period,
            tags: Some(entry.keywords),
            thumbnail_url: entry.thumbnail_url,
            ..CompetitionRecord::new(Platform::Dacon, entry.url, entry.title)
        }
    }
}

#[async_trait]
impl CompetitionSource for DaconSource {
    fn platform(&self) -> Platform {
        Platform::Dacon
    }

    async fn fetch(&self) -> Result<Vec<CompetitionRecord>> {
        let body = fetch_text(&self.client, &self.config.listing_url)
            .await
            .map_err(|e| AppError::source_unavailable(Platform::Dacon.name(), e))?;
        let entries = parse_listing(&body, &self.config)?;

        if entries.is_empty() {
            log::warn!("Dacon: no open competitions on {}", self.config.listing_url);
        }

        let concurrency = self.http.max_concurrent.max(1);
        let records = stream::iter(entries)
            .map(|entry| self.complete_entry(entry))
            .buffered(concurrency)
            .collect::<Vec<_>>()
            .await;

        Ok(records)
    }
}
