//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
///
/// Built once by the entry point and handed to the orchestrator; nothing in
/// the library reads the environment on its own.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP client behavior shared by every source
    #[serde(default)]
    pub http: HttpConfig,

    /// Kaggle API source
    #[serde(default)]
    pub kaggle: KaggleConfig,

    /// Dacon listing scraper
    #[serde(default)]
    pub dacon: DaconConfig,

    /// Slack notification sink
    #[serde(default)]
    pub slack: SlackConfig,

    /// Checkpoint location
    #[serde(default)]
    pub storage: StorageConfig,

    /// Trigger loop settings
    #[serde(default)]
    pub schedule: ScheduleConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Overlay secrets and the channel from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    /// Overlay values from an arbitrary lookup (empty values are ignored).
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(token) = get("SLACK_TOKEN") {
            self.slack.token = Some(token);
        }
        if let Some(channel) = get("SLACK_CHANNEL") {
            self.slack.channel = channel;
        }
        if let Some(username) = get("KAGGLE_USERNAME") {
            self.kaggle.username = Some(username);
        }
        if let Some(key) = get("KAGGLE_KEY") {
            self.kaggle.key = Some(key);
        }
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.http.user_agent.trim().is_empty() {
            return Err(AppError::validation("http.user_agent is empty"));
        }
        if self.http.timeout_secs == 0 {
            return Err(AppError::validation("http.timeout_secs must be > 0"));
        }
        if self.http.max_concurrent == 0 {
            return Err(AppError::validation("http.max_concurrent must be > 0"));
        }
        if self.schedule.interval_secs == 0 {
            return Err(AppError::validation("schedule.interval_secs must be > 0"));
        }
        if self.slack.channel.trim().is_empty() {
            return Err(AppError::validation("slack.channel is empty"));
        }
        if self.storage.checkpoint_path.as_os_str().is_empty() {
            return Err(AppError::validation("storage.checkpoint_path is empty"));
        }

        let urls = [
            ("kaggle.api_base", &self.kaggle.api_base),
            ("kaggle.site_base", &self.kaggle.site_base),
            ("kaggle.competition_base", &self.kaggle.competition_base),
            ("dacon.base_url", &self.dacon.base_url),
            ("dacon.listing_url", &self.dacon.listing_url),
            ("slack.api_base", &self.slack.api_base),
        ];
        for (name, value) in urls {
            url::Url::parse(value)
                .map_err(|e| AppError::validation(format!("{name} is not an absolute URL: {e}")))?;
        }

        if !self.kaggle.enabled && !self.dacon.enabled {
            log::warn!("Both sources are disabled; every cycle will report nothing new");
        }
        Ok(())
    }
}

/// HTTP client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Per-request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Maximum concurrent detail-page requests within one source
    #[serde(default = "defaults::max_concurrent")]
    pub max_concurrent: usize,

    /// Delay between detail-page requests in milliseconds
    #[serde(default)]
    pub request_delay_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            max_concurrent: defaults::max_concurrent(),
            request_delay_ms: 0,
        }
    }
}

/// Kaggle API source settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KaggleConfig {
    #[serde(default = "defaults::enabled")]
    pub enabled: bool,

    /// REST API root
    #[serde(default = "defaults::kaggle_api_base")]
    pub api_base: String,

    /// Site origin, used to resolve relative image paths
    #[serde(default = "defaults::kaggle_site_base")]
    pub site_base: String,

    /// Prefix for competition slugs
    #[serde(default = "defaults::kaggle_competition_base")]
    pub competition_base: String,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub key: Option<String>,

    /// Number of list pages to read per cycle
    #[serde(default = "defaults::kaggle_max_pages")]
    pub max_pages: u32,
}

impl Default for KaggleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_base: defaults::kaggle_api_base(),
            site_base: defaults::kaggle_site_base(),
            competition_base: defaults::kaggle_competition_base(),
            username: None,
            key: None,
            max_pages: defaults::kaggle_max_pages(),
        }
    }
}

/// Dacon scraper settings.
///
/// The status text, period label and selectors track the site's markup and
/// are expected to drift.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaconConfig {
    #[serde(default = "defaults::enabled")]
    pub enabled: bool,

    /// Origin that relative links are resolved against
    #[serde(default = "defaults::dacon_base_url")]
    pub base_url: String,

    /// Competition listing page
    #[serde(default = "defaults::dacon_listing_url")]
    pub listing_url: String,

    /// Status text of entries still accepting participants
    #[serde(default = "defaults::dacon_open_status")]
    pub open_status: String,

    /// Label preceding the period on the schedule page
    #[serde(default = "defaults::dacon_period_label")]
    pub period_label: String,

    /// Path segment appended to a competition URL to reach its schedule
    #[serde(default = "defaults::dacon_schedule_path")]
    pub schedule_path: String,

    #[serde(default)]
    pub selectors: DaconSelectors,
}

impl Default for DaconConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: defaults::dacon_base_url(),
            listing_url: defaults::dacon_listing_url(),
            open_status: defaults::dacon_open_status(),
            period_label: defaults::dacon_period_label(),
            schedule_path: defaults::dacon_schedule_path(),
            selectors: DaconSelectors::default(),
        }
    }
}

/// CSS selectors for one Dacon listing entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaconSelectors {
    #[serde(default = "defaults::dacon_entry")]
    pub entry: String,
    #[serde(default = "defaults::dacon_status")]
    pub status: String,
    #[serde(default = "defaults::dacon_title")]
    pub title: String,
    #[serde(default = "defaults::dacon_keywords")]
    pub keywords: String,
    #[serde(default = "defaults::dacon_link")]
    pub link: String,
    #[serde(default = "defaults::dacon_image")]
    pub image: String,
}

impl Default for DaconSelectors {
    fn default() -> Self {
        Self {
            entry: defaults::dacon_entry(),
            status: defaults::dacon_status(),
            title: defaults::dacon_title(),
            keywords: defaults::dacon_keywords(),
            link: defaults::dacon_link(),
            image: defaults::dacon_image(),
        }
    }
}

/// Slack sink settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlackConfig {
    /// Web API root
    #[serde(default = "defaults::slack_api_base")]
    pub api_base: String,

    /// Bot token (`xoxb-...`)
    #[serde(default)]
    pub token: Option<String>,

    #[serde(default = "defaults::slack_channel")]
    pub channel: String,

    /// Optional form linked from a "find teammates" button
    #[serde(default)]
    pub team_form_url: Option<String>,
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            api_base: defaults::slack_api_base(),
            token: None,
            channel: defaults::slack_channel(),
            team_form_url: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// JSON checkpoint of the last completed cycle
    #[serde(default = "defaults::checkpoint_path")]
    pub checkpoint_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            checkpoint_path: defaults::checkpoint_path(),
        }
    }
}

/// Trigger loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Seconds between cycle starts
    #[serde(default = "defaults::interval")]
    pub interval_secs: u64,

    /// Skip ticks that fall on Saturday or Sunday (local time)
    #[serde(default = "defaults::enabled")]
    pub weekdays_only: bool,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval_secs: defaults::interval(),
            weekdays_only: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "defaults::log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
        }
    }
}

mod defaults {
    use std::path::PathBuf;

    pub fn enabled() -> bool {
        true
    }

    // HTTP defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; contest-notifier/0.1)".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn max_concurrent() -> usize {
        4
    }

    // Kaggle defaults
    pub fn kaggle_api_base() -> String {
        "https://www.kaggle.com/api/v1".into()
    }
    pub fn kaggle_site_base() -> String {
        "https://www.kaggle.com".into()
    }
    pub fn kaggle_competition_base() -> String {
        "https://www.kaggle.com/competitions/".into()
    }
    pub fn kaggle_max_pages() -> u32 {
        1
    }

    // Dacon defaults
    pub fn dacon_base_url() -> String {
        "https://dacon.io".into()
    }
    pub fn dacon_listing_url() -> String {
        "https://dacon.io/competitions".into()
    }
    pub fn dacon_open_status() -> String {
        "참가신청중".into()
    }
    pub fn dacon_period_label() -> String {
        "대회 기간 :".into()
    }
    pub fn dacon_schedule_path() -> String {
        "schedule".into()
    }
    pub fn dacon_entry() -> String {
        "div.comp".into()
    }
    pub fn dacon_status() -> String {
        "div.dday".into()
    }
    pub fn dacon_title() -> String {
        "p.name.ellipsis".into()
    }
    pub fn dacon_keywords() -> String {
        "p.info2.ellipsis.keyword".into()
    }
    pub fn dacon_link() -> String {
        "a[href]".into()
    }
    pub fn dacon_image() -> String {
        "img".into()
    }

    // Slack defaults
    pub fn slack_api_base() -> String {
        "https://slack.com/api".into()
    }
    pub fn slack_channel() -> String {
        "#contest-notify-bot".into()
    }

    pub fn checkpoint_path() -> PathBuf {
        PathBuf::from("data/competition_data.json")
    }
    pub fn interval() -> u64 {
        120
    }
    pub fn log_level() -> String {
        "info".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_default_config_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_user_agent() {
        let mut config = Config::default();
        config.http.user_agent = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_interval() {
        let mut config = Config::default();
        config.schedule.interval_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_relative_listing_url() {
        let mut config = Config::default();
        config.dacon.listing_url = "/competitions".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let config: Config = toml::from_str(
            r##"
            [slack]
            channel = "#alerts"

            [schedule]
            weekdays_only = false
            "##,
        )
        .unwrap();

        assert_eq!(config.slack.channel, "#alerts");
        assert!(!config.schedule.weekdays_only);
        assert_eq!(config.schedule.interval_secs, 120);
        assert_eq!(config.dacon.open_status, "참가신청중");
        assert_eq!(config.dacon.selectors.entry, "div.comp");
    }

    #[test]
    fn env_overrides_secrets_and_ignores_blanks() {
        let mut config = Config::default();
        config.apply_env_with(|key| match key {
            "SLACK_TOKEN" => Some("xoxb-test".to_string()),
            "SLACK_CHANNEL" => Some("   ".to_string()),
            "KAGGLE_USERNAME" => Some("alice".to_string()),
            "KAGGLE_KEY" => Some("secret".to_string()),
            _ => None,
        });

        assert_eq!(config.slack.token.as_deref(), Some("xoxb-test"));
        assert_eq!(config.slack.channel, "#contest-notify-bot");
        assert_eq!(config.kaggle.username.as_deref(), Some("alice"));
        assert_eq!(config.kaggle.key.as_deref(), Some("secret"));
    }

    #[test]
    fn load_malformed_file_reports_toml_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[slack\nchannel = ").unwrap();

        assert!(matches!(Config::load(&path), Err(AppError::Toml(_))));
    }

    #[test]
    fn load_missing_file_is_io_error() {
        assert!(matches!(Config::load("does/not/exist.toml"), Err(AppError::Io(_))));
    }
}
