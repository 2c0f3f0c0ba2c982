// src/services/notify.rs

//! Competition notifications.
//!
//! Rendering is pure and produces Slack Block Kit payloads; delivery goes
//! through a [`MessageSink`]. The [`Notifier`] glues the two together and
//! reports every delivery as a plain `bool` so one rejected message never
//! stops the rest of a cycle.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use unicode_segmentation::UnicodeSegmentation;

use crate::error::{AppError, Result};
use crate::models::{CompetitionRecord, Platform, SlackConfig};

/// Shown in place of any missing field so every message has the same shape.
pub const PLACEHOLDER: &str = "없음";

/// Fallback text of the "nothing new" message.
pub const NOTHING_NEW_TEXT: &str = "새로운 대회가 없습니다.";

const CONTEXT_ICON_URL: &str =
    "https://api.slack.com/img/blocks/bkb_template_images/tripAgentLocationMarker.png";

/// Graphemes of description kept in the context line.
const DESCRIPTION_LIMIT: usize = 100;

/// A rendered message: fallback text plus Block Kit blocks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlackMessage {
    pub text: String,
    pub blocks: Vec<Value>,
}

fn or_placeholder(value: Option<&str>) -> &str {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(PLACEHOLDER)
}

fn escape_mrkdwn(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn truncate_graphemes(text: &str, limit: usize) -> String {
    let mut graphemes = text.graphemes(true);
    let head: String = graphemes.by_ref().take(limit).collect();
    if graphemes.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

/// Render the announcement for a newly discovered competition.
pub fn render_competition(record: &CompetitionRecord, team_form_url: Option<&str>) -> SlackMessage {
    let deadline = record.deadline_display();
    let details = match record.platform {
        Platform::Kaggle => format!(
            "카테고리: {}\n상금: {}\n마감일: {}",
            or_placeholder(record.tags.as_deref()),
            or_placeholder(record.reward.as_deref()),
            or_placeholder(deadline.as_deref()),
        ),
        Platform::Dacon => format!(
            "키워드: {}\n상금: {}\n기간: {}",
            or_placeholder(record.tags.as_deref()),
            or_placeholder(record.reward.as_deref()),
            or_placeholder(record.schedule_window.as_deref()),
        ),
    };

    let mut competition = json!({
        "type": "section",
        "text": {
            "type": "mrkdwn",
            "text": format!("*<{}|{}>*\n{}", record.identity, escape_mrkdwn(&record.title), details),
        }
    });
    if let Some(image_url) = &record.thumbnail_url {
        competition["accessory"] = json!({
            "type": "image",
            "image_url": image_url,
            "alt_text": "대회 이미지 썸네일",
        });
    }

    let context_text = match record.platform {
        Platform::Kaggle => record
            .description
            .as_deref()
            .map(|d| truncate_graphemes(d.trim(), DESCRIPTION_LIMIT)),
        Platform::Dacon => record.tags.clone(),
    }
    .filter(|t| !t.is_empty())
    .unwrap_or_else(|| PLACEHOLDER.to_string());

    let mut buttons = Vec::new();
    if let Some(form_url) = team_form_url {
        buttons.push(json!({
            "type": "button",
            "text": { "type": "plain_text", "emoji": true, "text": "같이 할 사람 찾기 👋🏼" },
            "url": form_url,
            "value": "go_to_surveyform",
        }));
    }
    buttons.push(json!({
        "type": "button",
        "text": { "type": "plain_text", "emoji": true, "text": "대회 페이지 방문" },
        "url": record.identity,
        "value": "go_to_competition",
    }));

    let blocks = vec![
        json!({
            "type": "section",
            "text": {
                "type": "mrkdwn",
                "text": format!("🔥 새로운 *{}* 대회가 열렸어요!", record.platform),
            }
        }),
        json!({ "type": "divider" }),
        competition,
        json!({
            "type": "context",
            "elements": [
                { "type": "image", "image_url": CONTEXT_ICON_URL, "alt_text": "Location Pin Icon" },
                { "type": "plain_text", "emoji": true, "text": context_text },
            ]
        }),
        json!({ "type": "divider" }),
        json!({ "type": "actions", "elements": buttons }),
    ];

    SlackMessage {
        text: format!("New competition: {}", record.title),
        blocks,
    }
}

/// Render the heartbeat sent when a cycle found nothing new.
pub fn render_nothing_new() -> SlackMessage {
    SlackMessage {
        text: NOTHING_NEW_TEXT.to_string(),
        blocks: vec![json!({
            "type": "section",
            "text": {
                "type": "mrkdwn",
                "text": "🔍 *대회 알림 업데이트*\n현재 새로운 대회가 없습니다. 다음 업데이트를 기다려주세요!",
            }
        })],
    }
}

/// Destination for rendered messages.
#[async_trait]
pub trait MessageSink: Send + Sync {
    /// Deliver one message, surfacing the sink's own error detail on rejection.
    async fn deliver(&self, message: &SlackMessage) -> Result<()>;
}

#[derive(Debug, Deserialize)]
struct SlackResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

/// Posts messages to a channel through Slack's `chat.postMessage`.
pub struct SlackSink {
    client: Client,
    api_base: String,
    token: Option<String>,
    channel: String,
}

impl SlackSink {
    pub fn new(config: &SlackConfig, client: Client) -> Self {
        Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            channel: config.channel.clone(),
        }
    }
}

#[async_trait]
impl MessageSink for SlackSink {
    async fn deliver(&self, message: &SlackMessage) -> Result<()> {
        let token = self
            .token
            .as_deref()
            .ok_or_else(|| AppError::delivery("SLACK_TOKEN not configured"))?;

        let body = json!({
            "channel": self.channel,
            "text": message.text,
            "blocks": message.blocks,
            "unfurl_links": false,
            "unfurl_media": false,
        });

        let response: SlackResponse = self
            .client
            .post(format!("{}/chat.postMessage", self.api_base))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if response.ok {
            Ok(())
        } else {
            Err(AppError::delivery(
                response.error.unwrap_or_else(|| "unknown_error".to_string()),
            ))
        }
    }
}

/// Renders records and hands them to a sink, one message per call.
pub struct Notifier {
    sink: Box<dyn MessageSink>,
    team_form_url: Option<String>,
}

impl Notifier {
    pub fn new(sink: Box<dyn MessageSink>) -> Self {
        Self {
            sink,
            team_form_url: None,
        }
    }

    /// Add a "find teammates" button linking to `url` on every announcement.
    pub fn with_team_form(mut self, url: Option<String>) -> Self {
        self.team_form_url = url;
        self
    }

    /// Announce one competition. Returns whether the sink accepted it.
    pub async fn notify(&self, record: &CompetitionRecord) -> bool {
        let message = render_competition(record, self.team_form_url.as_deref());
        match self.sink.deliver(&message).await {
            Ok(()) => {
                log::info!("Notification sent for {} competition: {}", record.platform, record.title);
                true
            }
            Err(e) => {
                log::error!(
                    "Notification failed for {} ({}): {}",
                    record.title,
                    record.identity,
                    e
                );
                false
            }
        }
    }

    /// Tell the channel that this cycle found nothing new.
    pub async fn notify_nothing_new(&self) -> bool {
        match self.sink.deliver(&render_nothing_new()).await {
            Ok(()) => {
                log::info!("No-new-competition notification sent");
                true
            }
            Err(e) => {
                log::error!("No-new-competition notification failed: {e}");
                false
            }
        }
    }
}
