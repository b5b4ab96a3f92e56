use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::collector::{CollectedChannel, MessageCollector, Window};
use crate::error::CollectionError;
use crate::model::{Attachment, Author, Message};

const API_BASE: &str = "https://discord.com/api/v9";
const PAGE_SIZE: u32 = 100;
/// Hard cap on API requests per channel per run.
const MAX_REQUESTS: u32 = 500;
/// Pause between pagination requests to stay well under rate limits.
const PAGE_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Deserialize)]
struct RawChannel {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawAuthor {
    #[serde(default)]
    username: String,
    #[serde(default)]
    id: String,
}

#[derive(Debug, Deserialize)]
struct RawAttachment {
    #[serde(default)]
    url: String,
    #[serde(default)]
    content_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawMessage {
    id: String,
    #[serde(default)]
    content: String,
    timestamp: String,
    #[serde(default)]
    author: Option<RawAuthor>,
    #[serde(default)]
    channel_id: String,
    #[serde(default)]
    attachments: Vec<RawAttachment>,
}

#[derive(Debug)]
struct RateLimit {
    remaining: u32,
    reset_at: f64,
}

/// Reads channel history over the Discord REST API with a user token.
/// Tracks rate-limit headers and paginates backwards until the window start.
pub struct DiscordReader {
    client: reqwest::Client,
    token: String,
    rate_limit: Mutex<RateLimit>,
}

impl DiscordReader {
    pub fn new(user_token: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            token: user_token.into(),
            rate_limit: Mutex::new(RateLimit {
                remaining: 5,
                reset_at: 0.0,
            }),
        }
    }

    async fn wait_for_rate_limit(&self) {
        let limit = self.rate_limit.lock().await;
        if limit.remaining <= 1 {
            let now = now_epoch();
            let wait = (limit.reset_at - now).max(0.0) + 0.5;
            drop(limit);
            if wait > 0.0 {
                info!("Rate limit reached, sleeping for {:.2}s", wait);
                tokio::time::sleep(Duration::from_secs_f64(wait)).await;
            }
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        channel_id: &str,
        endpoint: &str,
    ) -> Result<T, CollectionError> {
        self.wait_for_rate_limit().await;

        let url = format!("{}{}", API_BASE, endpoint);
        let response = self
            .client
            .get(&url)
            .header("Authorization", &self.token)
            .header("Content-Type", "application/json")
            .send()
            .await
            .map_err(|e| CollectionError::new(channel_id, format!("request failed: {}", e)))?;

        {
            let mut limit = self.rate_limit.lock().await;
            limit.remaining = header_value(&response, "X-RateLimit-Remaining").unwrap_or(5.0) as u32;
            limit.reset_at =
                header_value(&response, "X-RateLimit-Reset").unwrap_or_else(|| now_epoch() + 5.0);
        }

        let status = response.status();
        if status.as_u16() == 429 {
            let retry_after = response
                .json::<serde_json::Value>()
                .await
                .ok()
                .and_then(|v| v["retry_after"].as_f64())
                .unwrap_or(1.0);
            warn!("Rate limited, retrying after {:.2}s", retry_after);
            tokio::time::sleep(Duration::from_secs_f64(retry_after)).await;
            return Box::pin(self.get_json(channel_id, endpoint)).await;
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CollectionError::new(
                channel_id,
                format!("API error {}: {}", status, body),
            ));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| CollectionError::new(channel_id, format!("bad response body: {}", e)))
    }

    async fn channel_name(&self, channel_id: &str) -> String {
        // The name is cosmetic (titles, prompt keyword scan); degrade rather
        // than failing the whole run when the lookup breaks.
        match self
            .get_json::<RawChannel>(channel_id, &format!("/channels/{}", channel_id))
            .await
        {
            Ok(channel) => channel
                .name
                .unwrap_or_else(|| format!("Channel {}", channel_id)),
            Err(err) => {
                warn!("Failed to look up channel name: {}", err);
                format!("Channel {}", channel_id)
            }
        }
    }

    async fn fetch_page(
        &self,
        channel_id: &str,
        before: Option<&str>,
    ) -> Result<Vec<RawMessage>, CollectionError> {
        let mut endpoint = format!("/channels/{}/messages?limit={}", channel_id, PAGE_SIZE);
        if let Some(before_id) = before {
            endpoint.push_str(&format!("&before={}", before_id));
        }
        self.get_json(channel_id, &endpoint).await
    }
}

#[async_trait]
impl MessageCollector for DiscordReader {
    async fn collect(
        &self,
        channel_id: &str,
        window: &Window,
    ) -> Result<CollectedChannel, CollectionError> {
        let channel_name = self.channel_name(channel_id).await;
        info!(
            "Collecting messages from #{} ({}) since {}",
            channel_name, channel_id, window.start
        );

        let mut messages = Vec::new();
        let mut before: Option<String> = None;
        let mut requests = 0;

        loop {
            requests += 1;
            if requests > MAX_REQUESTS {
                warn!(
                    "Request cap ({}) reached for channel {}, stopping pagination",
                    MAX_REQUESTS, channel_id
                );
                break;
            }

            let page = self.fetch_page(channel_id, before.as_deref()).await?;
            if page.is_empty() {
                break;
            }

            // Pages arrive newest-first; the last entry is the oldest.
            let oldest = parse_timestamp(&page[page.len() - 1].timestamp, channel_id)?;
            before = Some(page[page.len() - 1].id.clone());

            for raw in page {
                let timestamp = parse_timestamp(&raw.timestamp, channel_id)?;
                if window.contains(timestamp) {
                    if let Some(message) = convert(raw, timestamp) {
                        messages.push(message);
                    }
                }
            }

            if oldest < window.start {
                break;
            }

            tokio::time::sleep(PAGE_DELAY).await;
        }

        messages.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        debug!(
            "Collected {} messages from #{}",
            messages.len(),
            channel_name
        );
        Ok(CollectedChannel {
            channel_name,
            messages,
        })
    }
}

fn parse_timestamp(raw: &str, channel_id: &str) -> Result<DateTime<Utc>, CollectionError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| CollectionError::new(channel_id, format!("bad timestamp {:?}: {}", raw, e)))
}

/// Convert a raw API message. Empty messages (attachment-only system noise
/// with no author) are dropped.
fn convert(raw: RawMessage, timestamp: DateTime<Utc>) -> Option<Message> {
    let author = raw.author?;
    if raw.content.is_empty() && raw.attachments.is_empty() {
        return None;
    }
    Some(Message {
        id: raw.id,
        author: Author {
            name: author.username,
            id: author.id,
        },
        content: raw.content,
        timestamp,
        channel_id: raw.channel_id,
        attachments: raw
            .attachments
            .into_iter()
            .map(|a| Attachment {
                url: a.url,
                kind: a.content_type.unwrap_or_else(|| "unknown".to_string()),
            })
            .collect(),
    })
}

fn header_value(response: &reqwest::Response, name: &str) -> Option<f64> {
    response
        .headers()
        .get(name)?
        .to_str()
        .ok()?
        .parse::<f64>()
        .ok()
}

fn now_epoch() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn raw(id: &str, content: &str, attachments: Vec<RawAttachment>) -> RawMessage {
        RawMessage {
            id: id.to_string(),
            content: content.to_string(),
            timestamp: "2025-03-14T09:00:00+00:00".to_string(),
            author: Some(RawAuthor {
                username: "alice".to_string(),
                id: "1".to_string(),
            }),
            channel_id: "100".to_string(),
            attachments,
        }
    }

    #[test]
    fn convert_keeps_text_messages() {
        let ts = Utc.with_ymd_and_hms(2025, 3, 14, 9, 0, 0).unwrap();
        let message = convert(raw("1", "hello", Vec::new()), ts).unwrap();
        assert_eq!(message.content, "hello");
        assert_eq!(message.author.name, "alice");
    }

    #[test]
    fn convert_drops_messages_with_no_content_and_no_attachments() {
        let ts = Utc.with_ymd_and_hms(2025, 3, 14, 9, 0, 0).unwrap();
        assert!(convert(raw("1", "", Vec::new()), ts).is_none());
    }

    #[test]
    fn convert_keeps_attachment_only_messages() {
        let ts = Utc.with_ymd_and_hms(2025, 3, 14, 9, 0, 0).unwrap();
        let attachments = vec![RawAttachment {
            url: "https://cdn.example/pic.png".to_string(),
            content_type: Some("image/png".to_string()),
        }];
        let message = convert(raw("1", "", attachments), ts).unwrap();
        assert!(message.content.is_empty());
        assert_eq!(message.attachments[0].kind, "image/png");
    }

    #[test]
    fn timestamps_parse_discord_format() {
        let ts = parse_timestamp("2025-03-14T09:30:00.123000+00:00", "100").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2025, 3, 14, 9, 30, 0).unwrap() + chrono::Duration::milliseconds(123));
    }
}
