use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::error::PostError;
use crate::model::Summary;

const API_BASE: &str = "https://discord.com/api/v9";
const EMBED_BLUE: u32 = 0x3498db;
const EMBED_RED: u32 = 0xe74c3c;

/// Destination for generated summaries. Posting is fire-and-forget from the
/// core's point of view; a failed post is reported, never retried here.
#[async_trait]
pub trait SummaryPoster: Send + Sync {
    async fn post(&self, summary: &Summary) -> Result<(), PostError>;

    /// Report a failed channel run to the destination.
    async fn post_error(&self, message: &str) -> Result<(), PostError>;
}

/// Posts summaries to a Discord channel as embeds, authenticated as a bot.
pub struct DiscordPoster {
    client: reqwest::Client,
    bot_token: String,
    destination_channel_id: String,
}

impl DiscordPoster {
    pub fn new(bot_token: impl Into<String>, destination_channel_id: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            bot_token: bot_token.into(),
            destination_channel_id: destination_channel_id.into(),
        }
    }

    async fn send_embed(&self, embed: Value) -> Result<(), PostError> {
        let url = format!(
            "{}/channels/{}/messages",
            API_BASE, self.destination_channel_id
        );
        debug!("Posting embed to {}", url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bot {}", self.bot_token))
            .header("Content-Type", "application/json")
            .json(&json!({ "embeds": [embed] }))
            .send()
            .await
            .map_err(|e| {
                PostError::new(&self.destination_channel_id, format!("request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PostError::new(
                &self.destination_channel_id,
                format!("API error {}: {}", status, body),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl SummaryPoster for DiscordPoster {
    async fn post(&self, summary: &Summary) -> Result<(), PostError> {
        self.send_embed(summary_embed(summary)).await?;
        info!(
            "Posted summary for #{} to channel {}",
            summary.channel_name, self.destination_channel_id
        );
        Ok(())
    }

    async fn post_error(&self, message: &str) -> Result<(), PostError> {
        self.send_embed(error_embed(message)).await
    }
}

/// Poster that only logs, for replay runs with posting disabled.
pub struct LogPoster;

#[async_trait]
impl SummaryPoster for LogPoster {
    async fn post(&self, summary: &Summary) -> Result<(), PostError> {
        info!(
            "Would post summary '{}' ({} chars, {} messages, via {})",
            summary.title(),
            summary.character_count(),
            summary.message_count,
            summary.provider_used
        );
        Ok(())
    }

    async fn post_error(&self, message: &str) -> Result<(), PostError> {
        info!("Would post error: {}", message);
        Ok(())
    }
}

fn summary_embed(summary: &Summary) -> Value {
    json!({
        "title": format!("{} ({})", summary.title(), summary.generated_at.format("%Y-%m-%d")),
        "description": summary.text,
        "color": EMBED_BLUE,
        "footer": {
            "text": format!(
                "Summary by {} • {} messages analyzed",
                summary.provider_used, summary.message_count
            )
        }
    })
}

fn error_embed(message: &str) -> Value {
    json!({
        "title": "Error Generating Summary",
        "description": message,
        "color": EMBED_RED,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Provider;
    use chrono::{TimeZone, Utc};

    fn sample_summary() -> Summary {
        Summary {
            channel_id: "100".to_string(),
            channel_name: "general".to_string(),
            window_start: Utc.with_ymd_and_hms(2025, 3, 13, 0, 0, 0).unwrap(),
            window_end: Utc.with_ymd_and_hms(2025, 3, 14, 0, 0, 0).unwrap(),
            text: "The channel discussed release planning.".to_string(),
            provider_used: Provider::Deepseek,
            message_count: 42,
            generated_at: Utc.with_ymd_and_hms(2025, 3, 14, 23, 0, 0).unwrap(),
        }
    }

    #[test]
    fn summary_embed_has_title_body_and_footer() {
        let embed = summary_embed(&sample_summary());
        assert_eq!(embed["title"], "Channel Recap: general (2025-03-14)");
        assert_eq!(
            embed["description"],
            "The channel discussed release planning."
        );
        assert_eq!(
            embed["footer"]["text"],
            "Summary by deepseek • 42 messages analyzed"
        );
        assert_eq!(embed["color"], EMBED_BLUE);
    }

    #[test]
    fn error_embed_is_red() {
        let embed = error_embed("provider exploded");
        assert_eq!(embed["description"], "provider exploded");
        assert_eq!(embed["color"], EMBED_RED);
    }

    #[tokio::test]
    async fn log_poster_always_succeeds() {
        let poster = LogPoster;
        poster.post(&sample_summary()).await.unwrap();
        poster.post_error("boom").await.unwrap();
    }
}
