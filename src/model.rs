use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::Provider;

/// Who sent a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub name: String,
    pub id: String,
}

/// Attachment metadata carried along for context. Attachments themselves are
/// never summarized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub url: String,
    pub kind: String,
}

/// One chat message as read from a source channel. Immutable once collected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub author: Author,
    /// May be empty for attachment-only messages.
    #[serde(default)]
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub channel_id: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

impl Message {
    /// One line of the serialized conversation: `[HH:MM] author: content`.
    pub fn formatted_line(&self) -> String {
        format!(
            "[{}] {}: {}",
            self.timestamp.format("%H:%M"),
            self.author.name,
            self.content
        )
    }
}

/// A generated summary for one channel over one time window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Summary {
    pub channel_id: String,
    pub channel_name: String,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub text: String,
    pub provider_used: Provider,
    /// Number of messages actually fed to the summarizer.
    pub message_count: usize,
    pub generated_at: DateTime<Utc>,
}

impl Summary {
    pub fn title(&self) -> String {
        format!("Channel Recap: {}", self.channel_name)
    }

    pub fn character_count(&self) -> usize {
        self.text.chars().count()
    }
}
