use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::collector::{CollectedChannel, MessageCollector, Window};
use crate::error::CollectionError;
use crate::model::Message;

/// On-disk capture format: channel id → channel name + messages.
/// Written by the `capture` binary, read back here.
pub type CaptureData = HashMap<String, CaptureChannel>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureChannel {
    pub channel_name: String,
    pub messages: Vec<Message>,
}

/// Offline collector that replays a previously captured data file instead of
/// calling Discord. Used for prompt development and end-to-end dry runs.
pub struct ReplayReader {
    data: CaptureData,
}

impl ReplayReader {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read capture file: {}", path.display()))?;
        let data: CaptureData = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse capture file: {}", path.display()))?;

        let total: usize = data.values().map(|c| c.messages.len()).sum();
        info!(
            "Loaded capture with {} channels, {} messages",
            data.len(),
            total
        );
        Ok(Self { data })
    }
}

#[async_trait]
impl MessageCollector for ReplayReader {
    async fn collect(
        &self,
        channel_id: &str,
        window: &Window,
    ) -> Result<CollectedChannel, CollectionError> {
        let channel = self.data.get(channel_id).ok_or_else(|| {
            CollectionError::new(channel_id, "channel not present in capture file")
        })?;

        let mut messages: Vec<Message> = channel
            .messages
            .iter()
            .filter(|m| window.contains(m.timestamp))
            .cloned()
            .collect();
        messages.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));

        info!(
            "Replayed {} messages from #{} (capture)",
            messages.len(),
            channel.channel_name
        );
        Ok(CollectedChannel {
            channel_name: channel.channel_name.clone(),
            messages,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::io::Write;

    use crate::model::Author;

    fn message(id: &str, hour: u32) -> Message {
        Message {
            id: id.to_string(),
            author: Author {
                name: "alice".to_string(),
                id: "1".to_string(),
            },
            content: format!("message {}", id),
            timestamp: Utc.with_ymd_and_hms(2025, 3, 14, hour, 0, 0).unwrap(),
            channel_id: "100".to_string(),
            attachments: Vec::new(),
        }
    }

    fn write_capture(data: &CaptureData) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", serde_json::to_string(data).unwrap()).unwrap();
        file
    }

    #[tokio::test]
    async fn replays_only_messages_inside_the_window() {
        let mut data = CaptureData::new();
        data.insert(
            "100".to_string(),
            CaptureChannel {
                channel_name: "general".to_string(),
                // Out of order on purpose; replay must sort ascending
                messages: vec![message("b", 12), message("a", 9), message("c", 23)],
            },
        );
        let file = write_capture(&data);
        let reader = ReplayReader::load(file.path()).unwrap();

        let window = Window {
            start: Utc.with_ymd_and_hms(2025, 3, 14, 8, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2025, 3, 14, 13, 0, 0).unwrap(),
        };
        let collected = reader.collect("100", &window).await.unwrap();

        assert_eq!(collected.channel_name, "general");
        let ids: Vec<&str> = collected.messages.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn unknown_channel_is_a_collection_error() {
        let file = write_capture(&CaptureData::new());
        let reader = ReplayReader::load(file.path()).unwrap();

        let err = reader
            .collect("404", &Window::last_days(1))
            .await
            .unwrap_err();
        assert_eq!(err.channel_id, "404");
    }

    #[test]
    fn malformed_capture_file_fails_to_load() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(ReplayReader::load(file.path()).is_err());
    }
}
