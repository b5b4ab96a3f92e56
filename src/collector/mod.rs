pub mod discord;
pub mod replay;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::error::CollectionError;
use crate::model::Message;

pub use discord::DiscordReader;
pub use replay::ReplayReader;

/// UTC time range of messages eligible for one summarization run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Window {
    /// Window ending now and reaching `days` back.
    pub fn last_days(days: i64) -> Self {
        let end = Utc::now();
        Self {
            start: end - Duration::days(days),
            end,
        }
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start && instant <= self.end
    }
}

/// One channel's collected batch. `messages` are ordered by timestamp
/// ascending; a failed collection never yields a partial batch.
#[derive(Debug, Clone)]
pub struct CollectedChannel {
    pub channel_name: String,
    pub messages: Vec<Message>,
}

/// Source of messages for the generator. Implemented by the live Discord
/// reader and by the offline replay reader.
#[async_trait]
pub trait MessageCollector: Send + Sync {
    async fn collect(
        &self,
        channel_id: &str,
        window: &Window,
    ) -> Result<CollectedChannel, CollectionError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn window_bounds_are_inclusive() {
        let start = Utc.with_ymd_and_hms(2025, 3, 13, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2025, 3, 14, 0, 0, 0).unwrap();
        let window = Window { start, end };

        assert!(window.contains(start));
        assert!(window.contains(end));
        assert!(!window.contains(start - Duration::seconds(1)));
        assert!(!window.contains(end + Duration::seconds(1)));
    }

    #[test]
    fn last_days_spans_the_requested_length() {
        let window = Window::last_days(2);
        assert_eq!(window.end - window.start, Duration::days(2));
    }
}
