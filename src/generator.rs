use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use tracing::{info, warn};

use crate::collector::{MessageCollector, Window};
use crate::config::PromptsConfig;
use crate::error::SummaryGenerationError;
use crate::model::Summary;
use crate::prompts::{PromptKind, PromptLibrary, PromptPair};
use crate::summarize::Summarizer;

/// Fixed summary body for windows with no messages. No provider is called.
pub const NO_ACTIVITY_TEXT: &str = "No activity in this channel during the collection window.";

/// Orchestrates one channel's summarization: collect, select prompts, run the
/// primary provider, fall back to the secondary on failure.
pub struct SummaryGenerator {
    collector: Arc<dyn MessageCollector>,
    primary: Arc<dyn Summarizer>,
    fallback: Option<Arc<dyn Summarizer>>,
    prompts: PromptLibrary,
    channel_kinds: HashMap<String, PromptKind>,
}

impl SummaryGenerator {
    pub fn new(
        collector: Arc<dyn MessageCollector>,
        primary: Arc<dyn Summarizer>,
        fallback: Option<Arc<dyn Summarizer>>,
        prompts_config: &PromptsConfig,
    ) -> Self {
        let mut channel_kinds = HashMap::new();
        for (channel_id, kind_name) in &prompts_config.channel_kinds {
            match PromptKind::parse(kind_name) {
                Some(kind) => {
                    channel_kinds.insert(channel_id.clone(), kind);
                }
                None => warn!(
                    "Unknown prompt kind {:?} configured for channel {}, ignoring",
                    kind_name, channel_id
                ),
            }
        }
        Self {
            collector,
            primary,
            fallback,
            prompts: PromptLibrary::default(),
            channel_kinds,
        }
    }

    /// Generate one channel's summary over the window. An explicit
    /// `override_pair` bypasses prompt selection entirely.
    pub async fn generate(
        &self,
        channel_id: &str,
        window: &Window,
        override_pair: Option<&PromptPair>,
    ) -> Result<Summary, SummaryGenerationError> {
        let collected = self.collector.collect(channel_id, window).await?;

        if collected.messages.is_empty() {
            info!(
                "No messages in #{} for this window, producing placeholder",
                collected.channel_name
            );
            return Ok(Summary {
                channel_id: channel_id.to_string(),
                channel_name: collected.channel_name,
                window_start: window.start,
                window_end: window.end,
                text: NO_ACTIVITY_TEXT.to_string(),
                provider_used: self.primary.provider(),
                message_count: 0,
                generated_at: Utc::now(),
            });
        }

        let explicit = self.channel_kinds.get(channel_id).copied();
        let pair = self
            .prompts
            .select(&collected.channel_name, explicit, override_pair);

        info!(
            "Summarizing {} messages from #{} with {}",
            collected.messages.len(),
            collected.channel_name,
            self.primary.provider()
        );

        let primary_err = match self.primary.summarize(&collected.messages, &pair).await {
            Ok(text) => {
                return Ok(self.build_summary(
                    channel_id,
                    &collected.channel_name,
                    window,
                    text,
                    self.primary.provider(),
                    collected.messages.len(),
                ));
            }
            Err(err) => err,
        };

        let Some(fallback) = &self.fallback else {
            return Err(SummaryGenerationError::AllProvidersFailed {
                channel_id: channel_id.to_string(),
                primary: primary_err,
                fallback: None,
            });
        };

        warn!(
            "Primary provider failed for #{} ({}), trying {}",
            collected.channel_name,
            primary_err,
            fallback.provider()
        );

        match fallback.summarize(&collected.messages, &pair).await {
            Ok(text) => {
                info!(
                    "Fallback provider {} succeeded for #{}",
                    fallback.provider(),
                    collected.channel_name
                );
                Ok(self.build_summary(
                    channel_id,
                    &collected.channel_name,
                    window,
                    text,
                    fallback.provider(),
                    collected.messages.len(),
                ))
            }
            Err(fallback_err) => Err(SummaryGenerationError::AllProvidersFailed {
                channel_id: channel_id.to_string(),
                primary: primary_err,
                fallback: Some(fallback_err),
            }),
        }
    }

    /// Generate summaries for several channels concurrently. One channel's
    /// failure never aborts another; each result is reported separately.
    pub async fn generate_all(
        &self,
        channel_ids: &[String],
        window: &Window,
    ) -> Vec<(String, Result<Summary, SummaryGenerationError>)> {
        let runs = channel_ids.iter().map(|channel_id| async move {
            let result = self.generate(channel_id, window, None).await;
            (channel_id.clone(), result)
        });
        join_all(runs).await
    }

    fn build_summary(
        &self,
        channel_id: &str,
        channel_name: &str,
        window: &Window,
        text: String,
        provider: crate::config::Provider,
        message_count: usize,
    ) -> Summary {
        Summary {
            channel_id: channel_id.to_string(),
            channel_name: channel_name.to_string(),
            window_start: window.start,
            window_end: window.end,
            text,
            provider_used: provider,
            message_count,
            generated_at: Utc::now(),
        }
    }
}
