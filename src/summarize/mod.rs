pub mod anthropic;
pub mod deepseek;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::config::{LlmConfig, Provider};
use crate::error::{ProviderError, ProviderErrorKind};
use crate::model::Message;
use crate::prompts::{self, PromptPair};

pub use anthropic::AnthropicSummarizer;
pub use deepseek::DeepSeekSummarizer;

/// Timeout applied to each individual provider request.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// How transient provider failures are retried before giving up.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

/// A provider capable of turning an ordered conversation into a summary.
///
/// Variants implement `complete` (one raw model call); the chunking, retry
/// and combine logic is shared through the provided `summarize` driver.
#[async_trait]
pub trait Summarizer: Send + Sync {
    fn provider(&self) -> Provider;

    /// Serialized conversations longer than this are split into chunks.
    fn max_input_chars(&self) -> usize;

    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::default()
    }

    /// One raw completion call: system prompt + rendered user prompt in,
    /// summary text out.
    async fn complete(&self, system: &str, user: &str) -> Result<String, ProviderError>;

    /// Summarize an ordered batch of messages with the given prompt pair.
    ///
    /// Conversations over the input budget are split on message boundaries,
    /// each chunk summarized with the same pair, and the partials merged by
    /// exactly one combine-pass call.
    async fn summarize(
        &self,
        messages: &[Message],
        pair: &PromptPair,
    ) -> Result<String, ProviderError> {
        let lines: Vec<String> = messages.iter().map(|m| m.formatted_line()).collect();
        let chunks = chunk_lines(&lines, self.max_input_chars());

        debug!(
            provider = %self.provider(),
            messages = messages.len(),
            chunks = chunks.len(),
            "serialized conversation"
        );

        if chunks.len() == 1 {
            let user = pair.render(&chunks[0]);
            return self.complete_with_retry(&pair.system, &user).await;
        }

        let total = chunks.len();
        let mut partials = Vec::with_capacity(total);
        for (index, chunk) in chunks.iter().enumerate() {
            info!(
                provider = %self.provider(),
                "summarizing chunk {}/{}",
                index + 1,
                total
            );
            let user = pair.render(chunk);
            partials.push(self.complete_with_retry(&pair.system, &user).await?);
        }

        let combine = prompts::combine_pair();
        let joined = partials
            .iter()
            .enumerate()
            .map(|(i, partial)| format!("Part {}:\n{}", i + 1, partial))
            .collect::<Vec<_>>()
            .join("\n\n");
        let user = combine.render(&joined);
        self.complete_with_retry(&combine.system, &user).await
    }

    /// Run `complete` under the retry policy. Only transient failures are
    /// retried; the delay doubles between attempts.
    async fn complete_with_retry(
        &self,
        system: &str,
        user: &str,
    ) -> Result<String, ProviderError> {
        let policy = self.retry_policy();
        let mut delay = policy.base_delay;
        let mut attempt = 0;

        loop {
            attempt += 1;
            match self.complete(system, user).await {
                Ok(text) => {
                    if text.trim().is_empty() {
                        return Err(ProviderError::new(
                            self.provider(),
                            ProviderErrorKind::EmptyResponse,
                            "provider returned empty text",
                        ));
                    }
                    return Ok(text);
                }
                Err(err) if err.kind.is_transient() && attempt < policy.attempts => {
                    warn!(
                        provider = %self.provider(),
                        attempt,
                        "transient provider failure, retrying in {:?}: {}",
                        delay,
                        err
                    );
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

/// Build the summarizer variant for a configured provider.
pub fn create_summarizer(provider: Provider, llm: &LlmConfig) -> Arc<dyn Summarizer> {
    let config = llm.provider_config(provider).clone();
    match provider {
        Provider::Anthropic => Arc::new(AnthropicSummarizer::new(config)),
        Provider::Deepseek => Arc::new(DeepSeekSummarizer::new(config)),
    }
}

/// Map a reqwest failure onto the provider error taxonomy.
pub(crate) fn transport_error(provider: Provider, err: reqwest::Error) -> ProviderError {
    let kind = if err.is_timeout() {
        ProviderErrorKind::Timeout
    } else {
        ProviderErrorKind::Transport
    };
    ProviderError::new(provider, kind, err.to_string())
}

/// Greedy-pack serialized lines into chunks of at most `budget` characters.
/// Boundaries always fall between messages; a single oversized line becomes
/// its own chunk rather than being split.
fn chunk_lines(lines: &[String], budget: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    for line in lines {
        let added = if current.is_empty() {
            line.len()
        } else {
            line.len() + 1
        };
        if !current.is_empty() && current.len() + added > budget {
            chunks.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push('\n');
        }
        current.push_str(line);
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    if chunks.is_empty() {
        // An empty batch still yields one (empty) chunk so callers see a
        // uniform shape; the generator short-circuits before reaching here.
        chunks.push(String::new());
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::sync::atomic::{AtomicU32, Ordering};

    use crate::model::{Author, Message};
    use crate::prompts::PromptPair;

    fn message(id: u32, minute: u32, content: &str) -> Message {
        Message {
            id: id.to_string(),
            author: Author {
                name: "alice".to_string(),
                id: "1".to_string(),
            },
            content: content.to_string(),
            timestamp: Utc.with_ymd_and_hms(2025, 3, 14, 10, minute, 0).unwrap(),
            channel_id: "100".to_string(),
            attachments: Vec::new(),
        }
    }

    #[test]
    fn chunking_fits_budget_and_preserves_every_line() {
        let lines: Vec<String> = (0..20).map(|i| format!("line number {:02}", i)).collect();
        let chunks = chunk_lines(&lines, 40);

        for chunk in &chunks {
            assert!(chunk.len() <= 40, "chunk over budget: {:?}", chunk);
        }
        let rejoined = chunks.join("\n");
        assert_eq!(rejoined, lines.join("\n"));
    }

    #[test]
    fn short_input_stays_in_one_chunk() {
        let lines = vec!["a".to_string(), "b".to_string()];
        assert_eq!(chunk_lines(&lines, 100), vec!["a\nb".to_string()]);
    }

    #[test]
    fn oversized_line_gets_its_own_chunk() {
        let lines = vec![
            "short".to_string(),
            "x".repeat(50),
            "tail".to_string(),
        ];
        let chunks = chunk_lines(&lines, 20);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[1], "x".repeat(50));
    }

    #[test]
    fn serialized_lines_preserve_timestamp_order() {
        let messages = vec![
            message(1, 0, "first"),
            message(2, 15, "second"),
            message(3, 30, "third"),
        ];
        let lines: Vec<String> = messages.iter().map(|m| m.formatted_line()).collect();
        let first = lines.iter().position(|l| l.contains("first")).unwrap();
        let second = lines.iter().position(|l| l.contains("second")).unwrap();
        let third = lines.iter().position(|l| l.contains("third")).unwrap();
        assert!(first < second && second < third);
    }

    /// Mock summarizer with a controllable input budget and failure script.
    struct ScriptedSummarizer {
        budget: usize,
        calls: AtomicU32,
        fail_first: u32,
        failure_kind: ProviderErrorKind,
    }

    impl ScriptedSummarizer {
        fn succeeding(budget: usize) -> Self {
            Self {
                budget,
                calls: AtomicU32::new(0),
                fail_first: 0,
                failure_kind: ProviderErrorKind::Server,
            }
        }

        fn failing_first(n: u32, kind: ProviderErrorKind) -> Self {
            Self {
                budget: 10_000,
                calls: AtomicU32::new(0),
                fail_first: n,
                failure_kind: kind,
            }
        }
    }

    #[async_trait]
    impl Summarizer for ScriptedSummarizer {
        fn provider(&self) -> Provider {
            Provider::Anthropic
        }

        fn max_input_chars(&self) -> usize {
            self.budget
        }

        fn retry_policy(&self) -> RetryPolicy {
            RetryPolicy {
                attempts: 3,
                base_delay: Duration::ZERO,
            }
        }

        async fn complete(&self, _system: &str, user: &str) -> Result<String, ProviderError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.fail_first {
                return Err(ProviderError::new(
                    self.provider(),
                    self.failure_kind,
                    "scripted failure",
                ));
            }
            Ok(format!("summary of {} chars", user.len()))
        }
    }

    fn pair() -> PromptPair {
        PromptPair::new("sys", "{text}")
    }

    #[tokio::test]
    async fn single_chunk_makes_exactly_one_call() {
        let summarizer = ScriptedSummarizer::succeeding(10_000);
        let messages = vec![message(1, 0, "hello"), message(2, 1, "world")];
        summarizer.summarize(&messages, &pair()).await.unwrap();
        assert_eq!(summarizer.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn chunked_input_adds_exactly_one_combine_call() {
        let summarizer = ScriptedSummarizer::succeeding(60);
        let messages: Vec<Message> = (0..10)
            .map(|i| message(i, i, &format!("message body number {}", i)))
            .collect();

        let lines: Vec<String> = messages.iter().map(|m| m.formatted_line()).collect();
        let expected_chunks = chunk_lines(&lines, 60).len() as u32;
        assert!(expected_chunks > 1);

        summarizer.summarize(&messages, &pair()).await.unwrap();
        assert_eq!(
            summarizer.calls.load(Ordering::SeqCst),
            expected_chunks + 1
        );
    }

    #[tokio::test]
    async fn transient_failures_are_retried_until_success() {
        let summarizer = ScriptedSummarizer::failing_first(2, ProviderErrorKind::Server);
        let messages = vec![message(1, 0, "hello")];
        let text = summarizer.summarize(&messages, &pair()).await.unwrap();
        assert!(text.starts_with("summary of"));
        assert_eq!(summarizer.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn retry_budget_exhaustion_surfaces_the_error() {
        let summarizer = ScriptedSummarizer::failing_first(5, ProviderErrorKind::Timeout);
        let messages = vec![message(1, 0, "hello")];
        let err = summarizer.summarize(&messages, &pair()).await.unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::Timeout);
        assert_eq!(summarizer.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn auth_failures_are_not_retried() {
        let summarizer = ScriptedSummarizer::failing_first(5, ProviderErrorKind::Auth);
        let messages = vec![message(1, 0, "hello")];
        let err = summarizer.summarize(&messages, &pair()).await.unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::Auth);
        assert_eq!(summarizer.calls.load(Ordering::SeqCst), 1);
    }
}
