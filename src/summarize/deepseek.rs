use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{Provider, ProviderConfig};
use crate::error::{ProviderError, ProviderErrorKind};
use crate::summarize::{transport_error, Summarizer, REQUEST_TIMEOUT};

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: String,
}

/// Summarizer variant backed by DeepSeek's OpenAI-compatible chat API.
pub struct DeepSeekSummarizer {
    client: reqwest::Client,
    config: ProviderConfig,
}

impl DeepSeekSummarizer {
    pub fn new(config: ProviderConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }
}

#[async_trait]
impl Summarizer for DeepSeekSummarizer {
    fn provider(&self) -> Provider {
        Provider::Deepseek
    }

    fn max_input_chars(&self) -> usize {
        self.config.effective_max_input_chars(Provider::Deepseek)
    }

    async fn complete(&self, system: &str, user: &str) -> Result<String, ProviderError> {
        let provider = self.provider();
        let request = ChatRequest {
            model: self.config.effective_model(provider),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            max_tokens: self.config.max_output_tokens,
        };

        let url = format!(
            "{}/chat/completions",
            self.config.effective_base_url(provider)
        );
        debug!("Sending request to DeepSeek: {}", url);

        let response = self
            .client
            .post(&url)
            .timeout(REQUEST_TIMEOUT)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| transport_error(provider, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(provider, status.as_u16(), body));
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| {
            ProviderError::new(
                provider,
                ProviderErrorKind::EmptyResponse,
                format!("failed to parse response: {}", e),
            )
        })?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| {
                ProviderError::new(
                    provider,
                    ProviderErrorKind::EmptyResponse,
                    "response contained no choices",
                )
            })
    }
}
