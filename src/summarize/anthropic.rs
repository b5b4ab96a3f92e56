use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{Provider, ProviderConfig};
use crate::error::{ProviderError, ProviderErrorKind};
use crate::summarize::{transport_error, Summarizer, REQUEST_TIMEOUT};

const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<ApiMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ApiMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: String,
}

/// Summarizer variant backed by Anthropic's messages API.
pub struct AnthropicSummarizer {
    client: reqwest::Client,
    config: ProviderConfig,
}

impl AnthropicSummarizer {
    pub fn new(config: ProviderConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }
}

#[async_trait]
impl Summarizer for AnthropicSummarizer {
    fn provider(&self) -> Provider {
        Provider::Anthropic
    }

    fn max_input_chars(&self) -> usize {
        self.config.effective_max_input_chars(Provider::Anthropic)
    }

    async fn complete(&self, system: &str, user: &str) -> Result<String, ProviderError> {
        let provider = self.provider();
        let request = MessagesRequest {
            model: self.config.effective_model(provider),
            max_tokens: self.config.max_output_tokens,
            system,
            messages: vec![ApiMessage {
                role: "user",
                content: user,
            }],
        };

        let url = format!("{}/v1/messages", self.config.effective_base_url(provider));
        debug!("Sending request to Anthropic: {}", url);

        let response = self
            .client
            .post(&url)
            .timeout(REQUEST_TIMEOUT)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
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

        let parsed: MessagesResponse = response.json().await.map_err(|e| {
            ProviderError::new(
                provider,
                ProviderErrorKind::EmptyResponse,
                format!("failed to parse response: {}", e),
            )
        })?;

        parsed
            .content
            .into_iter()
            .next()
            .map(|block| block.text)
            .ok_or_else(|| {
                ProviderError::new(
                    provider,
                    ProviderErrorKind::EmptyResponse,
                    "response contained no content blocks",
                )
            })
    }
}
