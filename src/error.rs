use thiserror::Error;

use crate::config::Provider;

/// What went wrong inside a provider call. Drives the retry decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    Auth,
    BadRequest,
    RateLimited,
    Timeout,
    Server,
    Transport,
    EmptyResponse,
}

impl ProviderErrorKind {
    /// Transient failures are retried with backoff; the rest fail immediately.
    pub fn is_transient(self) -> bool {
        matches!(
            self,
            ProviderErrorKind::RateLimited
                | ProviderErrorKind::Timeout
                | ProviderErrorKind::Server
                | ProviderErrorKind::Transport
        )
    }
}

/// Failure of a single summarizer variant, after its retry budget is spent.
#[derive(Debug, Error)]
#[error("{provider} error{}: {message}", .status.map(|s| format!(" (HTTP {})", s)).unwrap_or_default())]
pub struct ProviderError {
    pub provider: Provider,
    pub kind: ProviderErrorKind,
    pub status: Option<u16>,
    pub message: String,
}

impl ProviderError {
    pub fn new(provider: Provider, kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        Self {
            provider,
            kind,
            status: None,
            message: message.into(),
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Classify an HTTP status into an error kind.
    pub fn from_status(provider: Provider, status: u16, body: impl Into<String>) -> Self {
        let kind = match status {
            401 | 403 => ProviderErrorKind::Auth,
            429 => ProviderErrorKind::RateLimited,
            400..=499 => ProviderErrorKind::BadRequest,
            _ => ProviderErrorKind::Server,
        };
        Self::new(provider, kind, body).with_status(status)
    }
}

/// Failure to collect messages for a channel. Fatal to that channel's run;
/// partial collections are never surfaced.
#[derive(Debug, Error)]
#[error("failed to collect messages from channel {channel_id}: {message}")]
pub struct CollectionError {
    pub channel_id: String,
    pub message: String,
}

impl CollectionError {
    pub fn new(channel_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            channel_id: channel_id.into(),
            message: message.into(),
        }
    }
}

/// Terminal failure of one channel's generation workflow.
#[derive(Debug, Error)]
pub enum SummaryGenerationError {
    #[error(transparent)]
    Collection(#[from] CollectionError),

    #[error("all providers failed for channel {channel_id}: primary: {primary}{}",
        .fallback.as_ref().map(|f| format!("; fallback: {}", f)).unwrap_or_default())]
    AllProvidersFailed {
        channel_id: String,
        primary: ProviderError,
        fallback: Option<ProviderError>,
    },
}

/// Failure to post a summary to the destination channel. The summary is not
/// regenerated; retry policy, if any, belongs to the poster.
#[derive(Debug, Error)]
#[error("failed to post to channel {channel_id}: {message}")]
pub struct PostError {
    pub channel_id: String,
    pub message: String,
}

impl PostError {
    pub fn new(channel_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            channel_id: channel_id.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_kinds() {
        assert!(ProviderErrorKind::RateLimited.is_transient());
        assert!(ProviderErrorKind::Timeout.is_transient());
        assert!(ProviderErrorKind::Server.is_transient());
        assert!(ProviderErrorKind::Transport.is_transient());
        assert!(!ProviderErrorKind::Auth.is_transient());
        assert!(!ProviderErrorKind::BadRequest.is_transient());
        assert!(!ProviderErrorKind::EmptyResponse.is_transient());
    }

    #[test]
    fn status_classification() {
        let err = ProviderError::from_status(Provider::Anthropic, 401, "bad key");
        assert_eq!(err.kind, ProviderErrorKind::Auth);
        let err = ProviderError::from_status(Provider::Deepseek, 429, "slow down");
        assert_eq!(err.kind, ProviderErrorKind::RateLimited);
        let err = ProviderError::from_status(Provider::Deepseek, 503, "unavailable");
        assert_eq!(err.kind, ProviderErrorKind::Server);
        assert_eq!(err.status, Some(503));
    }
}
