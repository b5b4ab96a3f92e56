use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    Anthropic,
    Deepseek,
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Provider::Anthropic => write!(f, "anthropic"),
            Provider::Deepseek => write!(f, "deepseek"),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub discord: DiscordConfig,
    pub llm: LlmConfig,
    #[serde(default = "default_scheduler_config")]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub prompts: PromptsConfig,
    #[serde(default = "default_replay_config")]
    pub replay: ReplayConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DiscordConfig {
    /// User token for reading source channels.
    pub user_token: String,
    /// Channels to summarize, by id.
    pub source_channel_ids: Vec<String>,
    /// Bot token for posting summaries.
    pub bot_token: String,
    pub destination_channel_id: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    #[serde(default)]
    pub primary: Provider,
    /// Secondary provider tried when the primary fails. Ignored if it names
    /// the same provider as `primary`.
    #[serde(default)]
    pub fallback: Option<Provider>,
    #[serde(default)]
    pub anthropic: ProviderConfig,
    #[serde(default)]
    pub deepseek: ProviderConfig,
}

impl LlmConfig {
    pub fn provider_config(&self, provider: Provider) -> &ProviderConfig {
        match provider {
            Provider::Anthropic => &self.anthropic,
            Provider::Deepseek => &self.deepseek,
        }
    }

    /// Fallback provider, only when configured and distinct from the primary.
    pub fn effective_fallback(&self) -> Option<Provider> {
        self.fallback.filter(|f| *f != self.primary)
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ProviderConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub base_url: String,
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
    /// Serialized conversations longer than this are chunked.
    #[serde(default)]
    pub max_input_chars: usize,
}

impl ProviderConfig {
    /// Effective model: the configured value, or the canonical default for
    /// the provider when left empty.
    pub fn effective_model(&self, provider: Provider) -> &str {
        if !self.model.is_empty() {
            return &self.model;
        }
        match provider {
            Provider::Anthropic => "claude-3-7-sonnet-20250219",
            Provider::Deepseek => "deepseek-chat",
        }
    }

    pub fn effective_base_url(&self, provider: Provider) -> &str {
        if !self.base_url.is_empty() {
            return &self.base_url;
        }
        match provider {
            Provider::Anthropic => "https://api.anthropic.com",
            Provider::Deepseek => "https://api.deepseek.com",
        }
    }

    pub fn effective_max_input_chars(&self, provider: Provider) -> usize {
        if self.max_input_chars > 0 {
            return self.max_input_chars;
        }
        match provider {
            Provider::Anthropic => 25_000,
            Provider::Deepseek => 12_000,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SchedulerConfig {
    #[serde(default = "default_summary_hour")]
    pub hour: u8,
    #[serde(default)]
    pub minute: u8,
    /// How many days of history each run summarizes.
    #[serde(default = "default_window_days")]
    pub window_days: i64,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct PromptsConfig {
    /// Explicit prompt kind per channel id (e.g. "defi"). Unknown kinds are
    /// ignored and the keyword scan applies instead.
    #[serde(default)]
    pub channel_kinds: HashMap<String, String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReplayConfig {
    #[serde(default = "default_capture_path")]
    pub capture_path: PathBuf,
}

fn default_max_output_tokens() -> u32 {
    1000
}

fn default_summary_hour() -> u8 {
    23
}

fn default_window_days() -> i64 {
    1
}

fn default_capture_path() -> PathBuf {
    PathBuf::from("captures/messages.json")
}

fn default_scheduler_config() -> SchedulerConfig {
    SchedulerConfig {
        hour: default_summary_hour(),
        minute: 0,
        window_days: default_window_days(),
    }
}

fn default_replay_config() -> ReplayConfig {
    ReplayConfig {
        capture_path: default_capture_path(),
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        if config.discord.source_channel_ids.is_empty() {
            anyhow::bail!("At least one source channel id must be configured");
        }
        if config.scheduler.hour > 23 || config.scheduler.minute > 59 {
            anyhow::bail!(
                "Invalid schedule time {:02}:{:02}",
                config.scheduler.hour,
                config.scheduler.minute
            );
        }

        let primary_key = &config.llm.provider_config(config.llm.primary).api_key;
        if primary_key.is_empty() {
            anyhow::bail!(
                "No API key configured for primary provider {}",
                config.llm.primary
            );
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [discord]
        user_token = "user-tok"
        source_channel_ids = ["111", "222"]
        bot_token = "bot-tok"
        destination_channel_id = "999"

        [llm]
        primary = "anthropic"
        fallback = "deepseek"

        [llm.anthropic]
        api_key = "sk-ant"

        [llm.deepseek]
        api_key = "sk-ds"
    "#;

    #[test]
    fn parses_minimal_config_with_defaults() {
        let config: Config = toml::from_str(MINIMAL).unwrap();
        assert_eq!(config.llm.primary, Provider::Anthropic);
        assert_eq!(config.llm.effective_fallback(), Some(Provider::Deepseek));
        assert_eq!(config.scheduler.hour, 23);
        assert_eq!(config.scheduler.minute, 0);
        assert_eq!(config.scheduler.window_days, 1);
        assert_eq!(
            config.llm.anthropic.effective_model(Provider::Anthropic),
            "claude-3-7-sonnet-20250219"
        );
        assert_eq!(
            config
                .llm
                .deepseek
                .effective_max_input_chars(Provider::Deepseek),
            12_000
        );
    }

    #[test]
    fn fallback_equal_to_primary_is_ignored() {
        let mut config: Config = toml::from_str(MINIMAL).unwrap();
        config.llm.fallback = Some(Provider::Anthropic);
        assert_eq!(config.llm.effective_fallback(), None);
    }

    #[test]
    fn explicit_values_override_defaults() {
        let toml_str = r#"
            [discord]
            user_token = "u"
            source_channel_ids = ["1"]
            bot_token = "b"
            destination_channel_id = "2"

            [llm]
            primary = "deepseek"

            [llm.deepseek]
            api_key = "k"
            model = "deepseek-reasoner"
            max_input_chars = 8000

            [scheduler]
            hour = 6
            minute = 30
            window_days = 3
        "#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.llm.primary, Provider::Deepseek);
        assert_eq!(config.llm.effective_fallback(), None);
        assert_eq!(
            config.llm.deepseek.effective_model(Provider::Deepseek),
            "deepseek-reasoner"
        );
        assert_eq!(
            config
                .llm
                .deepseek
                .effective_max_input_chars(Provider::Deepseek),
            8000
        );
        assert_eq!(config.scheduler.hour, 6);
        assert_eq!(config.scheduler.window_days, 3);
    }
}
