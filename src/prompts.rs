use std::collections::HashMap;

/// The substitution placeholder every user template must contain.
pub const TEXT_PLACEHOLDER: &str = "{text}";

/// Specialized prompt families. Selection falls back to `General` when
/// nothing more specific matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptKind {
    General,
    Defi,
    Crypto,
}

impl PromptKind {
    /// Parse a configured kind name. Unknown names yield `None`, which makes
    /// the selector fall through to the keyword scan.
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "general" => Some(PromptKind::General),
            "defi" => Some(PromptKind::Defi),
            "crypto" => Some(PromptKind::Crypto),
            _ => None,
        }
    }
}

/// A system prompt plus a user template holding exactly one `{text}`
/// placeholder for the serialized conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptPair {
    pub system: String,
    pub user_template: String,
}

impl PromptPair {
    pub fn new(system: impl Into<String>, user_template: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user_template: user_template.into(),
        }
    }

    /// Substitute the serialized conversation into the user template.
    pub fn render(&self, text: &str) -> String {
        self.user_template.replace(TEXT_PLACEHOLDER, text)
    }
}

const GENERAL_SYSTEM: &str = "\
You are an expert summarization assistant extracting key insights from chat conversations.\n\
Guidelines: identify the most significant information, stay objective and precise,\n\
provide clear structured insights, include all relevant links shared in the discussion,\n\
and highlight any data, statistics or strategies that were mentioned.";

const GENERAL_USER: &str = "\
Analyze and summarize the following conversation with attention to context,\n\
key themes, and important details.\n\n\
Conversation transcript:\n{text}\n\n\
Produce a concise but comprehensive overview: main topics, notable interactions,\n\
essential insights, relevant links, presented in a structured easy-to-read format.";

const DEFI_SYSTEM: &str = "\
You are a DeFi analyst extracting actionable insights from cryptocurrency and\n\
blockchain discussions. Priorities: yield farming and stablecoin strategies,\n\
liquidity provision and risk/reward, APY/APR comparisons, protocol risks and\n\
security concerns, governance decisions, TVL movements, and new launches or\n\
airdrops. Always preserve links to protocols, tools and dashboards.";

const DEFI_USER: &str = "\
Provide an analysis of the following DeFi conversation, emphasizing financial\n\
strategies, yield opportunities, and market dynamics.\n\n\
Conversation transcript:\n{text}\n\n\
Extract specific metrics (APYs, TVL, prices) with sourcing, identify strategies\n\
with their risk levels, include relevant links, and organize by protocol or\n\
strategy type. Prioritize actionable information.";

const CRYPTO_SYSTEM: &str = "\
You are a cryptocurrency market analyst extracting trading insights from online\n\
discussions. Priorities: trading setups and technical patterns, price predictions\n\
with rationale, sentiment around major assets, on-chain metrics, regulatory news,\n\
macro correlations, and emerging narratives. Preserve links to charts and sources.";

const CRYPTO_USER: &str = "\
Analyze the following crypto conversation for trading insights, market trends,\n\
and opportunities.\n\n\
Conversation transcript:\n{text}\n\n\
Extract price levels and technical patterns, identify strategies with their\n\
timeframes, summarize sentiment per asset, include relevant links, and organize\n\
by asset or market segment.";

const COMBINE_SYSTEM: &str = "\
You consolidate partial summaries of one long conversation into a single\n\
coherent summary. Merge overlapping points, keep chronology intact, and do not\n\
drop any topic, metric or link present in the partials.";

const COMBINE_USER: &str = "\
The following are partial summaries of consecutive sections of one conversation,\n\
in order. Consolidate them into one final summary.\n\n{text}";

/// Channel-name keywords per specialized kind, scanned case-insensitively.
/// DeFi is checked before crypto: the order is part of the contract.
const DEFI_KEYWORDS: &[&str] = &[
    "defi", "yield", "farm", "staking", "liquidity", "lp", "lending", "borrowing", "amm", "swap",
    "stable",
];
const CRYPTO_KEYWORDS: &[&str] = &[
    "crypto", "bitcoin", "ethereum", "btc", "eth", "token", "coin", "trading", "market", "airdrop",
];

/// The fixed pair used for the chunk-combine pass.
pub fn combine_pair() -> PromptPair {
    PromptPair::new(COMBINE_SYSTEM, COMBINE_USER)
}

/// Immutable table of prompt pairs, built once at startup and shared
/// read-only across channel workflows.
#[derive(Debug, Clone)]
pub struct PromptLibrary {
    pairs: HashMap<PromptKind, PromptPair>,
}

impl Default for PromptLibrary {
    fn default() -> Self {
        let mut pairs = HashMap::new();
        pairs.insert(PromptKind::General, PromptPair::new(GENERAL_SYSTEM, GENERAL_USER));
        pairs.insert(PromptKind::Defi, PromptPair::new(DEFI_SYSTEM, DEFI_USER));
        pairs.insert(PromptKind::Crypto, PromptPair::new(CRYPTO_SYSTEM, CRYPTO_USER));
        Self { pairs }
    }
}

impl PromptLibrary {
    /// Resolve the prompt pair for a channel.
    ///
    /// Resolution order, first match wins:
    /// 1. a full caller override,
    /// 2. an explicit known kind,
    /// 3. channel-name keyword scan (DeFi before crypto),
    /// 4. the general pair.
    pub fn select(
        &self,
        channel_name: &str,
        explicit: Option<PromptKind>,
        override_pair: Option<&PromptPair>,
    ) -> PromptPair {
        if let Some(pair) = override_pair {
            return pair.clone();
        }
        let kind = explicit.unwrap_or_else(|| Self::detect_kind(channel_name));
        self.pairs[&kind].clone()
    }

    fn detect_kind(channel_name: &str) -> PromptKind {
        let lower = channel_name.to_lowercase();
        if DEFI_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
            PromptKind::Defi
        } else if CRYPTO_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
            PromptKind::Crypto
        } else {
            PromptKind::General
        }
    }
}
