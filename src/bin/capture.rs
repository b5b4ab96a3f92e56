//! Offline data capture tool.
//!
//! Reads the configured source channels over the given number of days and
//! writes the messages to the capture file consumed by `--replay` mode.
//! Useful for prompt development without hitting Discord on every run.

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use recapbot::collector::replay::{CaptureChannel, CaptureData};
use recapbot::collector::{DiscordReader, MessageCollector, Window};
use recapbot::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,recapbot=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Usage: capture [config.toml] [--days N]
    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut days: i64 = 4;
    let mut config_path = PathBuf::from("config.toml");
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == "--days" {
            days = iter
                .next()
                .context("--days takes a number")?
                .parse()
                .context("--days takes a number")?;
        } else if !arg.starts_with("--") {
            config_path = PathBuf::from(arg);
        }
    }

    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    info!(
        "Capturing {} day(s) of history from {} channel(s)",
        days,
        config.discord.source_channel_ids.len()
    );

    let reader = DiscordReader::new(config.discord.user_token.clone());
    let window = Window::last_days(days);

    let mut data = CaptureData::new();
    for channel_id in &config.discord.source_channel_ids {
        let collected = reader
            .collect(channel_id, &window)
            .await
            .with_context(|| format!("Capture failed for channel {}", channel_id))?;
        info!(
            "  #{}: {} messages",
            collected.channel_name,
            collected.messages.len()
        );
        data.insert(
            channel_id.clone(),
            CaptureChannel {
                channel_name: collected.channel_name,
                messages: collected.messages,
            },
        );
    }

    let path = &config.replay.capture_path;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(&data).context("Failed to serialize capture")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write capture file {}", path.display()))?;

    let total: usize = data.values().map(|c| c.messages.len()).sum();
    info!(
        "Captured {} messages across {} channels to {}",
        total,
        data.len(),
        path.display()
    );

    Ok(())
}
