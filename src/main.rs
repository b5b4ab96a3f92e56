use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use recapbot::app::App;
use recapbot::collector::{DiscordReader, MessageCollector, ReplayReader};
use recapbot::config::Config;
use recapbot::generator::SummaryGenerator;
use recapbot::poster::{DiscordPoster, LogPoster, SummaryPoster};
use recapbot::scheduler::{daily_cron, Scheduler};
use recapbot::summarize::create_summarizer;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,recapbot=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Flags: --run-once (single cycle then exit), --replay (offline capture
    // data, log-only posting). First non-flag argument is the config path.
    let args: Vec<String> = std::env::args().skip(1).collect();
    let run_once = args.iter().any(|a| a == "--run-once");
    let replay = args.iter().any(|a| a == "--replay");
    let config_path = args
        .iter()
        .find(|a| !a.starts_with("--"))
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    info!("Loading configuration from: {}", config_path.display());
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    info!("Configuration loaded successfully");
    info!("  Primary provider: {}", config.llm.primary);
    match config.llm.effective_fallback() {
        Some(provider) => info!("  Fallback provider: {}", provider),
        None => info!("  Fallback provider: none"),
    }
    info!(
        "  Source channels: {:?}",
        config.discord.source_channel_ids
    );
    info!(
        "  Schedule: daily at {:02}:{:02} UTC, {} day(s) window",
        config.scheduler.hour, config.scheduler.minute, config.scheduler.window_days
    );

    let collector: Arc<dyn MessageCollector> = if replay {
        info!(
            "Replay mode: reading capture file {}",
            config.replay.capture_path.display()
        );
        Arc::new(ReplayReader::load(&config.replay.capture_path)?)
    } else {
        Arc::new(DiscordReader::new(config.discord.user_token.clone()))
    };

    let primary = create_summarizer(config.llm.primary, &config.llm);
    let fallback = config
        .llm
        .effective_fallback()
        .map(|provider| create_summarizer(provider, &config.llm));

    let generator = SummaryGenerator::new(collector, primary, fallback, &config.prompts);

    let poster: Arc<dyn SummaryPoster> = if replay {
        Arc::new(LogPoster)
    } else {
        Arc::new(DiscordPoster::new(
            config.discord.bot_token.clone(),
            config.discord.destination_channel_id.clone(),
        ))
    };

    let app = Arc::new(App::new(config.clone(), generator, poster));

    if run_once || replay {
        // One-shot mode: run the full cycle and return only after every
        // pending post has completed, so shutdown needs no grace sleep.
        info!("Running a single summary cycle");
        app.run_cycle().await;
        info!("Single cycle complete");
        return Ok(());
    }

    let mut scheduler = Scheduler::new().await?;
    let cron = daily_cron(config.scheduler.hour, config.scheduler.minute);
    let job_app = app.clone();
    scheduler
        .add_cron_job(&cron, "daily-summary", move || {
            let app = job_app.clone();
            Box::pin(async move {
                app.run_cycle().await;
            })
        })
        .await?;
    scheduler.start().await?;

    info!("Bot is running, press Ctrl-C to stop");
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;

    info!("Shutting down...");
    scheduler.shutdown().await?;

    Ok(())
}
