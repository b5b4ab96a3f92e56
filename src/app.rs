use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{error, info};

use crate::collector::Window;
use crate::config::Config;
use crate::generator::SummaryGenerator;
use crate::poster::SummaryPoster;

/// Pause between consecutive posts to the destination channel.
const POST_SPACING: Duration = Duration::from_secs(1);

/// One generate-and-post cycle over all configured channels. Shared between
/// the scheduler job and the one-shot/replay modes.
pub struct App {
    config: Config,
    generator: SummaryGenerator,
    poster: Arc<dyn SummaryPoster>,
}

impl App {
    pub fn new(config: Config, generator: SummaryGenerator, poster: Arc<dyn SummaryPoster>) -> Self {
        Self {
            config,
            generator,
            poster,
        }
    }

    /// Generate and post summaries for every configured channel. Failures are
    /// isolated per channel: each one is logged and reported to the
    /// destination, and the remaining channels still run.
    pub async fn run_cycle(&self) {
        let started = Instant::now();
        let window = Window::last_days(self.config.scheduler.window_days);
        info!(
            "Starting summary cycle for {} channel(s), window {} .. {}",
            self.config.discord.source_channel_ids.len(),
            window.start,
            window.end
        );

        let results = self
            .generator
            .generate_all(&self.config.discord.source_channel_ids, &window)
            .await;

        let mut posted = 0;
        for (channel_id, result) in results {
            match result {
                Ok(summary) => match self.poster.post(&summary).await {
                    Ok(()) => {
                        posted += 1;
                        tokio::time::sleep(POST_SPACING).await;
                    }
                    Err(err) => {
                        error!("Failed to post summary for channel {}: {}", channel_id, err);
                    }
                },
                Err(err) => {
                    error!("Summary run failed for channel {}: {}", channel_id, err);
                    if let Err(post_err) = self.poster.post_error(&err.to_string()).await {
                        error!("Failed to report the failure as well: {}", post_err);
                    }
                }
            }
        }

        info!(
            "Summary cycle finished: {}/{} channel(s) posted in {:.2}s",
            posted,
            self.config.discord.source_channel_ids.len(),
            started.elapsed().as_secs_f64()
        );
    }
}
