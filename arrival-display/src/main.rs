use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use arrival_display::config::{DisplayConfig, FeedMode};
use arrival_display::display::TracingSink;
use arrival_display::feed::{FeedSource, LiveFeedClient, ReplaySource};
use arrival_display::scheduler::Scheduler;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("arrival_display=info")),
        )
        .init();

    let config = match DisplayConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            std::process::exit(2);
        }
    };

    if let Some(client_config) = config.live_feed_config() {
        info!(
            agency = %client_config.agency,
            stop_code = %client_config.stop_code,
            "using live arrival feed"
        );
        match LiveFeedClient::new(client_config) {
            Ok(client) => run(client, &config).await,
            Err(e) => {
                error!(error = %e, "failed to create feed client");
                std::process::exit(1);
            }
        }
        return;
    }

    if let FeedMode::Replay { path } = &config.mode {
        info!(path = %path.display(), "using recorded arrival feed");
        match ReplaySource::from_file(path) {
            Ok(source) => {
                info!(entries = source.len(), "loaded replay entries");
                run(source, &config).await;
            }
            Err(e) => {
                error!(error = %e, "failed to load replay file; set ARRIVALS_REPLAY_FILE");
                std::process::exit(1);
            }
        }
    }
}

async fn run<S: FeedSource>(source: S, config: &DisplayConfig) {
    let mut scheduler = Scheduler::new(source, TracingSink::new(), config);

    scheduler
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "failed to listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        })
        .await;

    info!(
        cycles = scheduler.cycles(),
        frames = scheduler.sink().presented(),
        "display stopped"
    );
}
