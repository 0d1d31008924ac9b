//! Harvest feeds from the environment and answer `!meme` on stdin
//!
//! ```bash
//! MEME_DOWNLOAD_DIR=./cache SUBREDDIT_SCRAPE_LIST=pics,gifs \
//! REDDIT_API_CLIENT_ID=... REDDIT_API_CLIENT_SECRET=... \
//! cargo run --example harvest
//! ```
//!
//! Each `!meme` line prints the path of a random cached file; `!refresh`
//! starts a cycle right away. Ctrl+C or SIGTERM shuts down.

use feed_harvest::{Config, Event, Harvester, run_with_shutdown};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            std::process::exit(1);
        }
    };
    config.log_summary();

    let harvester = Harvester::new(config)?;

    let mut events = harvester.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            if let Event::CycleCompleted { total_cached, .. } = event {
                info!(total_cached, "Cache refreshed");
            }
        }
    });

    harvester.spawn_scheduler().await;

    let serving = harvester.clone();
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            match line.trim() {
                "!meme" => match serving.random_cached_file().await {
                    Some(path) => println!("{}", path.display()),
                    None => println!("No memes cached yet"),
                },
                "!refresh" => serving.trigger_manual_refresh(),
                _ => {}
            }
        }
    });

    run_with_shutdown(harvester).await;
    Ok(())
}
