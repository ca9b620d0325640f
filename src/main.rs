//! Whale Watch - Main Entry Point
//!
//! Wires the live trade feed into the aggregation and position-tracking
//! pipeline and runs the periodic re-scan and persistence schedules.

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use whale_watch::common::channels::{create_check_channel, create_trade_channel};
use whale_watch::config::load_config;
use whale_watch::notify::LogNotifier;
use whale_watch::state::store::StateStore;
use whale_watch::state::SharedState;
use whale_watch::{InfoClient, PositionTracker, TradeAggregator, TradeFeedClient};

/// CLI arguments for the application
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Override path of the state snapshot file
    #[arg(long)]
    state_file: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting Whale Watch");
    info!("Configuration file: {}", args.config);

    // Load environment variables from .env file if present
    dotenvy::dotenv().ok();

    let mut config = load_config(Some(&args.config))?;
    if let Some(path) = args.state_file {
        config.settings.state_file = path;
    }

    // Restore the previous snapshot if one exists
    let state = Arc::new(SharedState::new());
    let store = StateStore::new(
        &config.settings.state_file,
        config.settings.stale_after_minutes,
    );
    store.restore_into(&state);

    let client = InfoClient::with_timeout(
        &config.hyperliquid,
        Duration::from_secs(config.settings.request_timeout_seconds),
    )?;

    let (trade_tx, trade_rx) = create_trade_channel();
    let (check_tx, check_rx) = create_check_channel();

    // Feed: exchange trades into the aggregator
    let feed = TradeFeedClient::new(&config.hyperliquid, &config.settings, client.clone());
    tokio::spawn(async move {
        feed.run(trade_tx).await;
    });

    // Aggregator: debounced per-account whale volume into check requests
    let aggregator = TradeAggregator::new(&config.tracker, check_tx);
    tokio::spawn(async move {
        aggregator.run(trade_rx).await;
    });

    // Tracker: check requests into classified, deduped alerts
    let notifier = Arc::new(LogNotifier);
    let tracker = Arc::new(PositionTracker::new(
        client,
        Arc::clone(&state),
        notifier,
        config.tracker.clone(),
    ));
    {
        let tracker = Arc::clone(&tracker);
        tokio::spawn(async move {
            tracker.run(check_rx).await;
        });
    }

    // Warm-up: discoveries made in the first moments after boot are recorded
    // without alerting, so restarts stay quiet
    {
        let state = Arc::clone(&state);
        let warmup = Duration::from_millis(config.tracker.warmup_ms);
        tokio::spawn(async move {
            tokio::time::sleep(warmup).await;
            if state.is_warming_up() {
                state.end_warmup();
                info!("Warm-up complete, new-position alerts armed");
            }
        });
    }

    // Periodic re-scan of tracked positions
    {
        let tracker = Arc::clone(&tracker);
        let refresh = Duration::from_millis(config.tracker.refresh_interval_ms);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(refresh);
            interval.tick().await;
            loop {
                interval.tick().await;
                tracker.check_tracked_positions().await;
            }
        });
    }

    // Periodic snapshot save
    {
        let state = Arc::clone(&state);
        let store = store.clone();
        let save_interval = Duration::from_millis(config.settings.save_interval_ms);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(save_interval);
            interval.tick().await;
            loop {
                interval.tick().await;
                store.persist(&state);
            }
        });
    }

    info!("Pipeline running");

    tokio::signal::ctrl_c().await?;
    info!("Received shutdown signal, saving state...");
    store.persist(&state);

    Ok(())
}
