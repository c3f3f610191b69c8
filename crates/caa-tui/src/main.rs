use std::sync::Arc;
use std::time::Duration;

use caa_proto::config::Config;
use caa_proto::platform;
use caa_proto::state::PersistentState;
use caa_tui::app::App;
use caa_tui::controller::Controller;
use caa_tui::feed::HttpFeed;
use caa_tui::headless;
use caa_tui::notify::{DesktopBackend, Notifier};
use clap::Parser;

/// Watch the CAA radio latest-songs feed.
#[derive(Parser, Debug)]
#[command(name = "caa-radio", version)]
struct Args {
    /// Feed URL (defaults to `feed.url` from config.toml)
    #[arg(long)]
    url: Option<String>,

    /// Seconds between refreshes
    #[arg(long)]
    interval: Option<u64>,

    /// Print new songs as lines instead of drawing the TUI
    #[arg(long)]
    headless: bool,

    /// Never show desktop notifications
    #[arg(long)]
    no_notify: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let data_dir = platform::data_dir();
    std::fs::create_dir_all(&data_dir)?;
    let log_path = data_dir.join("caa-radio.log");

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    // Allow RUST_LOG override; default to debug for app code but suppress noisy
    // connection-level DEBUG from HTTP client internals (hyper_util, reqwest).
    let log_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "debug,hyper_util=warn,reqwest=warn,hyper=warn".to_string());
    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_env_filter(log_filter.as_str())
        .with_ansi(false)
        .init();

    eprintln!("caa-radio log: {}", log_path.display());
    tracing::info!("caa-radio starting…");

    let config = Config::load().unwrap_or_else(|e| {
        tracing::warn!("config unreadable, using defaults: {}", e);
        Config::default()
    });

    let url = args.url.unwrap_or_else(|| config.feed.url.clone());
    let period = Duration::from_secs(args.interval.unwrap_or(config.feed.poll_interval_secs).max(1));
    let timeout = (config.feed.request_timeout_secs > 0)
        .then(|| Duration::from_secs(config.feed.request_timeout_secs));

    let feed = Arc::new(HttpFeed::new(url.clone(), timeout)?);

    let notifier = if args.no_notify || !config.notifications.enabled {
        Notifier::disabled()
    } else {
        Notifier::new(Arc::new(DesktopBackend::detect(
            config.notifications.permission,
            PersistentState::default_path(),
        )))
    };

    let controller = Controller::new(feed, Arc::new(notifier), period)
        .with_max_songs(config.display.max_songs);
    let events = controller.subscribe();
    let state = controller.state();
    let handle = controller.spawn();

    if args.headless {
        headless::run(handle, events, tokio::signal::ctrl_c(), std::io::stdout()).await?;
    } else {
        App::new(state, url).run(handle, events).await?;
    }

    Ok(())
}
