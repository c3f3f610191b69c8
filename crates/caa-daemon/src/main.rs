use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use caa_daemon::http::{self, SharedDocument};
use caa_daemon::output;
use caa_daemon::schedule::{next_delay, LatestTracker, ScrapeOutcome};
use caa_daemon::scrape;
use caa_proto::config::{Config, GeneratorConfig};
use caa_proto::songs::{encode_feed, Song};
use clap::{Parser, Subcommand};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Scrape the CAA "last played" page into latest.json.
#[derive(Parser, Debug)]
#[command(name = "caa-generate", version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scrape once and write the document
    Once {
        /// Output file; stdout when omitted or "-"
        dest: Option<PathBuf>,
    },
    /// Keep scraping, writing whenever the latest song changes
    Run {
        /// Output file (defaults to `generator.output`); "-" for stdout
        dest: Option<PathBuf>,

        /// Don't serve latest.json over HTTP
        #[arg(long)]
        no_serve: bool,
    },
}

fn stdout_if_dash(dest: Option<PathBuf>) -> Option<PathBuf> {
    dest.filter(|p| p.as_os_str() != "-")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let data_dir = caa_proto::platform::data_dir();
    std::fs::create_dir_all(&data_dir)?;
    let log_path = data_dir.join("generator.log");

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    // stdout carries the JSON document, so console logs go to stderr.
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(log_file)
        .with_ansi(false);
    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(file_layer)
        .with(stderr_layer)
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,caa_daemon=debug")),
        )
        .init();

    info!("Log file: {:?}", log_path);

    let config = Config::load()?;
    info!("Config loaded from: {:?}", Config::config_path());

    let client = reqwest::Client::builder()
        .user_agent(concat!("caa-generate/", env!("CARGO_PKG_VERSION")))
        .timeout(Duration::from_secs(30))
        .build()
        .context("building HTTP client")?;

    match args.command {
        Command::Once { dest } => {
            run_once(&client, &config.generator, stdout_if_dash(dest).as_deref()).await
        }
        Command::Run { dest, no_serve } => {
            let dest = match dest {
                Some(p) => stdout_if_dash(Some(p)),
                None => Some(config.generator.output.clone()),
            };
            let serve = config.generator.serve && !no_serve;
            run_forever(&client, &config.generator, dest.as_deref(), serve).await
        }
    }
}

async fn scrape_songs(client: &reqwest::Client, config: &GeneratorConfig) -> anyhow::Result<Vec<Song>> {
    let html = scrape::fetch_last_played(client, &config.source_url).await?;
    let songs = scrape::parse_last_played(&html, config.buffer_size)?;
    debug!("[scrape] {} songs from {}", songs.len(), config.source_url);
    Ok(songs)
}

async fn run_once(
    client: &reqwest::Client,
    config: &GeneratorConfig,
    dest: Option<&Path>,
) -> anyhow::Result<()> {
    let songs = scrape_songs(client, config).await?;
    if songs.is_empty() {
        bail!("no songs found at {}", config.source_url);
    }
    let document = encode_feed(&songs)?;
    output::emit(dest, &document).with_context(|| format!("writing {:?}", dest))?;
    info!("[generator] wrote {} songs", songs.len());
    Ok(())
}

async fn run_forever(
    client: &reqwest::Client,
    config: &GeneratorConfig,
    dest: Option<&Path>,
    serve: bool,
) -> anyhow::Result<()> {
    let document: SharedDocument = Arc::new(RwLock::new(None));
    let _http_handle = serve.then(|| {
        http::start_server(config.bind_address.clone(), config.port, document.clone())
    });

    let mut tracker = LatestTracker::default();
    loop {
        let songs = match scrape_songs(client, config).await {
            Ok(songs) => Some(songs),
            Err(e) => {
                warn!("[scrape] {:#}", e);
                None
            }
        };

        let outcome = tracker.observe(songs.as_deref());
        if let (ScrapeOutcome::Changed(latest), Some(songs)) = (&outcome, &songs) {
            info!("[generator] latest is now {}", latest.display());
            match encode_feed(songs) {
                Ok(doc) => {
                    if let Err(e) = output::emit(dest, &doc) {
                        error!("[output] writing {:?} failed: {}", dest, e);
                    }
                    *document.write().await = Some(doc);
                }
                Err(e) => error!("[generator] encoding failed: {}", e),
            }
        }

        let delay = next_delay(chrono::Utc::now(), &outcome);
        debug!("[generator] next scrape in {}s", delay.as_secs());

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = tokio::signal::ctrl_c() => {
                info!("[generator] interrupted, stopping");
                break;
            }
        }
    }

    Ok(())
}
