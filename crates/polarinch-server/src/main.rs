//! polarinch server binary.
//!
//! Reads `config.toml` (or the path given with `--config`), opens the SQLite
//! store, schedules generation runs and serves the read API over HTTP.
//!
//! Run a single generation pass without serving:
//!
//! ```
//! cargo run -p polarinch-server -- --once
//! ```

use std::{
  path::{Path, PathBuf},
  sync::Arc,
  time::Duration,
};

use anyhow::Context as _;
use clap::Parser;
use polarinch_generate::{OpenAiClient, Retrying};
use polarinch_server::{ServerConfig, pipeline::Pipeline, scheduler::Scheduler};
use polarinch_store_sqlite::SqliteStore;
use tokio::{net::TcpListener, sync::watch};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Sentiment-labelled tweet dataset server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Run one generation pass, then exit without serving.
  #[arg(long)]
  once: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Load configuration.
  let mut server_cfg = ServerConfig::load(&cli.config)
    .with_context(|| format!("failed to load config from {:?}", cli.config))?;

  if server_cfg.generation.api_key.is_empty()
    && let Ok(key) = std::env::var("OPENAI_API_KEY")
  {
    server_cfg.generation.api_key = key;
  }
  if server_cfg.generation.api_key.is_empty() {
    tracing::warn!("no generation API key configured; requests will be unauthenticated");
  }

  // Expand `~` in store path.
  let store_path = expand_tilde(&server_cfg.store_path);

  // Open SQLite store.
  let store = Arc::new(
    SqliteStore::open(&store_path)
      .await
      .with_context(|| format!("failed to open store at {store_path:?}"))?,
  );

  let client = OpenAiClient::new(server_cfg.generation.clone())
    .context("failed to build generation client")?;
  let generator = Retrying::new(client, server_cfg.generation.retry_policy());
  let pipeline = Pipeline::new(generator, store.clone(), server_cfg.topics.clone());

  if cli.once {
    let report = pipeline.run_once().await.context("generation run failed")?;
    tracing::info!(
      cells = report.cells,
      generated = report.generated,
      skipped = report.skipped,
      inserted = report.inserted,
      "generation run finished"
    );
    return close(store).await;
  }

  // Schedule generation in the background.
  let scheduler = Scheduler::new(
    pipeline,
    Duration::from_secs(server_cfg.schedule_interval_secs),
  )
  .run_on_start(server_cfg.run_on_start);
  let (stop_tx, mut stop_rx) = watch::channel(false);
  let scheduler_task = tokio::spawn(scheduler.run(async move {
    let _ = stop_rx.changed().await;
  }));

  let app = polarinch_server::router(store.clone());
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

  tracing::info!("shutting down");
  let _ = stop_tx.send(true);
  scheduler_task.await.context("scheduler task failed")?;

  close(store).await
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!(error = %e, "failed to listen for shutdown signal");
    std::future::pending::<()>().await;
  }
}

async fn close(store: Arc<SqliteStore>) -> anyhow::Result<()> {
  Arc::unwrap_or_clone(store)
    .close()
    .await
    .context("failed to close store")
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
