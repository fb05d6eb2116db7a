//! Main entry point for the feedpull CLI application.
//!
//! Runs a single ingestion pass over the configured directory listing and
//! exits non-zero if the run could not start or was aborted.

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

use feedpull::cli::LogFormat;
use feedpull::{Cli, FileStore, HttpClient, IngestionStore, OrderedStore, Pipeline};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli);

    let http = HttpClient::new(cli.timeout())?;

    let backend = FileStore::open(&cli.store_dir)
        .await
        .with_context(|| format!("cannot open store at {}", cli.store_dir.display()))?;
    backend.ping().await?;
    let store = IngestionStore::new(Arc::new(backend), cli.key.clone());
    info!(
        store = %cli.store_dir.display(),
        key = store.key(),
        records = store.len().await?,
        "store ready"
    );

    let pipeline = Pipeline::new(&http, &store, cli.pipeline_options());
    let summary = pipeline
        .run(&cli.directory)
        .await
        .with_context(|| format!("ingestion from {} failed", cli.directory))?;

    info!(
        processed = summary.entries,
        appended = summary.appended,
        transferred = %format_size(http.transferred_bytes()),
        "done"
    );
    Ok(())
}

/// Install the global subscriber; `RUST_LOG` takes precedence over `-v`/`-q`.
fn init_tracing(cli: &Cli) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_filter()));

    match cli.log_format {
        LogFormat::Text => fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init(),
        LogFormat::Json => fmt()
            .json()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init(),
    }
}

/// Format a byte size into a human-readable string.
fn format_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if size >= GB {
        format!("{:.2} GB", size as f64 / GB as f64)
    } else if size >= MB {
        format!("{:.2} MB", size as f64 / MB as f64)
    } else if size >= KB {
        format!("{:.2} KB", size as f64 / KB as f64)
    } else {
        format!("{} bytes", size)
    }
}
