use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

use crate::locate::{DEFAULT_SELECTOR, DEFAULT_SUFFIX, LocatorOptions};
use crate::pipeline::{FailurePolicy, PipelineOptions};
use crate::store::DEFAULT_KEY;

/// Listing polled when no directory is given.
pub const DEFAULT_DIRECTORY: &str = "http://bitly.com/nuvi-plz";

#[derive(Parser, Debug)]
#[command(name = "feedpull")]
#[command(version)]
#[command(about = "Ingest documents from zip archives on an HTTP directory listing", long_about = None)]
#[command(after_help = "Examples:\n  \
  feedpull https://example.com/feeds/            ingest every .zip on the listing\n  \
  feedpull --keep-going --store-dir /var/feeds   skip archives that fail to download\n  \
  RUST_LOG=feedpull=trace feedpull                full tracing output")]
pub struct Cli {
    /// Directory listing URL
    #[arg(value_name = "URL", env = "FEEDPULL_DIRECTORY", default_value = DEFAULT_DIRECTORY)]
    pub directory: String,

    /// Directory holding the record log
    #[arg(long, value_name = "DIR", env = "FEEDPULL_STORE_DIR", default_value = "./feedpull-store")]
    pub store_dir: PathBuf,

    /// Name of the record list to append to
    #[arg(long, env = "FEEDPULL_KEY", default_value = DEFAULT_KEY)]
    pub key: String,

    /// Substring a link must contain to be treated as an archive
    #[arg(long, default_value = DEFAULT_SUFFIX)]
    pub suffix: String,

    /// CSS selector for link elements on the listing
    #[arg(long, default_value = DEFAULT_SELECTOR)]
    pub selector: String,

    /// Where downloaded archives are stored while being processed
    #[arg(long, value_name = "DIR", env = "FEEDPULL_TEMP_DIR")]
    pub temp_dir: Option<PathBuf>,

    /// Continue with the next archive when one fails to download or open
    #[arg(long)]
    pub keep_going: bool,

    /// HTTP timeout in seconds (default: wait indefinitely)
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Log format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// More output (-v, -vv)
    #[arg(short = 'v', action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (-q => warnings and errors only)
    #[arg(short = 'q', action = clap::ArgAction::Count, conflicts_with = "verbose")]
    pub quiet: u8,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

impl Cli {
    /// Default `tracing` filter directive for the chosen verbosity.
    pub fn log_filter(&self) -> &'static str {
        match (self.quiet, self.verbose) {
            (q, _) if q > 1 => "feedpull=error",
            (1, _) => "feedpull=warn",
            (_, 0) => "feedpull=info",
            (_, 1) => "feedpull=debug",
            _ => "feedpull=trace",
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout.map(Duration::from_secs)
    }

    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            locator: LocatorOptions {
                suffix: self.suffix.clone(),
                selector: self.selector.clone(),
            },
            temp_dir: self.temp_dir.clone().unwrap_or_else(std::env::temp_dir),
            failure_policy: if self.keep_going {
                FailurePolicy::Skip
            } else {
                FailurePolicy::Abort
            },
        }
    }
}
