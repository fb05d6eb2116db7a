//! # feedpull
//!
//! Pulls zip archives published on an HTTP directory listing and appends
//! every document inside them to a durable, deduplicated record log.
//!
//! A run has three stages:
//!
//! - **Discovery**: fetch the listing, keep links whose target contains the
//!   archive suffix, and resolve them against the page's final URL.
//! - **Retrieval**: download each archive into a temporary file that is
//!   removed once the archive has been processed, even on failure.
//! - **Ingestion**: read each member fully and append it to the log unless
//!   a byte-identical record is already there.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use feedpull::{FileStore, HttpClient, IngestionStore, Pipeline, PipelineOptions};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let http = HttpClient::new(None)?;
//!     let store = IngestionStore::new(Arc::new(FileStore::open("./store").await?), "NEWS_XML");
//!
//!     let pipeline = Pipeline::new(&http, &store, PipelineOptions::default());
//!     let summary = pipeline.run("https://example.com/feeds/").await?;
//!     println!("{} new records", summary.appended);
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod error;
pub mod fetch;
pub mod io;
pub mod locate;
pub mod pipeline;
pub mod store;
pub mod zip;

pub use cli::Cli;
pub use error::{Error, ErrorKind, Result};
pub use fetch::{ArchiveFetcher, LocalArchive};
pub use io::{HttpClient, LocalFileReader, ReadAt};
pub use locate::{ArchiveLocator, LocatorOptions};
pub use pipeline::{FailurePolicy, Pipeline, PipelineOptions, RunSummary};
pub use store::{FileStore, Ingested, IngestionStore, MemoryStore, OrderedStore, Record};
pub use zip::{ArchiveEntry, ArchiveExtractor};
