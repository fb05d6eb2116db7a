//! One ingestion pass: discover archives, download each, ingest its members.
//!
//! Work is strictly sequential. One archive is on disk at a time, and it is
//! removed before the next one is fetched, whether or not processing it
//! succeeded.

use std::path::PathBuf;
use tracing::{debug, error, info, instrument, warn};

use crate::error::Result;
use crate::fetch::{ArchiveFetcher, LocalArchive};
use crate::io::HttpClient;
use crate::locate::{ArchiveLocator, LocatorOptions};
use crate::store::{Ingested, IngestionStore, OrderedStore};
use crate::zip::ArchiveExtractor;

/// What to do when one archive cannot be downloaded or opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Stop the whole run and return the error.
    #[default]
    Abort,
    /// Record the failure and continue with the next archive.
    Skip,
}

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub locator: LocatorOptions,
    /// Directory that receives temporary archive downloads.
    pub temp_dir: PathBuf,
    pub failure_policy: FailurePolicy,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            locator: LocatorOptions::default(),
            temp_dir: std::env::temp_dir(),
            failure_policy: FailurePolicy::default(),
        }
    }
}

/// Counters for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Archives whose processing was attempted.
    pub archives: usize,
    /// Archives that failed to download or open (only with [`FailurePolicy::Skip`]).
    pub failed_archives: usize,
    /// Document entries processed, whatever their outcome.
    pub entries: usize,
    pub appended: usize,
    pub already_present: usize,
    /// Entries that could not be read or stored.
    pub failed_entries: usize,
}

/// Composes discovery, download, extraction and ingestion.
pub struct Pipeline<'a, S: OrderedStore> {
    http: &'a HttpClient,
    store: &'a IngestionStore<S>,
    opts: PipelineOptions,
}

impl<'a, S: OrderedStore> Pipeline<'a, S> {
    pub fn new(http: &'a HttpClient, store: &'a IngestionStore<S>, opts: PipelineOptions) -> Self {
        Self { http, store, opts }
    }

    /// Run one pass over the listing at `directory_url`.
    ///
    /// Discovery failure is returned immediately. A failing archive either
    /// ends the run or is skipped, per [`FailurePolicy`]. Entry failures are
    /// logged and counted, and never stop the run.
    #[instrument(skip(self))]
    pub async fn run(&self, directory_url: &str) -> Result<RunSummary> {
        let locator = ArchiveLocator::new(self.http, self.opts.locator.clone());
        let archives = locator.locate(directory_url).await?;

        let fetcher = ArchiveFetcher::new(self.http, &self.opts.temp_dir);
        let mut summary = RunSummary::default();

        for url in &archives {
            summary.archives += 1;
            if let Err(e) = self.process_archive(&fetcher, url, &mut summary).await {
                match self.opts.failure_policy {
                    FailurePolicy::Abort => {
                        error!(%url, error = %e, "archive failed, aborting run");
                        return Err(e);
                    }
                    FailurePolicy::Skip => {
                        warn!(%url, error = %e, "archive failed, skipping");
                        summary.failed_archives += 1;
                    }
                }
            }
        }

        info!(
            archives = summary.archives,
            entries = summary.entries,
            appended = summary.appended,
            already_present = summary.already_present,
            failed_entries = summary.failed_entries,
            failed_archives = summary.failed_archives,
            "run complete"
        );
        Ok(summary)
    }

    async fn process_archive(
        &self,
        fetcher: &ArchiveFetcher<'_>,
        url: &str,
        summary: &mut RunSummary,
    ) -> Result<()> {
        info!(%url, "processing archive");
        let archive = fetcher.fetch(url).await?;

        let ingested = self.ingest_archive(&archive, summary).await;
        let removed = archive.remove();
        ingested?;
        removed
    }

    async fn ingest_archive(&self, archive: &LocalArchive, summary: &mut RunSummary) -> Result<()> {
        let extractor = ArchiveExtractor::open(archive.path())?;
        let entries = extractor.entries().await?;
        debug!(source = archive.source(), count = entries.len(), "archive opened");

        for entry in &entries {
            if entry.is_directory {
                debug!(entry = %entry.name, "skipping directory entry");
                continue;
            }
            summary.entries += 1;

            let outcome = match extractor.read_all(entry).await {
                Ok(content) => self.store.ingest(&content).await,
                Err(e) => Err(e),
            };
            match outcome {
                Ok(Ingested::Appended(position)) => {
                    info!(entry = %entry.name, position, "record appended");
                    summary.appended += 1;
                }
                Ok(Ingested::AlreadyPresent) => {
                    debug!(entry = %entry.name, "already present");
                    summary.already_present += 1;
                }
                Err(e) => {
                    warn!(entry = %entry.name, error = %e, "entry failed");
                    summary.failed_entries += 1;
                }
            }
        }
        Ok(())
    }
}
