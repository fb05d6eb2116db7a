//! Discovery of archive links on a directory listing page.

use scraper::{Html, Selector};
use tracing::{debug, info, instrument};

use crate::error::{Error, Result};
use crate::io::HttpClient;

/// Default substring an archive link must contain.
pub const DEFAULT_SUFFIX: &str = ".zip";

/// Default CSS selector for link-bearing elements.
pub const DEFAULT_SELECTOR: &str = "a";

/// Configuration for archive discovery.
#[derive(Debug, Clone)]
pub struct LocatorOptions {
    /// Substring a link target must contain to count as an archive.
    pub suffix: String,
    /// CSS selector for the elements whose `href` is inspected.
    pub selector: String,
}

impl Default for LocatorOptions {
    fn default() -> Self {
        Self {
            suffix: DEFAULT_SUFFIX.to_string(),
            selector: DEFAULT_SELECTOR.to_string(),
        }
    }
}

/// Finds downloadable archives on a directory listing.
pub struct ArchiveLocator<'a> {
    http: &'a HttpClient,
    opts: LocatorOptions,
}

impl<'a> ArchiveLocator<'a> {
    pub fn new(http: &'a HttpClient, opts: LocatorOptions) -> Self {
        Self { http, opts }
    }

    /// Fetch the listing at `directory_url` and return its archive URLs.
    ///
    /// Links are resolved against the page's post-redirect URL. An empty
    /// listing yields an empty list.
    #[instrument(skip(self))]
    pub async fn locate(&self, directory_url: &str) -> Result<Vec<String>> {
        let page = self.http.get_page(directory_url).await?;
        if page.url != directory_url {
            debug!(effective = %page.url, "listing was redirected");
        }

        let links = archive_links(&page.body, &page.url, &self.opts)
            .map_err(|message| Error::fetch(&page.url, message))?;
        info!(count = links.len(), "archives discovered");
        Ok(links)
    }
}

/// Extract archive links from a listing document, in document order.
///
/// Each result is `base` with the raw `href` appended. The suffix check is
/// a substring match, and duplicate links are passed through as-is.
pub fn archive_links(
    html: &str,
    base: &str,
    opts: &LocatorOptions,
) -> std::result::Result<Vec<String>, String> {
    let selector = Selector::parse(&opts.selector)
        .map_err(|e| format!("invalid selector {:?}: {e}", opts.selector))?;
    let doc = Html::parse_document(html);

    let mut links = Vec::new();
    for el in doc.select(&selector) {
        let Some(href) = el.value().attr("href") else {
            continue;
        };
        if !href.contains(opts.suffix.as_str()) {
            debug!(href, "skipping non-archive link");
            continue;
        }
        links.push(format!("{base}{href}"));
    }
    Ok(links)
}
