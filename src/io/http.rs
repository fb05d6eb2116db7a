use reqwest::{Client, Response};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::{Error, Result};

/// User-Agent string sent with every request.
const USER_AGENT: &str = concat!("feedpull/", env!("CARGO_PKG_VERSION"));

/// A fetched text document together with the URL it was finally served from.
#[derive(Debug, Clone)]
pub struct Page {
    /// Effective URL after following redirects.
    pub url: String,
    pub body: String,
}

/// HTTP transport shared by discovery and download
pub struct HttpClient {
    client: Client,
    transferred_bytes: AtomicU64,
}

impl HttpClient {
    /// Create a new client.
    ///
    /// Without a timeout a stalled server stalls the caller indefinitely.
    pub fn new(timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| Error::fetch("(client)", format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            transferred_bytes: AtomicU64::new(0),
        })
    }

    /// Get total body bytes received from the network
    pub fn transferred_bytes(&self) -> u64 {
        self.transferred_bytes.load(Ordering::Relaxed)
    }

    /// GET a page and return its body as text plus its post-redirect URL.
    pub async fn get_page(&self, url: &str) -> Result<Page> {
        let resp = self.send(url).await?;
        let final_url = resp.url().to_string();

        let body = resp
            .text()
            .await
            .map_err(|e| Error::fetch(url, format!("failed to read body: {e}")))?;
        self.transferred_bytes
            .fetch_add(body.len() as u64, Ordering::Relaxed);

        Ok(Page {
            url: final_url,
            body,
        })
    }

    /// Stream the body at `url` into `sink`, returning the number of bytes written.
    ///
    /// `path` is only used to label filesystem errors.
    pub async fn download_to(&self, url: &str, sink: &mut File, path: &Path) -> Result<u64> {
        let mut resp = self.send(url).await?;
        let mut written = 0u64;

        while let Some(chunk) = resp
            .chunk()
            .await
            .map_err(|e| Error::fetch(url, format!("failed to read body: {e}")))?
        {
            sink.write_all(&chunk)
                .await
                .map_err(|e| Error::io(path, e))?;
            written += chunk.len() as u64;
            self.transferred_bytes
                .fetch_add(chunk.len() as u64, Ordering::Relaxed);
        }
        sink.flush().await.map_err(|e| Error::io(path, e))?;

        debug!(%url, bytes = written, "download complete");
        Ok(written)
    }

    async fn send(&self, url: &str) -> Result<Response> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::fetch(url, e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::fetch(url, format!("HTTP {status}")));
        }
        Ok(resp)
    }
}
