//! Input acquisition: streaming download of a URL into the job workspace.

use futures::StreamExt;
use reqwest::Client;
use std::path::Path;
use std::time::Duration;
use talkforge_common::{StageError, StageOutcome};
use tokio::io::AsyncWriteExt;

/// Downloads remote inputs. Cheap to clone; the HTTP connection pool is shared.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    pub fn new(timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Failed to build HTTP client with timeout: {}", e);
                Client::new()
            });
        Self { client }
    }

    /// Stream the body at `url` into `dest`, returning the bytes written.
    ///
    /// The body is written chunk by chunk and never held in memory as a whole.
    /// There are no retries.
    pub async fn fetch(&self, url: &str, dest: &Path) -> StageOutcome<u64> {
        tracing::debug!("Fetching {} -> {:?}", url, dest);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| StageError::transport(format!("GET {url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(StageError::transport(format!("GET {url}: HTTP {status}")));
        }

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StageError::write(format!("{}: {e}", parent.display())))?;
        }
        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|e| StageError::write(format!("{}: {e}", dest.display())))?;

        let mut written: u64 = 0;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk =
                chunk.map_err(|e| StageError::transport(format!("GET {url}: body: {e}")))?;
            file.write_all(&chunk)
                .await
                .map_err(|e| StageError::write(format!("{}: {e}", dest.display())))?;
            written += chunk.len() as u64;
        }

        file.flush()
            .await
            .map_err(|e| StageError::write(format!("{}: {e}", dest.display())))?;

        tracing::debug!("Fetched {} bytes from {}", written, url);
        Ok(written)
    }
}

/// Whether `url` uses a scheme the fetcher accepts.
pub fn is_fetchable_url(url: &str) -> bool {
    match reqwest::Url::parse(url) {
        Ok(parsed) => {
            matches!(parsed.scheme(), "http" | "https") && parsed.host_str().is_some()
        }
        Err(_) => false,
    }
}
