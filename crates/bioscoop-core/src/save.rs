//! Best-effort file saving
//!
//! The headless equivalent of the browser's anchor-download: fetch a URL
//! into a local file. Failures are reported to the caller, which logs them
//! and moves on; nothing retries.

use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument, warn};
use url::Url;

#[async_trait]
pub trait FileSaver: Send + Sync {
    /// Save `url` under `filename`; returns where it landed
    async fn save(&self, url: &Url, filename: &str) -> Result<PathBuf>;
}

/// Streams a URL into a directory with reqwest
pub struct HttpFileSaver {
    client: Client,
    dir: PathBuf,
}

impl HttpFileSaver {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            client: Client::new(),
            dir: dir.into(),
        }
    }

    pub fn with_client(client: Client, dir: impl Into<PathBuf>) -> Self {
        Self {
            client,
            dir: dir.into(),
        }
    }

    fn failure(filename: &str, reason: impl ToString) -> Error {
        Error::FileSave {
            filename: filename.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Stream the response body into `part`
    async fn write_body(
        mut response: reqwest::Response,
        part: &Path,
        filename: &str,
    ) -> Result<u64> {
        let mut file = tokio::fs::File::create(part).await?;
        let mut written = 0u64;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| Self::failure(filename, e))?
        {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
            debug!(written, "Chunk saved");
        }
        file.flush().await?;
        Ok(written)
    }
}

#[async_trait]
impl FileSaver for HttpFileSaver {
    #[instrument(skip(self), fields(dir = %self.dir.display()))]
    async fn save(&self, url: &Url, filename: &str) -> Result<PathBuf> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| Self::failure(filename, e))?;

        if !response.status().is_success() {
            return Err(Self::failure(filename, response.status()));
        }

        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(filename);
        let part = self.dir.join(format!("{}.part", filename));

        // The target name only appears once the body is complete.
        let written = match Self::write_body(response, &part, filename).await {
            Ok(written) => written,
            Err(e) => {
                if let Err(cleanup) = tokio::fs::remove_file(&part).await {
                    warn!(error = %cleanup, part = %part.display(), "Partial file not removed");
                }
                return Err(e);
            }
        };
        tokio::fs::rename(&part, &path).await?;

        info!(path = %path.display(), bytes = written, "File saved");
        Ok(path)
    }
}

/// Saver that refuses everything (no writable target configured)
pub struct DisabledSaver;

#[async_trait]
impl FileSaver for DisabledSaver {
    async fn save(&self, _url: &Url, filename: &str) -> Result<PathBuf> {
        Err(HttpFileSaver::failure(filename, "file saving disabled"))
    }
}
