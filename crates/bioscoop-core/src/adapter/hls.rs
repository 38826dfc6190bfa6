//! HLS streaming client
//!
//! Fetches the manifest with reqwest and enumerates variants with m3u8-rs.
//! Segment delivery is left to the media element.

use super::{LevelInfo, StreamingClient, AUTO_LEVEL};
use crate::{error::Error, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// HLS client backed by reqwest
pub struct HlsClient {
    client: Client,
    url: Option<Url>,
    levels: Vec<LevelInfo>,
    current_level: i32,
    destroyed: bool,
}

impl HlsClient {
    pub fn new() -> Self {
        // Builder only fails when the TLS backend cannot initialize.
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self::with_client(client)
    }

    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            url: None,
            levels: Vec::new(),
            current_level: AUTO_LEVEL,
            destroyed: false,
        }
    }

    async fn fetch(&self, url: &Url) -> Result<String> {
        debug!("Fetching HLS manifest: {}", url);
        let response = self.client.get(url.clone()).send().await?;

        if !response.status().is_success() {
            return Err(Error::ManifestFetch(format!(
                "{} returned {}",
                url,
                response.status()
            )));
        }

        Ok(response.text().await?)
    }
}

impl Default for HlsClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Enumerate the variants of a manifest body.
///
/// A master playlist yields one level per `EXT-X-STREAM-INF`; a media
/// playlist used as entry point yields a single level of unknown height.
pub fn parse_levels(content: &str, base_url: &Url) -> Result<Vec<LevelInfo>> {
    if !content.contains("#EXT-X-STREAM-INF") {
        m3u8_rs::parse_media_playlist_res(content.as_bytes())
            .map_err(|e| Error::ManifestParse(format!("Failed to parse HLS media: {:?}", e)))?;
        return Ok(vec![LevelInfo {
            height: None,
            width: None,
            bandwidth: 0,
            uri: Some(base_url.clone()),
        }]);
    }

    let master = m3u8_rs::parse_master_playlist_res(content.as_bytes())
        .map_err(|e| Error::ManifestParse(format!("Failed to parse HLS master: {:?}", e)))?;

    master
        .variants
        .iter()
        .filter(|v| !v.is_i_frame)
        .map(|variant| {
            let uri = base_url.join(&variant.uri).map_err(|e| {
                Error::ManifestParse(format!("Invalid URI '{}': {}", variant.uri, e))
            })?;
            Ok(LevelInfo {
                height: variant.resolution.map(|r| r.height as u32),
                width: variant.resolution.map(|r| r.width as u32),
                bandwidth: variant.bandwidth,
                uri: Some(uri),
            })
        })
        .collect()
}

#[async_trait]
impl StreamingClient for HlsClient {
    #[instrument(skip(self))]
    async fn load_source(&mut self, url: &Url) -> Result<Vec<LevelInfo>> {
        self.destroyed = false;
        let content = self.fetch(url).await?;
        let levels = parse_levels(&content, url)?;
        info!(levels = levels.len(), "HLS manifest parsed");

        self.url = Some(url.clone());
        self.levels = levels.clone();
        Ok(levels)
    }

    fn levels(&self) -> &[LevelInfo] {
        &self.levels
    }

    fn set_current_level(&mut self, level: i32) {
        if level != AUTO_LEVEL && (level < 0 || level as usize >= self.levels.len()) {
            warn!(level, "Level index out of range, ignoring");
            return;
        }
        self.current_level = level;
    }

    fn current_level(&self) -> i32 {
        self.current_level
    }

    async fn start_load(&mut self) -> Result<()> {
        if self.destroyed {
            return Err(Error::ClientDestroyed);
        }
        let url = self
            .url
            .clone()
            .ok_or_else(|| Error::InvalidSource("no source loaded".into()))?;
        let content = self.fetch(&url).await?;
        self.levels = parse_levels(&content, &url)?;
        Ok(())
    }

    fn recover_media_error(&mut self) {
        // Nothing is decoded here; a recovery drops back to automatic
        // selection so the element re-negotiates the variant.
        debug!("Media recovery requested");
        self.current_level = AUTO_LEVEL;
    }

    fn destroy(&mut self) {
        self.destroyed = true;
        self.levels.clear();
        self.url = None;
    }
}
