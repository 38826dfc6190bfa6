//! Media Source Adapter
//!
//! Decides how a [`MediaSource`] reaches the media element:
//! - adaptive manifest through a [`StreamingClient`] when the element has
//!   no native HLS support
//! - adaptive manifest handed straight to the element when it does
//! - progressive file set directly on the element
//!
//! and exposes a normalized quality list plus a level-switch operation.

mod hls;
mod scripted;

pub use hls::{parse_levels, HlsClient};
pub use scripted::{ScriptedClient, ScriptedLog};

use crate::{
    media::MediaElement,
    types::{MediaSource, QualityLevel, SourceKind, AUTO_LABEL},
    Result,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Level index meaning "let the client pick the bitrate"
pub const AUTO_LEVEL: i32 = -1;

/// Labels offered for progressive files without per-quality URLs
pub const DIRECT_FALLBACK_LABELS: [&str; 3] = ["1080p", "720p", "480p"];

/// One variant reported by a streaming client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelInfo {
    pub height: Option<u32>,
    pub width: Option<u32>,
    /// Bandwidth in bits per second
    pub bandwidth: u64,
    pub uri: Option<Url>,
}

impl LevelInfo {
    pub fn label(&self) -> Option<String> {
        self.height.map(|h| format!("{}p", h))
    }
}

/// Error classes surfaced by a streaming client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamErrorKind {
    Network,
    Media,
    Other,
}

impl std::fmt::Display for StreamErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StreamErrorKind::Network => write!(f, "network"),
            StreamErrorKind::Media => write!(f, "media"),
            StreamErrorKind::Other => write!(f, "other"),
        }
    }
}

/// Error event from a streaming client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamError {
    pub kind: StreamErrorKind,
    pub fatal: bool,
    pub details: String,
}

impl StreamError {
    pub fn fatal(kind: StreamErrorKind, details: impl Into<String>) -> Self {
        Self {
            kind,
            fatal: true,
            details: details.into(),
        }
    }

    pub fn non_fatal(kind: StreamErrorKind, details: impl Into<String>) -> Self {
        Self {
            kind,
            fatal: false,
            details: details.into(),
        }
    }
}

impl From<StreamError> for crate::Error {
    fn from(error: StreamError) -> Self {
        crate::Error::StreamFatal {
            kind: error.kind.to_string(),
            details: error.details,
        }
    }
}

/// What the adapter did about a stream error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryAction {
    Ignored,
    Reloaded,
    RecoveredMedia,
    Destroyed,
}

/// Adaptive streaming client (hls.js-like)
#[async_trait]
pub trait StreamingClient: Send {
    /// Fetch and parse the manifest; resolves with the variant list
    async fn load_source(&mut self, url: &Url) -> Result<Vec<LevelInfo>>;

    /// Variants from the last parsed manifest
    fn levels(&self) -> &[LevelInfo];

    /// Pin a level index, or [`AUTO_LEVEL`]
    fn set_current_level(&mut self, level: i32);

    fn current_level(&self) -> i32;

    /// Restart loading after a network failure
    async fn start_load(&mut self) -> Result<()>;

    /// Try to recover from a decode failure in place
    fn recover_media_error(&mut self);

    /// Release every resource held by the client
    fn destroy(&mut self);
}

/// Builds a fresh streaming client per attached source
pub type ClientFactory = Arc<dyn Fn() -> Box<dyn StreamingClient> + Send + Sync>;

/// Factory for the reqwest/m3u8-rs backed client
pub fn hls_client_factory() -> ClientFactory {
    Arc::new(|| Box::new(HlsClient::new()) as Box<dyn StreamingClient>)
}

/// How the current source is being played
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackPath {
    /// Adaptive manifest through a streaming client
    Streaming,
    /// Adaptive manifest played by the element itself
    NativeAdaptive,
    /// Progressive file
    Direct,
}

impl PlaybackPath {
    /// Streaming starts as soon as the manifest is parsed
    pub fn autoplay_on_attach(self) -> bool {
        matches!(self, PlaybackPath::Streaming)
    }

    /// Native adaptive playback starts once metadata is loaded
    pub fn autoplay_on_metadata(self) -> bool {
        matches!(self, PlaybackPath::NativeAdaptive)
    }
}

/// Media Source Adapter for one player instance
pub struct MediaSourceAdapter {
    source: MediaSource,
    factory: ClientFactory,
    client: Option<Box<dyn StreamingClient>>,
    levels: Vec<QualityLevel>,
    path: Option<PlaybackPath>,
    /// URL currently set on the element (differs from the source URL after
    /// switching to a per-quality progressive file)
    active_url: Option<Url>,
}

impl MediaSourceAdapter {
    pub fn new(source: MediaSource, factory: ClientFactory) -> Self {
        Self {
            source,
            factory,
            client: None,
            levels: vec![QualityLevel::auto()],
            path: None,
            active_url: None,
        }
    }

    pub fn source(&self) -> &MediaSource {
        &self.source
    }

    /// Normalized quality list, "Auto" first
    pub fn levels(&self) -> &[QualityLevel] {
        &self.levels
    }

    pub fn level_labels(&self) -> Vec<String> {
        self.levels.iter().map(|l| l.label.clone()).collect()
    }

    pub fn path(&self) -> Option<PlaybackPath> {
        self.path
    }

    pub fn has_client(&self) -> bool {
        self.client.is_some()
    }

    /// Raw level index currently pinned on the client
    pub fn client_level(&self) -> Option<i32> {
        self.client.as_ref().map(|c| c.current_level())
    }

    /// Wire the source to the element
    #[instrument(skip(self, element), fields(url = %self.source.url()))]
    pub async fn attach(&mut self, element: &mut dyn MediaElement) -> Result<PlaybackPath> {
        self.detach();

        let url = self.source.url().clone();
        let path = match &self.source.kind {
            SourceKind::Adaptive(_) if !element.can_play_native_hls() => {
                let mut client = (self.factory)();
                element.set_source(&url);
                let levels = match client.load_source(&url).await {
                    Ok(levels) => levels,
                    Err(e) => {
                        warn!(error = %e, "Manifest load failed, releasing client");
                        client.destroy();
                        return Err(e);
                    }
                };
                client.set_current_level(AUTO_LEVEL);
                self.client = Some(client);
                self.on_manifest_parsed(&levels);
                PlaybackPath::Streaming
            }
            SourceKind::Adaptive(_) => {
                element.set_source(&url);
                self.levels = vec![QualityLevel::auto()];
                PlaybackPath::NativeAdaptive
            }
            SourceKind::Direct(_) => {
                element.set_source(&url);
                self.levels = self.direct_levels();
                PlaybackPath::Direct
            }
        };

        self.active_url = Some(url);
        self.path = Some(path);
        info!(?path, levels = ?self.level_labels(), "Source attached");
        Ok(path)
    }

    /// Build the label list from a parsed manifest: unique heights,
    /// highest first, "Auto" in front.
    fn on_manifest_parsed(&mut self, levels: &[LevelInfo]) {
        let mut heights: Vec<u32> = levels.iter().filter_map(|l| l.height).collect();
        heights.sort_unstable_by(|a, b| b.cmp(a));
        heights.dedup();

        self.levels = std::iter::once(QualityLevel::auto())
            .chain(heights.into_iter().map(QualityLevel::from_height))
            .collect();
        debug!(levels = levels.len(), "Manifest parsed");
    }

    fn direct_levels(&self) -> Vec<QualityLevel> {
        let mut levels: Vec<QualityLevel> = if self.source.renditions.is_empty() {
            DIRECT_FALLBACK_LABELS
                .iter()
                .map(|l| QualityLevel::from_label(l))
                .collect()
        } else {
            self.source
                .renditions
                .keys()
                .map(|l| QualityLevel::from_label(l))
                .collect()
        };
        levels.sort_by(|a, b| b.height.cmp(&a.height));
        levels.insert(0, QualityLevel::auto());
        levels
    }

    /// Switch playback quality. Returns false (and changes nothing) when
    /// the label is not offered.
    pub fn switch_level(&mut self, label: &str, element: &mut dyn MediaElement) -> bool {
        if !self.levels.iter().any(|l| l.label == label) {
            debug!(label, "Quality not offered, ignoring");
            return false;
        }

        if let Some(client) = self.client.as_mut() {
            if label == AUTO_LABEL {
                client.set_current_level(AUTO_LEVEL);
            } else {
                let index = client
                    .levels()
                    .iter()
                    .position(|l| l.label().as_deref() == Some(label));
                match index {
                    Some(index) => client.set_current_level(index as i32),
                    None => return false,
                }
            }
            info!(label, level = client.current_level(), "Quality switched");
            return true;
        }

        if self.path == Some(PlaybackPath::Direct) {
            let target = if label == AUTO_LABEL {
                Some(self.source.url().clone())
            } else {
                self.source.renditions.get(label).cloned()
            };
            // Without a per-quality URL the switch is cosmetic.
            if let Some(target) = target {
                if self.active_url.as_ref() != Some(&target) {
                    let position = element.current_time();
                    let was_playing = !element.is_paused();
                    element.set_source(&target);
                    element.set_current_time(position);
                    if was_playing {
                        if let Err(e) = element.play() {
                            warn!(error = %e, "Playback did not resume after quality switch");
                        }
                    }
                    self.active_url = Some(target);
                }
            }
        }

        info!(label, "Quality switched");
        true
    }

    /// Apply the recovery policy for a client error
    #[instrument(skip(self), fields(kind = %error.kind, fatal = error.fatal))]
    pub async fn handle_error(&mut self, error: &StreamError) -> RecoveryAction {
        if !error.fatal {
            debug!(details = %error.details, "Non-fatal stream error ignored");
            return RecoveryAction::Ignored;
        }
        let Some(client) = self.client.as_mut() else {
            return RecoveryAction::Ignored;
        };

        match error.kind {
            StreamErrorKind::Network => {
                warn!(details = %error.details, "Fatal network error, reloading source");
                match client.start_load().await {
                    Ok(()) => RecoveryAction::Reloaded,
                    Err(e) => {
                        warn!(error = %e, "Reload failed, tearing down client");
                        self.detach();
                        RecoveryAction::Destroyed
                    }
                }
            }
            StreamErrorKind::Media => {
                warn!(details = %error.details, "Fatal media error, attempting recovery");
                client.recover_media_error();
                RecoveryAction::RecoveredMedia
            }
            StreamErrorKind::Other => {
                warn!(details = %error.details, "Unrecoverable stream error, tearing down client");
                self.detach();
                RecoveryAction::Destroyed
            }
        }
    }

    /// Destroy the streaming client, if any
    pub fn detach(&mut self) {
        if let Some(mut client) = self.client.take() {
            client.destroy();
            debug!("Streaming client destroyed");
        }
    }
}

impl Drop for MediaSourceAdapter {
    fn drop(&mut self) {
        self.detach();
    }
}
