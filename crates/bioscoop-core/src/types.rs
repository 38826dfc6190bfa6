//! Core types for BioScoop Core

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use url::Url;
use uuid::Uuid;

/// Unique identifier for a mounted player instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Sources and Quality
// =============================================================================

/// How a source URL is played back, decided once when the source is built
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "url", rename_all = "snake_case")]
pub enum SourceKind {
    /// Adaptive manifest (HLS)
    Adaptive(Url),
    /// Progressive file (MP4 and friends)
    Direct(Url),
}

impl SourceKind {
    /// Classify a URL by its path extension
    pub fn detect(url: Url) -> Self {
        let path = url.path().to_lowercase();
        if path.ends_with(".m3u8") || path.ends_with(".m3u") {
            SourceKind::Adaptive(url)
        } else {
            SourceKind::Direct(url)
        }
    }

    pub fn url(&self) -> &Url {
        match self {
            SourceKind::Adaptive(url) | SourceKind::Direct(url) => url,
        }
    }

    pub fn is_adaptive(&self) -> bool {
        matches!(self, SourceKind::Adaptive(_))
    }
}

/// A playable source plus optional per-quality progressive renditions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaSource {
    pub kind: SourceKind,
    /// Quality label ("720p") to a direct file URL for that quality
    #[serde(default)]
    pub renditions: BTreeMap<String, Url>,
}

impl MediaSource {
    pub fn new(kind: SourceKind) -> Self {
        Self {
            kind,
            renditions: BTreeMap::new(),
        }
    }

    /// Parse and classify a URL string
    pub fn parse(url: &str) -> crate::Result<Self> {
        let url = Url::parse(url)?;
        Ok(Self::new(SourceKind::detect(url)))
    }

    pub fn with_rendition(mut self, label: impl Into<String>, url: Url) -> Self {
        self.renditions.insert(label.into(), url);
        self
    }

    pub fn url(&self) -> &Url {
        self.kind.url()
    }
}

/// Label of the automatic bitrate level
pub const AUTO_LABEL: &str = "Auto";

/// One selectable playback quality
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityLevel {
    /// Display label, e.g. "1080p" or "Auto"
    pub label: String,
    /// Vertical resolution, absent for "Auto"
    pub height: Option<u32>,
}

impl QualityLevel {
    pub fn auto() -> Self {
        Self {
            label: AUTO_LABEL.to_string(),
            height: None,
        }
    }

    pub fn from_height(height: u32) -> Self {
        Self {
            label: format!("{}p", height),
            height: Some(height),
        }
    }

    /// Build a level from a label like "720p"
    pub fn from_label(label: &str) -> Self {
        let height = label.trim_end_matches('p').parse().ok();
        Self {
            label: label.to_string(),
            height,
        }
    }

    pub fn is_auto(&self) -> bool {
        self.label == AUTO_LABEL
    }
}

// =============================================================================
// Playback UI State
// =============================================================================

/// How the picture fills the viewport
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitMode {
    #[default]
    Contain,
    Cover,
    Fill,
}

impl FitMode {
    /// Next mode in the contain -> cover -> fill cycle
    pub fn next(self) -> Self {
        match self {
            FitMode::Contain => FitMode::Cover,
            FitMode::Cover => FitMode::Fill,
            FitMode::Fill => FitMode::Contain,
        }
    }
}

/// Picture rotation in quarter turns
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rotation(u16);

impl Rotation {
    pub fn degrees(self) -> u16 {
        self.0
    }

    /// Rotate clockwise by 90 degrees
    pub fn rotated(self) -> Self {
        Self((self.0 + 90) % 360)
    }
}

/// Video chapter/marker for navigation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chapter {
    pub id: String,
    pub title: String,
    /// Start time in seconds
    pub start_time: f64,
}

impl Chapter {
    pub fn new(id: impl Into<String>, title: impl Into<String>, start_time: f64) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            start_time,
        }
    }

    /// Marker position on the scrub bar as a percentage
    pub fn marker_position(&self, duration: f64) -> Option<f64> {
        if duration <= 0.0 || !duration.is_finite() {
            return None;
        }
        let position = (self.start_time / duration) * 100.0;
        (0.0..=100.0).contains(&position).then_some(position)
    }

    /// Scrub-bar marker, if the chapter falls inside `duration`
    pub fn marker(&self, duration: f64) -> Option<ChapterMarker> {
        self.marker_position(duration).map(|position| ChapterMarker {
            id: self.id.clone(),
            title: self.title.clone(),
            start_time: self.start_time,
            position,
        })
    }
}

/// Chapter placed on the scrub bar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterMarker {
    pub id: String,
    pub title: String,
    pub start_time: f64,
    /// Percentage of the duration
    pub position: f64,
}

/// Download simulator state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadStatus {
    #[default]
    Idle,
    Downloading,
    Success,
}

impl std::fmt::Display for DownloadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DownloadStatus::Idle => write!(f, "idle"),
            DownloadStatus::Downloading => write!(f, "downloading"),
            DownloadStatus::Success => write!(f, "success"),
        }
    }
}

/// Transient confirmation shown over the player
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub message: String,
}

// =============================================================================
// Catalog Types
// =============================================================================

/// Kind of catalog item
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    #[default]
    Movie,
    Series,
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContentType::Movie => write!(f, "movie"),
            ContentType::Series => write!(f, "series"),
        }
    }
}

/// Audio languages offered by the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    Telugu,
    Tamil,
    Hindi,
    Kannada,
    Malayalam,
    English,
}

impl std::str::FromStr for Language {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.to_lowercase().as_str() {
            "telugu" => Ok(Language::Telugu),
            "tamil" => Ok(Language::Tamil),
            "hindi" => Ok(Language::Hindi),
            "kannada" => Ok(Language::Kannada),
            "malayalam" => Ok(Language::Malayalam),
            "english" => Ok(Language::English),
            _ => Err(crate::Error::UnknownLanguage(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Episode {
    pub id: String,
    pub season: u32,
    pub episode_number: u32,
    pub title: String,
    pub duration: String,
    pub video_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Season {
    pub season_number: u32,
    pub episodes: Vec<Episode>,
}

/// Catalog item (movie or series)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Content {
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub content_type: ContentType,
    pub languages: Vec<Language>,
    pub genres: Vec<String>,
    pub release_year: u16,
    pub poster_url: String,
    pub banner_url: String,
    pub rating: f32,
    pub trending: bool,
    /// Main movie file (HLS manifest or progressive file)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    /// Optional per-quality progressive files
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub quality_urls: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub seasons: Vec<Season>,
    pub created_at: DateTime<Utc>,
}

/// Completed (simulated) download
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadRecord {
    pub content_id: String,
    pub title: String,
    pub poster_url: String,
    pub quality: String,
    /// Human readable size estimate, e.g. "2.0 GB"
    pub size: String,
    pub downloaded_at: DateTime<Utc>,
    #[serde(rename = "type")]
    pub content_type: ContentType,
}

/// Last known playback position for a content item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchPosition {
    pub content_id: String,
    /// Position in seconds
    pub timestamp: f64,
    /// Duration in seconds at the time of the update
    pub duration: f64,
    pub updated_at: DateTime<Utc>,
}

impl WatchPosition {
    /// Watched fraction in percent
    pub fn progress_percent(&self) -> f64 {
        if self.duration > 0.0 {
            (self.timestamp / self.duration * 100.0).clamp(0.0, 100.0)
        } else {
            0.0
        }
    }
}
