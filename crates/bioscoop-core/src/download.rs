//! Simulated downloads
//!
//! A download is a progress ramp (`Idle -> Downloading -> Success`) fed by
//! a [`RampSource`] on a fixed tick. When the ramp completes the controller
//! persists a [`DownloadRecord`] and, for progressive sources, asks a
//! file saver for a real copy.

use crate::{
    config::PlayerConfig,
    types::{ContentType, DownloadRecord, DownloadStatus},
    Error, Result,
};
use chrono::Utc;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

/// Container extension used for saved files
pub const DOWNLOAD_EXTENSION: &str = "mp4";

/// Assumed bitrate in Mbps for a quality label
pub fn bitrate_mbps(quality: &str) -> f64 {
    if quality.contains("1080p") {
        4.5
    } else if quality.contains("720p") {
        2.2
    } else if quality.contains("480p") {
        1.0
    } else {
        2.0
    }
}

/// Display estimate of a download's size.
///
/// `MB = Mbps * seconds / 8`; above 1024 MB the value is shown in GB with
/// one decimal, otherwise in whole MB.
pub fn estimate_size(quality: &str, duration_seconds: f64) -> String {
    if duration_seconds <= 0.0 || !duration_seconds.is_finite() {
        return "Unknown size".to_string();
    }
    let size_mb = bitrate_mbps(quality) * duration_seconds / 8.0;
    if size_mb > 1024.0 {
        format!("{:.1} GB", size_mb / 1024.0)
    } else {
        format!("{} MB", size_mb.round() as u64)
    }
}

/// File name for a saved copy: alphanumerics of the title, lowercased
pub fn download_filename(title: &str) -> String {
    let stem: String = title
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect();
    let stem = if stem.is_empty() { "video".to_string() } else { stem };
    format!("{}.{}", stem, DOWNLOAD_EXTENSION)
}

/// Source of per-tick progress increments
pub trait RampSource: Send {
    /// Percentage points to add on this tick
    fn next_increment(&mut self) -> f64;
}

/// Uniform random increments from a seedable ChaCha generator
pub struct RandomRamp {
    rng: ChaCha8Rng,
    min: f64,
    max: f64,
}

impl RandomRamp {
    pub fn new(min: f64, max: f64) -> Self {
        Self {
            rng: ChaCha8Rng::from_os_rng(),
            min,
            max,
        }
    }

    /// Reproducible ramp for tests and demos
    pub fn seeded(seed: u64, min: f64, max: f64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            min,
            max,
        }
    }

    pub fn from_config(config: &PlayerConfig) -> Self {
        Self::new(config.download_increment_min, config.download_increment_max)
    }
}

impl RampSource for RandomRamp {
    fn next_increment(&mut self) -> f64 {
        self.rng.random_range(self.min..=self.max)
    }
}

/// Constant increments
#[derive(Debug, Clone, Copy)]
pub struct FixedRamp(pub f64);

impl RampSource for FixedRamp {
    fn next_increment(&mut self) -> f64 {
        self.0
    }
}

/// Outcome of one progress tick
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// Not downloading; the tick was stale
    Ignored,
    Progress(f64),
    /// Ramp reached 100 for this quality
    Completed { quality: String },
}

/// Download state machine
pub struct DownloadSimulator {
    status: DownloadStatus,
    progress: f64,
    quality: Option<String>,
    ramp: Box<dyn RampSource>,
}

impl DownloadSimulator {
    pub fn new(ramp: Box<dyn RampSource>) -> Self {
        Self {
            status: DownloadStatus::Idle,
            progress: 0.0,
            quality: None,
            ramp,
        }
    }

    pub fn status(&self) -> DownloadStatus {
        self.status
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    /// Quality of the running or finished download
    pub fn quality(&self) -> Option<&str> {
        self.quality.as_deref()
    }

    /// `Idle -> Downloading`
    pub fn start(&mut self, quality: &str) -> Result<()> {
        if self.status != DownloadStatus::Idle {
            return Err(Error::DownloadInProgress);
        }
        self.status = DownloadStatus::Downloading;
        self.progress = 0.0;
        self.quality = Some(quality.to_string());
        info!(quality, "Download started");
        Ok(())
    }

    /// Advance the ramp; `Downloading -> Success` once it reaches 100
    pub fn tick(&mut self) -> TickOutcome {
        if self.status != DownloadStatus::Downloading {
            return TickOutcome::Ignored;
        }
        self.progress += self.ramp.next_increment();
        if self.progress >= 100.0 {
            self.progress = 100.0;
            self.status = DownloadStatus::Success;
            let quality = self.quality.clone().unwrap_or_default();
            info!(quality = %quality, "Download complete");
            TickOutcome::Completed { quality }
        } else {
            debug!(progress = self.progress, "Download progress");
            TickOutcome::Progress(self.progress)
        }
    }

    /// `Success -> Idle`
    pub fn reset(&mut self) {
        if self.status == DownloadStatus::Success {
            self.status = DownloadStatus::Idle;
            self.progress = 0.0;
            self.quality = None;
        }
    }

    /// Enter `Success` directly for content downloaded in an earlier session
    pub fn mark_downloaded(&mut self) {
        self.status = DownloadStatus::Success;
        self.progress = 100.0;
    }

    /// Abandon a running ramp (source change)
    pub fn abort(&mut self) {
        if self.status == DownloadStatus::Downloading {
            self.status = DownloadStatus::Idle;
            self.progress = 0.0;
            self.quality = None;
        }
    }
}

/// Catalog fields copied into a download record
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadMeta {
    pub content_id: String,
    pub title: String,
    pub poster_url: String,
    pub content_type: ContentType,
}

impl DownloadMeta {
    pub fn record(&self, quality: &str, duration_seconds: f64) -> DownloadRecord {
        DownloadRecord {
            content_id: self.content_id.clone(),
            title: self.title.clone(),
            poster_url: self.poster_url.clone(),
            quality: quality.to_string(),
            size: estimate_size(quality, duration_seconds),
            downloaded_at: Utc::now(),
            content_type: self.content_type,
        }
    }
}
