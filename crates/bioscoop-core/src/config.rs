//! Player configuration
//!
//! Every timing constant of the controller lives here so that the
//! embedding application (or the CLI `--config` flag) can tune them.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// What happens to a finished download for the rest of the session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadCompletionPolicy {
    /// Success returns to idle after `download_reset_ms`, allowing another
    /// download. The mount-time "already downloaded" check is not applied.
    #[default]
    ResetAfterDelay,
    /// Success is terminal. A player mounted for already-downloaded content
    /// starts in the success state.
    KeepForSession,
}

/// Player configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Inactivity before on-screen controls hide (ms)
    pub controls_hide_delay_ms: u64,
    /// Download progress tick interval (ms)
    pub download_tick_ms: u64,
    /// Smallest random progress increment per tick (percentage points)
    pub download_increment_min: f64,
    /// Largest random progress increment per tick (percentage points)
    pub download_increment_max: f64,
    /// Behavior after a download completes
    pub download_completion: DownloadCompletionPolicy,
    /// Delay before success returns to idle (ms)
    pub download_reset_ms: u64,
    /// Lifetime of the transient confirmation notice (ms)
    pub notice_dismiss_ms: u64,
    /// Watch position persist interval while playing (ms)
    pub persist_interval_ms: u64,
    /// Positions at or below this are never persisted (seconds)
    pub min_persist_position: f64,
    /// Saved positions at or below this are never resumed (seconds)
    pub resume_min_position: f64,
    /// Saved positions within this many seconds of the end are not resumed
    pub resume_tail_margin: f64,
    /// Manual skip distance (seconds)
    pub skip_seconds: f64,
    /// Skip-intro jump distance (seconds)
    pub skip_intro_seconds: f64,
    /// Skip-intro is offered while the position is below this (seconds)
    pub skip_intro_window: f64,
    /// Qualities offered in the download menu
    pub download_qualities: Vec<String>,
    /// Start playback automatically once the source is ready
    pub autoplay: bool,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            controls_hide_delay_ms: 3000,
            download_tick_ms: 200,
            download_increment_min: 2.0,
            download_increment_max: 8.0,
            download_completion: DownloadCompletionPolicy::ResetAfterDelay,
            download_reset_ms: 3000,
            notice_dismiss_ms: 3000,
            persist_interval_ms: 5000,
            min_persist_position: 5.0,
            resume_min_position: 10.0,
            resume_tail_margin: 60.0,
            skip_seconds: 10.0,
            skip_intro_seconds: 85.0,
            skip_intro_window: 35.0,
            download_qualities: vec!["1080p".into(), "720p".into(), "480p".into()],
            autoplay: true,
        }
    }
}

impl PlayerConfig {
    /// Load a JSON config file; absent fields keep their defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: PlayerConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the controller cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.download_tick_ms == 0 || self.persist_interval_ms == 0 {
            return Err(Error::InvalidConfig(
                "tick and persist intervals must be non-zero".into(),
            ));
        }
        if self.download_increment_min <= 0.0
            || self.download_increment_max < self.download_increment_min
        {
            return Err(Error::InvalidConfig(format!(
                "download increment range {}..{} is empty",
                self.download_increment_min, self.download_increment_max
            )));
        }
        if self.resume_min_position < 0.0 || self.resume_tail_margin < 0.0 {
            return Err(Error::InvalidConfig("resume window must be non-negative".into()));
        }
        if self.download_qualities.is_empty() {
            return Err(Error::InvalidConfig("no download qualities configured".into()));
        }
        Ok(())
    }

    pub fn controls_hide_delay(&self) -> Duration {
        Duration::from_millis(self.controls_hide_delay_ms)
    }

    pub fn download_tick(&self) -> Duration {
        Duration::from_millis(self.download_tick_ms)
    }

    pub fn download_reset(&self) -> Duration {
        Duration::from_millis(self.download_reset_ms)
    }

    pub fn notice_dismiss(&self) -> Duration {
        Duration::from_millis(self.notice_dismiss_ms)
    }

    pub fn persist_interval(&self) -> Duration {
        Duration::from_millis(self.persist_interval_ms)
    }
}
