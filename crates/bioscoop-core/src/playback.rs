//! Playback state tracking
//!
//! Keeps position, duration and progress in sync with the media element
//! and turns seek gestures (percentages, chapter starts, skips) into
//! clamped absolute targets.

use serde::{Deserialize, Serialize};

/// Guard against division by a zero duration
const DURATION_EPSILON: f64 = 1e-9;

/// Position, duration and derived progress of the current source
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlaybackTracker {
    current_time: f64,
    /// 0 until metadata is known
    duration: f64,
    /// Percentage in [0, 100]
    progress: f64,
    buffered_fraction: f64,
}

impl PlaybackTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn buffered_fraction(&self) -> f64 {
        self.buffered_fraction
    }

    pub fn has_duration(&self) -> bool {
        self.duration > 0.0
    }

    /// Accept a duration reported by the element; ignores NaN/infinite
    /// values. Returns true if the known duration changed.
    pub fn set_duration(&mut self, duration: f64) -> bool {
        if !duration.is_finite() || duration < 0.0 || duration == self.duration {
            return false;
        }
        self.duration = duration;
        self.current_time = self.clamp_time(self.current_time);
        self.progress = self.percent_of(self.current_time);
        true
    }

    /// Apply a time-update from the element
    pub fn on_time_update(&mut self, current_time: f64, duration: f64) {
        self.set_duration(duration);
        self.current_time = self.clamp_time(current_time);
        self.progress = self.percent_of(self.current_time);
    }

    /// Record how far the element has buffered
    pub fn on_buffered(&mut self, buffered_end: f64) {
        self.buffered_fraction = if self.has_duration() && buffered_end.is_finite() {
            (buffered_end / self.duration).clamp(0.0, 1.0)
        } else {
            0.0
        };
    }

    /// Convert a scrub-bar percentage to an absolute time and update the
    /// tracked progress ahead of the next time-update.
    pub fn seek_percent(&mut self, percent: f64) -> f64 {
        let percent = if percent.is_finite() {
            percent.clamp(0.0, 100.0)
        } else {
            0.0
        };
        let target = self.duration * percent / 100.0;
        self.current_time = target;
        self.progress = if self.has_duration() { percent } else { 0.0 };
        target
    }

    /// Clamp an absolute target and update tracked state optimistically
    pub fn seek_to(&mut self, seconds: f64) -> f64 {
        let target = self.clamp_time(seconds);
        self.current_time = target;
        self.progress = self.percent_of(target);
        target
    }

    /// Target for a relative skip
    pub fn skip_by(&mut self, delta: f64) -> f64 {
        self.seek_to(self.current_time + delta)
    }

    /// Progress percentage for a given position
    pub fn percent_of(&self, seconds: f64) -> f64 {
        if !self.has_duration() {
            return 0.0;
        }
        (seconds / self.duration.max(DURATION_EPSILON) * 100.0).clamp(0.0, 100.0)
    }

    fn clamp_time(&self, seconds: f64) -> f64 {
        if !seconds.is_finite() {
            return 0.0;
        }
        if self.has_duration() {
            seconds.clamp(0.0, self.duration)
        } else {
            seconds.max(0.0)
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Format seconds as `m:ss`; unknown values render as `00:00`
pub fn format_time(seconds: f64) -> String {
    if !seconds.is_finite() || seconds <= 0.0 {
        return "00:00".to_string();
    }
    let mins = (seconds / 60.0).floor() as u64;
    let secs = (seconds % 60.0).floor() as u64;
    format!("{}:{:02}", mins, secs)
}
