//! Media element seam
//!
//! The controller never talks to a decoder directly. It drives a
//! [`MediaElement`], which in a browser build is the `<video>` element and
//! in headless builds is [`SimulatedMediaElement`].

use crate::{Error, Result};
use std::sync::{Arc, Mutex, MutexGuard};
use url::Url;

/// MIME type probed for native HLS support
pub const HLS_MIME_TYPE: &str = "application/vnd.apple.mpegurl";

/// Operations the player needs from a media element
pub trait MediaElement: Send {
    /// Current position in seconds
    fn current_time(&self) -> f64;

    /// Move the playhead
    fn set_current_time(&mut self, seconds: f64);

    /// Duration in seconds; NaN or infinite until metadata is known
    fn duration(&self) -> f64;

    /// Start playback. Fails with [`Error::AutoplayBlocked`] when refused.
    fn play(&mut self) -> Result<()>;

    fn pause(&mut self);

    fn is_paused(&self) -> bool;

    fn set_volume(&mut self, volume: f64);

    fn set_muted(&mut self, muted: bool);

    /// Point the element at a new source URL
    fn set_source(&mut self, url: &Url);

    fn source(&self) -> Option<Url>;

    /// End of the buffered range containing the playhead, in seconds
    fn buffered_end(&self) -> f64;

    /// Whether the element can play the given MIME type natively
    fn can_play_type(&self, mime: &str) -> bool;

    fn can_play_native_hls(&self) -> bool {
        self.can_play_type(HLS_MIME_TYPE)
    }
}

#[derive(Debug)]
struct SimulatedState {
    source: Option<Url>,
    current_time: f64,
    duration: f64,
    paused: bool,
    volume: f64,
    muted: bool,
    buffered_ahead: f64,
    native_hls: bool,
    reject_autoplay: bool,
}

/// In-memory media element with a manually advanced clock
///
/// Clones share the same state, so a test or driver can keep a handle
/// while the controller owns another.
#[derive(Debug, Clone)]
pub struct SimulatedMediaElement {
    state: Arc<Mutex<SimulatedState>>,
}

impl SimulatedMediaElement {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(SimulatedState {
                source: None,
                current_time: 0.0,
                duration: f64::NAN,
                paused: true,
                volume: 1.0,
                muted: false,
                buffered_ahead: 30.0,
                native_hls: false,
                reject_autoplay: false,
            })),
        }
    }

    /// Report native HLS support (Safari-like element)
    pub fn with_native_hls(self, native: bool) -> Self {
        self.lock().native_hls = native;
        self
    }

    /// Refuse every `play()` call, like a browser autoplay policy
    pub fn with_autoplay_rejected(self, rejected: bool) -> Self {
        self.lock().reject_autoplay = rejected;
        self
    }

    /// Simulate metadata arriving
    pub fn set_duration(&self, duration: f64) {
        self.lock().duration = duration;
    }

    /// Advance the playhead if playing; returns the new position
    pub fn advance(&self, seconds: f64) -> f64 {
        let mut state = self.lock();
        if !state.paused {
            let limit = if state.duration.is_finite() {
                state.duration
            } else {
                f64::MAX
            };
            state.current_time = (state.current_time + seconds).min(limit);
            if state.current_time >= limit {
                state.paused = true;
            }
        }
        state.current_time
    }

    /// Whether the playhead reached the end
    pub fn is_ended(&self) -> bool {
        let state = self.lock();
        state.duration.is_finite() && state.current_time >= state.duration
    }

    pub fn volume(&self) -> f64 {
        self.lock().volume
    }

    pub fn is_muted(&self) -> bool {
        self.lock().muted
    }

    fn lock(&self) -> MutexGuard<'_, SimulatedState> {
        // A poisoned lock only means another holder panicked mid-update;
        // the plain-data state is still usable.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for SimulatedMediaElement {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaElement for SimulatedMediaElement {
    fn current_time(&self) -> f64 {
        self.lock().current_time
    }

    fn set_current_time(&mut self, seconds: f64) {
        let mut state = self.lock();
        let upper = if state.duration.is_finite() {
            state.duration
        } else {
            f64::MAX
        };
        state.current_time = seconds.clamp(0.0, upper);
    }

    fn duration(&self) -> f64 {
        self.lock().duration
    }

    fn play(&mut self) -> Result<()> {
        let mut state = self.lock();
        if state.reject_autoplay {
            return Err(Error::AutoplayBlocked);
        }
        if state.source.is_none() {
            return Err(Error::MediaElement("no source attached".into()));
        }
        state.paused = false;
        Ok(())
    }

    fn pause(&mut self) {
        self.lock().paused = true;
    }

    fn is_paused(&self) -> bool {
        self.lock().paused
    }

    fn set_volume(&mut self, volume: f64) {
        self.lock().volume = volume.clamp(0.0, 1.0);
    }

    fn set_muted(&mut self, muted: bool) {
        self.lock().muted = muted;
    }

    fn set_source(&mut self, url: &Url) {
        let mut state = self.lock();
        state.source = Some(url.clone());
        state.current_time = 0.0;
        state.paused = true;
    }

    fn source(&self) -> Option<Url> {
        self.lock().source.clone()
    }

    fn buffered_end(&self) -> f64 {
        let state = self.lock();
        let end = state.current_time + state.buffered_ahead;
        if state.duration.is_finite() {
            end.min(state.duration)
        } else {
            end
        }
    }

    fn can_play_type(&self, mime: &str) -> bool {
        match mime {
            HLS_MIME_TYPE => self.lock().native_hls,
            "video/mp4" | "video/webm" => true,
            _ => false,
        }
    }
}
