//! Events and user actions consumed by the player controller

use crate::{adapter::StreamError, scheduler::Ticket, types::FitMode};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Everything the controller reacts to besides direct user input
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    /// Media element callback
    Media(MediaEvent),
    /// Streaming client error callback
    Stream(StreamError),
    /// Scheduler timer, with the registration that produced it
    Timer { event: TimerEvent, ticket: Ticket },
    /// Background file save finished
    FileSaved {
        filename: String,
        result: Result<PathBuf, String>,
    },
}

/// Media element callbacks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaEvent {
    TimeUpdate,
    LoadedMetadata,
    Ended,
}

/// Timer slots firing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    HideControls,
    DownloadTick,
    DownloadReset,
    DismissNotice,
    PersistProgress,
}

impl From<MediaEvent> for PlayerEvent {
    fn from(event: MediaEvent) -> Self {
        PlayerEvent::Media(event)
    }
}

impl From<StreamError> for PlayerEvent {
    fn from(error: StreamError) -> Self {
        PlayerEvent::Stream(error)
    }
}

impl TimerEvent {
    /// Wrap the timer event for delivery on the player channel
    pub fn fired(self, ticket: Ticket) -> PlayerEvent {
        PlayerEvent::Timer {
            event: self,
            ticket,
        }
    }
}

impl PlayerEvent {
    /// Whether this is the given timer firing
    pub fn is_timer(&self, wanted: TimerEvent) -> bool {
        matches!(self, PlayerEvent::Timer { event, .. } if *event == wanted)
    }
}

/// User input mapped onto the player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", content = "value", rename_all = "snake_case")]
pub enum UserAction {
    /// Click on the picture or the space bar
    TogglePlay,
    /// Scrub bar position in percent
    Seek(f64),
    /// Chapter marker, by absolute start time in seconds
    SeekChapter(f64),
    SkipForward,
    SkipBack,
    SkipIntro,
    SetVolume(f64),
    ToggleMute,
    ToggleFullscreen,
    SetFitMode(FitMode),
    CycleFitMode,
    Rotate,
    ToggleQualityMenu,
    SelectQuality(String),
    ToggleDownloadMenu,
    StartDownload(String),
    /// Mouse move or touch start over the player
    PointerActivity,
    PointerLeave,
}
