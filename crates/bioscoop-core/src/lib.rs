//! BioScoop Core - Player library for the BioScoop streaming catalog
//!
//! This crate provides the player behind every "watch" page:
//! - Media source adaptation (HLS client, native HLS, progressive files)
//! - Quality level normalization and switching
//! - Seeking, chapter shortcuts and skip gestures
//! - Resume-from-position and continue-watching persistence
//! - Simulated downloads with progress and best-effort file saving
//! - Controls auto-hide and transient notices
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        BioScoop Core                            │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐           │
//! │  │ Media Source │  │   Playback   │  │   Download   │           │
//! │  │   Adapter    │  │   Tracker    │  │  Simulator   │           │
//! │  └──────┬───────┘  └──────┬───────┘  └──────┬───────┘           │
//! │         │                 │                 │                   │
//! │         └─────────────────┼─────────────────┘                   │
//! │                           │                                     │
//! │                    ┌──────┴──────┐                              │
//! │                    │   Player    │◄──── Scheduler (timers)      │
//! │                    │ Controller  │                              │
//! │                    └──────┬──────┘                              │
//! │                           │                                     │
//! │  ┌──────────────┐  ┌──────┴──────┐  ┌──────────────┐            │
//! │  │    Media     │  │   Content   │  │  File Saver  │            │
//! │  │   Element    │  │    Store    │  │              │            │
//! │  └──────────────┘  └─────────────┘  └──────────────┘            │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod types;
pub mod config;
pub mod scheduler;
pub mod media;
pub mod adapter;
pub mod playback;
pub mod download;
pub mod resume;
pub mod controls;
pub mod store;
pub mod catalog;
pub mod save;
pub mod events;
pub mod controller;

pub use error::{Error, Result};
pub use types::*;
pub use config::{DownloadCompletionPolicy, PlayerConfig};
pub use scheduler::{Scheduler, TaskName, Ticket};
pub use media::{MediaElement, SimulatedMediaElement};
pub use adapter::{
    hls_client_factory, ClientFactory, HlsClient, LevelInfo, MediaSourceAdapter, PlaybackPath,
    RecoveryAction, ScriptedClient, StreamError, StreamErrorKind, StreamingClient,
};
pub use playback::{format_time, PlaybackTracker};
pub use download::{estimate_size, DownloadSimulator, FixedRamp, RampSource, RandomRamp};
pub use resume::ResumeTracker;
pub use controls::ControlsVisibility;
pub use store::{ContentStore, MemoryStore};
pub use catalog::{resolve_playback, PlaybackTarget};
pub use save::{DisabledSaver, FileSaver, HttpFileSaver};
pub use events::{MediaEvent, PlayerEvent, TimerEvent, UserAction};
pub use controller::{PlayerContext, PlayerController, PlayerProps, PlayerSnapshot};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the player library with default configuration
pub fn init() {
    tracing::info!(version = VERSION, "BioScoop Core initialized");
}
