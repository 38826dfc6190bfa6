//! Player Controller - owns one mounted player instance
//!
//! Coordinates:
//! - Source attachment and quality switching through the adapter
//! - Playback position, seeking and skip gestures
//! - Resume at mount and periodic watch-progress persistence
//! - The simulated download ramp and its completion side effects
//! - Controls auto-hide and transient notices
//!
//! Every timer is a task in the player's [`Scheduler`]; tasks only post
//! [`PlayerEvent`]s and the controller applies them on its own task.
//! After [`PlayerController::dispose`] nothing fires and nothing is applied.

use crate::{
    adapter::{hls_client_factory, ClientFactory, MediaSourceAdapter, PlaybackPath, RecoveryAction},
    catalog::PlaybackTarget,
    config::{DownloadCompletionPolicy, PlayerConfig},
    controls::{ControlsVisibility, HideContext},
    download::{download_filename, estimate_size, DownloadMeta, DownloadSimulator, RampSource, RandomRamp, TickOutcome},
    events::{MediaEvent, PlayerEvent, TimerEvent, UserAction},
    media::MediaElement,
    playback::PlaybackTracker,
    resume::ResumeTracker,
    save::{DisabledSaver, FileSaver},
    scheduler::{Scheduler, TaskName},
    store::ContentStore,
    types::*,
    Error, Result,
};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Descriptive inputs of a player instance
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayerProps {
    pub title: String,
    pub subtitle: Option<String>,
    pub poster_url: Option<String>,
    /// Enables resume, progress persistence and download records
    pub content_id: Option<String>,
    pub chapters: Vec<Chapter>,
}

impl PlayerProps {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_content_id(mut self, id: impl Into<String>) -> Self {
        self.content_id = Some(id.into());
        self
    }

    pub fn with_subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.subtitle = Some(subtitle.into());
        self
    }

    pub fn with_chapters(mut self, chapters: Vec<Chapter>) -> Self {
        self.chapters = chapters;
        self
    }

    /// Props for a resolved catalog item
    pub fn from_target(target: &PlaybackTarget) -> Self {
        Self {
            title: target.title.clone(),
            subtitle: target.subtitle.clone(),
            poster_url: Some(target.poster_url.clone()),
            content_id: Some(target.content_id.clone()),
            chapters: Vec::new(),
        }
    }

    fn download_meta(&self) -> Option<DownloadMeta> {
        let content_id = self.content_id.clone()?;
        Some(DownloadMeta {
            content_id,
            title: self.title.clone(),
            poster_url: self.poster_url.clone().unwrap_or_default(),
            content_type: if self.subtitle.is_some() {
                ContentType::Series
            } else {
                ContentType::Movie
            },
        })
    }
}

/// Collaborators injected into a player
pub struct PlayerContext {
    pub store: Arc<dyn ContentStore>,
    pub element: Box<dyn MediaElement>,
    pub client_factory: ClientFactory,
    pub file_saver: Arc<dyn FileSaver>,
    /// Defaults to a random ramp built from the config
    pub ramp: Option<Box<dyn RampSource>>,
}

impl PlayerContext {
    pub fn new(store: Arc<dyn ContentStore>, element: Box<dyn MediaElement>) -> Self {
        Self {
            store,
            element,
            client_factory: hls_client_factory(),
            file_saver: Arc::new(DisabledSaver),
            ramp: None,
        }
    }

    pub fn with_client_factory(mut self, factory: ClientFactory) -> Self {
        self.client_factory = factory;
        self
    }

    pub fn with_file_saver(mut self, saver: Arc<dyn FileSaver>) -> Self {
        self.file_saver = saver;
        self
    }

    pub fn with_ramp(mut self, ramp: Box<dyn RampSource>) -> Self {
        self.ramp = Some(ramp);
        self
    }
}

/// Entry of the download menu
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadOption {
    pub quality: String,
    pub estimated_size: String,
}

/// Observable state of a player
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerSnapshot {
    pub session_id: SessionId,
    pub title: String,
    pub subtitle: Option<String>,
    pub path: Option<PlaybackPath>,
    pub is_playing: bool,
    pub current_time: f64,
    pub duration: f64,
    pub progress: f64,
    pub buffered_fraction: f64,
    pub volume: f64,
    pub is_muted: bool,
    pub is_fullscreen: bool,
    pub fit_mode: FitMode,
    pub rotation: u16,
    pub controls_visible: bool,
    pub quality_menu_open: bool,
    pub download_menu_open: bool,
    pub qualities: Vec<String>,
    pub selected_quality: String,
    pub download_status: DownloadStatus,
    pub download_progress: f64,
    pub notice: Option<String>,
    /// Last error that stopped playback
    pub error: Option<String>,
    pub chapter_markers: Vec<ChapterMarker>,
    pub skip_intro_available: bool,
    pub disposed: bool,
}

/// Player Interaction Controller
pub struct PlayerController {
    id: SessionId,
    config: PlayerConfig,
    props: PlayerProps,
    download_meta: Option<DownloadMeta>,

    store: Arc<dyn ContentStore>,
    element: Box<dyn MediaElement>,
    client_factory: ClientFactory,
    file_saver: Arc<dyn FileSaver>,

    adapter: MediaSourceAdapter,
    tracker: PlaybackTracker,
    downloads: DownloadSimulator,
    resume: ResumeTracker,
    controls: ControlsVisibility,
    scheduler: Scheduler<PlayerEvent>,
    events: mpsc::UnboundedReceiver<PlayerEvent>,
    state_tx: watch::Sender<PlayerSnapshot>,

    is_playing: bool,
    volume: f64,
    is_muted: bool,
    is_fullscreen: bool,
    fit_mode: FitMode,
    rotation: Rotation,
    quality_menu_open: bool,
    download_menu_open: bool,
    selected_quality: String,
    notice: Option<Notice>,
    error: Option<String>,
    disposed: bool,
}

impl PlayerController {
    /// Build a player for `source`. Nothing touches the element until
    /// [`mount`](Self::mount).
    pub fn new(
        config: PlayerConfig,
        source: MediaSource,
        mut props: PlayerProps,
        ctx: PlayerContext,
    ) -> Result<Self> {
        config.validate()?;

        props
            .chapters
            .sort_by(|a, b| a.start_time.total_cmp(&b.start_time));
        let ramp = ctx
            .ramp
            .unwrap_or_else(|| Box::new(RandomRamp::from_config(&config)));
        let (scheduler, events) = Scheduler::new();

        let mut controller = Self {
            id: SessionId::new(),
            download_meta: props.download_meta(),
            resume: ResumeTracker::new(props.content_id.clone(), &config),
            adapter: MediaSourceAdapter::new(source, ctx.client_factory.clone()),
            tracker: PlaybackTracker::new(),
            downloads: DownloadSimulator::new(ramp),
            controls: ControlsVisibility::new(),
            scheduler,
            events,
            state_tx: watch::channel(Self::placeholder_snapshot()).0,
            store: ctx.store,
            element: ctx.element,
            client_factory: ctx.client_factory,
            file_saver: ctx.file_saver,
            is_playing: false,
            volume: 1.0,
            is_muted: false,
            is_fullscreen: false,
            fit_mode: FitMode::default(),
            rotation: Rotation::default(),
            quality_menu_open: false,
            download_menu_open: false,
            selected_quality: AUTO_LABEL.to_string(),
            notice: None,
            error: None,
            disposed: false,
            config,
            props,
        };
        controller.publish();
        Ok(controller)
    }

    fn placeholder_snapshot() -> PlayerSnapshot {
        PlayerSnapshot {
            session_id: SessionId::new(),
            title: String::new(),
            subtitle: None,
            path: None,
            is_playing: false,
            current_time: 0.0,
            duration: 0.0,
            progress: 0.0,
            buffered_fraction: 0.0,
            volume: 1.0,
            is_muted: false,
            is_fullscreen: false,
            fit_mode: FitMode::default(),
            rotation: 0,
            controls_visible: true,
            quality_menu_open: false,
            download_menu_open: false,
            qualities: Vec::new(),
            selected_quality: AUTO_LABEL.to_string(),
            download_status: DownloadStatus::Idle,
            download_progress: 0.0,
            notice: None,
            error: None,
            chapter_markers: Vec::new(),
            skip_intro_available: false,
            disposed: false,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    pub fn props(&self) -> &PlayerProps {
        &self.props
    }

    pub fn chapters(&self) -> &[Chapter] {
        &self.props.chapters
    }

    /// Scrub-bar markers; empty until the duration is known
    pub fn chapter_markers(&self) -> Vec<ChapterMarker> {
        self.props
            .chapters
            .iter()
            .filter_map(|c| c.marker(self.tracker.duration()))
            .collect()
    }

    /// Last error that stopped playback
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn path(&self) -> Option<PlaybackPath> {
        self.adapter.path()
    }

    pub fn qualities(&self) -> Vec<String> {
        self.adapter.level_labels()
    }

    pub fn selected_quality(&self) -> &str {
        &self.selected_quality
    }

    pub fn download_status(&self) -> DownloadStatus {
        self.downloads.status()
    }

    pub fn download_progress(&self) -> f64 {
        self.downloads.progress()
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn controls_visible(&self) -> bool {
        self.controls.is_visible()
    }

    pub fn tracker(&self) -> &PlaybackTracker {
        &self.tracker
    }

    /// Skip-intro is offered near the start of playback
    pub fn skip_intro_available(&self) -> bool {
        self.tracker.current_time() < self.config.skip_intro_window
    }

    /// Download menu entries with size estimates for the current duration
    pub fn download_options(&self) -> Vec<DownloadOption> {
        self.config
            .download_qualities
            .iter()
            .map(|quality| DownloadOption {
                quality: quality.clone(),
                estimated_size: estimate_size(quality, self.tracker.duration()),
            })
            .collect()
    }

    /// Sender for media element and streaming client callbacks
    pub fn event_sender(&self) -> Option<mpsc::UnboundedSender<PlayerEvent>> {
        self.scheduler.sender()
    }

    /// Subscribe to state snapshots published after every change
    pub fn subscribe(&self) -> watch::Receiver<PlayerSnapshot> {
        self.state_tx.subscribe()
    }

    /// Number of timers currently pending
    pub fn pending_timers(&self) -> usize {
        self.scheduler.active_count()
    }

    pub fn is_timer_pending(&self, task: TaskName) -> bool {
        self.scheduler.is_scheduled(task)
    }

    pub fn snapshot(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            session_id: self.id,
            title: self.props.title.clone(),
            subtitle: self.props.subtitle.clone(),
            path: self.adapter.path(),
            is_playing: self.is_playing,
            current_time: self.tracker.current_time(),
            duration: self.tracker.duration(),
            progress: self.tracker.progress(),
            buffered_fraction: self.tracker.buffered_fraction(),
            volume: self.volume,
            is_muted: self.is_muted,
            is_fullscreen: self.is_fullscreen,
            fit_mode: self.fit_mode,
            rotation: self.rotation.degrees(),
            controls_visible: self.controls.is_visible(),
            quality_menu_open: self.quality_menu_open,
            download_menu_open: self.download_menu_open,
            qualities: self.adapter.level_labels(),
            selected_quality: self.selected_quality.clone(),
            download_status: self.downloads.status(),
            download_progress: self.downloads.progress(),
            notice: self.notice.as_ref().map(|n| n.message.clone()),
            error: self.error.clone(),
            chapter_markers: self.chapter_markers(),
            skip_intro_available: self.skip_intro_available(),
            disposed: self.disposed,
        }
    }

    fn publish(&self) {
        self.state_tx.send_replace(self.snapshot());
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Load the saved position, restore download state and attach the
    /// source. A failed attach leaves the player paused and usable.
    #[instrument(skip(self), fields(session = %self.id, title = %self.props.title))]
    pub async fn mount(&mut self) -> Result<()> {
        if self.disposed {
            return Ok(());
        }
        info!("Mounting player");

        self.load_saved_state().await;
        let attached = self.attach_source().await;
        self.publish();
        attached
    }

    async fn load_saved_state(&mut self) {
        let Some(content_id) = self.props.content_id.clone() else {
            return;
        };

        if let Err(e) = self.resume.load(self.store.as_ref()).await {
            warn!(error = %e, "Could not read saved position");
        }

        if self.config.download_completion == DownloadCompletionPolicy::KeepForSession {
            match self.store.is_downloaded(&content_id).await {
                Ok(true) => {
                    debug!("Content already downloaded");
                    self.downloads.mark_downloaded();
                }
                Ok(false) => {}
                Err(e) => warn!(error = %e, "Could not read download state"),
            }
        }
    }

    async fn attach_source(&mut self) -> Result<()> {
        self.selected_quality = AUTO_LABEL.to_string();
        match self.adapter.attach(self.element.as_mut()).await {
            Ok(path) => {
                self.error = None;
                self.apply_output_settings();
                if path.autoplay_on_attach() && self.config.autoplay {
                    self.start_playback();
                }
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, code = e.error_code(), "Source could not be attached");
                self.error = Some(e.to_string());
                self.set_playing(false);
                Err(e)
            }
        }
    }

    fn apply_output_settings(&mut self) {
        self.element.set_volume(self.volume);
        self.element.set_muted(self.is_muted);
    }

    /// Replace the source. The previous streaming client is destroyed
    /// before the new one is created.
    #[instrument(skip(self, source), fields(session = %self.id, url = %source.url()))]
    pub async fn change_source(&mut self, source: MediaSource) -> Result<()> {
        if self.disposed {
            return Ok(());
        }
        self.persist_position().await;

        self.adapter.detach();
        self.adapter = MediaSourceAdapter::new(source, self.client_factory.clone());

        self.set_playing(false);
        self.tracker.reset();
        self.downloads.abort();
        self.scheduler.cancel(TaskName::DownloadProgress);
        self.download_menu_open = false;
        self.quality_menu_open = false;

        self.resume.reset();
        self.load_saved_state().await;
        let attached = self.attach_source().await;
        self.publish();
        attached
    }

    /// Unmount: persist the final position, cancel every timer, destroy the
    /// streaming client and drop queued events. Safe to call twice.
    #[instrument(skip(self), fields(session = %self.id))]
    pub async fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.persist_position().await;

        self.scheduler.dispose();
        self.adapter.detach();
        self.element.pause();
        self.is_playing = false;

        let mut dropped = 0usize;
        while self.events.try_recv().is_ok() {
            dropped += 1;
        }
        self.events.close();

        self.disposed = true;
        info!(dropped, "Player disposed");
        self.publish();
    }

    // =========================================================================
    // Event loop
    // =========================================================================

    /// Wait for the next event. Returns `None` once disposed or when no
    /// sender remains.
    pub async fn next_event(&mut self) -> Option<PlayerEvent> {
        if self.disposed {
            return None;
        }
        self.events.recv().await
    }

    /// Wait for the next event and apply it
    pub async fn process_next(&mut self) -> Option<PlayerEvent> {
        let event = self.next_event().await?;
        self.handle_event(event.clone()).await;
        Some(event)
    }

    /// Apply every event already queued; returns how many were applied
    pub async fn drain_pending(&mut self) -> usize {
        let mut applied = 0;
        while !self.disposed {
            let Ok(event) = self.events.try_recv() else {
                break;
            };
            self.handle_event(event).await;
            applied += 1;
        }
        applied
    }

    /// Apply one event
    pub async fn handle_event(&mut self, event: PlayerEvent) {
        if self.disposed {
            debug!(?event, "Event after dispose ignored");
            return;
        }

        match event {
            PlayerEvent::Media(event) => self.on_media_event(event).await,
            PlayerEvent::Stream(error) => {
                if self.adapter.handle_error(&error).await == RecoveryAction::Destroyed {
                    let error = Error::from(error);
                    warn!(error = %error, code = error.error_code(), "Playback stopped");
                    self.error = Some(error.to_string());
                    self.element.pause();
                    self.set_playing(false);
                }
            }
            PlayerEvent::Timer { event, ticket } => {
                if self.scheduler.is_current(ticket) {
                    self.on_timer(event).await;
                } else {
                    debug!(?event, task = %ticket.task, "Stale timer event dropped");
                }
            }
            PlayerEvent::FileSaved { filename, result } => match result {
                Ok(path) => {
                    info!(path = %path.display(), "Download saved");
                    self.show_notice(format!("Saved {}", filename));
                }
                Err(reason) => warn!(filename = %filename, reason = %reason, "Download could not be saved"),
            },
        }
        self.publish();
    }

    async fn on_media_event(&mut self, event: MediaEvent) {
        match event {
            MediaEvent::TimeUpdate => {
                self.tracker
                    .on_time_update(self.element.current_time(), self.element.duration());
                self.tracker.on_buffered(self.element.buffered_end());
                self.try_resume();
            }
            MediaEvent::LoadedMetadata => {
                self.tracker.set_duration(self.element.duration());
                self.try_resume();
                let native = self.adapter.path().is_some_and(PlaybackPath::autoplay_on_metadata);
                if native && self.config.autoplay && !self.is_playing {
                    self.start_playback();
                }
            }
            MediaEvent::Ended => {
                self.tracker
                    .on_time_update(self.element.current_time(), self.element.duration());
                self.set_playing(false);
                self.persist_position().await;
            }
        }
    }

    async fn on_timer(&mut self, timer: TimerEvent) {
        match timer {
            TimerEvent::HideControls => {
                let ctx = HideContext {
                    is_playing: self.is_playing,
                    quality_menu_open: self.quality_menu_open,
                    download_menu_open: self.download_menu_open,
                };
                self.controls.on_hide_timer(ctx);
            }
            TimerEvent::DownloadTick => {
                if let TickOutcome::Completed { quality } = self.downloads.tick() {
                    self.scheduler.cancel(TaskName::DownloadProgress);
                    self.complete_download(&quality).await;
                }
            }
            TimerEvent::DownloadReset => self.downloads.reset(),
            TimerEvent::DismissNotice => self.notice = None,
            TimerEvent::PersistProgress => {
                if self.is_playing {
                    self.persist_position().await;
                }
            }
        }
    }

    /// Seek to the saved position once the duration is known
    fn try_resume(&mut self) {
        if !self.tracker.has_duration() {
            return;
        }
        if let Some(position) = self.resume.resume_target(self.tracker.duration()) {
            let target = self.tracker.seek_to(position);
            self.element.set_current_time(target);
        }
    }

    // =========================================================================
    // User actions
    // =========================================================================

    /// Apply a user action
    pub async fn dispatch(&mut self, action: UserAction) {
        if self.disposed {
            debug!(?action, "Action after dispose ignored");
            return;
        }
        debug!(?action, "Dispatching action");

        match action {
            UserAction::TogglePlay => {
                if self.is_playing {
                    self.pause_playback();
                } else {
                    self.start_playback();
                }
            }
            UserAction::Seek(percent) => {
                let target = self.tracker.seek_percent(percent);
                self.element.set_current_time(target);
            }
            UserAction::SeekChapter(start_time) => {
                let target = self.tracker.seek_to(start_time);
                self.element.set_current_time(target);
                if !self.is_playing {
                    self.start_playback();
                }
            }
            UserAction::SkipForward => self.skip(self.config.skip_seconds),
            UserAction::SkipBack => self.skip(-self.config.skip_seconds),
            UserAction::SkipIntro => {
                if self.skip_intro_available() {
                    self.skip(self.config.skip_intro_seconds);
                }
            }
            UserAction::SetVolume(volume) => {
                let volume = if volume.is_finite() {
                    volume.clamp(0.0, 1.0)
                } else {
                    self.volume
                };
                self.volume = volume;
                self.element.set_volume(volume);
                if volume > 0.0 && self.is_muted {
                    self.is_muted = false;
                    self.element.set_muted(false);
                }
            }
            UserAction::ToggleMute => {
                self.is_muted = !self.is_muted;
                self.element.set_muted(self.is_muted);
            }
            UserAction::ToggleFullscreen => self.is_fullscreen = !self.is_fullscreen,
            UserAction::SetFitMode(mode) => self.fit_mode = mode,
            UserAction::CycleFitMode => self.fit_mode = self.fit_mode.next(),
            UserAction::Rotate => self.rotation = self.rotation.rotated(),
            UserAction::ToggleQualityMenu => {
                self.quality_menu_open = !self.quality_menu_open;
                self.download_menu_open = false;
            }
            UserAction::SelectQuality(label) => {
                if self.adapter.switch_level(&label, self.element.as_mut()) {
                    self.selected_quality = label;
                    self.quality_menu_open = false;
                }
            }
            UserAction::ToggleDownloadMenu => {
                if self.downloads.status() == DownloadStatus::Idle {
                    self.download_menu_open = !self.download_menu_open;
                    self.quality_menu_open = false;
                }
            }
            UserAction::StartDownload(quality) => self.start_download(&quality),
            UserAction::PointerActivity => {
                self.controls.on_activity();
                self.scheduler.after(
                    TaskName::ControlsHide,
                    self.config.controls_hide_delay(),
                    |t| TimerEvent::HideControls.fired(t),
                );
            }
            UserAction::PointerLeave => self.controls.on_pointer_leave(self.is_playing),
        }
        self.publish();
    }

    fn skip(&mut self, delta: f64) {
        self.tracker
            .on_time_update(self.element.current_time(), self.element.duration());
        let target = self.tracker.skip_by(delta);
        self.element.set_current_time(target);
    }

    fn start_playback(&mut self) {
        match self.element.play() {
            Ok(()) => self.set_playing(true),
            Err(e) => {
                warn!(error = %e, "Playback did not start");
                self.set_playing(false);
            }
        }
    }

    fn pause_playback(&mut self) {
        self.element.pause();
        self.set_playing(false);
    }

    /// The persist interval runs exactly while playing
    fn set_playing(&mut self, playing: bool) {
        let was_playing = self.is_playing;
        self.is_playing = playing;
        if playing && !was_playing {
            self.scheduler.every(
                TaskName::ProgressPersist,
                self.config.persist_interval(),
                |t| TimerEvent::PersistProgress.fired(t),
            );
        } else if !playing {
            self.scheduler.cancel(TaskName::ProgressPersist);
            self.controls.show();
        }
    }

    async fn persist_position(&mut self) {
        let Some(content_id) = self.resume.content_id().map(str::to_string) else {
            return;
        };
        let position = self.element.current_time();
        if !self.resume.should_persist(position) {
            return;
        }
        // Live and not-yet-loaded sources report NaN or infinity.
        let duration = if self.tracker.has_duration() {
            self.tracker.duration()
        } else {
            Some(self.element.duration())
                .filter(|d| d.is_finite() && *d > 0.0)
                .unwrap_or(0.0)
        };
        match self
            .store
            .update_watch_progress(&content_id, position, duration)
            .await
        {
            Ok(()) => debug!(position, "Watch progress saved"),
            Err(e) => warn!(error = %e, "Could not save watch progress"),
        }
    }

    // =========================================================================
    // Downloads
    // =========================================================================

    fn start_download(&mut self, quality: &str) {
        if !self.config.download_qualities.iter().any(|q| q == quality) {
            debug!(quality, "Quality not offered for download");
            return;
        }
        if let Err(e) = self.downloads.start(quality) {
            debug!(error = %e, "Download not started");
            return;
        }
        self.download_menu_open = false;
        self.scheduler.cancel(TaskName::DownloadReset);
        self.scheduler.every(
            TaskName::DownloadProgress,
            self.config.download_tick(),
            |t| TimerEvent::DownloadTick.fired(t),
        );
    }

    /// Success side effects: record, file save, notice, reset timer
    async fn complete_download(&mut self, quality: &str) {
        if let Some(meta) = &self.download_meta {
            let record = meta.record(quality, self.tracker.duration());
            match self.store.add_download(record).await {
                Ok(true) => info!(content_id = %meta.content_id, quality, "Download recorded"),
                Ok(false) => debug!(content_id = %meta.content_id, "Download already recorded"),
                Err(e) => warn!(error = %e, "Could not record download"),
            }
        }

        match self.save_target(quality) {
            Some(url) => {
                let saver = self.file_saver.clone();
                let filename = download_filename(&self.props.title);
                self.scheduler.spawn(TaskName::FileSave, async move {
                    let result = saver.save(&url, &filename).await.map_err(|e| e.to_string());
                    PlayerEvent::FileSaved { filename, result }
                });
            }
            None => self.show_notice(format!("Downloaded {} ({})", self.props.title, quality)),
        }

        if self.config.download_completion == DownloadCompletionPolicy::ResetAfterDelay {
            self.scheduler.after(
                TaskName::DownloadReset,
                self.config.download_reset(),
                |t| TimerEvent::DownloadReset.fired(t),
            );
        }
    }

    /// Progressive sources are saved as files; adaptive ones are not
    fn save_target(&self, quality: &str) -> Option<Url> {
        let source = self.adapter.source();
        match &source.kind {
            SourceKind::Direct(url) => Some(
                source
                    .renditions
                    .get(quality)
                    .cloned()
                    .unwrap_or_else(|| url.clone()),
            ),
            SourceKind::Adaptive(_) => None,
        }
    }

    fn show_notice(&mut self, message: String) {
        info!(message = %message, "Notice");
        self.notice = Some(Notice { message });
        self.scheduler.after(
            TaskName::NoticeDismiss,
            self.config.notice_dismiss(),
            |t| TimerEvent::DismissNotice.fired(t),
        );
    }
}
