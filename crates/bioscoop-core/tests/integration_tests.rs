//! Integration tests for BioScoop Core

use async_trait::async_trait;
use bioscoop_core::{
    adapter::ScriptedLog, resolve_playback, scheduler::TaskName, Chapter, ClientFactory,
    ContentStore, DownloadCompletionPolicy, DownloadStatus, FileSaver, FitMode, FixedRamp,
    LevelInfo, MediaElement, MediaEvent, MediaSource, MemoryStore, PlaybackPath, PlayerConfig,
    PlayerContext, PlayerController, PlayerEvent, PlayerProps, RandomRamp, Result,
    ScriptedClient, SimulatedMediaElement, StreamError, StreamErrorKind, StreamingClient,
    TimerEvent, UserAction,
};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time;
use url::Url;

const HLS_SRC: &str = "https://cdn.example.com/kalki/master.m3u8";
const MP4_SRC: &str = "https://cdn.example.com/kalki.mp4";

// =============================================================================
// Helpers
// =============================================================================

fn level(height: u32) -> LevelInfo {
    LevelInfo {
        height: Some(height),
        width: None,
        bandwidth: height as u64 * 4000,
        uri: None,
    }
}

/// File saver that records what it was asked to save
#[derive(Default, Clone)]
struct RecordingSaver {
    saved: Arc<Mutex<Vec<(Url, String)>>>,
}

#[async_trait]
impl FileSaver for RecordingSaver {
    async fn save(&self, url: &Url, filename: &str) -> Result<PathBuf> {
        self.saved
            .lock()
            .unwrap()
            .push((url.clone(), filename.to_string()));
        Ok(PathBuf::from("/downloads").join(filename))
    }
}

struct Harness {
    player: PlayerController,
    element: SimulatedMediaElement,
    store: Arc<MemoryStore>,
    log: ScriptedLog,
    saver: RecordingSaver,
}

fn harness_with(
    src: &str,
    element: SimulatedMediaElement,
    store: Arc<MemoryStore>,
    config: PlayerConfig,
) -> Harness {
    let client = ScriptedClient::new(vec![level(480), level(1080), level(720), level(1080)]);
    let log = client.log();
    let saver = RecordingSaver::default();
    let ctx = PlayerContext::new(store.clone(), Box::new(element.clone()))
        .with_client_factory(client.into_factory())
        .with_file_saver(Arc::new(saver.clone()))
        .with_ramp(Box::new(RandomRamp::seeded(42, 2.0, 8.0)));
    let props = PlayerProps::new("Kalki 2898 AD")
        .with_content_id("1")
        .with_chapters(vec![
            Chapter::new("c2", "Kasi", 600.0),
            Chapter::new("c1", "Opening", 0.0),
        ]);
    let player = PlayerController::new(config, MediaSource::parse(src).unwrap(), props, ctx).unwrap();

    Harness {
        player,
        element,
        store,
        log,
        saver,
    }
}

fn harness(src: &str) -> Harness {
    harness_with(
        src,
        SimulatedMediaElement::new(),
        Arc::new(MemoryStore::seeded()),
        PlayerConfig::default(),
    )
}

/// Metadata arrives with the given duration
async fn load_metadata(h: &mut Harness, duration: f64) {
    h.element.set_duration(duration);
    h.player.handle_event(MediaEvent::LoadedMetadata.into()).await;
}

/// Process events until one matches
async fn run_until(player: &mut PlayerController, wanted: impl Fn(&PlayerEvent) -> bool) {
    loop {
        let event = player
            .process_next()
            .await
            .expect("event channel closed");
        if wanted(&event) {
            return;
        }
    }
}

// =============================================================================
// Source Attachment and Quality Tests
// =============================================================================

#[tokio::test]
async fn test_streaming_levels_and_autoplay() {
    let mut h = harness(HLS_SRC);
    h.player.mount().await.unwrap();

    let snapshot = h.player.snapshot();
    assert_eq!(snapshot.path, Some(PlaybackPath::Streaming));
    assert_eq!(snapshot.qualities, vec!["Auto", "1080p", "720p", "480p"]);
    assert_eq!(snapshot.selected_quality, "Auto");
    assert!(snapshot.is_playing);
    assert_eq!(h.log.current_level(), -1);
}

#[tokio::test]
async fn test_unknown_quality_is_noop() {
    let mut h = harness(HLS_SRC);
    h.player.mount().await.unwrap();
    h.player.dispatch(UserAction::ToggleQualityMenu).await;

    let before = h.player.snapshot();
    h.player
        .dispatch(UserAction::SelectQuality("2160p".into()))
        .await;
    assert_eq!(h.player.snapshot(), before);
    assert_eq!(h.log.current_level(), -1);
}

#[tokio::test]
async fn test_quality_switch_and_back_to_auto() {
    let mut h = harness(HLS_SRC);
    h.player.mount().await.unwrap();

    h.player
        .dispatch(UserAction::SelectQuality("1080p".into()))
        .await;
    assert_eq!(h.player.selected_quality(), "1080p");
    // First level whose label matches
    assert_eq!(h.log.current_level(), 1);

    h.player
        .dispatch(UserAction::SelectQuality("Auto".into()))
        .await;
    assert_eq!(h.player.selected_quality(), "Auto");
    assert_eq!(h.log.current_level(), -1);
}

#[tokio::test]
async fn test_direct_source_is_not_autoplayed() {
    let mut h = harness(MP4_SRC);
    h.player.mount().await.unwrap();

    assert_eq!(h.player.path(), Some(PlaybackPath::Direct));
    assert!(!h.player.is_playing());
    assert_eq!(h.player.qualities(), vec!["Auto", "1080p", "720p", "480p"]);

    load_metadata(&mut h, 300.0).await;
    assert!(!h.player.is_playing());
    assert_eq!(h.player.snapshot().duration, 300.0);
}

#[tokio::test]
async fn test_failed_manifest_leaves_player_paused() {
    let client = ScriptedClient::new(vec![level(720)]).failing();
    let element = SimulatedMediaElement::new();
    let ctx = PlayerContext::new(Arc::new(MemoryStore::seeded()), Box::new(element))
        .with_client_factory(client.into_factory());
    let mut player = PlayerController::new(
        PlayerConfig::default(),
        MediaSource::parse(HLS_SRC).unwrap(),
        PlayerProps::new("Broken"),
        ctx,
    )
    .unwrap();

    assert!(player.mount().await.is_err());
    assert!(!player.is_playing());
    assert!(player.snapshot().error.unwrap().starts_with("Failed to fetch manifest"));
    player.dispatch(UserAction::Rotate).await;
    assert_eq!(player.snapshot().rotation, 90);
}

#[tokio::test]
async fn test_fatal_stream_errors() {
    let mut h = harness(HLS_SRC);
    h.player.mount().await.unwrap();

    let network = StreamError::fatal(StreamErrorKind::Network, "manifestLoadError");
    h.player.handle_event(network.into()).await;
    assert_eq!(h.log.reloads(), 1);
    assert!(h.player.is_playing());

    let other = StreamError::fatal(StreamErrorKind::Other, "internalException");
    h.player.handle_event(other.into()).await;
    assert!(h.log.destroyed());
    assert!(!h.player.is_playing());
    assert!(h.element.is_paused());
}

#[tokio::test]
async fn test_fatal_stream_error_reported_in_snapshot() {
    let mut h = harness(HLS_SRC);
    h.player.mount().await.unwrap();
    assert_eq!(h.player.snapshot().error, None);

    let other = StreamError::fatal(StreamErrorKind::Other, "internalException");
    h.player.handle_event(other.into()).await;
    assert_eq!(
        h.player.snapshot().error.as_deref(),
        Some("Fatal stream error (other): internalException")
    );

    // A fresh source clears it
    h.player
        .change_source(MediaSource::parse(MP4_SRC).unwrap())
        .await
        .unwrap();
    assert_eq!(h.player.error(), None);
}

#[tokio::test]
async fn test_change_source_destroys_previous_client() {
    let first = ScriptedClient::new(vec![level(720)]);
    let first_log = first.log();
    let second = ScriptedClient::new(vec![level(1080), level(480)]);
    let second_log = second.log();
    let clients = Mutex::new(vec![second, first]);
    let factory: ClientFactory = Arc::new(move || {
        let client = clients.lock().unwrap().pop().unwrap();
        Box::new(client) as Box<dyn StreamingClient>
    });

    let ctx = PlayerContext::new(
        Arc::new(MemoryStore::seeded()),
        Box::new(SimulatedMediaElement::new()),
    )
    .with_client_factory(factory);
    let mut player = PlayerController::new(
        PlayerConfig::default(),
        MediaSource::parse(HLS_SRC).unwrap(),
        PlayerProps::new("Kalki 2898 AD").with_content_id("1"),
        ctx,
    )
    .unwrap();
    player.mount().await.unwrap();
    player.dispatch(UserAction::SkipForward).await;
    assert_eq!(player.tracker().current_time(), 10.0);

    player
        .change_source(MediaSource::parse("https://cdn.example.com/salaar/master.m3u8").unwrap())
        .await
        .unwrap();

    assert!(first_log.destroyed());
    assert!(!second_log.destroyed());
    assert_eq!(second_log.loads(), 1);
    assert_eq!(player.qualities(), vec!["Auto", "1080p", "480p"]);
    assert_eq!(player.tracker().current_time(), 0.0);
    assert_eq!(player.selected_quality(), "Auto");
    assert!(player.is_playing());
}

// =============================================================================
// Seeking Tests
// =============================================================================

#[tokio::test]
async fn test_seek_percent_is_clamped() {
    let mut h = harness(MP4_SRC);
    h.player.mount().await.unwrap();
    load_metadata(&mut h, 200.0).await;

    h.player.dispatch(UserAction::Seek(50.0)).await;
    assert_eq!(h.element.current_time(), 100.0);
    assert_eq!(h.player.snapshot().progress, 50.0);

    h.player.dispatch(UserAction::Seek(150.0)).await;
    assert_eq!(h.element.current_time(), 200.0);
    assert_eq!(h.player.snapshot().progress, 100.0);

    h.player.dispatch(UserAction::Seek(-5.0)).await;
    assert_eq!(h.element.current_time(), 0.0);
}

#[tokio::test]
async fn test_skips_are_clamped() {
    let mut h = harness(MP4_SRC);
    h.player.mount().await.unwrap();
    load_metadata(&mut h, 15.0).await;

    h.player.dispatch(UserAction::SkipBack).await;
    assert_eq!(h.element.current_time(), 0.0);

    h.player.dispatch(UserAction::SkipForward).await;
    assert_eq!(h.element.current_time(), 10.0);

    h.player.dispatch(UserAction::SkipForward).await;
    assert_eq!(h.element.current_time(), 15.0);
}

#[tokio::test]
async fn test_skip_intro_window() {
    let mut h = harness(MP4_SRC);
    h.player.mount().await.unwrap();
    load_metadata(&mut h, 3600.0).await;

    assert!(h.player.skip_intro_available());
    h.player.dispatch(UserAction::SkipIntro).await;
    assert_eq!(h.element.current_time(), 85.0);
    assert!(!h.player.skip_intro_available());

    h.player.dispatch(UserAction::SkipIntro).await;
    assert_eq!(h.element.current_time(), 85.0);
}

#[tokio::test]
async fn test_chapter_seek_resumes_playback() {
    let mut h = harness(MP4_SRC);
    h.player.mount().await.unwrap();
    load_metadata(&mut h, 3600.0).await;
    assert!(!h.player.is_playing());

    let chapters: Vec<&str> = h.player.chapters().iter().map(|c| c.id.as_str()).collect();
    assert_eq!(chapters, vec!["c1", "c2"]);

    let start = h.player.chapters()[1].start_time;
    h.player.dispatch(UserAction::SeekChapter(start)).await;
    assert_eq!(h.element.current_time(), 600.0);
    assert!(h.player.is_playing());
    assert!(!h.element.is_paused());
}

#[tokio::test]
async fn test_chapter_markers_follow_duration() {
    let mut h = harness(MP4_SRC);
    h.player.mount().await.unwrap();
    assert!(h.player.snapshot().chapter_markers.is_empty());

    load_metadata(&mut h, 3600.0).await;
    let markers = h.player.snapshot().chapter_markers;
    assert_eq!(markers.len(), 2);
    assert_eq!(markers[0].id, "c1");
    assert_eq!(markers[0].position, 0.0);
    assert_eq!(markers[1].title, "Kasi");
    assert!((markers[1].position - 16.666).abs() < 0.01);

    // Chapters past the end get no marker
    h.player
        .change_source(MediaSource::parse("https://cdn.example.com/trailer.mp4").unwrap())
        .await
        .unwrap();
    load_metadata(&mut h, 300.0).await;
    let ids: Vec<String> = h.player.chapter_markers().into_iter().map(|m| m.id).collect();
    assert_eq!(ids, vec!["c1"]);
}

// =============================================================================
// Resume Tests
// =============================================================================

#[tokio::test]
async fn test_resume_inside_window() {
    let store = Arc::new(MemoryStore::seeded());
    store.update_watch_progress("1", 50.0, 120.0).await.unwrap();
    let mut h = harness_with(MP4_SRC, SimulatedMediaElement::new(), store, PlayerConfig::default());
    h.player.mount().await.unwrap();

    load_metadata(&mut h, 120.0).await;
    assert_eq!(h.element.current_time(), 50.0);

    // Decided once: a later seek is not undone by another metadata event
    h.player.dispatch(UserAction::Seek(0.0)).await;
    h.player.handle_event(MediaEvent::LoadedMetadata.into()).await;
    assert_eq!(h.element.current_time(), 0.0);
}

#[tokio::test]
async fn test_no_resume_near_end() {
    let store = Arc::new(MemoryStore::seeded());
    store.update_watch_progress("1", 65.0, 120.0).await.unwrap();
    let mut h = harness_with(MP4_SRC, SimulatedMediaElement::new(), store, PlayerConfig::default());
    h.player.mount().await.unwrap();

    load_metadata(&mut h, 120.0).await;
    assert_eq!(h.element.current_time(), 0.0);
}

#[tokio::test]
async fn test_resume_on_time_update_when_metadata_missed() {
    let store = Arc::new(MemoryStore::seeded());
    store.update_watch_progress("1", 300.0, 3600.0).await.unwrap();
    let mut h = harness_with(HLS_SRC, SimulatedMediaElement::new(), store, PlayerConfig::default());
    h.player.mount().await.unwrap();

    h.element.set_duration(3600.0);
    h.player.handle_event(MediaEvent::TimeUpdate.into()).await;
    assert_eq!(h.element.current_time(), 300.0);
}

#[tokio::test(start_paused = true)]
async fn test_progress_persisted_while_playing() {
    let mut h = harness(HLS_SRC);
    h.player.mount().await.unwrap();
    h.element.set_duration(600.0);
    h.element.advance(42.0);

    run_until(&mut h.player, |e| e.is_timer(TimerEvent::PersistProgress)).await;
    assert_eq!(h.store.get_watch_position("1").await.unwrap(), Some(42.0));

    // Pausing stops the interval
    h.player.dispatch(UserAction::TogglePlay).await;
    assert!(!h.player.is_timer_pending(TaskName::ProgressPersist));
}

#[tokio::test]
async fn test_short_watch_not_persisted() {
    let mut h = harness(HLS_SRC);
    h.player.mount().await.unwrap();
    h.element.set_duration(600.0);
    h.element.advance(4.0);

    h.player.dispose().await;
    assert_eq!(h.store.get_watch_position("1").await.unwrap(), None);
}

#[tokio::test]
async fn test_live_duration_persisted_as_unknown() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.json");
    let store = Arc::new(MemoryStore::open(&path).await.unwrap());
    let mut h = harness_with(HLS_SRC, SimulatedMediaElement::new(), store, PlayerConfig::default());
    h.player.mount().await.unwrap();
    h.element.set_duration(f64::INFINITY);
    h.element.advance(30.0);

    h.player.dispose().await;

    let reopened = MemoryStore::open(&path).await.unwrap();
    let list = reopened.continue_watching().await.unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].timestamp, 30.0);
    assert_eq!(list[0].duration, 0.0);
}

// =============================================================================
// Controls Tests
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_hide_timer_blocked_while_menu_open() {
    let mut h = harness(HLS_SRC);
    h.player.mount().await.unwrap();

    h.player.dispatch(UserAction::PointerActivity).await;
    h.player.dispatch(UserAction::ToggleQualityMenu).await;
    run_until(&mut h.player, |e| e.is_timer(TimerEvent::HideControls)).await;
    assert!(h.player.controls_visible());

    h.player.dispatch(UserAction::ToggleQualityMenu).await;
    h.player.dispatch(UserAction::PointerActivity).await;
    run_until(&mut h.player, |e| e.is_timer(TimerEvent::HideControls)).await;
    assert!(!h.player.controls_visible());

    h.player.dispatch(UserAction::PointerActivity).await;
    assert!(h.player.controls_visible());
}

#[tokio::test(start_paused = true)]
async fn test_activity_rearms_hide_timer() {
    let mut h = harness(HLS_SRC);
    h.player.mount().await.unwrap();
    let start = time::Instant::now();

    h.player.dispatch(UserAction::PointerActivity).await;
    time::advance(Duration::from_secs(2)).await;
    h.player.dispatch(UserAction::PointerActivity).await;

    run_until(&mut h.player, |e| e.is_timer(TimerEvent::HideControls)).await;
    assert!(start.elapsed() >= Duration::from_secs(5));
    assert!(!h.player.controls_visible());
}

#[tokio::test(start_paused = true)]
async fn test_hide_event_queued_before_rearm_is_dropped() {
    let mut h = harness(HLS_SRC);
    h.player.mount().await.unwrap();

    h.player.dispatch(UserAction::PointerActivity).await;
    let queued = h.player.next_event().await.unwrap();
    assert!(queued.is_timer(TimerEvent::HideControls));

    // Activity between delivery and handling re-arms the timer
    h.player.dispatch(UserAction::PointerActivity).await;
    h.player.handle_event(queued).await;
    assert!(h.player.controls_visible());
    assert!(h.player.is_timer_pending(TaskName::ControlsHide));

    run_until(&mut h.player, |e| e.is_timer(TimerEvent::HideControls)).await;
    assert!(!h.player.controls_visible());
}

#[tokio::test]
async fn test_pointer_leave_hides_only_while_playing() {
    let mut h = harness(MP4_SRC);
    h.player.mount().await.unwrap();

    h.player.dispatch(UserAction::PointerLeave).await;
    assert!(h.player.controls_visible());

    h.player.dispatch(UserAction::TogglePlay).await;
    h.player.dispatch(UserAction::PointerLeave).await;
    assert!(!h.player.controls_visible());
}

#[tokio::test]
async fn test_menus_are_exclusive() {
    let mut h = harness(HLS_SRC);
    h.player.mount().await.unwrap();

    h.player.dispatch(UserAction::ToggleQualityMenu).await;
    h.player.dispatch(UserAction::ToggleDownloadMenu).await;
    let snapshot = h.player.snapshot();
    assert!(snapshot.download_menu_open);
    assert!(!snapshot.quality_menu_open);

    h.player.dispatch(UserAction::ToggleQualityMenu).await;
    let snapshot = h.player.snapshot();
    assert!(!snapshot.download_menu_open);
    assert!(snapshot.quality_menu_open);
}

#[tokio::test]
async fn test_volume_mute_fit_rotation() {
    let mut h = harness(MP4_SRC);
    h.player.mount().await.unwrap();

    h.player.dispatch(UserAction::ToggleMute).await;
    assert!(h.element.is_muted());
    h.player.dispatch(UserAction::SetVolume(1.7)).await;
    assert_eq!(h.element.volume(), 1.0);
    assert!(!h.element.is_muted());

    h.player.dispatch(UserAction::CycleFitMode).await;
    h.player.dispatch(UserAction::CycleFitMode).await;
    for _ in 0..5 {
        h.player.dispatch(UserAction::Rotate).await;
    }
    h.player.dispatch(UserAction::ToggleFullscreen).await;

    let snapshot = h.player.snapshot();
    assert_eq!(snapshot.fit_mode, FitMode::Fill);
    assert_eq!(snapshot.rotation, 90);
    assert!(snapshot.is_fullscreen);
}

// =============================================================================
// Download Tests
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_download_ramp_records_once_and_saves_file() {
    let mut h = harness(MP4_SRC);
    h.player.mount().await.unwrap();
    load_metadata(&mut h, 3600.0).await;

    let options = h.player.download_options();
    assert_eq!(options[1].quality, "720p");
    assert_eq!(options[1].estimated_size, "990 MB");

    h.player.dispatch(UserAction::ToggleDownloadMenu).await;
    h.player
        .dispatch(UserAction::StartDownload("720p".into()))
        .await;
    assert_eq!(h.player.download_status(), DownloadStatus::Downloading);
    assert!(!h.player.snapshot().download_menu_open);

    // A second request while downloading is ignored
    h.player
        .dispatch(UserAction::StartDownload("1080p".into()))
        .await;

    let mut last = 0.0;
    while h.player.download_status() == DownloadStatus::Downloading {
        h.player.process_next().await.unwrap();
        let progress = h.player.download_progress();
        assert!(progress >= last && progress <= 100.0);
        last = progress;
    }
    assert_eq!(h.player.download_status(), DownloadStatus::Success);
    assert_eq!(h.player.download_progress(), 100.0);

    let downloads = h.store.downloads().await.unwrap();
    assert_eq!(downloads.len(), 1);
    assert_eq!(downloads[0].content_id, "1");
    assert_eq!(downloads[0].quality, "720p");
    assert_eq!(downloads[0].size, "990 MB");

    run_until(&mut h.player, |e| matches!(e, PlayerEvent::FileSaved { .. })).await;
    assert_eq!(
        h.player.notice().map(|n| n.message.as_str()),
        Some("Saved kalki2898ad.mp4")
    );
    let saved = h.saver.saved.lock().unwrap().clone();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].0.as_str(), MP4_SRC);

    run_until(&mut h.player, |e| e.is_timer(TimerEvent::DownloadReset)).await;
    assert_eq!(h.player.download_status(), DownloadStatus::Idle);
    assert_eq!(h.player.download_progress(), 0.0);
}

#[tokio::test(start_paused = true)]
async fn test_tick_from_finished_download_is_dropped() {
    let mut h = harness(MP4_SRC);
    h.player.mount().await.unwrap();
    load_metadata(&mut h, 3600.0).await;

    h.player
        .dispatch(UserAction::StartDownload("720p".into()))
        .await;
    let first_tick = loop {
        let event = h.player.next_event().await.unwrap();
        let tick = event.is_timer(TimerEvent::DownloadTick);
        h.player.handle_event(event.clone()).await;
        if tick {
            break event;
        }
    };
    assert!(h.player.download_progress() > 0.0);

    while h.player.download_status() == DownloadStatus::Downloading {
        h.player.process_next().await.unwrap();
    }
    run_until(&mut h.player, |e| e.is_timer(TimerEvent::DownloadReset)).await;
    assert_eq!(h.player.download_status(), DownloadStatus::Idle);

    h.player
        .dispatch(UserAction::StartDownload("480p".into()))
        .await;
    h.player.handle_event(first_tick).await;
    assert_eq!(h.player.download_status(), DownloadStatus::Downloading);
    assert_eq!(h.player.download_progress(), 0.0);
}

#[tokio::test(start_paused = true)]
async fn test_adaptive_download_shows_notice_without_file() {
    let mut h = harness(HLS_SRC);
    h.player.mount().await.unwrap();

    h.player
        .dispatch(UserAction::StartDownload("1080p".into()))
        .await;
    while h.player.download_status() == DownloadStatus::Downloading {
        h.player.process_next().await.unwrap();
    }

    assert_eq!(
        h.player.notice().map(|n| n.message.as_str()),
        Some("Downloaded Kalki 2898 AD (1080p)")
    );
    assert!(h.saver.saved.lock().unwrap().is_empty());

    run_until(&mut h.player, |e| e.is_timer(TimerEvent::DismissNotice)).await;
    assert!(h.player.notice().is_none());
}

#[tokio::test]
async fn test_download_menu_locked_outside_idle() {
    let mut h = harness(MP4_SRC);
    h.player.mount().await.unwrap();
    h.player
        .dispatch(UserAction::StartDownload("480p".into()))
        .await;

    h.player.dispatch(UserAction::ToggleDownloadMenu).await;
    assert!(!h.player.snapshot().download_menu_open);
}

#[tokio::test]
async fn test_unoffered_download_quality_ignored() {
    let mut h = harness(MP4_SRC);
    h.player.mount().await.unwrap();
    h.player
        .dispatch(UserAction::StartDownload("4K".into()))
        .await;
    assert_eq!(h.player.download_status(), DownloadStatus::Idle);
}

#[tokio::test]
async fn test_keep_for_session_policy_restores_success() {
    let store = Arc::new(MemoryStore::seeded());
    let target = resolve_playback(
        &store.get_content_by_id("1").await.unwrap().unwrap(),
        None,
        None,
    )
    .unwrap();
    store
        .add_download(target.download_meta().record("720p", 3600.0))
        .await
        .unwrap();

    let config = PlayerConfig {
        download_completion: DownloadCompletionPolicy::KeepForSession,
        ..Default::default()
    };
    let mut h = harness_with(MP4_SRC, SimulatedMediaElement::new(), store, config);
    h.player.mount().await.unwrap();

    assert_eq!(h.player.download_status(), DownloadStatus::Success);
    h.player.dispatch(UserAction::ToggleDownloadMenu).await;
    assert!(!h.player.snapshot().download_menu_open);
}

#[tokio::test(start_paused = true)]
async fn test_keep_for_session_never_resets() {
    let config = PlayerConfig {
        download_completion: DownloadCompletionPolicy::KeepForSession,
        ..Default::default()
    };
    let client = ScriptedClient::new(vec![level(720)]);
    let ctx = PlayerContext::new(
        Arc::new(MemoryStore::seeded()),
        Box::new(SimulatedMediaElement::new()),
    )
    .with_client_factory(client.into_factory())
    .with_ramp(Box::new(FixedRamp(50.0)));
    let mut player = PlayerController::new(
        config,
        MediaSource::parse(HLS_SRC).unwrap(),
        PlayerProps::new("Vikram").with_content_id("6"),
        ctx,
    )
    .unwrap();
    player.mount().await.unwrap();

    player
        .dispatch(UserAction::StartDownload("480p".into()))
        .await;
    while player.download_status() != DownloadStatus::Success {
        player.process_next().await.unwrap();
    }
    assert!(!player.is_timer_pending(TaskName::DownloadReset));

    time::advance(Duration::from_secs(30)).await;
    player.drain_pending().await;
    assert_eq!(player.download_status(), DownloadStatus::Success);
}

// =============================================================================
// Dispose Tests
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_no_callbacks_after_dispose() {
    let mut h = harness(HLS_SRC);
    h.player.mount().await.unwrap();
    h.element.set_duration(600.0);
    h.element.advance(120.0);

    h.player.dispatch(UserAction::PointerActivity).await;
    h.player
        .dispatch(UserAction::StartDownload("720p".into()))
        .await;
    assert!(h.player.pending_timers() >= 3);

    h.player.dispose().await;
    assert_eq!(h.player.pending_timers(), 0);
    assert!(h.log.destroyed());
    assert!(h.player.event_sender().is_none());
    // Final persist
    assert_eq!(h.store.get_watch_position("1").await.unwrap(), Some(120.0));

    time::advance(Duration::from_secs(60)).await;
    tokio::task::yield_now().await;
    assert!(h.player.next_event().await.is_none());
    assert_eq!(h.player.drain_pending().await, 0);
    assert_eq!(h.player.download_status(), DownloadStatus::Downloading);
    assert!(h.store.downloads().await.unwrap().is_empty());

    let before = h.player.snapshot();
    h.player.dispatch(UserAction::Rotate).await;
    h.player.handle_event(MediaEvent::Ended.into()).await;
    assert_eq!(h.player.snapshot(), before);
    assert!(before.disposed);

    // Idempotent
    h.player.dispose().await;
}
