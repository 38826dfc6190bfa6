//! CLI command implementations

use crate::output::{is_interactive, print_rows, print_value};
use bioscoop_core::MediaElement;
use anyhow::{anyhow, bail};
use bioscoop_core::{
    adapter::{hls_client_factory, MediaSourceAdapter, PlaybackPath},
    download::{bitrate_mbps, estimate_size},
    playback::format_time,
    resolve_playback, Chapter, ChapterMarker, ContentStore, DisabledSaver, DownloadStatus, Error,
    FileSaver,
    HttpFileSaver, Language, MediaEvent, MediaSource, MemoryStore, PlaybackTarget, PlayerConfig,
    PlayerContext, PlayerController, PlayerEvent, PlayerProps, SimulatedMediaElement, UserAction,
};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tabled::Tabled;
use tracing::{debug, warn};

/// Player configuration from `--config`, or defaults
pub fn load_config(path: Option<&Path>) -> anyhow::Result<PlayerConfig> {
    match path {
        Some(path) => Ok(PlayerConfig::from_json_file(path)?),
        None => Ok(PlayerConfig::default()),
    }
}

/// Catalog item plus optional episode
pub struct ItemRef {
    pub content_id: String,
    pub season: Option<u32>,
    pub episode: Option<u32>,
}

pub struct CatalogFilter {
    pub search: Option<String>,
    pub language: Option<String>,
    pub trending: bool,
}

async fn resolve(store: &MemoryStore, item: &ItemRef) -> anyhow::Result<PlaybackTarget> {
    let content = store
        .get_content_by_id(&item.content_id)
        .await?
        .ok_or_else(|| Error::ContentNotFound(item.content_id.clone()))?;
    resolve_playback(&content, item.season, item.episode).ok_or_else(|| {
        anyhow!(
            "No playable source for '{}' (series need --season and --episode)",
            content.title
        )
    })
}

// =============================================================================
// Levels / Estimate
// =============================================================================

#[derive(Tabled, Serialize)]
struct LevelRow {
    quality: String,
    height: String,
}

/// Show the quality list a player would offer for a source
pub async fn levels(source: &str, format: &str) -> anyhow::Result<()> {
    let source = MediaSource::parse(source)?;
    let mut element = SimulatedMediaElement::new();
    let mut adapter = MediaSourceAdapter::new(source, hls_client_factory());
    let path = adapter.attach(&mut element).await?;

    if is_interactive(format) {
        let path = match path {
            PlaybackPath::Streaming => "adaptive stream",
            PlaybackPath::NativeAdaptive => "native adaptive",
            PlaybackPath::Direct => "progressive file",
        };
        println!("{} {}", style("Playback:").bold(), path);
    }

    let rows: Vec<LevelRow> = adapter
        .levels()
        .iter()
        .map(|level| LevelRow {
            quality: level.label.clone(),
            height: level
                .height
                .map(|h| h.to_string())
                .unwrap_or_else(|| "-".to_string()),
        })
        .collect();
    print_rows(rows, format, |row| format!("  {}", row.quality))
}

#[derive(Tabled, Serialize)]
struct EstimateRow {
    quality: String,
    bitrate_mbps: f64,
    size: String,
}

/// Size estimates for the configured download qualities
pub fn estimate(
    config: &PlayerConfig,
    duration: f64,
    quality: Option<&str>,
    format: &str,
) -> anyhow::Result<()> {
    let qualities: Vec<String> = match quality {
        Some(q) => vec![q.to_string()],
        None => config.download_qualities.clone(),
    };
    let rows: Vec<EstimateRow> = qualities
        .into_iter()
        .map(|quality| EstimateRow {
            bitrate_mbps: bitrate_mbps(&quality),
            size: estimate_size(&quality, duration),
            quality,
        })
        .collect();
    print_rows(rows, format, |row| format!("{:<6} {}", row.quality, row.size))
}

// =============================================================================
// Catalog / Downloads / Continue Watching
// =============================================================================

#[derive(Tabled, Serialize)]
struct CatalogRow {
    id: String,
    title: String,
    #[tabled(rename = "type")]
    #[serde(rename = "type")]
    content_type: String,
    year: u16,
    rating: f32,
    languages: String,
    trending: bool,
}

pub async fn catalog(store_path: &Path, filter: CatalogFilter, format: &str) -> anyhow::Result<()> {
    let store = MemoryStore::open(store_path).await?;
    let language = filter
        .language
        .as_deref()
        .map(str::parse::<Language>)
        .transpose()?;

    let mut items = match (&filter.search, language) {
        (Some(query), _) => store.search_content(query).await?,
        (None, Some(language)) => store.get_by_language(language).await?,
        (None, None) if filter.trending => store.get_trending().await?,
        (None, None) => store.get_all_content().await?,
    };
    if let Some(language) = language {
        items.retain(|c| c.languages.contains(&language));
    }
    if filter.trending {
        items.retain(|c| c.trending);
    }

    let rows: Vec<CatalogRow> = items
        .into_iter()
        .map(|c| CatalogRow {
            languages: c
                .languages
                .iter()
                .map(|l| format!("{:?}", l))
                .collect::<Vec<_>>()
                .join(", "),
            id: c.id,
            title: c.title,
            content_type: c.content_type.to_string(),
            year: c.release_year,
            rating: c.rating,
            trending: c.trending,
        })
        .collect();
    print_rows(rows, format, |row| {
        format!(
            "{:>3}  {:<28} {:<7} {}  {:.1}{}",
            row.id,
            style(&row.title).bold(),
            row.content_type,
            row.year,
            row.rating,
            if row.trending { "  trending" } else { "" }
        )
    })
}

#[derive(Tabled, Serialize)]
struct DownloadRow {
    content_id: String,
    title: String,
    quality: String,
    size: String,
    #[tabled(rename = "type")]
    #[serde(rename = "type")]
    content_type: String,
    downloaded_at: String,
}

pub async fn downloads(store_path: &Path, remove: Option<&str>, format: &str) -> anyhow::Result<()> {
    let store = MemoryStore::open(store_path).await?;
    if let Some(content_id) = remove {
        store.remove_download(content_id).await?;
        if is_interactive(format) {
            println!("{} {}", style("Removed downloads of").yellow(), content_id);
        }
    }

    let rows: Vec<DownloadRow> = store
        .downloads()
        .await?
        .into_iter()
        .map(|d| DownloadRow {
            content_id: d.content_id,
            title: d.title,
            quality: d.quality,
            size: d.size,
            content_type: d.content_type.to_string(),
            downloaded_at: d.downloaded_at.format("%Y-%m-%d %H:%M").to_string(),
        })
        .collect();
    print_rows(rows, format, |row| {
        format!("{:<28} {:<6} {:>8}  {}", row.title, row.quality, row.size, row.downloaded_at)
    })
}

#[derive(Tabled, Serialize)]
struct ContinueRow {
    content_id: String,
    title: String,
    position: String,
    progress: String,
}

pub async fn continue_watching(store_path: &Path, format: &str) -> anyhow::Result<()> {
    let store = MemoryStore::open(store_path).await?;
    let mut rows = Vec::new();
    for entry in store.continue_watching().await? {
        let title = store
            .get_content_by_id(&entry.content_id)
            .await?
            .map(|c| c.title)
            .unwrap_or_else(|| entry.content_id.clone());
        rows.push(ContinueRow {
            position: format!("{} / {}", format_time(entry.timestamp), format_time(entry.duration)),
            progress: format!("{:.0}%", entry.progress_percent()),
            content_id: entry.content_id,
            title,
        });
    }
    print_rows(rows, format, |row| {
        format!("{:<28} {:>15}  {}", row.title, row.position, row.progress)
    })
}

// =============================================================================
// Headless Sessions
// =============================================================================

#[derive(Serialize)]
struct PlaySummary {
    content_id: String,
    title: String,
    subtitle: Option<String>,
    path: Option<PlaybackPath>,
    qualities: Vec<String>,
    resumed_from: f64,
    position: f64,
    duration: f64,
    chapter_markers: Vec<ChapterMarker>,
    error: Option<String>,
}

/// Knobs of a headless `play` session
pub struct PlayOptions {
    pub seconds: u32,
    pub duration: f64,
    pub chapters: Option<PathBuf>,
    pub seek_chapter: Option<String>,
}

/// Chapter list from a JSON file
fn load_chapters(path: &Path) -> anyhow::Result<Vec<Chapter>> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("cannot read chapters from {}: {}", path.display(), e))?;
    Ok(serde_json::from_str(&raw)?)
}

/// Simulate `seconds` of playback; the position is persisted on exit
pub async fn play(
    store_path: &Path,
    config: PlayerConfig,
    item: ItemRef,
    options: PlayOptions,
    format: &str,
) -> anyhow::Result<()> {
    let store = Arc::new(MemoryStore::open(store_path).await?);
    let target = resolve(&store, &item).await?;
    let chapters = match &options.chapters {
        Some(path) => load_chapters(path)?,
        None => Vec::new(),
    };
    let element = SimulatedMediaElement::new();
    let ctx = PlayerContext::new(store.clone(), Box::new(element.clone()));
    let mut player = PlayerController::new(
        config,
        target.media_source()?,
        PlayerProps::from_target(&target).with_chapters(chapters),
        ctx,
    )?;

    if let Err(e) = player.mount().await {
        warn!(error = %e, "Source did not attach, continuing with the simulated element");
    }
    element.set_duration(options.duration);
    player.handle_event(MediaEvent::LoadedMetadata.into()).await;
    let resumed_from = element.current_time();
    if let Some(id) = &options.seek_chapter {
        let start = player
            .chapters()
            .iter()
            .find(|c| &c.id == id)
            .map(|c| c.start_time)
            .ok_or_else(|| anyhow!("no chapter with id '{}'", id))?;
        player.dispatch(UserAction::SeekChapter(start)).await;
    }
    if !player.is_playing() {
        player.dispatch(UserAction::TogglePlay).await;
    }

    for _ in 0..options.seconds {
        element.advance(1.0);
        player.handle_event(MediaEvent::TimeUpdate.into()).await;
        player.drain_pending().await;
        if element.is_ended() {
            player.handle_event(MediaEvent::Ended.into()).await;
            break;
        }
    }

    let snapshot = player.snapshot();
    player.dispose().await;

    let summary = PlaySummary {
        content_id: target.content_id.clone(),
        title: snapshot.title,
        subtitle: snapshot.subtitle,
        path: snapshot.path,
        qualities: snapshot.qualities,
        resumed_from,
        position: snapshot.current_time,
        duration: snapshot.duration,
        chapter_markers: snapshot.chapter_markers,
        error: snapshot.error,
    };
    print_value(&summary, format, || {
        let mut text = format!("{} {}", style("Played").green().bold(), summary.title);
        if let Some(subtitle) = &summary.subtitle {
            text.push_str(&format!(" ({})", subtitle));
        }
        if summary.resumed_from > 0.0 {
            text.push_str(&format!("\n  Resumed from {}", format_time(summary.resumed_from)));
        }
        text.push_str(&format!(
            "\n  Position {} / {}\n  Qualities {}",
            format_time(summary.position),
            format_time(summary.duration),
            summary.qualities.join(", ")
        ));
        for marker in &summary.chapter_markers {
            text.push_str(&format!(
                "\n  {} {} {}",
                style("|").dim(),
                format_time(marker.start_time),
                marker.title
            ));
        }
        if let Some(error) = &summary.error {
            text.push_str(&format!("\n  {}", style(error).red()));
        }
        text
    })
}

#[derive(Serialize)]
struct DownloadSummary {
    content_id: String,
    title: String,
    quality: String,
    size: Option<String>,
    saved_to: Option<PathBuf>,
    notice: Option<String>,
}

/// Run the download ramp to completion; progressive sources are saved
/// into `out` when given
pub async fn download(
    store_path: &Path,
    config: PlayerConfig,
    item: ItemRef,
    quality: &str,
    out: Option<PathBuf>,
    duration: f64,
    format: &str,
) -> anyhow::Result<()> {
    let store = Arc::new(MemoryStore::open(store_path).await?);
    let target = resolve(&store, &item).await?;
    let source = target.media_source()?;
    let saves_file = !source.kind.is_adaptive();

    let saver: Arc<dyn FileSaver> = match out {
        Some(dir) => Arc::new(HttpFileSaver::new(dir)),
        None => Arc::new(DisabledSaver),
    };
    let element = SimulatedMediaElement::new();
    let ctx = PlayerContext::new(store.clone(), Box::new(element.clone())).with_file_saver(saver);
    let mut player =
        PlayerController::new(config, source, PlayerProps::from_target(&target), ctx)?;

    if let Err(e) = player.mount().await {
        warn!(error = %e, "Source did not attach, downloading anyway");
    }
    if player.is_playing() {
        player.dispatch(UserAction::TogglePlay).await;
    }
    element.set_duration(duration);
    player.handle_event(MediaEvent::LoadedMetadata.into()).await;

    match player.download_status() {
        DownloadStatus::Idle => {}
        status => bail!("Download not available (status: {})", status),
    }
    player
        .dispatch(UserAction::StartDownload(quality.to_string()))
        .await;
    if player.download_status() != DownloadStatus::Downloading {
        bail!(
            "Quality '{}' is not offered (choose from {})",
            quality,
            player.config().download_qualities.join(", ")
        );
    }

    let bar = if is_interactive(format) {
        let bar = ProgressBar::new(100);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.green} [{bar:40.cyan/blue}] {pos:>3}% {msg}")?
                .progress_chars("=>-"),
        );
        bar.set_message(format!("{} ({})", target.title, quality));
        Some(bar)
    } else {
        None
    };

    while player.download_status() == DownloadStatus::Downloading {
        let Some(event) = player.process_next().await else {
            break;
        };
        debug!(?event, "Event");
        if let Some(bar) = &bar {
            bar.set_position(player.download_progress() as u64);
        }
    }
    if let Some(bar) = &bar {
        bar.finish_with_message("done");
    }

    let mut saved_to = None;
    if saves_file {
        while let Some(event) = player.process_next().await {
            if let PlayerEvent::FileSaved { result, .. } = event {
                match result {
                    Ok(path) => saved_to = Some(path),
                    Err(reason) => {
                        if is_interactive(format) {
                            eprintln!("{} {}", style("File not saved:").yellow(), reason);
                        }
                    }
                }
                break;
            }
        }
    }

    let notice = player.notice().map(|n| n.message.clone());
    player.dispose().await;

    let size = store
        .downloads()
        .await?
        .into_iter()
        .find(|d| d.content_id == target.content_id && d.quality == quality)
        .map(|d| d.size);
    let summary = DownloadSummary {
        content_id: target.content_id.clone(),
        title: target.title.clone(),
        quality: quality.to_string(),
        size,
        saved_to,
        notice,
    };
    print_value(&summary, format, || {
        let mut text = format!(
            "{} {} ({}, {})",
            style("Downloaded").green().bold(),
            summary.title,
            summary.quality,
            summary.size.as_deref().unwrap_or("unknown size")
        );
        if let Some(path) = &summary.saved_to {
            text.push_str(&format!("\n  Saved to {}", path.display()));
        }
        text
    })
}
