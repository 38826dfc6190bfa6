//! Resolving what to play for a catalog item

use crate::{
    download::DownloadMeta,
    types::{Content, ContentType, MediaSource, SourceKind},
    Error, Result,
};
use serde::Serialize;
use tracing::warn;
use url::Url;

/// Source and labels for one playback of a catalog item
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaybackTarget {
    pub content_id: String,
    pub src: String,
    pub title: String,
    /// "Series - S1 E2" for episodes
    pub subtitle: Option<String>,
    pub poster_url: String,
    #[serde(skip)]
    quality_urls: Vec<(String, String)>,
}

impl PlaybackTarget {
    /// Episodes are recorded as series downloads
    pub fn content_type(&self) -> ContentType {
        if self.subtitle.is_some() {
            ContentType::Series
        } else {
            ContentType::Movie
        }
    }

    /// Classify the source and attach per-quality progressive files
    pub fn media_source(&self) -> Result<MediaSource> {
        let url = Url::parse(&self.src)
            .map_err(|e| Error::InvalidSource(format!("'{}': {}", self.src, e)))?;
        let mut source = MediaSource::new(SourceKind::detect(url));
        if !source.kind.is_adaptive() {
            for (label, raw) in &self.quality_urls {
                match Url::parse(raw) {
                    Ok(url) => source = source.with_rendition(label.clone(), url),
                    Err(e) => warn!(label = %label, error = %e, "Skipping invalid quality URL"),
                }
            }
        }
        Ok(source)
    }

    pub fn download_meta(&self) -> DownloadMeta {
        DownloadMeta {
            content_id: self.content_id.clone(),
            title: self.title.clone(),
            poster_url: self.poster_url.clone(),
            content_type: self.content_type(),
        }
    }
}

/// Pick the playable source of a content item.
///
/// Movies play their main file. Series play the requested episode; when the
/// episode cannot be found the series' own file (if any) is used.
pub fn resolve_playback(
    content: &Content,
    season: Option<u32>,
    episode: Option<u32>,
) -> Option<PlaybackTarget> {
    let mut target = PlaybackTarget {
        content_id: content.id.clone(),
        src: content.video_url.clone().unwrap_or_default(),
        title: content.title.clone(),
        subtitle: None,
        poster_url: content.banner_url.clone(),
        quality_urls: content
            .quality_urls
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
    };

    if content.content_type == ContentType::Series {
        if let (Some(s), Some(e)) = (season, episode) {
            let found = content
                .seasons
                .iter()
                .find(|sea| sea.season_number == s)
                .and_then(|sea| sea.episodes.iter().find(|ep| ep.episode_number == e));
            if let Some(ep) = found {
                target.src = ep.video_url.clone();
                target.title = ep.title.clone();
                target.subtitle = Some(format!("{} - S{} E{}", content.title, s, e));
                target.quality_urls.clear();
            }
        }
    }

    (!target.src.is_empty()).then_some(target)
}
