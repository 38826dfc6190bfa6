//! Content / download / watch-position store
//!
//! The player only sees the [`ContentStore`] trait. [`MemoryStore`] is the
//! stock implementation: explicitly constructed, shared through an `Arc`,
//! optionally mirrored to a JSON file after every write.

use crate::{
    types::{Content, ContentType, DownloadRecord, Episode, Language, Season, WatchPosition},
    Error, Result,
};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

/// Continue-watching entries kept per store
pub const CONTINUE_WATCHING_LIMIT: usize = 10;

/// Catalog, downloads and playback positions
#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn get_all_content(&self) -> Result<Vec<Content>>;

    async fn get_content_by_id(&self, id: &str) -> Result<Option<Content>>;

    async fn get_trending(&self) -> Result<Vec<Content>>;

    async fn get_by_language(&self, language: Language) -> Result<Vec<Content>>;

    /// Case-insensitive match on title or any genre
    async fn search_content(&self, query: &str) -> Result<Vec<Content>>;

    /// Store a download, newest first. Returns false if a record with the
    /// same content id and quality already exists.
    async fn add_download(&self, record: DownloadRecord) -> Result<bool>;

    /// Remove every download of a content item
    async fn remove_download(&self, content_id: &str) -> Result<()>;

    async fn is_downloaded(&self, content_id: &str) -> Result<bool>;

    async fn downloads(&self) -> Result<Vec<DownloadRecord>>;

    /// Upsert the latest position of a content item
    async fn update_watch_progress(&self, content_id: &str, time: f64, duration: f64)
        -> Result<()>;

    async fn get_watch_position(&self, content_id: &str) -> Result<Option<f64>>;

    /// Most recently watched first
    async fn continue_watching(&self) -> Result<Vec<WatchPosition>>;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoreData {
    content: Vec<Content>,
    #[serde(default)]
    downloads: Vec<DownloadRecord>,
    #[serde(default)]
    continue_watching: Vec<WatchPosition>,
}

/// In-memory store with optional JSON persistence
pub struct MemoryStore {
    data: RwLock<StoreData>,
    path: Option<PathBuf>,
}

impl MemoryStore {
    /// Empty store with the given catalog, nothing persisted
    pub fn with_content(content: Vec<Content>) -> Self {
        Self {
            data: RwLock::new(StoreData {
                content,
                ..Default::default()
            }),
            path: None,
        }
    }

    /// Store preloaded with the demo catalog
    pub fn seeded() -> Self {
        Self::with_content(seed_catalog())
    }

    /// Open a JSON-backed store, seeding the file when it does not exist
    #[instrument]
    pub async fn open(path: &Path) -> Result<Self> {
        let data = match tokio::fs::read_to_string(path).await {
            Ok(raw) => {
                let data: StoreData = serde_json::from_str(&raw)?;
                info!(
                    content = data.content.len(),
                    downloads = data.downloads.len(),
                    "Store loaded"
                );
                data
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("Store file missing, seeding demo catalog");
                StoreData {
                    content: seed_catalog(),
                    ..Default::default()
                }
            }
            Err(e) => return Err(e.into()),
        };

        let store = Self {
            data: RwLock::new(data),
            path: Some(path.to_path_buf()),
        };
        store.flush(&*store.data.read().await).await?;
        Ok(store)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    async fn flush(&self, data: &StoreData) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let raw = serde_json::to_string_pretty(data)?;
        tokio::fs::write(path, raw)
            .await
            .map_err(|e| Error::store(format!("writing {}: {}", path.display(), e)))?;
        debug!(path = %path.display(), "Store flushed");
        Ok(())
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn get_all_content(&self) -> Result<Vec<Content>> {
        Ok(self.data.read().await.content.clone())
    }

    async fn get_content_by_id(&self, id: &str) -> Result<Option<Content>> {
        Ok(self
            .data
            .read()
            .await
            .content
            .iter()
            .find(|c| c.id == id)
            .cloned())
    }

    async fn get_trending(&self) -> Result<Vec<Content>> {
        Ok(self
            .data
            .read()
            .await
            .content
            .iter()
            .filter(|c| c.trending)
            .cloned()
            .collect())
    }

    async fn get_by_language(&self, language: Language) -> Result<Vec<Content>> {
        Ok(self
            .data
            .read()
            .await
            .content
            .iter()
            .filter(|c| c.languages.contains(&language))
            .cloned()
            .collect())
    }

    async fn search_content(&self, query: &str) -> Result<Vec<Content>> {
        let query = query.to_lowercase();
        Ok(self
            .data
            .read()
            .await
            .content
            .iter()
            .filter(|c| {
                c.title.to_lowercase().contains(&query)
                    || c.genres.iter().any(|g| g.to_lowercase().contains(&query))
            })
            .cloned()
            .collect())
    }

    #[instrument(skip(self, record), fields(content_id = %record.content_id, quality = %record.quality))]
    async fn add_download(&self, record: DownloadRecord) -> Result<bool> {
        let mut data = self.data.write().await;
        let exists = data
            .downloads
            .iter()
            .any(|d| d.content_id == record.content_id && d.quality == record.quality);
        if exists {
            debug!("Download already recorded");
            return Ok(false);
        }
        data.downloads.insert(0, record);
        self.flush(&data).await?;
        info!("Download recorded");
        Ok(true)
    }

    async fn remove_download(&self, content_id: &str) -> Result<()> {
        let mut data = self.data.write().await;
        let before = data.downloads.len();
        data.downloads.retain(|d| d.content_id != content_id);
        if data.downloads.len() != before {
            self.flush(&data).await?;
            info!(content_id, removed = before - data.downloads.len(), "Downloads removed");
        }
        Ok(())
    }

    async fn is_downloaded(&self, content_id: &str) -> Result<bool> {
        Ok(self
            .data
            .read()
            .await
            .downloads
            .iter()
            .any(|d| d.content_id == content_id))
    }

    async fn downloads(&self) -> Result<Vec<DownloadRecord>> {
        Ok(self.data.read().await.downloads.clone())
    }

    async fn update_watch_progress(
        &self,
        content_id: &str,
        time: f64,
        duration: f64,
    ) -> Result<()> {
        if !time.is_finite() || time < 0.0 {
            return Err(Error::store(format!("invalid watch position {} for {}", time, content_id)));
        }
        // JSON has no infinity; unknown lengths are stored as 0.
        let duration = if duration.is_finite() && duration > 0.0 { duration } else { 0.0 };

        let mut data = self.data.write().await;
        data.continue_watching.retain(|w| w.content_id != content_id);
        data.continue_watching.insert(
            0,
            WatchPosition {
                content_id: content_id.to_string(),
                timestamp: time,
                duration,
                updated_at: Utc::now(),
            },
        );
        data.continue_watching.truncate(CONTINUE_WATCHING_LIMIT);
        self.flush(&data).await?;
        debug!(content_id, time, duration, "Watch progress updated");
        Ok(())
    }

    async fn get_watch_position(&self, content_id: &str) -> Result<Option<f64>> {
        Ok(self
            .data
            .read()
            .await
            .continue_watching
            .iter()
            .find(|w| w.content_id == content_id)
            .map(|w| w.timestamp))
    }

    async fn continue_watching(&self) -> Result<Vec<WatchPosition>> {
        Ok(self.data.read().await.continue_watching.clone())
    }
}

/// Demo catalog shipped with the store
pub fn seed_catalog() -> Vec<Content> {
    use Language::*;

    let sample = |name: &str| {
        format!(
            "http://commondatastorage.googleapis.com/gtv-videos-bucket/sample/{}.mp4",
            name
        )
    };
    let movie = |id: &str,
                 title: &str,
                 description: &str,
                 languages: Vec<Language>,
                 genres: &[&str],
                 year: u16,
                 rating: f32,
                 trending: bool,
                 video: &str,
                 duration: &str| Content {
        id: id.to_string(),
        title: title.to_string(),
        description: description.to_string(),
        content_type: ContentType::Movie,
        languages,
        genres: genres.iter().map(|g| g.to_string()).collect(),
        release_year: year,
        poster_url: format!("https://picsum.photos/seed/{}/300/450", id),
        banner_url: format!("https://picsum.photos/seed/{}-banner/1200/600", id),
        rating,
        trending,
        video_url: Some(sample(video)),
        quality_urls: BTreeMap::new(),
        duration: Some(duration.to_string()),
        seasons: Vec::new(),
        created_at: Utc::now(),
    };

    let episode = |number: u32, title: &str, duration: &str| Episode {
        id: format!("s1e{}", number),
        season: 1,
        episode_number: number,
        title: title.to_string(),
        duration: duration.to_string(),
        video_url: sample("Sintel"),
    };

    vec![
        movie(
            "1",
            "Kalki 2898 AD",
            "A modern-day avatar of Vishnu descends to protect the world from evil forces.",
            vec![Telugu, Hindi, Tamil, Malayalam, Kannada],
            &["Action", "Sci-Fi", "Mythology"],
            2024,
            9.2,
            true,
            "BigBuckBunny",
            "2h 58m",
        ),
        movie(
            "2",
            "Salaar: Part 1",
            "A gang leader keeps a promise made to his dying friend.",
            vec![Telugu, Hindi, Kannada],
            &["Action", "Drama"],
            2023,
            8.5,
            true,
            "ElephantsDream",
            "2h 55m",
        ),
        movie(
            "3",
            "Leo",
            "A mild-mannered cafe owner fends off a gang and draws a cartel's attention.",
            vec![Tamil, Telugu, Hindi],
            &["Action", "Thriller"],
            2023,
            8.8,
            true,
            "TearsOfSteel",
            "2h 44m",
        ),
        Content {
            id: "4".to_string(),
            title: "The Family Man".to_string(),
            description: "An intelligence officer protects the nation while hiding his job from his family."
                .to_string(),
            content_type: ContentType::Series,
            languages: vec![Hindi, Telugu, Tamil, English],
            genres: vec!["Action".into(), "Comedy".into(), "Drama".into()],
            release_year: 2019,
            poster_url: "https://picsum.photos/seed/familyman/300/450".to_string(),
            banner_url: "https://picsum.photos/seed/familyman-banner/1200/600".to_string(),
            rating: 9.5,
            trending: true,
            video_url: None,
            quality_urls: BTreeMap::new(),
            duration: None,
            seasons: vec![Season {
                season_number: 1,
                episodes: vec![
                    episode(1, "The Family Man", "45m"),
                    episode(2, "Sleepers", "48m"),
                ],
            }],
            created_at: Utc::now(),
        },
        movie(
            "5",
            "RRR",
            "Two revolutionaries on a journey far from home in the 1920s.",
            vec![Telugu, Hindi, English],
            &["Action", "Drama", "History"],
            2022,
            9.0,
            false,
            "BigBuckBunny",
            "3h 2m",
        ),
        movie(
            "6",
            "Vikram",
            "An investigator finds a string of killings is not what it seems.",
            vec![Tamil, Telugu, Hindi],
            &["Action", "Thriller"],
            2022,
            8.9,
            false,
            "ElephantsDream",
            "2h 54m",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(content_id: &str, quality: &str) -> DownloadRecord {
        DownloadRecord {
            content_id: content_id.into(),
            title: "Leo".into(),
            poster_url: String::new(),
            quality: quality.into(),
            size: "1.2 GB".into(),
            downloaded_at: Utc::now(),
            content_type: ContentType::Movie,
        }
    }

    #[tokio::test]
    async fn test_duplicate_download_is_noop() {
        let store = MemoryStore::seeded();
        assert!(store.add_download(record("3", "720p")).await.unwrap());
        assert!(!store.add_download(record("3", "720p")).await.unwrap());
        assert!(store.add_download(record("3", "480p")).await.unwrap());

        let downloads = store.downloads().await.unwrap();
        assert_eq!(downloads.len(), 2);
        assert_eq!(downloads[0].quality, "480p");
        assert!(store.is_downloaded("3").await.unwrap());

        store.remove_download("3").await.unwrap();
        assert!(!store.is_downloaded("3").await.unwrap());
    }

    #[tokio::test]
    async fn test_watch_progress_upsert_and_cap() {
        let store = MemoryStore::seeded();
        for i in 0..12 {
            store
                .update_watch_progress(&i.to_string(), 30.0, 100.0)
                .await
                .unwrap();
        }
        store.update_watch_progress("5", 64.0, 100.0).await.unwrap();

        let list = store.continue_watching().await.unwrap();
        assert_eq!(list.len(), CONTINUE_WATCHING_LIMIT);
        assert_eq!(list[0].content_id, "5");
        assert_eq!(list[0].timestamp, 64.0);
        assert_eq!(list.iter().filter(|w| w.content_id == "5").count(), 1);

        assert_eq!(store.get_watch_position("5").await.unwrap(), Some(64.0));
        assert_eq!(store.get_watch_position("0").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_unknown_duration_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        {
            let store = MemoryStore::open(&path).await.unwrap();
            store
                .update_watch_progress("1", 42.0, f64::INFINITY)
                .await
                .unwrap();
            store.update_watch_progress("2", 10.0, f64::NAN).await.unwrap();
            assert!(store.update_watch_progress("3", f64::NAN, 100.0).await.is_err());
            assert!(store.update_watch_progress("3", -1.0, 100.0).await.is_err());
        }

        let reopened = MemoryStore::open(&path).await.unwrap();
        let list = reopened.continue_watching().await.unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[1].content_id, "1");
        assert_eq!(list[1].timestamp, 42.0);
        assert_eq!(list[1].duration, 0.0);
        assert_eq!(reopened.get_watch_position("3").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_catalog_queries() {
        let store = MemoryStore::seeded();
        assert_eq!(store.get_all_content().await.unwrap().len(), 6);
        assert_eq!(store.get_trending().await.unwrap().len(), 4);
        assert_eq!(store.get_by_language(Language::English).await.unwrap().len(), 2);

        let thrillers = store.search_content("THRILL").await.unwrap();
        let ids: Vec<_> = thrillers.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["3", "6"]);

        let series = store.get_content_by_id("4").await.unwrap().unwrap();
        assert_eq!(series.seasons[0].episodes.len(), 2);
        assert!(store.get_content_by_id("404").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_json_persistence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("bioscoop.json");

        {
            let store = MemoryStore::open(&path).await.unwrap();
            store.add_download(record("1", "1080p")).await.unwrap();
            store.update_watch_progress("1", 812.5, 10680.0).await.unwrap();
        }

        let reopened = MemoryStore::open(&path).await.unwrap();
        assert_eq!(reopened.downloads().await.unwrap().len(), 1);
        assert_eq!(reopened.get_watch_position("1").await.unwrap(), Some(812.5));
        assert_eq!(reopened.get_all_content().await.unwrap().len(), 6);
    }

    #[test]
    fn test_blocking_access_outside_runtime() {
        let store = MemoryStore::seeded();
        let found = tokio_test::block_on(store.get_content_by_id("2")).unwrap();
        assert_eq!(found.map(|c| c.title), Some("Salaar: Part 1".to_string()));
    }
}
