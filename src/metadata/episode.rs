// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, info, warn};
use url::Url;

use crate::episode::Episode;
use crate::error::MetadataError;

const RECORD_EXTENSION: &str = "json";

/// Serializable metadata for a stored episode, one JSON file per episode
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpisodeRecord {
    #[serde(default, deserialize_with = "nullable")]
    pub title: String,
    #[serde(default, deserialize_with = "nullable")]
    pub description: String,
    #[serde(default, deserialize_with = "nullable")]
    pub audio_file: String,
    #[serde(default, deserialize_with = "nullable")]
    pub audio_url: String,
    #[serde(default, deserialize_with = "nullable")]
    pub pub_date: String,
    #[serde(default, deserialize_with = "whole_number")]
    pub duration: u64,
    #[serde(default, deserialize_with = "whole_number")]
    pub file_size: u64,
    #[serde(default, deserialize_with = "nullable")]
    pub source_url: String,
    /// Earlier name of `source_url`, still written so older readers find it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub youtube_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guid: Option<String>,
}

impl EpisodeRecord {
    /// Create a record from an episode
    pub fn from_episode(episode: &Episode) -> Self {
        Self {
            title: episode.title.clone(),
            description: episode.description.clone(),
            audio_file: episode.audio_file.to_string_lossy().into_owned(),
            audio_url: episode.audio_url.clone(),
            pub_date: episode.pub_date.to_rfc3339(),
            duration: episode.duration,
            file_size: episode.file_size,
            source_url: episode.source_url.clone(),
            youtube_url: Some(episode.source_url.clone()).filter(|s| !s.is_empty()),
            image_file: episode
                .image_file
                .as_ref()
                .map(|p| p.to_string_lossy().into_owned()),
            image_url: episode.image_url.clone(),
            guid: Some(episode.guid().to_string()),
        }
    }

    /// Source URL under either field name, `source_url` winning
    pub fn source(&self) -> &str {
        if self.source_url.is_empty() {
            self.youtube_url.as_deref().unwrap_or_default()
        } else {
            &self.source_url
        }
    }
}

/// Treat an explicit JSON `null` like a missing field
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Accept integers, floats (`1234.0`) and `null` for counters
fn whole_number<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<f64>::deserialize(deserializer)?;
    Ok(value.filter(|v| v.is_finite() && *v > 0.0).map_or(0, |v| v as u64))
}

/// Write an episode record to a JSON file
pub fn write_episode_record(episode: &Episode, path: &Path) -> Result<(), MetadataError> {
    let record = EpisodeRecord::from_episode(episode);
    let json = serde_json::to_string_pretty(&record)?;
    std::fs::write(path, json).map_err(|e| MetadataError::WriteFailed {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Read an episode record from a JSON file
pub fn read_episode_record(path: &Path) -> Result<EpisodeRecord, MetadataError> {
    let content = std::fs::read_to_string(path).map_err(|e| MetadataError::ReadFailed {
        path: path.to_path_buf(),
        source: e,
    })?;

    serde_json::from_str(&content).map_err(|e| MetadataError::JsonParseFailed {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Durable one-record-per-episode store rooted at a metadata directory
///
/// Records are keyed by the audio file stem (`Show.mp3` → `Show.json`). Media
/// URLs are not trusted from disk: whenever the referenced file exists they
/// are rebuilt from the store's base URL, so moving the server to a new
/// address only requires a restart.
#[derive(Debug, Clone)]
pub struct MetadataStore {
    dir: PathBuf,
    base_url: String,
}

impl MetadataStore {
    pub fn new(dir: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            dir: dir.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Path of the record belonging to an audio file
    pub fn record_path(&self, audio_file: &Path) -> Result<PathBuf, MetadataError> {
        let stem = audio_file
            .file_stem()
            .ok_or_else(|| MetadataError::InvalidAudioPath(audio_file.to_path_buf()))?;
        let mut name = stem.to_os_string();
        name.push(".");
        name.push(RECORD_EXTENSION);
        Ok(self.dir.join(name))
    }

    /// Public URL for a stored media file, e.g. `<base>/audio/My%20Show.mp3`
    pub fn media_url(&self, route: &str, file: &Path) -> String {
        let name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        if let Ok(mut url) = Url::parse(&self.base_url) {
            let pushed = match url.path_segments_mut() {
                Ok(mut segments) => {
                    segments.pop_if_empty().push(route).push(&name);
                    true
                }
                Err(()) => false,
            };
            if pushed {
                return url.to_string();
            }
        }

        format!("{}/{}/{}", self.base_url, route, name)
    }

    /// Whether a record named `<stem>.json` exists
    pub fn has_record(&self, stem: &str) -> bool {
        self.dir
            .join(format!("{}.{}", stem, RECORD_EXTENSION))
            .exists()
    }

    /// Persist an episode, replacing any record with the same key
    pub fn save(&self, episode: &Episode) -> Result<PathBuf, MetadataError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| MetadataError::CreateDirectoryFailed {
            path: self.dir.clone(),
            source: e,
        })?;

        let path = self.record_path(&episode.audio_file)?;
        write_episode_record(episode, &path)?;
        debug!("Saved episode metadata to {}", path.display());
        Ok(path)
    }

    /// Load every readable record in the directory
    ///
    /// A missing directory yields no episodes. Records that cannot be read or
    /// parsed are logged and skipped; they never abort the load.
    pub fn load_all(&self) -> Vec<Episode> {
        let episodes: Vec<Episode> = self
            .record_paths()
            .into_iter()
            .filter_map(|path| match read_episode_record(&path) {
                Ok(record) => Some(self.hydrate(record)),
                Err(e) => {
                    warn!("Skipping episode record: {}", e);
                    None
                }
            })
            .collect();

        info!(
            "Loaded {} episode(s) from {}",
            episodes.len(),
            self.dir.display()
        );
        episodes
    }

    /// Find a stored episode by its source URL whose audio is still on disk
    pub fn find_by_source(&self, source_url: &str) -> Option<Episode> {
        self.record_paths()
            .into_iter()
            .filter_map(|path| read_episode_record(&path).ok())
            .filter(|record| record.source() == source_url)
            .map(|record| self.hydrate(record))
            .find(|episode| episode.audio_file.exists())
    }

    /// Delete the record belonging to an audio file; `Ok(false)` if there was none
    pub fn delete(&self, audio_file: &Path) -> Result<bool, MetadataError> {
        let path = self.record_path(audio_file)?;
        if !path.exists() {
            return Ok(false);
        }

        std::fs::remove_file(&path).map_err(|e| MetadataError::DeleteFailed {
            path: path.clone(),
            source: e,
        })?;
        info!("Deleted metadata file: {}", path.display());
        Ok(true)
    }

    /// Delete every record in the directory, returning how many were removed
    pub fn delete_all(&self) -> Result<usize, MetadataError> {
        let mut deleted = 0;
        for path in self.record_paths() {
            std::fs::remove_file(&path).map_err(|e| MetadataError::DeleteFailed {
                path: path.clone(),
                source: e,
            })?;
            deleted += 1;
        }
        Ok(deleted)
    }

    /// Sorted paths of all `*.json` files; empty when the directory is missing
    fn record_paths(&self) -> Vec<PathBuf> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Metadata directory does not exist: {}", self.dir.display());
                return Vec::new();
            }
            Err(e) => {
                warn!(
                    "{}",
                    MetadataError::ReadDirectoryFailed {
                        path: self.dir.clone(),
                        source: e,
                    }
                );
                return Vec::new();
            }
        };

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.is_file()
                    && path.extension().and_then(|e| e.to_str()) == Some(RECORD_EXTENSION)
            })
            .collect();
        paths.sort();
        paths
    }

    /// Turn a record into an episode, normalizing paths and rebuilding URLs
    fn hydrate(&self, record: EpisodeRecord) -> Episode {
        let audio_file = absolute(Path::new(&record.audio_file));

        let pub_date = parse_pub_date(&record.pub_date).unwrap_or_else(|| {
            warn!(
                "Unparseable pub_date '{}' for '{}', using now",
                record.pub_date, record.title
            );
            Utc::now()
        });

        let source_url = record.source().to_string();

        let title = if record.title.is_empty() {
            "Untitled".to_string()
        } else {
            record.title
        };

        // GUID is derived from the stored URL before it is regenerated
        let mut episode = Episode::new(title, audio_file, record.audio_url, pub_date, source_url)
            .with_description(record.description)
            .with_duration(record.duration)
            .with_file_size(record.file_size)
            .with_guid(record.guid.unwrap_or_default());

        if !record.audio_file.is_empty() && episode.audio_file.exists() {
            episode.audio_url = self.media_url("audio", &episode.audio_file);
        }

        if let Some(image_file) = record.image_file.filter(|f| !f.is_empty()) {
            let image_file = absolute(Path::new(&image_file));
            let image_url = if image_file.exists() {
                Some(self.media_url("thumbnails", &image_file))
            } else {
                record.image_url.filter(|u| !u.is_empty())
            };
            episode.image_file = Some(image_file);
            episode.image_url = image_url;
        } else {
            episode.image_url = record.image_url.filter(|u| !u.is_empty());
        }

        episode
    }
}

fn absolute(path: &Path) -> PathBuf {
    if path.as_os_str().is_empty() || path.is_absolute() {
        return path.to_path_buf();
    }
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Parse an ISO 8601 timestamp; values without an offset are taken as UTC
pub fn parse_pub_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
    ] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::{TempDir, tempdir};

    const BASE_URL: &str = "http://localhost:8083";

    struct Fixture {
        _root: TempDir,
        audio_dir: PathBuf,
        store: MetadataStore,
    }

    fn fixture() -> Fixture {
        let root = tempdir().unwrap();
        let audio_dir = root.path().join("audio");
        std::fs::create_dir_all(&audio_dir).unwrap();
        let store = MetadataStore::new(root.path().join("metadata"), BASE_URL);
        Fixture {
            _root: root,
            audio_dir,
            store,
        }
    }

    fn make_episode(audio_dir: &Path, name: &str, source: &str) -> Episode {
        let audio_file = audio_dir.join(name);
        std::fs::write(&audio_file, b"fake audio").unwrap();
        Episode::new(
            "Test Episode",
            &audio_file,
            format!("{}/audio/{}", BASE_URL, name),
            Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap(),
            source,
        )
        .with_description("A test episode")
        .with_duration(1800)
        .with_file_size(10)
    }

    #[test]
    fn record_converts_all_fields() {
        let episode = Episode::new(
            "Test Episode",
            "/data/audio/Test Episode.mp3",
            "http://localhost:8083/audio/Test%20Episode.mp3",
            Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap(),
            "https://example.com/watch?v=1",
        )
        .with_description("desc")
        .with_duration(61)
        .with_file_size(1234);

        let record = EpisodeRecord::from_episode(&episode);

        assert_eq!(record.title, "Test Episode");
        assert_eq!(record.description, "desc");
        assert_eq!(record.audio_file, "/data/audio/Test Episode.mp3");
        assert_eq!(record.audio_url, "http://localhost:8083/audio/Test%20Episode.mp3");
        assert_eq!(record.pub_date, "2024-01-15T12:00:00+00:00");
        assert_eq!(record.duration, 61);
        assert_eq!(record.file_size, 1234);
        assert_eq!(record.source_url, "https://example.com/watch?v=1");
        assert_eq!(record.youtube_url.as_deref(), Some("https://example.com/watch?v=1"));
        assert_eq!(record.guid.as_deref(), Some("https://example.com/watch?v=1"));
        assert!(record.image_file.is_none());
    }

    #[test]
    fn save_names_record_after_audio_stem() {
        let f = fixture();
        let episode = make_episode(&f.audio_dir, "My Show.mp3", "https://example.com/1");

        let path = f.store.save(&episode).unwrap();

        assert_eq!(path, f.store.dir().join("My Show.json"));
        assert!(path.exists());
    }

    #[test]
    fn save_overwrites_existing_record() {
        let f = fixture();
        let mut episode = make_episode(&f.audio_dir, "Show.mp3", "https://example.com/1");
        f.store.save(&episode).unwrap();

        episode.title = "Renamed".to_string();
        f.store.save(&episode).unwrap();

        let loaded = f.store.load_all();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].title, "Renamed");
    }

    #[test]
    fn save_and_load_roundtrip_keeps_core_fields() {
        let f = fixture();
        let episode = make_episode(&f.audio_dir, "Show.mp3", "https://example.com/1");
        f.store.save(&episode).unwrap();

        let loaded = f.store.load_all();

        assert_eq!(loaded.len(), 1);
        let read_back = &loaded[0];
        assert_eq!(read_back.guid(), episode.guid());
        assert_eq!(read_back.title, episode.title);
        assert_eq!(read_back.description, episode.description);
        assert_eq!(read_back.pub_date, episode.pub_date);
        assert_eq!(read_back.duration, 1800);
        assert_eq!(read_back.file_size, 10);
        assert_eq!(read_back.audio_file, episode.audio_file);
    }

    #[test]
    fn load_regenerates_urls_from_current_base_url() {
        let f = fixture();
        let episode = make_episode(&f.audio_dir, "My Show.mp3", "");
        let original_guid = episode.guid().to_string();
        f.store.save(&episode).unwrap();

        let moved = MetadataStore::new(f.store.dir(), "https://pods.example.org/");
        let loaded = moved.load_all();

        assert_eq!(loaded[0].audio_url, "https://pods.example.org/audio/My%20Show.mp3");
        assert_eq!(loaded[0].guid(), original_guid);
        assert_eq!(loaded[0].title, "Test Episode");
        assert_eq!(loaded[0].pub_date, episode.pub_date);
    }

    #[test]
    fn load_keeps_stored_url_when_audio_is_gone() {
        let f = fixture();
        let episode = make_episode(&f.audio_dir, "Gone.mp3", "");
        f.store.save(&episode).unwrap();
        std::fs::remove_file(&episode.audio_file).unwrap();

        let moved = MetadataStore::new(f.store.dir(), "https://elsewhere.example.org");
        let loaded = moved.load_all();

        assert_eq!(loaded[0].audio_url, "http://localhost:8083/audio/Gone.mp3");
    }

    #[test]
    fn load_regenerates_image_url() {
        let f = fixture();
        let image = f.audio_dir.join("Show.jpg");
        std::fs::write(&image, b"jpeg").unwrap();
        let episode = make_episode(&f.audio_dir, "Show.mp3", "https://example.com/1")
            .with_image(image, "http://old/thumbnails/Show.jpg");
        f.store.save(&episode).unwrap();

        let loaded = f.store.load_all();

        assert_eq!(
            loaded[0].image_url.as_deref(),
            Some("http://localhost:8083/thumbnails/Show.jpg")
        );
    }

    #[test]
    fn load_skips_corrupt_records() {
        let f = fixture();
        let episode = make_episode(&f.audio_dir, "Good.mp3", "https://example.com/good");
        f.store.save(&episode).unwrap();
        std::fs::write(f.store.dir().join("Bad.json"), "{ not json").unwrap();

        let loaded = f.store.load_all();

        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].guid(), "https://example.com/good");
    }

    #[test]
    fn load_missing_directory_returns_nothing() {
        let dir = tempdir().unwrap();
        let store = MetadataStore::new(dir.path().join("nope"), BASE_URL);

        assert!(store.load_all().is_empty());
    }

    #[test]
    fn load_ignores_non_json_files() {
        let f = fixture();
        std::fs::create_dir_all(f.store.dir()).unwrap();
        std::fs::write(f.store.dir().join("notes.txt"), "hello").unwrap();

        assert!(f.store.load_all().is_empty());
    }

    #[test]
    fn load_accepts_legacy_records() {
        let f = fixture();
        std::fs::create_dir_all(f.store.dir()).unwrap();
        std::fs::write(
            f.store.dir().join("Legacy.json"),
            r#"{
  "title": "Legacy",
  "description": null,
  "audio_file": "/nowhere/Legacy.mp3",
  "audio_url": "http://old/audio/Legacy.mp3",
  "pub_date": "2023-05-01T08:30:00.123456",
  "duration": 95.0,
  "file_size": 2048,
  "youtube_url": "https://www.youtube.com/watch?v=legacy"
}"#,
        )
        .unwrap();

        let loaded = f.store.load_all();

        assert_eq!(loaded.len(), 1);
        let episode = &loaded[0];
        assert_eq!(episode.guid(), "https://www.youtube.com/watch?v=legacy");
        assert_eq!(episode.description, "");
        assert_eq!(episode.duration, 95);
        assert_eq!(
            episode.pub_date,
            Utc.with_ymd_and_hms(2023, 5, 1, 8, 30, 0).unwrap()
                + chrono::Duration::microseconds(123456)
        );
    }

    #[test]
    fn load_defaults_missing_fields() {
        let f = fixture();
        std::fs::create_dir_all(f.store.dir()).unwrap();
        std::fs::write(
            f.store.dir().join("Sparse.json"),
            r#"{"audio_url": "http://old/audio/Sparse.mp3", "pub_date": "garbage"}"#,
        )
        .unwrap();

        let before = Utc::now();
        let loaded = f.store.load_all();

        let episode = &loaded[0];
        assert_eq!(episode.title, "Untitled");
        assert_eq!(episode.duration, 0);
        assert_eq!(episode.file_size, 0);
        assert_eq!(episode.guid(), "http://old/audio/Sparse.mp3");
        assert!(episode.pub_date >= before);
    }

    #[test]
    fn load_makes_relative_paths_absolute() {
        let f = fixture();
        std::fs::create_dir_all(f.store.dir()).unwrap();
        std::fs::write(
            f.store.dir().join("Relative.json"),
            r#"{"title": "Relative", "audio_file": "audio/Relative.mp3", "audio_url": "u", "pub_date": "2024-01-01T00:00:00"}"#,
        )
        .unwrap();

        let loaded = f.store.load_all();

        assert!(loaded[0].audio_file.is_absolute());
        assert!(loaded[0].audio_file.ends_with("audio/Relative.mp3"));
    }

    #[test]
    fn find_by_source_matches_existing_audio() {
        let f = fixture();
        let episode = make_episode(&f.audio_dir, "Show.mp3", "https://example.com/1");
        f.store.save(&episode).unwrap();

        let found = f.store.find_by_source("https://example.com/1").unwrap();
        assert_eq!(found.title, "Test Episode");
        assert!(f.store.find_by_source("https://example.com/2").is_none());
    }

    #[test]
    fn find_by_source_ignores_records_without_audio() {
        let f = fixture();
        let episode = make_episode(&f.audio_dir, "Show.mp3", "https://example.com/1");
        f.store.save(&episode).unwrap();
        std::fs::remove_file(&episode.audio_file).unwrap();

        assert!(f.store.find_by_source("https://example.com/1").is_none());
    }

    #[test]
    fn delete_removes_record() {
        let f = fixture();
        let episode = make_episode(&f.audio_dir, "Show.mp3", "https://example.com/1");
        f.store.save(&episode).unwrap();

        assert!(f.store.delete(&episode.audio_file).unwrap());
        assert!(!f.store.delete(&episode.audio_file).unwrap());
        assert!(f.store.load_all().is_empty());
    }

    #[test]
    fn delete_all_counts_records() {
        let f = fixture();
        f.store.save(&make_episode(&f.audio_dir, "A.mp3", "a")).unwrap();
        f.store.save(&make_episode(&f.audio_dir, "B.mp3", "b")).unwrap();

        assert_eq!(f.store.delete_all().unwrap(), 2);
        assert!(f.store.load_all().is_empty());
    }

    #[test]
    fn media_url_percent_encodes_file_name() {
        let store = MetadataStore::new("/tmp", "http://localhost:8083/");
        assert_eq!(
            store.media_url("audio", Path::new("/x/Talk #1 & more.mp3")),
            "http://localhost:8083/audio/Talk%20%231%20&%20more.mp3"
        );
    }

    #[test]
    fn records_carry_both_source_field_names() {
        let f = fixture();
        let sourced = make_episode(&f.audio_dir, "Sourced.mp3", "https://example.com/v");
        let uploaded = make_episode(&f.audio_dir, "Uploaded.mp3", "");
        f.store.save(&sourced).unwrap();
        f.store.save(&uploaded).unwrap();

        let json: serde_json::Value = serde_json::from_str(
            &std::fs::read_to_string(f.store.dir().join("Sourced.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(json["source_url"], "https://example.com/v");
        assert_eq!(json["youtube_url"], "https://example.com/v");

        let json: serde_json::Value = serde_json::from_str(
            &std::fs::read_to_string(f.store.dir().join("Uploaded.json")).unwrap(),
        )
        .unwrap();
        assert!(json.get("youtube_url").is_none());

        let found = f.store.find_by_source("https://example.com/v").unwrap();
        assert_eq!(found.source_url, "https://example.com/v");
    }

    #[test]
    fn has_record_checks_stem() {
        let f = fixture();
        let episode = make_episode(&f.audio_dir, "Show.mp3", "");
        assert!(!f.store.has_record("Show"));

        f.store.save(&episode).unwrap();

        assert!(f.store.has_record("Show"));
        assert!(!f.store.has_record("Show_1"));
    }

    #[test]
    fn media_url_falls_back_for_opaque_base() {
        let store = MetadataStore::new("/tmp", "mailto:podcasts");
        assert_eq!(
            store.media_url("audio", Path::new("/x/a.mp3")),
            "mailto:podcasts/audio/a.mp3"
        );
    }

    #[test]
    fn media_url_keeps_base_path() {
        let store = MetadataStore::new("/tmp", "https://example.org/pod");
        assert_eq!(
            store.media_url("thumbnails", Path::new("/x/a.jpg")),
            "https://example.org/pod/thumbnails/a.jpg"
        );
    }

    #[test]
    fn parse_pub_date_accepts_common_forms() {
        let expected = Utc.with_ymd_and_hms(2024, 2, 1, 10, 0, 0).unwrap();
        assert_eq!(parse_pub_date("2024-02-01T10:00:00+00:00"), Some(expected));
        assert_eq!(parse_pub_date("2024-02-01T11:00:00+01:00"), Some(expected));
        assert_eq!(parse_pub_date("2024-02-01T10:00:00Z"), Some(expected));
        assert_eq!(parse_pub_date("2024-02-01T10:00:00"), Some(expected));
        assert_eq!(parse_pub_date("2024-02-01 10:00:00"), Some(expected));
        assert_eq!(
            parse_pub_date("2024-02-01"),
            Some(Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(parse_pub_date("yesterday"), None);
        assert_eq!(parse_pub_date(""), None);
    }
}
