// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::config::DownloaderSettings;
use crate::episode::{Episode, fetch_artwork, is_audio_extension, sanitize_title, unique_stem};
use crate::error::DownloadError;
use crate::http::HttpClient;
use crate::metadata::MetadataStore;

/// Turns a source URL into a stored, published episode
///
/// On success the audio (and artwork, if any) is on disk and the metadata
/// record has been saved. Implementations do not touch the catalog.
#[async_trait]
pub trait Downloader: Send + Sync {
    async fn download(&self, url: &str) -> Result<Episode, DownloadError>;
}

/// The subset of `yt-dlp --dump-single-json` output used for an episode
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MediaInfo {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub duration: Option<f64>,
    /// `YYYYMMDD`
    #[serde(default)]
    pub upload_date: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
}

impl MediaInfo {
    pub fn parse(url: &str, json: &[u8]) -> Result<Self, DownloadError> {
        serde_json::from_slice(json).map_err(|e| DownloadError::InvalidMediaInfo {
            url: url.to_string(),
            source: e,
        })
    }

    pub fn title(&self) -> &str {
        self.title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or("Untitled")
    }

    pub fn duration_secs(&self) -> u64 {
        self.duration
            .filter(|d| d.is_finite() && *d > 0.0)
            .map_or(0, |d| d.round() as u64)
    }

    /// Upload date at midnight UTC, or now when missing or malformed
    pub fn pub_date(&self) -> DateTime<Utc> {
        self.upload_date
            .as_deref()
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y%m%d").ok())
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|d| d.and_utc())
            .unwrap_or_else(Utc::now)
    }
}

/// Downloader backed by the `yt-dlp` command line tool
pub struct YtDlpDownloader {
    settings: DownloaderSettings,
    audio_dir: PathBuf,
    thumbnails_dir: PathBuf,
    store: MetadataStore,
    http: Arc<dyn HttpClient>,
}

impl YtDlpDownloader {
    pub fn new(
        settings: DownloaderSettings,
        audio_dir: impl Into<PathBuf>,
        thumbnails_dir: impl Into<PathBuf>,
        store: MetadataStore,
        http: Arc<dyn HttpClient>,
    ) -> Self {
        Self {
            settings,
            audio_dir: audio_dir.into(),
            thumbnails_dir: thumbnails_dir.into(),
            store,
            http,
        }
    }

    /// Run the configured command with `args` and return its stdout
    async fn run(&self, url: &str, args: &[String]) -> Result<Vec<u8>, DownloadError> {
        let mut parts = self.settings.command.split_whitespace();
        let program = parts.next().unwrap_or("yt-dlp");

        debug!("Running {} {}", self.settings.command, args.join(" "));
        let output = Command::new(program)
            .args(parts)
            .args(args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| DownloadError::SpawnFailed {
                command: self.settings.command.clone(),
                source: e,
            })?;

        if !output.status.success() {
            return Err(DownloadError::CommandFailed {
                command: self.settings.command.clone(),
                url: url.to_string(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(output.stdout)
    }

    async fn fetch_info(&self, url: &str) -> Result<MediaInfo, DownloadError> {
        let args = [
            "--dump-single-json",
            "--skip-download",
            "--no-playlist",
            "--no-warnings",
            url,
        ]
        .map(String::from);
        let stdout = self.run(url, &args).await?;
        MediaInfo::parse(url, &stdout)
    }

    async fn fetch_audio(&self, url: &str, stem: &str) -> Result<(), DownloadError> {
        let template = self
            .audio_dir
            .join(format!("{}.%(ext)s", escape_template(stem)));
        let args = vec![
            "--format".to_string(),
            "bestaudio/best".to_string(),
            "--extract-audio".to_string(),
            "--audio-format".to_string(),
            self.settings.audio_format.clone(),
            "--audio-quality".to_string(),
            self.settings.audio_quality.clone(),
            "--no-playlist".to_string(),
            "--no-warnings".to_string(),
            "--quiet".to_string(),
            "--output".to_string(),
            template.to_string_lossy().into_owned(),
            url.to_string(),
        ];
        self.run(url, &args).await.map(|_| ())
    }

    async fn fetch_thumbnail(&self, thumbnail_url: &str, stem: &str) -> Option<PathBuf> {
        if let Err(e) = tokio::fs::create_dir_all(&self.thumbnails_dir).await {
            warn!(
                "Cannot create thumbnails directory {}: {}",
                self.thumbnails_dir.display(),
                e
            );
            return None;
        }

        match fetch_artwork(self.http.as_ref(), thumbnail_url, &self.thumbnails_dir, stem).await {
            Ok(path) => Some(path),
            Err(e) => {
                warn!("Failed to download thumbnail: {}", e);
                None
            }
        }
    }
}

#[async_trait]
impl Downloader for YtDlpDownloader {
    async fn download(&self, url: &str) -> Result<Episode, DownloadError> {
        if let Some(existing) = self.store.find_by_source(url) {
            info!("Already downloaded, reusing episode: {}", existing.title);
            return Ok(existing);
        }

        info!("Downloading: {}", url);
        let media = self.fetch_info(url).await?;
        let title = media.title().to_string();

        let mut stem = sanitize_title(&title);
        if stem.is_empty() {
            stem = "Untitled".to_string();
        }

        tokio::fs::create_dir_all(&self.audio_dir)
            .await
            .map_err(|e| DownloadError::FileCreateFailed {
                path: self.audio_dir.clone(),
                source: e,
            })?;
        let stem = unique_stem(&self.audio_dir, &stem, |candidate| {
            self.store.has_record(candidate)
        });

        info!("Downloading audio for: {}", title);
        self.fetch_audio(url, &stem).await?;

        let audio_file = locate_audio(&self.audio_dir, &stem, &self.settings.audio_format)
            .ok_or_else(|| DownloadError::AudioMissing {
                title: title.clone(),
                dir: self.audio_dir.clone(),
            })?;
        let file_size = tokio::fs::metadata(&audio_file)
            .await
            .map(|m| m.len())
            .unwrap_or(0);

        let audio_url = self.store.media_url("audio", &audio_file);
        let mut episode = Episode::new(&title, &audio_file, audio_url, media.pub_date(), url)
            .with_description(media.description.clone().unwrap_or_default())
            .with_duration(media.duration_secs())
            .with_file_size(file_size);

        if let Some(thumbnail_url) = media.thumbnail.as_deref().filter(|t| !t.is_empty())
            && let Some(image_file) = self.fetch_thumbnail(thumbnail_url, &stem).await
        {
            let image_url = self.store.media_url("thumbnails", &image_file);
            episode = episode.with_image(image_file, image_url);
        }

        self.store.save(&episode)?;
        info!(
            "Successfully downloaded: {} ({:.1} MB)",
            title,
            file_size as f64 / (1024.0 * 1024.0)
        );
        Ok(episode)
    }
}

/// `%` starts a field in yt-dlp output templates
fn escape_template(stem: &str) -> String {
    stem.replace('%', "%%")
}

/// Find the extracted audio: `<stem>.<format>`, else any audio file named `<stem>.*`
fn locate_audio(dir: &Path, stem: &str, format: &str) -> Option<PathBuf> {
    let expected = dir.join(format!("{}.{}", stem, format));
    if expected.is_file() {
        return Some(expected);
    }
    debug!("Expected file not found: {}", expected.display());

    let mut candidates: Vec<PathBuf> = std::fs::read_dir(dir)
        .ok()?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            let name_matches = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(|n| n.strip_prefix(stem))
                .is_some_and(|rest| rest.starts_with('.'));
            let is_audio = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(is_audio_extension);
            path.is_file() && name_matches && is_audio
        })
        .collect();
    candidates.sort();
    candidates.into_iter().next()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpResponse;
    use chrono::TimeZone;
    use tempfile::tempdir;

    struct NoHttp;

    #[async_trait]
    impl HttpClient for NoHttp {
        async fn get_stream(&self, _url: &str) -> Result<HttpResponse, reqwest::Error> {
            panic!("no HTTP expected in this test");
        }
    }

    fn downloader(root: &Path, command: &str) -> YtDlpDownloader {
        let settings = DownloaderSettings {
            command: command.to_string(),
            ..DownloaderSettings::default()
        };
        YtDlpDownloader::new(
            settings,
            root.join("audio"),
            root.join("thumbnails"),
            MetadataStore::new(root.join("metadata"), "http://localhost:8083"),
            Arc::new(NoHttp),
        )
    }

    #[test]
    fn media_info_reads_relevant_fields() {
        let json = br#"{
            "id": "abc",
            "title": "  A Talk  ",
            "description": "Long text",
            "duration": 1234.6,
            "upload_date": "20240315",
            "thumbnail": "https://i.example/abc.jpg",
            "formats": [{"format_id": "140"}]
        }"#;

        let info = MediaInfo::parse("u", json).unwrap();

        assert_eq!(info.title(), "A Talk");
        assert_eq!(info.description.as_deref(), Some("Long text"));
        assert_eq!(info.duration_secs(), 1235);
        assert_eq!(
            info.pub_date(),
            Utc.with_ymd_and_hms(2024, 3, 15, 0, 0, 0).unwrap()
        );
        assert_eq!(info.thumbnail.as_deref(), Some("https://i.example/abc.jpg"));
    }

    #[test]
    fn media_info_tolerates_missing_fields() {
        let info = MediaInfo::parse("u", br#"{"title": null, "duration": null}"#).unwrap();
        let before = Utc::now();

        assert_eq!(info.title(), "Untitled");
        assert_eq!(info.duration_secs(), 0);
        assert!(info.pub_date() >= before);
    }

    #[test]
    fn media_info_bad_upload_date_means_now() {
        let info = MediaInfo {
            upload_date: Some("2024-03-15".to_string()),
            ..MediaInfo::default()
        };
        let before = Utc::now();

        assert!(info.pub_date() >= before);
    }

    #[test]
    fn media_info_rejects_non_json() {
        assert!(matches!(
            MediaInfo::parse("https://x", b"ERROR: unsupported URL"),
            Err(DownloadError::InvalidMediaInfo { .. })
        ));
    }

    #[test]
    fn template_escapes_percent() {
        assert_eq!(escape_template("100% Pure"), "100%% Pure");
    }

    #[test]
    fn locate_audio_prefers_expected_name() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("Show.mp3"), b"a").unwrap();
        std::fs::write(dir.path().join("Show (1).mp3"), b"b").unwrap();

        assert_eq!(
            locate_audio(dir.path(), "Show", "mp3"),
            Some(dir.path().join("Show.mp3"))
        );
    }

    #[test]
    fn locate_audio_falls_back_to_prefix_match() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("Show.f251.m4a"), b"a").unwrap();
        std::fs::write(dir.path().join("Show.info.json"), b"{}").unwrap();

        assert_eq!(
            locate_audio(dir.path(), "Show", "mp3"),
            Some(dir.path().join("Show.f251.m4a"))
        );
        assert_eq!(locate_audio(dir.path(), "Other", "mp3"), None);
    }

    #[tokio::test]
    async fn existing_record_short_circuits_download() {
        let dir = tempdir().unwrap();
        let downloader = downloader(dir.path(), "podservice-no-such-binary");

        let audio_dir = dir.path().join("audio");
        std::fs::create_dir_all(&audio_dir).unwrap();
        let audio_file = audio_dir.join("Known.mp3");
        std::fs::write(&audio_file, b"audio").unwrap();
        let known = Episode::new(
            "Known",
            &audio_file,
            "http://localhost:8083/audio/Known.mp3",
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            "https://example.com/known",
        );
        downloader.store.save(&known).unwrap();

        let episode = downloader.download("https://example.com/known").await.unwrap();

        assert_eq!(episode.guid(), "https://example.com/known");
        assert_eq!(episode.title, "Known");
    }

    #[tokio::test]
    async fn missing_command_is_reported() {
        let dir = tempdir().unwrap();
        let downloader = downloader(dir.path(), "podservice-no-such-binary");

        let result = downloader.download("https://example.com/new").await;

        assert!(matches!(result, Err(DownloadError::SpawnFailed { .. })));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_command_is_reported() {
        let dir = tempdir().unwrap();
        let downloader = downloader(dir.path(), "false");

        let result = downloader.download("https://example.com/new").await;

        assert!(matches!(result, Err(DownloadError::CommandFailed { .. })));
    }
}
