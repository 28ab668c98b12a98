// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level service settings loaded from `config.toml`
///
/// Precedence (highest wins):
/// 1) Environment variables (prefix `PODSERVICE__`, `__` as nested separator)
/// 2) Config file (if present)
/// 3) Struct defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub log_level: LogLevel,
    pub server: ServerSettings,
    pub podcast: PodcastSettings,
    pub storage: StorageSettings,
    pub watch: WatchSettings,
    pub downloader: DownloaderSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Public address clients use to reach the service; media URLs derive from it
    pub base_url: String,
    /// Largest accepted upload body, in megabytes
    pub max_upload_mb: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8083,
            base_url: "http://localhost:8083".to_string(),
            max_upload_mb: 500,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PodcastSettings {
    pub title: String,
    pub description: String,
    pub author: String,
    pub language: String,
    pub category: String,
    pub image_url: Option<String>,
}

impl Default for PodcastSettings {
    fn default() -> Self {
        Self {
            title: "My Podcast".to_string(),
            description: "Audio podcast episodes".to_string(),
            author: "Pod Service".to_string(),
            language: "en-us".to_string(),
            category: "Technology".to_string(),
            image_url: None,
        }
    }
}

/// Storage layout; unset directories live below `data_dir`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub data_dir: PathBuf,
    pub audio_dir: Option<PathBuf>,
    pub metadata_dir: Option<PathBuf>,
    pub thumbnails_dir: Option<PathBuf>,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("/tmp/podservice"),
            audio_dir: None,
            metadata_dir: None,
            thumbnails_dir: None,
        }
    }
}

impl StorageSettings {
    pub fn audio_dir(&self) -> PathBuf {
        self.audio_dir
            .clone()
            .unwrap_or_else(|| self.data_dir.join("audio"))
    }

    pub fn metadata_dir(&self) -> PathBuf {
        self.metadata_dir
            .clone()
            .unwrap_or_else(|| self.data_dir.join("metadata"))
    }

    pub fn thumbnails_dir(&self) -> PathBuf {
        self.thumbnails_dir
            .clone()
            .unwrap_or_else(|| self.data_dir.join("thumbnails"))
    }
}

/// The watched URL file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchSettings {
    pub file: PathBuf,
    pub enabled: bool,
    /// How often the file's modification time is checked
    pub poll_interval_secs: u64,
    /// URLs processed at the same time within one pass
    pub max_concurrent: usize,
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self {
            file: PathBuf::from("/tmp/podservice/urls.txt"),
            enabled: true,
            poll_interval_secs: 5,
            max_concurrent: 1,
        }
    }
}

/// External media downloader invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloaderSettings {
    pub command: String,
    pub audio_format: String,
    pub audio_quality: String,
}

impl Default for DownloaderSettings {
    fn default() -> Self {
        Self {
            command: "yt-dlp".to_string(),
            audio_format: "mp3".to_string(),
            audio_quality: "192".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    #[serde(alias = "ERROR")]
    Error,
    #[serde(alias = "WARN", alias = "WARNING", alias = "warning")]
    Warn,
    #[default]
    #[serde(alias = "INFO")]
    Info,
    #[serde(alias = "DEBUG")]
    Debug,
    #[serde(alias = "TRACE")]
    Trace,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}
