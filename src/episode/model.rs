// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

/// A single published episode: local audio plus the metadata shown in the feed
#[derive(Debug, Clone, PartialEq)]
pub struct Episode {
    pub title: String,
    pub description: String,
    /// Absolute path of the audio file on disk
    pub audio_file: PathBuf,
    /// Public URL of the audio file, derived from the server base URL
    pub audio_url: String,
    pub pub_date: DateTime<Utc>,
    /// Duration in seconds, 0 when unknown
    pub duration: u64,
    /// Audio file size in bytes
    pub file_size: u64,
    /// Origin of the episode (video page, article link); empty for plain uploads
    pub source_url: String,
    pub image_file: Option<PathBuf>,
    pub image_url: Option<String>,
    guid: String,
}

impl Episode {
    /// Create an episode, assigning its GUID from the source URL or, when
    /// there is none, from the audio URL
    pub fn new(
        title: impl Into<String>,
        audio_file: impl Into<PathBuf>,
        audio_url: impl Into<String>,
        pub_date: DateTime<Utc>,
        source_url: impl Into<String>,
    ) -> Self {
        let audio_url = audio_url.into();
        let source_url = source_url.into();
        let guid = derive_guid(&source_url, &audio_url);

        Self {
            title: title.into(),
            description: String::new(),
            audio_file: audio_file.into(),
            audio_url,
            pub_date,
            duration: 0,
            file_size: 0,
            source_url,
            image_file: None,
            image_url: None,
            guid,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_duration(mut self, seconds: u64) -> Self {
        self.duration = seconds;
        self
    }

    pub fn with_file_size(mut self, bytes: u64) -> Self {
        self.file_size = bytes;
        self
    }

    pub fn with_image(mut self, image_file: PathBuf, image_url: impl Into<String>) -> Self {
        self.image_file = Some(image_file);
        self.image_url = Some(image_url.into());
        self
    }

    /// Restore a GUID that was assigned in an earlier run
    pub(crate) fn with_guid(mut self, guid: impl Into<String>) -> Self {
        let guid = guid.into();
        if !guid.is_empty() {
            self.guid = guid;
        }
        self
    }

    /// Stable identifier used for deduplication and as the feed item GUID
    pub fn guid(&self) -> &str {
        &self.guid
    }

    /// File name of the audio file, e.g. `My Episode.mp3`
    pub fn audio_filename(&self) -> Option<&str> {
        self.audio_file.file_name().and_then(|n| n.to_str())
    }

    /// Whether `key` names this episode's audio file, with or without extension
    pub fn matches_file_key(&self, key: &str) -> bool {
        matches_key(&self.audio_file, key)
    }
}

fn derive_guid(source_url: &str, audio_url: &str) -> String {
    if source_url.is_empty() {
        audio_url.to_string()
    } else {
        source_url.to_string()
    }
}

fn matches_key(path: &Path, key: &str) -> bool {
    let name = path.file_name().and_then(|n| n.to_str());
    let stem = path.file_stem().and_then(|n| n.to_str());
    name == Some(key) || stem == Some(key)
}
