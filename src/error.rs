// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when reading or writing episode metadata records
#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("Failed to read metadata file {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write metadata file {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to delete metadata file {path}: {source}")]
    DeleteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create directory {path}: {source}")]
    CreateDirectoryFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read directory {path}: {source}")]
    ReadDirectoryFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse metadata JSON in {path}: {source}")]
    JsonParseFailed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize metadata: {0}")]
    JsonSerializeFailed(#[from] serde_json::Error),

    #[error("Audio file path {0} has no file name")]
    InvalidAudioPath(PathBuf),
}

/// Errors that can occur while turning a source URL or upload into an episode
#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("HTTP request failed for {url}: {source}")]
    HttpFailed {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP error {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Failed to create file {path}: {source}")]
    FileCreateFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write to file {path}: {source}")]
    FileWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Stream error while downloading {url}: {source}")]
    StreamFailed {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to run {command}: {source}")]
    SpawnFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{command} exited with {status} for {url}: {stderr}")]
    CommandFailed {
        command: String,
        url: String,
        status: String,
        stderr: String,
    },

    #[error("Could not read media info for {url}: {source}")]
    InvalidMediaInfo {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Downloaded audio for '{title}' not found in {dir}")]
    AudioMissing { title: String, dir: PathBuf },

    #[error("Metadata error: {0}")]
    Metadata(#[from] MetadataError),
}

/// Errors that can occur when reading or rewriting the watched URL file
#[derive(Error, Debug)]
pub enum QueueError {
    #[error("Failed to read URL file {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write URL file {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors that can occur while rendering the RSS document
#[derive(Error, Debug)]
pub enum FeedError {
    #[error("Failed to write RSS document: {0}")]
    WriteFailed(#[from] rss::Error),

    #[error("RSS document is not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
}

/// Errors that can occur when loading or saving the configuration file
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadFailed(#[from] config::ConfigError),

    #[error("Failed to serialize configuration: {0}")]
    SerializeFailed(#[from] toml::ser::Error),

    #[error("Failed to write configuration file {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Fatal errors raised while starting or running the service
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Failed to create directory {path}: {source}")]
    CreateDirectoryFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to bind {addr}: {source}")]
    BindFailed {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("HTTP server error: {0}")]
    ServeFailed(#[source] std::io::Error),

    #[error("URL file error: {0}")]
    Queue(#[from] QueueError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}
