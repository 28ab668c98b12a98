// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

pub mod catalog;
pub mod config;
pub mod downloader;
pub mod episode;
pub mod error;
pub mod feed;
pub mod http;
pub mod metadata;
pub mod process;
pub mod server;
pub mod service;
pub mod watch;

// Re-export main types for convenience
pub use catalog::{Catalog, SharedCatalog};
pub use config::{Settings, default_config_path, resolve_config_path};
pub use downloader::{Downloader, MediaInfo, YtDlpDownloader};
pub use episode::Episode;
pub use error::{
    ConfigError, DownloadError, FeedError, MetadataError, QueueError, ServiceError,
};
pub use feed::{ChannelMetadata, render};
pub use http::{HttpClient, HttpResponse, ReqwestClient};
pub use metadata::MetadataStore;
pub use process::{BatchReport, Processor};
pub use server::{MediaDirs, ServerState, make_app};
pub use service::run;
pub use watch::{UrlQueue, run_watch_loop};
