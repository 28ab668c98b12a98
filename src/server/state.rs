// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::FromRef;
use tokio::sync::Notify;

use crate::catalog::SharedCatalog;
use crate::feed::ChannelMetadata;
use crate::http::HttpClient;
use crate::metadata::MetadataStore;
use crate::watch::UrlQueue;

/// Directories media files are served from and written to
#[derive(Debug, Clone)]
pub struct MediaDirs {
    pub audio: PathBuf,
    pub thumbnails: PathBuf,
}

#[derive(Clone)]
pub struct ServerState {
    pub start_time: Instant,
    pub catalog: SharedCatalog,
    pub store: MetadataStore,
    pub channel: Arc<ChannelMetadata>,
    pub media: Arc<MediaDirs>,
    pub queue: Arc<UrlQueue>,
    /// Wakes the watch loop after URLs were queued through the API
    pub wake: Arc<Notify>,
    pub http: Arc<dyn HttpClient>,
    pub max_upload_bytes: usize,
}

impl ServerState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        catalog: SharedCatalog,
        store: MetadataStore,
        channel: ChannelMetadata,
        media: MediaDirs,
        queue: Arc<UrlQueue>,
        wake: Arc<Notify>,
        http: Arc<dyn HttpClient>,
        max_upload_bytes: usize,
    ) -> Self {
        Self {
            start_time: Instant::now(),
            catalog,
            store,
            channel: Arc::new(channel),
            media: Arc::new(media),
            queue,
            wake,
            http,
            max_upload_bytes,
        }
    }
}

impl FromRef<ServerState> for SharedCatalog {
    fn from_ref(input: &ServerState) -> Self {
        input.catalog.clone()
    }
}

impl FromRef<ServerState> for MetadataStore {
    fn from_ref(input: &ServerState) -> Self {
        input.store.clone()
    }
}

impl FromRef<ServerState> for Arc<ChannelMetadata> {
    fn from_ref(input: &ServerState) -> Self {
        input.channel.clone()
    }
}

impl FromRef<ServerState> for Arc<MediaDirs> {
    fn from_ref(input: &ServerState) -> Self {
        input.media.clone()
    }
}
