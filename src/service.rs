// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::Notify;
use tracing::{info, warn};

use crate::catalog::SharedCatalog;
use crate::config::Settings;
use crate::downloader::YtDlpDownloader;
use crate::error::ServiceError;
use crate::feed::ChannelMetadata;
use crate::http::{HttpClient, ReqwestClient};
use crate::metadata::MetadataStore;
use crate::process::Processor;
use crate::server::{MediaDirs, ServerState, make_app};
use crate::watch::{UrlQueue, run_watch_loop};

fn create_dir(path: &Path) -> Result<(), ServiceError> {
    std::fs::create_dir_all(path).map_err(|e| ServiceError::CreateDirectoryFailed {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Run the service until Ctrl-C
///
/// Startup order: directories, catalog hydration, URL watcher, HTTP listener.
/// Downloads in flight when the signal arrives are abandoned; their URLs
/// remain queued and are retried on the next start.
pub async fn run(settings: Settings) -> Result<(), ServiceError> {
    settings.validate()?;

    let media = MediaDirs {
        audio: settings.storage.audio_dir(),
        thumbnails: settings.storage.thumbnails_dir(),
    };
    let metadata_dir = settings.storage.metadata_dir();
    for dir in [&settings.storage.data_dir, &media.audio, &media.thumbnails, &metadata_dir] {
        create_dir(dir)?;
    }

    let store = MetadataStore::new(&metadata_dir, &settings.server.base_url);
    let catalog = SharedCatalog::hydrate(&store);

    let queue = Arc::new(UrlQueue::new(&settings.watch.file));
    let wake = Arc::new(Notify::new());
    let http: Arc<dyn HttpClient> = Arc::new(ReqwestClient::new());

    let watcher = if settings.watch.enabled {
        queue.ensure_exists().await?;

        let downloader = YtDlpDownloader::new(
            settings.downloader.clone(),
            &media.audio,
            &media.thumbnails,
            store.clone(),
            http.clone(),
        );
        let processor = Arc::new(Processor::new(
            Arc::new(downloader),
            catalog.clone(),
            queue.clone(),
            settings.watch.max_concurrent,
        ));
        let poll_interval = Duration::from_secs(settings.watch.poll_interval_secs);
        Some(tokio::spawn(run_watch_loop(processor, wake.clone(), poll_interval)))
    } else {
        info!("URL watching disabled");
        None
    };

    let state = ServerState::new(
        catalog,
        store,
        ChannelMetadata::from(&settings),
        media,
        queue,
        wake,
        http,
        settings.server.max_upload_mb * 1024 * 1024,
    );
    let app = make_app(state);

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| ServiceError::BindFailed {
            addr: addr.clone(),
            source: e,
        })?;

    info!("Listening on {}", addr);
    info!("Feed available at {}/feed.xml", settings.server.base_url);

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    if let Some(watcher) = watcher {
        watcher.abort();
    }
    info!("Service stopped");

    served.map_err(ServiceError::ServeFailed)
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown requested"),
        Err(e) => warn!("Cannot listen for shutdown signal: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn invalid_settings_are_rejected_before_startup() {
        let root = tempdir().unwrap();
        let mut settings = Settings::default();
        settings.storage.data_dir = root.path().join("data");
        settings.server.base_url = "localhost:8083".to_string();

        let result = run(settings).await;

        assert!(matches!(result, Err(ServiceError::Config(_))));
        assert!(!root.path().join("data").exists());
    }

    #[tokio::test]
    async fn bind_failure_is_reported() {
        let root = tempdir().unwrap();
        let occupied = std::net::TcpListener::bind("127.0.0.1:0").unwrap();

        let mut settings = Settings::default();
        settings.storage.data_dir = root.path().join("data");
        settings.watch.enabled = false;
        settings.server.host = "127.0.0.1".to_string();
        settings.server.port = occupied.local_addr().unwrap().port();

        let result = run(settings).await;

        assert!(matches!(result, Err(ServiceError::BindFailed { .. })));
        assert!(root.path().join("data/audio").is_dir());
        assert!(root.path().join("data/metadata").is_dir());
    }
}
