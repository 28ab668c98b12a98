// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, Notify, mpsc};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::error::QueueError;
use crate::process::Processor;

/// The watched URL file: one URL per line, `#` starts a comment
///
/// Every read-modify-write goes through one async lock, so the API appending
/// URLs and the watcher removing processed ones never interleave.
#[derive(Debug)]
pub struct UrlQueue {
    path: PathBuf,
    lock: Mutex<()>,
}

impl UrlQueue {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the file (and its parent directory) if missing
    pub async fn ensure_exists(&self) -> Result<(), QueueError> {
        let _guard = self.lock.lock().await;

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.write_error(e))?;
        }

        tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| self.write_error(e))?;
        Ok(())
    }

    /// Pending URLs in file order; a missing file has none
    pub async fn read_urls(&self) -> Result<Vec<String>, QueueError> {
        let _guard = self.lock.lock().await;
        Ok(parse_urls(&self.read_content().await?))
    }

    /// Remove every line equal to `url`; returns whether anything was removed
    pub async fn remove(&self, url: &str) -> Result<bool, QueueError> {
        let _guard = self.lock.lock().await;

        let content = self.read_content().await?;
        let kept: Vec<&str> = content.lines().filter(|line| line.trim() != url).collect();
        if kept.len() == content.lines().count() {
            return Ok(false);
        }

        let mut rewritten = kept.join("\n");
        if !rewritten.is_empty() {
            rewritten.push('\n');
        }
        tokio::fs::write(&self.path, rewritten)
            .await
            .map_err(|e| self.write_error(e))?;

        debug!("Removed URL from {}: {}", self.path.display(), url);
        Ok(true)
    }

    /// Append URLs, one per line
    pub async fn append(&self, urls: &[String]) -> Result<(), QueueError> {
        let _guard = self.lock.lock().await;

        let needs_newline = {
            let content = self.read_content().await?;
            !content.is_empty() && !content.ends_with('\n')
        };

        let mut chunk = String::new();
        if needs_newline {
            chunk.push('\n');
        }
        for url in urls {
            chunk.push_str(url.trim());
            chunk.push('\n');
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| self.write_error(e))?;
        file.write_all(chunk.as_bytes())
            .await
            .map_err(|e| self.write_error(e))?;
        file.flush().await.map_err(|e| self.write_error(e))?;
        Ok(())
    }

    /// Last modification time, `None` when the file does not exist
    pub async fn modified(&self) -> Option<SystemTime> {
        tokio::fs::metadata(&self.path)
            .await
            .and_then(|m| m.modified())
            .ok()
    }

    async fn read_content(&self) -> Result<String, QueueError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(QueueError::ReadFailed {
                path: self.path.clone(),
                source: e,
            }),
        }
    }

    fn write_error(&self, source: std::io::Error) -> QueueError {
        QueueError::WriteFailed {
            path: self.path.clone(),
            source,
        }
    }
}

/// Non-empty, non-comment lines, trimmed
pub fn parse_urls(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(String::from)
        .collect()
}

/// Whether a submitted URL may be queued
pub fn is_queueable_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// Filesystem watch on the URL file, feeding change events into a channel
///
/// The parent directory is watched, since editors often replace the file
/// instead of writing it in place. Dropping the watcher stops the events.
struct FileEvents {
    _watcher: RecommendedWatcher,
    rx: mpsc::UnboundedReceiver<()>,
}

impl FileEvents {
    fn start(path: &Path) -> notify::Result<Self> {
        let target = path.file_name().map(|n| n.to_os_string());
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let (tx, rx) = mpsc::unbounded_channel();
        let mut watcher: RecommendedWatcher = Watcher::new(
            move |res: Result<Event, notify::Error>| {
                if let Ok(event) = res
                    && matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_))
                    && event
                        .paths
                        .iter()
                        .any(|p| p.file_name() == target.as_deref())
                {
                    let _ = tx.send(());
                }
            },
            notify::Config::default(),
        )?;
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        Ok(Self {
            _watcher: watcher,
            rx,
        })
    }

    /// Wait for the next change, collapsing any burst already queued
    async fn changed(&mut self) -> bool {
        if self.rx.recv().await.is_none() {
            return false;
        }
        while self.rx.try_recv().is_ok() {}
        true
    }
}

/// Resolves on the next file event; never resolves once events are unavailable
async fn next_change(events: &mut Option<FileEvents>) {
    let open = match events.as_mut() {
        Some(events) => events.changed().await,
        None => false,
    };
    if !open {
        *events = None;
        std::future::pending::<()>().await;
    }
}

enum Trigger {
    Changed,
    Poll,
    Wake,
}

/// Process the URL file whenever it changes or `wake` fires
///
/// Changes arrive as filesystem events; `poll_interval` is a fallback that
/// compares modification times, for filesystems where events are not
/// delivered. The first pass runs immediately, so pending URLs are handled
/// at startup. Runs until the task is aborted.
pub async fn run_watch_loop(processor: Arc<Processor>, wake: Arc<Notify>, poll_interval: Duration) {
    let queue = processor.queue().clone();

    let mut events = match FileEvents::start(queue.path()) {
        Ok(events) => Some(events),
        Err(e) => {
            warn!(
                "Cannot watch {} ({}), polling every {}s",
                queue.path().display(),
                e,
                poll_interval.as_secs()
            );
            None
        }
    };

    let mut interval = tokio::time::interval(poll_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut last_seen: Option<SystemTime> = None;
    let mut first_pass = true;

    info!("Watching {} for new URLs", queue.path().display());

    loop {
        let trigger = tokio::select! {
            _ = next_change(&mut events) => Trigger::Changed,
            _ = wake.notified() => Trigger::Wake,
            _ = interval.tick() => Trigger::Poll,
        };

        let modified = queue.modified().await;
        let forced = matches!(trigger, Trigger::Wake);
        if !forced && !first_pass && modified == last_seen {
            continue;
        }
        first_pass = false;

        match trigger {
            Trigger::Wake => debug!("URL file processing requested"),
            Trigger::Changed | Trigger::Poll => {
                info!("URL file changed: {}", queue.path().display())
            }
        }

        match processor.process_queue().await {
            Ok(report) if report.is_empty() => debug!("No URLs to process"),
            Ok(report) => info!(
                "Processed {} URL(s): {} succeeded, {} failed",
                report.total(),
                report.succeeded.len(),
                report.failed.len()
            ),
            Err(e) => warn!("Could not process URL file: {}", e),
        }

        // Our own rewrites change the mtime too; only later edits should count
        last_seen = queue.modified().await;
    }
}
