// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::collections::HashSet;
use std::sync::Arc;

use futures::StreamExt;
use tracing::{error, info, warn};

use crate::catalog::SharedCatalog;
use crate::downloader::Downloader;
use crate::error::QueueError;
use crate::watch::UrlQueue;

/// Outcome of one processing pass over a batch of URLs
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    /// URLs that produced an episode (new or already known)
    pub succeeded: Vec<String>,
    /// URLs that failed, with the reason; they stay queued
    pub failed: Vec<(String, String)>,
    /// Number of episodes that were new to the catalog
    pub added: usize,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

enum UrlOutcome {
    Succeeded { url: String, added: bool },
    Failed { url: String, reason: String },
}

/// Runs queued URLs through the downloader into the catalog
///
/// Downloads happen without holding the catalog lock; only the final add
/// touches shared state. A URL is removed from the queue only after its
/// episode was admitted, so failures are retried on the next pass.
pub struct Processor {
    downloader: Arc<dyn Downloader>,
    catalog: SharedCatalog,
    queue: Arc<UrlQueue>,
    max_concurrent: usize,
}

impl Processor {
    pub fn new(
        downloader: Arc<dyn Downloader>,
        catalog: SharedCatalog,
        queue: Arc<UrlQueue>,
        max_concurrent: usize,
    ) -> Self {
        Self {
            downloader,
            catalog,
            queue,
            max_concurrent: max_concurrent.max(1),
        }
    }

    pub fn queue(&self) -> &Arc<UrlQueue> {
        &self.queue
    }

    /// Read the queue and process every pending URL
    pub async fn process_queue(&self) -> Result<BatchReport, QueueError> {
        let urls = self.queue.read_urls().await?;
        if urls.is_empty() {
            return Ok(BatchReport::default());
        }

        info!("Found {} URL(s) to process", urls.len());
        Ok(self.process_urls(urls).await)
    }

    /// Process a batch; one URL failing never stops the others
    pub async fn process_urls(&self, urls: Vec<String>) -> BatchReport {
        let mut seen = HashSet::new();
        let unique: Vec<String> = urls.into_iter().filter(|u| seen.insert(u.clone())).collect();

        let outcomes: Vec<UrlOutcome> = futures::stream::iter(unique)
            .map(|url| self.process_one(url))
            .buffer_unordered(self.max_concurrent)
            .collect()
            .await;

        let mut report = BatchReport::default();
        for outcome in outcomes {
            match outcome {
                UrlOutcome::Succeeded { url, added } => {
                    if added {
                        report.added += 1;
                    }
                    report.succeeded.push(url);
                }
                UrlOutcome::Failed { url, reason } => report.failed.push((url, reason)),
            }
        }
        report
    }

    async fn process_one(&self, url: String) -> UrlOutcome {
        info!("Processing URL: {}", url);

        let episode = match self.downloader.download(&url).await {
            Ok(episode) => episode,
            Err(e) => {
                error!("Failed to process {}: {}", url, e);
                return UrlOutcome::Failed {
                    url,
                    reason: e.to_string(),
                };
            }
        };

        let title = episode.title.clone();
        let added = self.catalog.add(episode);
        if added {
            info!("Added episode: {}", title);
        } else {
            info!("Episode already in feed: {}", title);
        }

        match self.queue.remove(&url).await {
            Ok(_) => info!("Removed processed URL from file: {}", url),
            Err(e) => warn!("Could not remove processed URL {}: {}", url, e),
        }

        UrlOutcome::Succeeded { url, added }
    }
}
