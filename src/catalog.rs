// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info};

use crate::episode::Episode;
use crate::feed::{ChannelMetadata, render};
use crate::metadata::MetadataStore;

/// In-memory set of published episodes, newest first
///
/// No two entries share a GUID. Every mutation leaves the entries sorted by
/// `pub_date` descending; the sort is stable, so episodes with equal dates
/// keep the order in which they were added.
#[derive(Debug, Default)]
pub struct Catalog {
    episodes: Vec<Episode>,
    guids: HashSet<String>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an episode; returns `false` if its GUID is already present
    pub fn add(&mut self, episode: Episode) -> bool {
        if self.guids.contains(episode.guid()) {
            debug!("Episode already in catalog: {}", episode.guid());
            return false;
        }

        self.guids.insert(episode.guid().to_string());
        self.episodes.push(episode);
        self.episodes.sort_by(|a, b| b.pub_date.cmp(&a.pub_date));
        true
    }

    /// Remove the episode whose audio file name (or stem) equals `key`
    pub fn remove(&mut self, key: &str) -> Option<Episode> {
        let index = self.episodes.iter().position(|e| e.matches_file_key(key))?;
        let episode = self.episodes.remove(index);
        self.guids.remove(episode.guid());
        Some(episode)
    }

    pub fn clear(&mut self) {
        self.episodes.clear();
        self.guids.clear();
    }

    pub fn all(&self) -> &[Episode] {
        &self.episodes
    }

    pub fn len(&self) -> usize {
        self.episodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.episodes.is_empty()
    }

    pub fn contains(&self, guid: &str) -> bool {
        self.guids.contains(guid)
    }

    /// Replace the contents with `episodes`, applying the usual add rules
    pub fn replace(&mut self, episodes: Vec<Episode>) -> usize {
        self.clear();
        for episode in episodes {
            self.add(episode);
        }
        self.len()
    }

    /// Replace the contents with everything persisted in `store`
    pub fn reload(&mut self, store: &MetadataStore) -> usize {
        self.replace(store.load_all())
    }
}

/// Cloneable handle to the one catalog shared by the HTTP layer and the watcher
///
/// Every operation takes the lock for its own duration only. Callers never
/// hold it across downloads or other I/O that can block.
#[derive(Debug, Clone, Default)]
pub struct SharedCatalog {
    inner: Arc<Mutex<Catalog>>,
}

impl SharedCatalog {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            inner: Arc::new(Mutex::new(catalog)),
        }
    }

    /// Build a catalog hydrated from every record in `store`
    pub fn hydrate(store: &MetadataStore) -> Self {
        let mut catalog = Catalog::new();
        let count = catalog.reload(store);
        info!("Catalog hydrated with {} episode(s)", count);
        Self::new(catalog)
    }

    // A panic while holding the lock cannot leave the catalog half-sorted:
    // every mutation completes before it returns.
    fn lock(&self) -> MutexGuard<'_, Catalog> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add(&self, episode: Episode) -> bool {
        self.lock().add(episode)
    }

    pub fn remove(&self, key: &str) -> Option<Episode> {
        self.lock().remove(key)
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Resynchronize with `store`; records are read before the lock is taken
    pub fn reload(&self, store: &MetadataStore) -> usize {
        let episodes = store.load_all();
        self.lock().replace(episodes)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn contains(&self, guid: &str) -> bool {
        self.lock().contains(guid)
    }

    /// Copy of the current entries in catalog order
    pub fn snapshot(&self) -> Vec<Episode> {
        self.lock().all().to_vec()
    }

    /// Render the feed while holding the lock, so no add can interleave
    pub fn render(&self, channel: &ChannelMetadata) -> String {
        let catalog = self.lock();
        render(channel, catalog.all())
    }
}
