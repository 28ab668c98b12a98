// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::config::Settings;

/// Channel-level data of the feed, fixed for the lifetime of a run
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelMetadata {
    pub title: String,
    pub description: String,
    pub author: String,
    pub language: String,
    pub category: String,
    /// Channel link, the public base URL of the service
    pub link: String,
    pub image_url: Option<String>,
}

impl Default for ChannelMetadata {
    fn default() -> Self {
        Self::from(&Settings::default())
    }
}

impl From<&Settings> for ChannelMetadata {
    fn from(settings: &Settings) -> Self {
        let podcast = &settings.podcast;
        Self {
            title: podcast.title.clone(),
            description: podcast.description.clone(),
            author: podcast.author.clone(),
            language: podcast.language.clone(),
            category: podcast.category.clone(),
            link: settings.server.base_url.trim_end_matches('/').to_string(),
            image_url: podcast.image_url.clone().filter(|u| !u.is_empty()),
        }
    }
}
