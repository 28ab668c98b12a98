// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use chrono::{DateTime, Utc};
use rss::extension::itunes::{
    ITunesCategoryBuilder, ITunesChannelExtensionBuilder, ITunesItemExtensionBuilder,
};
use rss::{ChannelBuilder, EnclosureBuilder, GuidBuilder, ImageBuilder, Item, ItemBuilder};
use tracing::error;

use super::ChannelMetadata;
use crate::episode::Episode;
use crate::error::FeedError;

const ENCLOSURE_MIME_TYPE: &str = "audio/mpeg";

/// Render the catalog as an RSS 2.0 document with iTunes extensions
///
/// Items appear in the order given. The output is always well-formed XML:
/// characters XML 1.0 cannot carry are dropped and reserved characters are
/// escaped by the writer. Should writing fail anyway, an empty channel is
/// returned instead.
pub fn render(channel: &ChannelMetadata, episodes: &[Episode]) -> String {
    match try_render(channel, episodes) {
        Ok(xml) => xml,
        Err(e) => {
            error!("Failed to render feed, serving empty channel: {}", e);
            fallback_document(channel)
        }
    }
}

/// Render the feed, surfacing writer errors
pub fn try_render(channel: &ChannelMetadata, episodes: &[Episode]) -> Result<String, FeedError> {
    let image_url = channel.image_url.as_deref().map(xml_safe);

    let mut itunes = ITunesChannelExtensionBuilder::default();
    itunes
        .author(Some(xml_safe(&channel.author)))
        .summary(Some(xml_safe(&channel.description)))
        .explicit(Some("no".to_string()))
        .categories(vec![
            ITunesCategoryBuilder::default()
                .text(xml_safe(&channel.category))
                .build(),
        ])
        .image(image_url.clone());

    let mut builder = ChannelBuilder::default();
    builder
        .title(xml_safe(&channel.title))
        .link(xml_safe(&channel.link))
        .description(xml_safe(&channel.description))
        .language(Some(xml_safe(&channel.language)))
        .itunes_ext(Some(itunes.build()))
        .items(episodes.iter().map(render_item).collect::<Vec<_>>());

    if let Some(url) = image_url {
        builder.image(Some(
            ImageBuilder::default()
                .url(url)
                .title(xml_safe(&channel.title))
                .link(xml_safe(&channel.link))
                .build(),
        ));
    }

    let bytes = builder.build().write_to(Vec::new())?;
    Ok(String::from_utf8(bytes)?)
}

fn render_item(episode: &Episode) -> Item {
    let description = xml_safe(&episode.description);

    let mut itunes = ITunesItemExtensionBuilder::default();
    itunes.summary(Some(description.clone()));
    if episode.duration > 0 {
        itunes.duration(Some(format_duration(episode.duration)));
    }
    if let Some(image_url) = &episode.image_url {
        itunes.image(Some(xml_safe(image_url)));
    }

    let mut item = ItemBuilder::default();
    item.title(Some(xml_safe(&episode.title)))
        .description(Some(description))
        .enclosure(Some(
            EnclosureBuilder::default()
                .url(xml_safe(&episode.audio_url))
                .length(episode.file_size.to_string())
                .mime_type(ENCLOSURE_MIME_TYPE.to_string())
                .build(),
        ))
        .pub_date(Some(format_pub_date(&episode.pub_date)))
        .guid(Some(
            GuidBuilder::default()
                .value(xml_safe(episode.guid()))
                .permalink(false)
                .build(),
        ))
        .itunes_ext(Some(itunes.build()));

    if !episode.source_url.is_empty() {
        item.link(Some(xml_safe(&episode.source_url)));
    }

    item.build()
}

/// RFC 822 date in UTC, e.g. `Wed, 02 Oct 2024 15:04:05 +0000`
pub fn format_pub_date(date: &DateTime<Utc>) -> String {
    date.format("%a, %d %b %Y %H:%M:%S +0000").to_string()
}

/// `HH:MM:SS` for iTunes duration
pub fn format_duration(seconds: u64) -> String {
    format!(
        "{:02}:{:02}:{:02}",
        seconds / 3600,
        (seconds % 3600) / 60,
        seconds % 60
    )
}

/// Drop characters that are not allowed anywhere in an XML 1.0 document
fn xml_safe(text: &str) -> String {
    text.chars().filter(|c| is_xml_char(*c)).collect()
}

fn is_xml_char(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\r') || (c >= ' ' && c != '\u{FFFE}' && c != '\u{FFFF}')
}

fn fallback_document(channel: &ChannelMetadata) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n\
         <rss version=\"2.0\"><channel><title>{}</title><link>{}</link>\
         <description>{}</description></channel></rss>",
        html_escape::encode_text(&xml_safe(&channel.title)),
        html_escape::encode_text(&xml_safe(&channel.link)),
        html_escape::encode_text(&xml_safe(&channel.description)),
    )
}
