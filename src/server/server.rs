// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, State},
    http::header,
    response::IntoResponse,
    routing::{delete, get, post},
};
use serde::Serialize;

use super::api::{
    add_urls, create_episode, delete_all_episodes, delete_episode, list_episodes, reload,
};
use super::media::{serve_audio, serve_thumbnail};
use super::state::ServerState;
use crate::catalog::SharedCatalog;
use crate::feed::ChannelMetadata;

#[derive(Serialize)]
struct ServerStats {
    pub name: &'static str,
    pub version: &'static str,
    pub title: String,
    pub uptime: String,
    pub episodes: usize,
    pub feed_url: String,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

async fn home(State(state): State<ServerState>) -> Json<ServerStats> {
    Json(ServerStats {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        title: state.channel.title.clone(),
        uptime: format_uptime(state.start_time.elapsed()),
        episodes: state.catalog.len(),
        feed_url: format!("{}/feed.xml", state.channel.link),
    })
}

/// Always answers 200 with a well-formed document, possibly without items
async fn feed(
    State(catalog): State<SharedCatalog>,
    State(channel): State<Arc<ChannelMetadata>>,
) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/xml; charset=utf-8")],
        catalog.render(&channel),
    )
}

pub fn make_app(state: ServerState) -> Router {
    let body_limit = state.max_upload_bytes;

    Router::new()
        .route("/", get(home))
        .route("/feed.xml", get(feed))
        .route("/audio/{file}", get(serve_audio))
        .route("/thumbnails/{file}", get(serve_thumbnail))
        .route(
            "/api/episodes",
            get(list_episodes)
                .post(create_episode)
                .delete(delete_all_episodes),
        )
        .route("/api/episodes/{file}", delete(delete_episode))
        .route("/api/urls", post(add_urls))
        .route("/api/reload", post(reload))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
