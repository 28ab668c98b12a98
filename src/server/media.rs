// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::{Path, Request, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tower::ServiceExt;
use tower_http::services::ServeFile;
use tracing::warn;

use super::state::MediaDirs;
use crate::episode::is_plain_filename;

/// Serve a stored audio file, with range support
///
/// A well-formed name that is not on disk answers 410 Gone: it was published
/// once and podcast clients should stop asking for it.
pub(super) async fn serve_audio(
    State(media): State<Arc<MediaDirs>>,
    Path(file): Path<String>,
    request: Request,
) -> Response {
    if !is_plain_filename(&file) {
        return (StatusCode::NOT_FOUND, "File not found").into_response();
    }
    if !media.audio.is_dir() {
        return (StatusCode::NOT_FOUND, "Audio directory not found").into_response();
    }

    let path = media.audio.join(&file);
    if !path.is_file() {
        warn!(
            "Audio file not found (may have been deleted or cached in client): {}",
            file
        );
        return (StatusCode::GONE, "Episode no longer available").into_response();
    }

    serve_file(path, request).await
}

pub(super) async fn serve_thumbnail(
    State(media): State<Arc<MediaDirs>>,
    Path(file): Path<String>,
    request: Request,
) -> Response {
    if !is_plain_filename(&file) || !media.thumbnails.is_dir() {
        return (StatusCode::NOT_FOUND, "Thumbnail not found").into_response();
    }

    let path = media.thumbnails.join(&file);
    if !path.is_file() {
        warn!("Thumbnail not found: {}", file);
        return (StatusCode::NOT_FOUND, "Thumbnail not found").into_response();
    }

    serve_file(path, request).await
}

async fn serve_file(path: PathBuf, request: Request) -> Response {
    match ServeFile::new(path).oneshot(request).await {
        Ok(response) => response.into_response(),
        Err(never) => match never {},
    }
}
