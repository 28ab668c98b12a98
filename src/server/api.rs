// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::{Path as FsPath, PathBuf};

use axum::{
    Json,
    body::Bytes,
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use super::state::ServerState;
use crate::catalog::SharedCatalog;
use crate::episode::{
    Episode, fetch_artwork, is_audio_extension, is_image_extension, is_plain_filename,
    sanitize_title, unique_stem, upload_extension,
};
use crate::metadata::{MetadataStore, parse_pub_date};
use crate::watch::is_queueable_url;

#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    error: String,
}

/// An error answered as `{"success": false, "error": ...}`
#[derive(Debug)]
pub(super) struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    fn internal(message: impl Into<String>) -> Self {
        let message = message.into();
        error!("{}", message);
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                success: false,
                error: self.message,
            }),
        )
            .into_response()
    }
}

/// Public view of a catalog entry
#[derive(Debug, Serialize)]
pub(super) struct EpisodeView {
    guid: String,
    title: String,
    description: String,
    audio_file: String,
    audio_url: String,
    pub_date: String,
    duration: u64,
    file_size: u64,
    source_url: String,
    image_url: Option<String>,
}

impl From<&Episode> for EpisodeView {
    fn from(episode: &Episode) -> Self {
        Self {
            guid: episode.guid().to_string(),
            title: episode.title.clone(),
            description: episode.description.clone(),
            audio_file: episode.audio_filename().unwrap_or_default().to_string(),
            audio_url: episode.audio_url.clone(),
            pub_date: episode.pub_date.to_rfc3339(),
            duration: episode.duration,
            file_size: episode.file_size,
            source_url: episode.source_url.clone(),
            image_url: episode.image_url.clone(),
        }
    }
}

#[derive(Serialize)]
struct EpisodeResponse {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    episode: EpisodeView,
}

/// GET /api/episodes
pub(super) async fn list_episodes(State(catalog): State<SharedCatalog>) -> Json<Vec<EpisodeView>> {
    Json(catalog.snapshot().iter().map(EpisodeView::from).collect())
}

#[derive(Default)]
struct UploadForm {
    audio: Option<(String, Bytes)>,
    title: String,
    description: String,
    source_url: String,
    pub_date: String,
    image_url: String,
}

impl UploadForm {
    async fn read(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = UploadForm::default();

        loop {
            let field = match multipart.next_field().await {
                Ok(Some(field)) => field,
                Ok(None) => break,
                Err(e) => return Err(ApiError::new(e.status(), e.body_text())),
            };

            let name = field.name().unwrap_or("").to_string();
            if name == "audio" {
                let filename = field.file_name().unwrap_or("").to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::new(e.status(), e.body_text()))?;
                form.audio = Some((filename, data));
                continue;
            }

            let value = field
                .text()
                .await
                .map_err(|e| ApiError::new(e.status(), e.body_text()))?;
            let value = value.trim().to_string();
            match name.as_str() {
                "title" => form.title = value,
                "description" => form.description = value,
                "source_url" => form.source_url = value,
                "pub_date" => form.pub_date = value,
                "image_url" => form.image_url = value,
                _ => {}
            }
        }

        Ok(form)
    }
}

/// POST /api/episodes: create an episode from an uploaded audio file
pub(super) async fn create_episode(
    State(state): State<ServerState>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    let form = UploadForm::read(multipart).await?;

    let (original_name, data) = form
        .audio
        .ok_or_else(|| ApiError::bad_request("Missing required field: audio"))?;
    if original_name.is_empty() {
        return Err(ApiError::bad_request("No audio file selected"));
    }
    if form.title.is_empty() {
        return Err(ApiError::bad_request("Missing required field: title"));
    }

    let pub_date = if form.pub_date.is_empty() {
        Utc::now()
    } else {
        parse_pub_date(&form.pub_date).ok_or_else(|| {
            ApiError::bad_request(format!("Invalid pub_date format: {}", form.pub_date))
        })?
    };

    if !form.source_url.is_empty()
        && let Some(existing) = find_by_guid(&state.catalog, &form.source_url)
    {
        info!("Episode already exists with GUID: {}", form.source_url);
        return Ok(episode_response(
            StatusCode::CONFLICT,
            Some("Episode already exists"),
            &existing,
        ));
    }

    let media = &state.media;
    for dir in [&media.audio, &media.thumbnails] {
        tokio::fs::create_dir_all(dir).await.map_err(|e| {
            ApiError::internal(format!("Cannot create directory {}: {}", dir.display(), e))
        })?;
    }

    let mut stem = sanitize_title(&form.title);
    if stem.is_empty() {
        stem = "untitled".to_string();
    }
    let store = &state.store;
    let stem = unique_stem(&media.audio, &stem, |candidate| store.has_record(candidate));
    let audio_path = media
        .audio
        .join(format!("{}.{}", stem, upload_extension(&original_name)));
    tokio::fs::write(&audio_path, &data).await.map_err(|e| {
        ApiError::internal(format!("Failed to save {}: {}", audio_path.display(), e))
    })?;
    info!("Saved audio file: {}", audio_path.display());

    let audio_url = state.store.media_url("audio", &audio_path);
    let mut episode = Episode::new(
        &form.title,
        &audio_path,
        audio_url,
        pub_date,
        &form.source_url,
    )
    .with_description(&form.description)
    .with_file_size(data.len() as u64);

    if !form.image_url.is_empty() {
        let file_stem = audio_stem(&audio_path);
        match fetch_artwork(state.http.as_ref(), &form.image_url, &media.thumbnails, &file_stem).await
        {
            Ok(image_file) => {
                let image_url = state.store.media_url("thumbnails", &image_file);
                info!("Downloaded thumbnail: {}", image_file.display());
                episode = episode.with_image(image_file, image_url);
            }
            Err(e) => warn!("Failed to download image for '{}': {}", form.title, e),
        }
    }

    if let Err(e) = state.store.save(&episode) {
        discard_files(&episode).await;
        return Err(ApiError::internal(format!("Failed to save metadata: {}", e)));
    }

    if !state.catalog.add(episode.clone()) {
        // Lost a race against an identical upload
        discard_files(&episode).await;
        if let Err(e) = state.store.delete(&episode.audio_file) {
            warn!("Failed to remove duplicate record: {}", e);
        }
        return Ok(episode_response(
            StatusCode::CONFLICT,
            Some("Episode already exists"),
            &episode,
        ));
    }

    info!("Created episode via API: {}", form.title);
    Ok(episode_response(StatusCode::CREATED, None, &episode))
}

fn find_by_guid(catalog: &SharedCatalog, guid: &str) -> Option<Episode> {
    if !catalog.contains(guid) {
        return None;
    }
    catalog.snapshot().into_iter().find(|e| e.guid() == guid)
}

fn episode_response(status: StatusCode, message: Option<&str>, episode: &Episode) -> Response {
    (
        status,
        Json(EpisodeResponse {
            success: true,
            message: message.map(String::from),
            episode: EpisodeView::from(episode),
        }),
    )
        .into_response()
}

fn audio_stem(path: &FsPath) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

async fn discard_files(episode: &Episode) {
    let files = std::iter::once(&episode.audio_file).chain(episode.image_file.as_ref());
    for file in files {
        if let Err(e) = tokio::fs::remove_file(file).await {
            warn!("Failed to remove {}: {}", file.display(), e);
        }
    }
}

#[derive(Serialize)]
pub(super) struct DeleteResponse {
    success: bool,
    deleted: usize,
}

/// DELETE /api/episodes/{file}: remove audio, record and artwork of one episode
pub(super) async fn delete_episode(
    State(state): State<ServerState>,
    Path(file): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    if !is_plain_filename(&file) {
        return Err(ApiError::bad_request("Invalid filename"));
    }

    let known = state
        .catalog
        .snapshot()
        .into_iter()
        .find(|e| e.matches_file_key(&file));
    let audio_path = known
        .as_ref()
        .map(|e| e.audio_file.clone())
        .unwrap_or_else(|| state.media.audio.join(&file));

    let mut found = false;
    if audio_path.is_file() {
        tokio::fs::remove_file(&audio_path).await.map_err(|e| {
            ApiError::internal(format!("Failed to delete {}: {}", audio_path.display(), e))
        })?;
        info!("Deleted audio file: {}", audio_path.display());
        found = true;
    }

    found |= state
        .store
        .delete(&audio_path)
        .map_err(|e| ApiError::internal(e.to_string()))?;

    let mut thumbnails: Vec<PathBuf> = known
        .as_ref()
        .and_then(|e| e.image_file.clone())
        .into_iter()
        .collect();
    let stem = audio_stem(&audio_path);
    thumbnails.extend(
        ["jpg", "jpeg", "png", "webp", "gif"]
            .iter()
            .map(|ext| state.media.thumbnails.join(format!("{}.{}", stem, ext))),
    );
    for thumbnail in thumbnails {
        if thumbnail.is_file() && tokio::fs::remove_file(&thumbnail).await.is_ok() {
            info!("Deleted thumbnail file: {}", thumbnail.display());
        }
    }

    found |= state.catalog.remove(&file).is_some();
    if !found {
        return Err(ApiError::new(StatusCode::NOT_FOUND, "Episode not found"));
    }

    Ok(Json(DeleteResponse {
        success: true,
        deleted: 1,
    }))
}

/// DELETE /api/episodes: remove every episode and its files
pub(super) async fn delete_all_episodes(
    State(state): State<ServerState>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let deleted = remove_files(&state.media.audio, is_audio_extension)
        .await
        .map_err(ApiError::internal)?;
    state
        .store
        .delete_all()
        .map_err(|e| ApiError::internal(e.to_string()))?;
    remove_files(&state.media.thumbnails, is_image_extension)
        .await
        .map_err(ApiError::internal)?;
    state.catalog.clear();

    info!("Deleted all episodes (total: {})", deleted);
    Ok(Json(DeleteResponse {
        success: true,
        deleted,
    }))
}

/// Delete the files in `dir` whose extension `matches`; a missing dir has none
async fn remove_files(dir: &FsPath, matches: fn(&str) -> bool) -> Result<usize, String> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(format!("Failed to read {}: {}", dir.display(), e)),
    };

    let mut removed = 0;
    while let Ok(Some(entry)) = entries.next_entry().await {
        let path = entry.path();
        let wanted = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(matches);
        if wanted && path.is_file() {
            tokio::fs::remove_file(&path)
                .await
                .map_err(|e| format!("Failed to delete {}: {}", path.display(), e))?;
            removed += 1;
        }
    }
    Ok(removed)
}

#[derive(Deserialize)]
struct UrlsRequest {
    url: Option<String>,
    urls: Option<Vec<serde_json::Value>>,
}

#[derive(Serialize)]
pub(super) struct UrlsResponse {
    success: bool,
    message: String,
    urls: Vec<String>,
    count: usize,
}

/// POST /api/urls: queue source URLs for the watcher
pub(super) async fn add_urls(
    State(state): State<ServerState>,
    body: Bytes,
) -> Result<Json<UrlsResponse>, ApiError> {
    let request: UrlsRequest = serde_json::from_slice(&body)
        .map_err(|_| ApiError::bad_request("Request body must be JSON"))?;

    let urls: Vec<String> = match (request.urls, request.url) {
        (Some(list), _) => list
            .iter()
            .filter_map(|v| v.as_str())
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .map(String::from)
            .collect(),
        (None, Some(url)) if !url.trim().is_empty() => vec![url.trim().to_string()],
        _ => Vec::new(),
    };

    if urls.is_empty() {
        return Err(ApiError::bad_request("Missing required field: url or urls"));
    }

    let invalid: Vec<&str> = urls
        .iter()
        .filter(|u| !is_queueable_url(u))
        .map(String::as_str)
        .collect();
    if !invalid.is_empty() {
        return Err(ApiError::bad_request(format!(
            "Invalid URL(s) (must start with http:// or https://): {}",
            invalid.join(", ")
        )));
    }

    state
        .queue
        .append(&urls)
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?;
    state.wake.notify_one();

    info!("Added {} URL(s) via API", urls.len());
    Ok(Json(UrlsResponse {
        success: true,
        message: format!("Added {} URL(s) for processing", urls.len()),
        count: urls.len(),
        urls,
    }))
}

#[derive(Serialize)]
pub(super) struct ReloadResponse {
    success: bool,
    episodes: usize,
}

/// POST /api/reload: resynchronize the catalog with the metadata directory
pub(super) async fn reload(
    State(catalog): State<SharedCatalog>,
    State(store): State<MetadataStore>,
) -> Result<Json<ReloadResponse>, ApiError> {
    let episodes = tokio::task::spawn_blocking(move || catalog.reload(&store))
        .await
        .map_err(|e| ApiError::internal(format!("Reload failed: {}", e)))?;

    info!("Reloaded catalog: {} episode(s)", episodes);
    Ok(Json(ReloadResponse {
        success: true,
        episodes,
    }))
}
