// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::{Path, PathBuf};

use futures::StreamExt;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::DownloadError;
use crate::http::HttpClient;

/// Suffix of artwork files that are still being written
const PARTIAL_SUFFIX: &str = "partial";

/// Download artwork from `url` into `output_dir/<stem>.<ext>`
///
/// The extension is chosen from the response content type, with a hint from
/// the URL taking precedence; unknown types are stored as `.jpg`. The body is
/// streamed to a `.partial` file first and renamed once complete, so a crash
/// never leaves a truncated image under the final name.
pub async fn fetch_artwork<C: HttpClient + ?Sized>(
    client: &C,
    url: &str,
    output_dir: &Path,
    stem: &str,
) -> Result<PathBuf, DownloadError> {
    let response = client
        .get_stream(url)
        .await
        .map_err(|e| DownloadError::HttpFailed {
            url: url.to_string(),
            source: e,
        })?;

    if !response.is_success() {
        return Err(DownloadError::HttpStatus {
            url: url.to_string(),
            status: response.status,
        });
    }

    let ext = artwork_extension(url, response.content_type.as_deref());
    let final_path = output_dir.join(format!("{}.{}", stem, ext));
    let partial_path = output_dir.join(format!("{}.{}.{}", stem, ext, PARTIAL_SUFFIX));

    let mut file = File::create(&partial_path)
        .await
        .map_err(|e| DownloadError::FileCreateFailed {
            path: partial_path.clone(),
            source: e,
        })?;

    let mut bytes_written: u64 = 0;
    let mut stream = response.body;

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| DownloadError::StreamFailed {
            url: url.to_string(),
            source: e,
        })?;

        file.write_all(&chunk)
            .await
            .map_err(|e| DownloadError::FileWriteFailed {
                path: partial_path.clone(),
                source: e,
            })?;

        bytes_written += chunk.len() as u64;
    }

    file.flush()
        .await
        .map_err(|e| DownloadError::FileWriteFailed {
            path: partial_path.clone(),
            source: e,
        })?;
    drop(file);

    tokio::fs::rename(&partial_path, &final_path)
        .await
        .map_err(|e| DownloadError::FileWriteFailed {
            path: final_path.clone(),
            source: e,
        })?;

    debug!("Downloaded artwork {} ({} bytes)", final_path.display(), bytes_written);
    Ok(final_path)
}

/// Pick an artwork file extension from the URL and content type
fn artwork_extension(url: &str, content_type: Option<&str>) -> &'static str {
    let url_lower = url.to_lowercase();
    for (hint, ext) in [
        (".png", "png"),
        (".webp", "webp"),
        (".gif", "gif"),
        (".ico", "ico"),
        (".svg", "svg"),
    ] {
        if url_lower.contains(hint) {
            return ext;
        }
    }

    let content_type = content_type.unwrap_or("").to_lowercase();
    if content_type.contains("png") {
        "png"
    } else if content_type.contains("webp") {
        "webp"
    } else if content_type.contains("gif") {
        "gif"
    } else if content_type.contains("svg") {
        "svg"
    } else if content_type.contains("icon") {
        "ico"
    } else {
        "jpg"
    }
}
