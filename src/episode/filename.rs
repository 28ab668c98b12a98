// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::collections::HashSet;
use std::path::Path;

/// Maximum length (in characters) of a stored file stem
const MAX_STEM_LENGTH: usize = 200;

/// Extension used when an upload carries none
const DEFAULT_AUDIO_EXTENSION: &str = "mp3";

/// Characters that are never allowed in a stored file name
fn is_forbidden_filename_char(c: char) -> bool {
    matches!(c, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*') || c.is_control()
}

/// Turn an episode title into a filesystem-safe file stem
///
/// Forbidden characters are dropped, runs of whitespace become a single
/// space, and the result is trimmed and capped at 200 characters. Returns an
/// empty string when nothing usable is left.
pub fn sanitize_title(title: &str) -> String {
    let kept: String = title
        .chars()
        .filter(|c| !is_forbidden_filename_char(*c) || c.is_whitespace())
        .collect();

    let collapsed = collapse_whitespace(&kept);
    truncate_at_boundary(collapsed.trim(), MAX_STEM_LENGTH)
}

/// Lower-cased extension of a client-supplied file name, without the dot
///
/// The name is passed through `sanitize_filename` first so that path
/// components smuggled into it never reach the storage layer.
pub fn upload_extension(original_filename: &str) -> String {
    let cleaned = sanitize_filename::sanitize(original_filename);
    Path::new(&cleaned)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty())
        .map(|e| e.to_lowercase())
        .unwrap_or_else(|| DEFAULT_AUDIO_EXTENSION.to_string())
}

/// Pick `stem`, or `stem_1`, `stem_2`, … so that no file in `dir` uses the stem
///
/// A stem is taken when any file in `dir` is named `<stem>` or `<stem>.<anything>`,
/// whatever its extension, or when `reserved` claims it. Records and artwork
/// are keyed by stem, so two extensions must never share one.
pub fn unique_stem(dir: &Path, stem: &str, reserved: impl Fn(&str) -> bool) -> String {
    let names: HashSet<String> = std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|entry| entry.ok())
                .filter_map(|entry| entry.file_name().into_string().ok())
                .collect()
        })
        .unwrap_or_default();

    let taken = |candidate: &str| {
        reserved(candidate)
            || names.iter().any(|name| {
                name.strip_prefix(candidate)
                    .is_some_and(|rest| rest.is_empty() || rest.starts_with('.'))
            })
    };

    let mut candidate = stem.to_string();
    let mut counter = 1;
    while taken(&candidate) {
        candidate = format!("{}_{}", stem, counter);
        counter += 1;
    }
    candidate
}

/// Whether a request path segment is a bare file name (no traversal)
pub fn is_plain_filename(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\'])
        && Path::new(name).file_name().and_then(|n| n.to_str()) == Some(name)
}

/// Check if an extension belongs to an audio format the service stores
pub fn is_audio_extension(ext: &str) -> bool {
    matches!(
        ext.to_lowercase().as_str(),
        "mp3" | "m4a" | "wav" | "opus" | "aac" | "ogg" | "flac" | "wma" | "aiff" | "webm"
    )
}

/// Check if an extension belongs to a stored artwork format
pub fn is_image_extension(ext: &str) -> bool {
    matches!(
        ext.to_lowercase().as_str(),
        "jpg" | "jpeg" | "png" | "webp" | "gif" | "svg" | "ico"
    )
}

/// Collapse runs of whitespace into single spaces
fn collapse_whitespace(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut last_was_space = false;

    for c in s.chars() {
        if c.is_whitespace() {
            if !last_was_space {
                result.push(' ');
                last_was_space = true;
            }
        } else {
            result.push(c);
            last_was_space = false;
        }
    }

    result
}

/// Truncate to `max_chars` characters, preferring a word boundary
fn truncate_at_boundary(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }

    let truncated: String = s.chars().take(max_chars).collect();
    if let Some(pos) = truncated.rfind(' ')
        && pos > truncated.len() / 2
    {
        return truncated[..pos].trim_end().to_string();
    }

    truncated.trim_end().to_string()
}
