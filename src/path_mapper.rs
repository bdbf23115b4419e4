//! Maps remote asset URLs onto the fixed layout of the site tree.
//!
//! Every function here is pure: the same URL always yields the same path, so
//! references discovered independently in HTML and CSS converge on one file.
//! Two different URLs whose sanitized names collide within a directory share
//! that file and the last download wins.

use std::path::{Component, Path, PathBuf};

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use url::{Position, Url};

use crate::extractor::AssetCategory;

pub const MAX_FILENAME_CHARS: usize = 200;
pub const FALLBACK_FILENAME: &str = "unnamed_file";
pub const DEFAULT_DOCUMENT: &str = "index.html";

/// Characters escaped when a local path is written back into a document.
const LINK_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`');

/// Relative path (forward slashes, from the site root) where `url` is stored.
///
/// `content_type` only matters when the URL's filename carries no extension.
pub fn map_to_local_path(url: &Url, content_type: Option<&str>) -> String {
    let raw_name = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or("");
    let decoded = percent_decode_str(raw_name).decode_utf8_lossy();
    let category = AssetCategory::from_path(&decoded);

    let basename = if decoded.is_empty() {
        DEFAULT_DOCUMENT
    } else {
        decoded.as_ref()
    };
    let mut filename = sanitize_filename(basename);

    if extension_of(&filename).is_none() {
        if let Some(extension) = content_type.and_then(extension_for_content_type) {
            filename = truncate_preserving_extension(&format!("{}.{}", filename, extension), MAX_FILENAME_CHARS);
        }
    }

    format!("{}/{}", category.subdirectory(), filename)
}

/// Makes `name` safe to use as a single file name on any common filesystem.
pub fn sanitize_filename(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    let trimmed = replaced.trim_matches(|c| c == '.' || c == ' ');
    let truncated = truncate_preserving_extension(trimmed, MAX_FILENAME_CHARS);

    if truncated.is_empty() {
        FALLBACK_FILENAME.to_string()
    } else {
        truncated
    }
}

/// Directory name for a cloned site, derived from its host and port.
pub fn site_directory_name(url: &Url) -> String {
    sanitize_filename(&url[Position::BeforeHost..Position::AfterPort])
}

/// Link from the document stored at `from_document` to the file at `target`,
/// both relative to the site root. Always uses forward slashes.
pub fn relative_link(from_document: &str, target: &str) -> String {
    let from_dir = Path::new(from_document)
        .parent()
        .unwrap_or_else(|| Path::new(""));
    let relative = pathdiff::diff_paths(Path::new(target), from_dir)
        .unwrap_or_else(|| PathBuf::from(target));

    relative
        .components()
        .filter_map(|component| match component {
            Component::ParentDir => Some("..".to_string()),
            Component::Normal(segment) => Some(
                utf8_percent_encode(&segment.to_string_lossy(), LINK_SEGMENT).to_string(),
            ),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) if idx > 0 => name.split_at(idx),
        _ => (name, ""),
    }
}

fn extension_of(name: &str) -> Option<&str> {
    let (_, extension) = split_extension(name);
    (extension.len() > 1).then(|| &extension[1..])
}

fn truncate_preserving_extension(name: &str, max_chars: usize) -> String {
    if name.chars().count() <= max_chars {
        return name.to_string();
    }

    let (stem, extension) = split_extension(name);
    let extension_chars = extension.chars().count();
    if extension_chars >= max_chars {
        return name.chars().take(max_chars).collect();
    }

    let stem: String = stem.chars().take(max_chars - extension_chars).collect();
    format!("{}{}", stem, extension)
}

/// File extension (without the dot) suggested by a `Content-Type` header.
pub fn extension_for_content_type(content_type: &str) -> Option<String> {
    let mime: mime::Mime = content_type.trim().parse().ok()?;
    let essence = mime.essence_str().to_ascii_lowercase();

    let known = match essence.as_str() {
        "text/css" => Some("css"),
        "text/html" => Some("html"),
        "image/jpeg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        "image/svg+xml" => Some("svg"),
        "image/webp" => Some("webp"),
        "image/x-icon" | "image/vnd.microsoft.icon" => Some("ico"),
        "font/woff2" => Some("woff2"),
        "font/ttf" => Some("ttf"),
        "font/otf" => Some("otf"),
        "text/plain" => Some("txt"),
        "text/xml" | "application/xml" => Some("xml"),
        "application/json" | "application/manifest+json" => Some("json"),
        "application/pdf" => Some("pdf"),
        "application/wasm" => Some("wasm"),
        "application/octet-stream" => Some("bin"),
        "image/avif" => Some("avif"),
        "image/bmp" => Some("bmp"),
        "video/mp4" => Some("mp4"),
        "video/webm" => Some("webm"),
        "audio/mpeg" => Some("mp3"),
        other if other.contains("javascript") => Some("js"),
        other if other.contains("font") => Some("woff"),
        _ => None,
    };

    known.map(str::to_string).or_else(|| canonical_extension(&essence))
}

/// The extension `mime_guess` lists for `essence` that maps back to the same
/// type; the list itself is alphabetical, so its first entry is often wrong.
fn canonical_extension(essence: &str) -> Option<String> {
    let extensions = mime_guess::get_mime_extensions_str(essence)?;
    extensions
        .iter()
        .find(|extension| {
            mime_guess::from_ext(extension)
                .first()
                .map(|guessed| guessed.essence_str().eq_ignore_ascii_case(essence))
                .unwrap_or(false)
        })
        .or_else(|| extensions.first())
        .map(|extension| extension.to_string())
}
