//! Byte-signature MIME detection and category/extension mapping.
//!
//! Reported MIME types from either remote system are untrusted; the helpdesk
//! in particular reports generic buckets such as `file` for downloads. The
//! sniffed type is authoritative whenever the reported type is generic or
//! missing.

use serde::{Deserialize, Serialize};

pub const FALLBACK_MIME: &str = "application/octet-stream";

const EXTENSION_TABLE: &[(&str, &str)] = &[
    ("image/jpeg", "jpg"),
    ("image/jpg", "jpg"),
    ("image/png", "png"),
    ("image/gif", "gif"),
    ("image/webp", "webp"),
    ("image/svg+xml", "svg"),
    ("image/bmp", "bmp"),
    ("image/tiff", "tiff"),
    ("video/mp4", "mp4"),
    ("video/mpeg", "mpeg"),
    ("video/quicktime", "mov"),
    ("video/x-msvideo", "avi"),
    ("video/webm", "webm"),
    ("video/3gpp", "3gp"),
    ("audio/mpeg", "mp3"),
    ("audio/mp3", "mp3"),
    ("audio/wav", "wav"),
    ("audio/ogg", "ogg"),
    ("audio/aac", "aac"),
    ("audio/x-m4a", "m4a"),
    ("audio/amr", "amr"),
    ("application/pdf", "pdf"),
    ("application/msword", "doc"),
    (
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "docx",
    ),
    ("application/vnd.ms-excel", "xls"),
    (
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "xlsx",
    ),
    ("application/vnd.ms-powerpoint", "ppt"),
    (
        "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "pptx",
    ),
    ("text/plain", "txt"),
    ("text/csv", "csv"),
    ("application/zip", "zip"),
    ("application/x-rar-compressed", "rar"),
    ("application/octet-stream", "bin"),
];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
/// Enumerates supported `MediaCategory` values.
pub enum MediaCategory {
    Image,
    Video,
    Audio,
    Document,
    Sticker,
}

impl MediaCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
            Self::Audio => "audio",
            Self::Document => "document",
            Self::Sticker => "sticker",
        }
    }

    /// Human-facing label used in inline failure fallbacks.
    pub fn display_label(self) -> &'static str {
        match self {
            Self::Image => "Image",
            Self::Video => "Video",
            Self::Audio => "Audio",
            Self::Document => "Document",
            Self::Sticker => "Sticker",
        }
    }

    /// Short prefix used when synthesizing transport-side media filenames.
    pub fn filename_prefix(self) -> &'static str {
        match self {
            Self::Image | Self::Sticker => "IMG",
            Self::Video => "VID",
            Self::Audio => "AUD",
            Self::Document => "DOC",
        }
    }
}

/// Maps a MIME type to its semantic attachment category. WebP images are
/// treated as stickers, matching the transport's sticker encoding.
pub fn category_for_mime(mimetype: &str) -> MediaCategory {
    let normalized = mimetype.trim().to_ascii_lowercase();
    if normalized.starts_with("image/") {
        if normalized == "image/webp" {
            return MediaCategory::Sticker;
        }
        return MediaCategory::Image;
    }
    if normalized.starts_with("video/") {
        return MediaCategory::Video;
    }
    if normalized.starts_with("audio/") {
        return MediaCategory::Audio;
    }
    MediaCategory::Document
}

/// Returns the canonical file extension for a MIME type, `bin` when unknown.
pub fn extension_for_mime(mimetype: &str) -> &'static str {
    let normalized = mimetype.trim().to_ascii_lowercase();
    EXTENSION_TABLE
        .iter()
        .find(|(mime, _)| *mime == normalized)
        .map(|(_, ext)| *ext)
        .unwrap_or("bin")
}

/// Returns true when a reported MIME type carries no real information and the
/// sniffed type should take precedence.
pub fn is_generic_mime(mimetype: &str) -> bool {
    let normalized = mimetype.trim().to_ascii_lowercase();
    normalized.is_empty() || normalized == "file" || normalized == FALLBACK_MIME
}

/// Detects a MIME type from leading file-signature bytes.
pub fn sniff_mime(bytes: &[u8]) -> &'static str {
    if bytes.len() < 4 {
        return FALLBACK_MIME;
    }

    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return "image/jpeg";
    }
    if bytes.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
        return "image/png";
    }
    if bytes.starts_with(b"GIF8") {
        return "image/gif";
    }
    if bytes.starts_with(b"RIFF") && bytes.len() >= 12 {
        if &bytes[8..12] == b"WEBP" {
            return "image/webp";
        }
        if &bytes[8..12] == b"WAVE" {
            return "audio/wav";
        }
    }
    if bytes.starts_with(b"BM") {
        return "image/bmp";
    }

    if bytes.len() >= 8 && &bytes[4..8] == b"ftyp" {
        return "video/mp4";
    }
    if bytes.starts_with(&[0x1A, 0x45, 0xDF, 0xA3]) {
        return "video/webm";
    }

    if bytes.starts_with(b"ID3") || (bytes[0] == 0xFF && (bytes[1] & 0xE0) == 0xE0) {
        return "audio/mpeg";
    }
    if bytes.starts_with(b"OggS") {
        return "audio/ogg";
    }
    if bytes.starts_with(b"fLaC") {
        return "audio/flac";
    }

    if bytes.starts_with(b"%PDF") {
        return "application/pdf";
    }
    if bytes.starts_with(&[0x50, 0x4B]) && (bytes[2] == 0x03 || bytes[2] == 0x05) {
        return sniff_zip_container(bytes);
    }

    FALLBACK_MIME
}

/// ZIP containers are probed for Office package markers in the leading bytes;
/// central-directory walking is deliberately out of scope.
fn sniff_zip_container(bytes: &[u8]) -> &'static str {
    let probe_len = bytes.len().min(512);
    let probe = &bytes[..probe_len];
    if contains_subslice(probe, b"word/") {
        return "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
    }
    if contains_subslice(probe, b"xl/") {
        return "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
    }
    if contains_subslice(probe, b"ppt/") {
        return "application/vnd.openxmlformats-officedocument.presentationml.presentation";
    }
    "application/zip"
}

fn contains_subslice(haystack: &[u8], needle: &[u8]) -> bool {
    if needle.is_empty() || haystack.len() < needle.len() {
        return false;
    }
    haystack.windows(needle.len()).any(|window| window == needle)
}
