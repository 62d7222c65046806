//! Normalized filename generation for relayed attachments.
//!
//! Transport media arrives nameless (or with a name the filesystem cannot
//! trust); helpdesk attachments arrive with user-chosen names. Both sides get
//! deterministic-but-unique names built from the effective MIME type.

use iris_core::current_unix_timestamp_ms;

use crate::media_sniff::{category_for_mime, extension_for_mime};

const MAX_FILE_NAME_CHARS: usize = 100;

/// Replaces characters that are illegal or risky on common filesystems and
/// collapses whitespace/underscore runs.
pub fn sanitize_file_name(raw: &str) -> String {
    let mut sanitized = String::with_capacity(raw.len());
    let mut last_was_underscore = false;
    for ch in raw.trim().chars() {
        let mapped = match ch {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c if c.is_control() => '_',
            c if c.is_whitespace() => '_',
            c => c,
        };
        if mapped == '_' {
            if last_was_underscore {
                continue;
            }
            last_was_underscore = true;
        } else {
            last_was_underscore = false;
        }
        sanitized.push(mapped);
    }
    let trimmed = sanitized.trim_matches(|c| c == '_' || c == '.');
    if trimmed.is_empty() {
        "attachment".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Synthesizes a filename for media pulled off the transport, for example
/// `IMG_1700000000000_ab12cd34.png`.
pub fn transport_media_file_name(mimetype: &str, message_id: &str) -> String {
    let prefix = category_for_mime(mimetype).filename_prefix();
    let extension = extension_for_mime(mimetype);
    let id_tail = message_id
        .trim()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(8)
        .collect::<String>();
    let id_tail = if id_tail.is_empty() {
        "media".to_string()
    } else {
        id_tail
    };
    format!(
        "{}_{}_{}.{}",
        prefix,
        current_unix_timestamp_ms(),
        id_tail,
        extension
    )
}

/// Normalizes a helpdesk attachment name before handing it to the transport:
/// original name (sans extension) sanitized, timestamped, re-extensioned from
/// the effective MIME type, and bounded in length.
pub fn helpdesk_attachment_file_name(original_name: Option<&str>, mimetype: &str) -> String {
    let base = original_name
        .map(|name| {
            let trimmed = name.trim();
            match trimmed.rsplit_once('.') {
                Some((stem, _)) if !stem.is_empty() => stem,
                _ => trimmed,
            }
        })
        .filter(|name| !name.is_empty())
        .unwrap_or("attachment");
    let sanitized = sanitize_file_name(base);
    let extension = extension_for_mime(mimetype);
    let full = format!(
        "{}_{}.{}",
        sanitized,
        current_unix_timestamp_ms(),
        extension
    );
    if full.chars().count() <= MAX_FILE_NAME_CHARS {
        return full;
    }
    let suffix = format!("_{}.{}", current_unix_timestamp_ms(), extension);
    let available = MAX_FILE_NAME_CHARS.saturating_sub(suffix.chars().count());
    let clipped = sanitized.chars().take(available.max(1)).collect::<String>();
    format!("{clipped}{suffix}")
}

#[cfg(test)]
mod tests {
    use super::{
        helpdesk_attachment_file_name, sanitize_file_name, transport_media_file_name,
        MAX_FILE_NAME_CHARS,
    };

    #[test]
    fn unit_sanitize_replaces_illegal_characters_and_collapses_runs() {
        assert_eq!(sanitize_file_name("inv/oi:ce 2024?.pdf"), "inv_oi_ce_2024_.pdf");
        assert_eq!(sanitize_file_name("  spaced   name  "), "spaced_name");
        assert_eq!(sanitize_file_name("___"), "attachment");
        assert_eq!(sanitize_file_name(""), "attachment");
    }

    #[test]
    fn unit_transport_media_file_name_uses_category_prefix_and_extension() {
        let name = transport_media_file_name("image/png", "ABCDEF1234567890");
        assert!(name.starts_with("IMG_"), "unexpected name {name}");
        assert!(name.ends_with("_ABCDEF12.png"), "unexpected name {name}");

        let doc = transport_media_file_name("application/pdf", "");
        assert!(doc.starts_with("DOC_"), "unexpected name {doc}");
        assert!(doc.ends_with("_media.pdf"), "unexpected name {doc}");
    }

    #[test]
    fn functional_helpdesk_file_name_reextensions_from_effective_mime() {
        let name = helpdesk_attachment_file_name(Some("report.bin"), "application/pdf");
        assert!(name.starts_with("report_"), "unexpected name {name}");
        assert!(name.ends_with(".pdf"), "unexpected name {name}");

        let nameless = helpdesk_attachment_file_name(None, "image/jpeg");
        assert!(nameless.starts_with("attachment_"), "unexpected name {nameless}");
        assert!(nameless.ends_with(".jpg"), "unexpected name {nameless}");
    }

    #[test]
    fn regression_helpdesk_file_name_is_length_bounded() {
        let long = "x".repeat(400);
        let name = helpdesk_attachment_file_name(Some(long.as_str()), "image/png");
        assert!(name.chars().count() <= MAX_FILE_NAME_CHARS);
        assert!(name.ends_with(".png"));
    }
}
