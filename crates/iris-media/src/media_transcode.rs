//! Buffer-level attachment transcoding.
//!
//! Resolves the effective MIME type (sniffed bytes beat generic reported
//! types), enforces size and allowed-type limits, and produces the normalized
//! attachment shape consumed by senders on both sides of the bridge.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::media_filename::{helpdesk_attachment_file_name, transport_media_file_name};
use crate::media_sniff::{category_for_mime, is_generic_mime, sniff_mime, MediaCategory};

pub const DEFAULT_MAX_ATTACHMENT_BYTES: u64 = 50 * 1024 * 1024;

#[derive(Debug, Error)]
/// Failure modes of attachment transcoding.
pub enum TranscodeError {
    #[error("attachment is empty")]
    EmptyBuffer,
    #[error("attachment size {size} exceeds limit {max}")]
    Oversized { size: u64, max: u64 },
    #[error("attachment type '{mimetype}' is not allowed")]
    UnsupportedType { mimetype: String },
}

#[derive(Debug, Clone)]
/// Size and type limits applied while transcoding.
pub struct TranscodeLimits {
    pub max_size_bytes: u64,
    pub allowed_mimes: Option<Vec<String>>,
}

impl Default for TranscodeLimits {
    fn default() -> Self {
        Self {
            max_size_bytes: DEFAULT_MAX_ATTACHMENT_BYTES,
            allowed_mimes: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
/// A normalized attachment ready for dispatch to either remote system.
pub struct TranscodedAttachment {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub mimetype: String,
    pub category: MediaCategory,
    pub size_bytes: u64,
}

/// Resolves the MIME type to act on: the reported type unless it is generic
/// or missing, in which case the byte-sniffed type wins.
pub fn effective_mime(bytes: &[u8], reported_mime: &str) -> String {
    if is_generic_mime(reported_mime) {
        return sniff_mime(bytes).to_string();
    }
    reported_mime.trim().to_ascii_lowercase()
}

/// Transcodes media downloaded from the transport for helpdesk delivery.
/// The synthesized filename embeds the transport message id.
pub fn transcode_from_transport(
    bytes: Vec<u8>,
    reported_mime: &str,
    message_id: &str,
    limits: &TranscodeLimits,
) -> Result<TranscodedAttachment, TranscodeError> {
    let mimetype = effective_mime(&bytes, reported_mime);
    let file_name = transport_media_file_name(&mimetype, message_id);
    finish(bytes, mimetype, file_name, limits)
}

/// Transcodes an attachment downloaded from the helpdesk for transport
/// delivery, preserving the original name stem where one exists.
pub fn transcode_from_helpdesk(
    bytes: Vec<u8>,
    reported_mime: &str,
    original_name: Option<&str>,
    limits: &TranscodeLimits,
) -> Result<TranscodedAttachment, TranscodeError> {
    let mimetype = effective_mime(&bytes, reported_mime);
    let file_name = helpdesk_attachment_file_name(original_name, &mimetype);
    finish(bytes, mimetype, file_name, limits)
}

fn finish(
    bytes: Vec<u8>,
    mimetype: String,
    file_name: String,
    limits: &TranscodeLimits,
) -> Result<TranscodedAttachment, TranscodeError> {
    if bytes.is_empty() {
        return Err(TranscodeError::EmptyBuffer);
    }
    let size = bytes.len() as u64;
    if size > limits.max_size_bytes {
        return Err(TranscodeError::Oversized {
            size,
            max: limits.max_size_bytes,
        });
    }
    if let Some(allowed) = &limits.allowed_mimes {
        if !allowed.iter().any(|mime| mime.eq_ignore_ascii_case(&mimetype)) {
            return Err(TranscodeError::UnsupportedType { mimetype });
        }
    }
    let category = category_for_mime(&mimetype);
    Ok(TranscodedAttachment {
        bytes,
        file_name,
        mimetype,
        category,
        size_bytes: size,
    })
}

#[cfg(test)]
mod tests {
    use super::{
        transcode_from_helpdesk, transcode_from_transport, TranscodeError, TranscodeLimits,
    };
    use crate::media_sniff::MediaCategory;

    fn png_bytes() -> Vec<u8> {
        let mut bytes = vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
        bytes.extend_from_slice(&[0u8; 64]);
        bytes
    }

    #[test]
    fn functional_generic_reported_type_defers_to_sniffed_png() {
        let attachment = transcode_from_helpdesk(
            png_bytes(),
            "file",
            Some("photo"),
            &TranscodeLimits::default(),
        )
        .expect("transcode");
        assert_eq!(attachment.mimetype, "image/png");
        assert_eq!(attachment.category, MediaCategory::Image);
        assert!(attachment.file_name.ends_with(".png"), "{}", attachment.file_name);
    }

    #[test]
    fn unit_specific_reported_type_wins_over_sniffing() {
        let attachment = transcode_from_helpdesk(
            png_bytes(),
            "image/webp",
            None,
            &TranscodeLimits::default(),
        )
        .expect("transcode");
        assert_eq!(attachment.mimetype, "image/webp");
        assert_eq!(attachment.category, MediaCategory::Sticker);
    }

    #[test]
    fn unit_transport_transcode_embeds_message_id() {
        let attachment = transcode_from_transport(
            png_bytes(),
            "",
            "3EB0A9C8D7",
            &TranscodeLimits::default(),
        )
        .expect("transcode");
        assert!(attachment.file_name.starts_with("IMG_"));
        assert!(attachment.file_name.contains("3EB0A9C8"));
    }

    #[test]
    fn regression_size_limit_is_enforced() {
        let limits = TranscodeLimits {
            max_size_bytes: 16,
            allowed_mimes: None,
        };
        let error = transcode_from_transport(png_bytes(), "image/png", "m1", &limits)
            .expect_err("oversized should fail");
        assert!(matches!(error, TranscodeError::Oversized { .. }));
    }

    #[test]
    fn regression_allowed_type_table_rejects_unlisted_mime() {
        let limits = TranscodeLimits {
            max_size_bytes: 1024,
            allowed_mimes: Some(vec!["image/jpeg".to_string()]),
        };
        let error = transcode_from_transport(png_bytes(), "image/png", "m1", &limits)
            .expect_err("unlisted type should fail");
        assert!(matches!(error, TranscodeError::UnsupportedType { .. }));
    }

    #[test]
    fn unit_empty_buffer_is_rejected() {
        let error =
            transcode_from_transport(Vec::new(), "image/png", "m1", &TranscodeLimits::default())
                .expect_err("empty buffer should fail");
        assert!(matches!(error, TranscodeError::EmptyBuffer));
    }
}
