//! Typed transport events and chat-identity helpers.
//!
//! Events arrive from the session supervisor already decoded into these
//! tagged variants; downstream code never touches raw protocol payloads.
//! Chat identities are `{digits}@{domain}` strings; group and broadcast
//! pseudo-chats are filtered before correlation.

use serde::{Deserialize, Serialize};

const GROUP_CHAT_SUFFIX: &str = "@g.us";
const BROADCAST_STATUS_MARKER: &str = "status@broadcast";

/// Returns the numeric portion of a transport chat identity.
pub fn phone_digits(chat_id: &str) -> &str {
    let trimmed = chat_id.trim();
    trimmed.split(['@', ':']).next().unwrap_or(trimmed)
}

/// Formats a chat identity as a display phone number, `+{digits}`.
pub fn formatted_phone(chat_id: &str) -> String {
    format!("+{}", phone_digits(chat_id))
}

/// True for group chats, which the bridge does not correlate.
pub fn is_group_chat(chat_id: &str) -> bool {
    chat_id.trim().ends_with(GROUP_CHAT_SUFFIX)
}

/// True for the broadcast-status pseudo-chat.
pub fn is_broadcast_status(chat_id: &str) -> bool {
    chat_id.trim().contains(BROADCAST_STATUS_MARKER)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
/// Identity of one transport message: id, chat, and origin side.
pub struct TransportMessageKey {
    pub message_id: String,
    pub chat_id: String,
    #[serde(default)]
    pub from_self: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
/// Opaque handle to transport-hosted media the supervisor can download.
pub struct TransportMediaRef {
    #[serde(default)]
    pub mimetype: String,
    #[serde(default)]
    pub size_bytes: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
/// Tagged content variants of an inbound transport message.
pub enum TransportMessageContent {
    Text {
        text: String,
    },
    ExtendedText {
        text: String,
        #[serde(default)]
        quoted_message_id: Option<String>,
    },
    Image {
        media: TransportMediaRef,
        #[serde(default)]
        caption: Option<String>,
    },
    Video {
        media: TransportMediaRef,
        #[serde(default)]
        caption: Option<String>,
    },
    Audio {
        media: TransportMediaRef,
    },
    Sticker {
        media: TransportMediaRef,
    },
    Document {
        media: TransportMediaRef,
        #[serde(default)]
        file_name: Option<String>,
    },
    /// Protocol/system sub-message with no user content.
    Protocol,
    /// Recognized envelope, unrecognized payload shape.
    Unknown,
}

impl TransportMessageContent {
    /// Media reference, when this variant carries one.
    pub fn media(&self) -> Option<&TransportMediaRef> {
        match self {
            Self::Image { media, .. }
            | Self::Video { media, .. }
            | Self::Audio { media }
            | Self::Sticker { media }
            | Self::Document { media, .. } => Some(media),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
/// One inbound transport message event.
pub struct TransportMessageEvent {
    pub key: TransportMessageKey,
    #[serde(default)]
    pub push_name: Option<String>,
    #[serde(default)]
    pub timestamp_ms: u64,
    pub content: TransportMessageContent,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
/// Delivery-status update for a previously sent transport message.
pub struct TransportStatusEvent {
    pub message_id: String,
    pub chat_id: String,
    pub status_code: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
/// Contact metadata pushed by the transport.
pub struct TransportContactEvent {
    pub chat_id: String,
    #[serde(default)]
    pub display_name: Option<String>,
}
