//! Typed request/response payloads for the helpdesk REST surface.
//!
//! Only fields the bridge consumes are modeled; everything else is ignored on
//! deserialization. The remote system stays authoritative for these records.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
/// Failure modes of helpdesk HTTP calls.
pub enum HelpdeskApiError {
    #[error("helpdesk configuration missing or incomplete: {detail}")]
    ConfigurationMissing { detail: String },
    #[error("helpdesk request failed with status {status}: {detail}")]
    RequestFailed { status: u16, detail: String },
    #[error("helpdesk request error: {0}")]
    RequestError(String),
    #[error("helpdesk response parse error: {0}")]
    ParseFailed(String),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
/// Direction of a helpdesk message relative to the conversation contact.
pub enum MessageDirection {
    Incoming,
    Outgoing,
}

impl MessageDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Incoming => "incoming",
            Self::Outgoing => "outgoing",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
/// Inbox routing association of a contact; `source_id` is the contact's
/// routing identifier inside one inbox.
pub struct ContactInbox {
    #[serde(default)]
    pub source_id: String,
    #[serde(default)]
    pub inbox: Option<InboxRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
/// Minimal inbox reference carried inside contact payloads.
pub struct InboxRef {
    #[serde(default)]
    pub id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
/// One helpdesk contact record.
pub struct ContactRecord {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub identifier: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub contact_inboxes: Vec<ContactInbox>,
}

impl ContactRecord {
    /// First inbox routing identifier, platform-ordered.
    pub fn first_source_id(&self) -> Option<&str> {
        self.contact_inboxes
            .first()
            .map(|inbox| inbox.source_id.as_str())
            .filter(|source_id| !source_id.trim().is_empty())
    }

    /// Inbox id of the first routing association, when exposed.
    pub fn first_inbox_id(&self) -> Option<i64> {
        self.contact_inboxes
            .first()
            .and_then(|inbox| inbox.inbox.as_ref())
            .map(|inbox| inbox.id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
/// Envelope of contact search results.
pub struct ContactSearchResponse {
    #[serde(default)]
    pub payload: Vec<ContactRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
/// Envelope of a single-contact read.
pub struct ContactShowResponse {
    #[serde(default)]
    pub payload: ContactRecord,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
/// One conversation as listed for a contact.
pub struct ConversationRecord {
    pub id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
/// Envelope of a contact's conversation listing.
pub struct ConversationListResponse {
    #[serde(default)]
    pub payload: Vec<ConversationRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
/// Response of a conversation create on the public API.
pub struct ConversationCreateResponse {
    pub id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
/// One created/read helpdesk message.
pub struct MessageRecord {
    pub id: i64,
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Attachment payload uploaded with a multipart message create.
pub struct HelpdeskAttachmentUpload {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub mimetype: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
/// New-contact payload for the public inbox API.
pub struct NewContact {
    pub identifier: String,
    pub name: String,
    pub phone_number: String,
}

#[cfg(test)]
mod tests {
    use super::{ContactRecord, ContactSearchResponse};

    #[test]
    fn unit_contact_record_exposes_first_routing_identifier() {
        let raw = r#"{
  "payload": [
    {
      "id": 42,
      "name": "Dina",
      "phone_number": "+6281234567890",
      "contact_inboxes": [
        { "source_id": "src-1", "inbox": { "id": 3 } },
        { "source_id": "src-2" }
      ]
    }
  ]
}"#;
        let parsed: ContactSearchResponse = serde_json::from_str(raw).expect("parse");
        let contact = parsed.payload.first().expect("contact");
        assert_eq!(contact.first_source_id(), Some("src-1"));
        assert_eq!(contact.first_inbox_id(), Some(3));
    }

    #[test]
    fn unit_contact_record_tolerates_missing_inboxes() {
        let contact = ContactRecord {
            id: 1,
            ..ContactRecord::default()
        };
        assert_eq!(contact.first_source_id(), None);
        assert_eq!(contact.first_inbox_id(), None);
    }
}
