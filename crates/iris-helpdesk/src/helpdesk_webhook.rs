//! Webhook payload decoding into tagged event variants.
//!
//! Raw webhook JSON is decoded exactly once, here at the boundary. Unknown
//! event names decode to `Unrecognized` (a recognized no-op); structurally
//! broken payloads fail with a reason-coded decode error. Downstream code
//! never inspects raw JSON.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const MESSAGE_CREATED_EVENT: &str = "message_created";
pub const MESSAGE_UPDATED_EVENT: &str = "message_updated";
pub const CONVERSATION_TYPING_ON_EVENT: &str = "conversation_typing_on";
pub const CONVERSATION_UPDATED_EVENT: &str = "conversation_updated";

/// Synthetic agent name the bridge posts under; webhook events from this
/// sender are echoes of the bridge's own writes and are never relayed back.
pub const BRIDGE_AGENT_NAME: &str = "syncAgent";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
/// Enumerates supported `WebhookDecodeReasonCode` values.
pub enum WebhookDecodeReasonCode {
    InvalidPayload,
    MissingEvent,
    MissingField,
    InvalidFieldType,
}

impl WebhookDecodeReasonCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidPayload => "invalid_payload",
            Self::MissingEvent => "missing_event",
            Self::MissingField => "missing_field",
            Self::InvalidFieldType => "invalid_field_type",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Reason-coded webhook decode failure.
pub struct WebhookDecodeError {
    pub code: WebhookDecodeReasonCode,
    pub message: String,
}

impl WebhookDecodeError {
    fn new(code: WebhookDecodeReasonCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl Display for WebhookDecodeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for WebhookDecodeError {}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
/// One attachment reference carried by a webhook message event.
pub struct HelpdeskWebhookAttachment {
    pub data_url: String,
    #[serde(default)]
    pub file_type: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
/// Decoded message-created/updated webhook payload.
pub struct HelpdeskMessageEvent {
    pub message_id: i64,
    pub conversation_id: i64,
    #[serde(default)]
    pub contact_id: Option<i64>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub message_type: Option<String>,
    #[serde(default)]
    pub sender_name: Option<String>,
    #[serde(default)]
    pub attachments: Vec<HelpdeskWebhookAttachment>,
}

impl HelpdeskMessageEvent {
    /// True for agent-side messages flowing toward the contact.
    pub fn is_outgoing(&self) -> bool {
        self.message_type.as_deref() == Some("outgoing")
    }

    /// True when the event was produced by the bridge's own synthetic agent.
    pub fn sender_is_bridge_agent(&self) -> bool {
        self.sender_name.as_deref() == Some(BRIDGE_AGENT_NAME)
    }

    pub fn trimmed_content(&self) -> Option<&str> {
        self.content
            .as_deref()
            .map(str::trim)
            .filter(|content| !content.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Tagged webhook event variants.
pub enum HelpdeskWebhookEvent {
    MessageCreated(HelpdeskMessageEvent),
    MessageUpdated(HelpdeskMessageEvent),
    ConversationTypingOn {
        conversation_id: i64,
        unread_count: i64,
    },
    ConversationUpdated {
        conversation_id: i64,
        unread_count: i64,
        agent_seen_recently: bool,
    },
    /// Recognized envelope with an event name the bridge does not handle.
    Unrecognized { event: String },
}

/// Deterministic duplicate-suppression key, computed from the raw payload
/// before any decode so replays of malformed events still collapse.
pub fn webhook_fingerprint(payload: &Value, session_id: &str) -> String {
    let event_id = payload
        .get("id")
        .map(render_scalar)
        .unwrap_or_else(|| "none".to_string());
    let conversation_id = payload
        .get("conversation")
        .and_then(|conversation| conversation.get("id"))
        .map(render_scalar)
        .unwrap_or_else(|| "none".to_string());
    format!("{event_id}_{conversation_id}_{session_id}")
}

fn render_scalar(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Decodes one webhook payload into its tagged variant.
pub fn decode_webhook_event(payload: &Value) -> Result<HelpdeskWebhookEvent, WebhookDecodeError> {
    let object = payload.as_object().ok_or_else(|| {
        WebhookDecodeError::new(
            WebhookDecodeReasonCode::InvalidPayload,
            "webhook payload is not a JSON object",
        )
    })?;
    let event = object
        .get("event")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|event| !event.is_empty())
        .ok_or_else(|| {
            WebhookDecodeError::new(
                WebhookDecodeReasonCode::MissingEvent,
                "webhook payload has no event name",
            )
        })?;

    match event {
        MESSAGE_CREATED_EVENT => Ok(HelpdeskWebhookEvent::MessageCreated(decode_message_event(
            payload,
        )?)),
        MESSAGE_UPDATED_EVENT => Ok(HelpdeskWebhookEvent::MessageUpdated(decode_message_event(
            payload,
        )?)),
        CONVERSATION_TYPING_ON_EVENT => {
            let conversation_id = require_i64_at(
                payload,
                &["conversation", "id"],
                "conversation_typing_on conversation id",
            )?;
            let unread_count = payload
                .get("conversation")
                .and_then(|conversation| conversation.get("unread_count"))
                .and_then(Value::as_i64)
                .unwrap_or(0);
            Ok(HelpdeskWebhookEvent::ConversationTypingOn {
                conversation_id,
                unread_count,
            })
        }
        CONVERSATION_UPDATED_EVENT => {
            let conversation_id =
                require_i64_at(payload, &["id"], "conversation_updated conversation id")?;
            let unread_count = payload
                .get("unread_count")
                .and_then(Value::as_i64)
                .unwrap_or(0);
            let agent_seen_recently = payload
                .get("agent_last_seen_at")
                .map(|value| !value.is_null())
                .unwrap_or(false);
            Ok(HelpdeskWebhookEvent::ConversationUpdated {
                conversation_id,
                unread_count,
                agent_seen_recently,
            })
        }
        other => Ok(HelpdeskWebhookEvent::Unrecognized {
            event: other.to_string(),
        }),
    }
}

fn decode_message_event(payload: &Value) -> Result<HelpdeskMessageEvent, WebhookDecodeError> {
    let message_id = require_i64_at(payload, &["id"], "message event id")?;
    let conversation_id = require_i64_at(
        payload,
        &["conversation", "id"],
        "message event conversation id",
    )?;
    let contact_id = payload
        .get("conversation")
        .and_then(|conversation| conversation.get("contact_inbox"))
        .and_then(|contact_inbox| contact_inbox.get("contact_id"))
        .and_then(value_as_loose_i64);
    let attachments = payload
        .get("attachments")
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter_map(|entry| {
                    let data_url = entry.get("data_url").and_then(Value::as_str)?.trim();
                    if data_url.is_empty() {
                        return None;
                    }
                    Some(HelpdeskWebhookAttachment {
                        data_url: data_url.to_string(),
                        file_type: string_field(entry, "file_type"),
                        file_name: string_field(entry, "file_name"),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(HelpdeskMessageEvent {
        message_id,
        conversation_id,
        contact_id,
        content: string_field(payload, "content"),
        content_type: string_field(payload, "content_type"),
        message_type: string_field(payload, "message_type"),
        sender_name: payload
            .get("sender")
            .and_then(|sender| sender.get("name"))
            .and_then(Value::as_str)
            .map(str::to_string),
        attachments,
    })
}

fn string_field(value: &Value, field: &str) -> Option<String> {
    value
        .get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Numeric ids occasionally arrive as strings; both shapes are accepted.
fn value_as_loose_i64(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_str().and_then(|text| text.trim().parse().ok()))
}

fn require_i64_at(payload: &Value, path: &[&str], label: &str) -> Result<i64, WebhookDecodeError> {
    let mut cursor = payload;
    for segment in path {
        cursor = cursor.get(segment).ok_or_else(|| {
            WebhookDecodeError::new(
                WebhookDecodeReasonCode::MissingField,
                format!("{label} is missing"),
            )
        })?;
    }
    value_as_loose_i64(cursor).ok_or_else(|| {
        WebhookDecodeError::new(
            WebhookDecodeReasonCode::InvalidFieldType,
            format!("{label} is not numeric"),
        )
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{
        decode_webhook_event, webhook_fingerprint, HelpdeskWebhookEvent, WebhookDecodeReasonCode,
    };

    #[test]
    fn functional_message_created_decodes_sender_conversation_and_attachments() {
        let payload = json!({
            "event": "message_created",
            "id": 812,
            "content": "hello from agent",
            "content_type": "text",
            "message_type": "outgoing",
            "sender": { "name": "Ana Agent" },
            "conversation": {
                "id": 11,
                "contact_inbox": { "contact_id": "42" }
            },
            "attachments": [
                { "data_url": "https://desk.example.com/blob/1", "file_type": "file", "file_name": "doc.pdf" },
                { "data_url": "  " }
            ]
        });
        let event = decode_webhook_event(&payload).expect("decode");
        match event {
            HelpdeskWebhookEvent::MessageCreated(message) => {
                assert_eq!(message.message_id, 812);
                assert_eq!(message.conversation_id, 11);
                assert_eq!(message.contact_id, Some(42));
                assert!(message.is_outgoing());
                assert!(!message.sender_is_bridge_agent());
                assert_eq!(message.attachments.len(), 1);
                assert_eq!(message.attachments[0].file_type.as_deref(), Some("file"));
            }
            other => panic!("unexpected variant {other:?}"),
        }
    }

    #[test]
    fn unit_typing_on_and_conversation_updated_read_signals() {
        let typing = decode_webhook_event(&json!({
            "event": "conversation_typing_on",
            "conversation": { "id": 11, "unread_count": 0 }
        }))
        .expect("decode");
        assert_eq!(
            typing,
            HelpdeskWebhookEvent::ConversationTypingOn {
                conversation_id: 11,
                unread_count: 0
            }
        );

        let updated = decode_webhook_event(&json!({
            "event": "conversation_updated",
            "id": 11,
            "unread_count": 0,
            "agent_last_seen_at": "2024-05-01T10:00:00Z"
        }))
        .expect("decode");
        assert_eq!(
            updated,
            HelpdeskWebhookEvent::ConversationUpdated {
                conversation_id: 11,
                unread_count: 0,
                agent_seen_recently: true
            }
        );
    }

    #[test]
    fn unit_unknown_event_name_is_recognized_as_noop_variant() {
        let event = decode_webhook_event(&json!({ "event": "webwidget_triggered" }))
            .expect("decode");
        assert_eq!(
            event,
            HelpdeskWebhookEvent::Unrecognized {
                event: "webwidget_triggered".to_string()
            }
        );
    }

    #[test]
    fn regression_missing_structural_fields_fail_with_reason_codes() {
        let no_event = decode_webhook_event(&json!({ "id": 5 })).expect_err("no event name");
        assert_eq!(no_event.code, WebhookDecodeReasonCode::MissingEvent);

        let no_conversation = decode_webhook_event(&json!({
            "event": "message_created",
            "id": 5
        }))
        .expect_err("no conversation");
        assert_eq!(no_conversation.code, WebhookDecodeReasonCode::MissingField);

        let bad_type = decode_webhook_event(&json!({
            "event": "message_created",
            "id": "not-a-number",
            "conversation": { "id": 11 }
        }))
        .expect_err("non-numeric id");
        assert_eq!(bad_type.code, WebhookDecodeReasonCode::InvalidFieldType);
    }

    #[test]
    fn unit_fingerprint_joins_event_conversation_and_session() {
        let payload = json!({
            "event": "message_created",
            "id": 812,
            "conversation": { "id": 11 }
        });
        assert_eq!(
            webhook_fingerprint(&payload, "session-1"),
            "812_11_session-1"
        );
        assert_eq!(
            webhook_fingerprint(&json!({}), "session-1"),
            "none_none_session-1"
        );
    }
}
