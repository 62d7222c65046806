//! Per-session correlation engine.
//!
//! Processes inbound transport events and helpdesk webhook events for one
//! tenant, driving the thread resolver, mapping store, duplicate filter,
//! read-tracking table, and transcoder. All failures are event-scoped: an
//! error drops the event being processed and never the session.

use std::path::PathBuf;
use std::sync::Arc;

use serde_json::Value;

use iris_core::{current_unix_timestamp, current_unix_timestamp_ms};
use iris_helpdesk::{
    decode_webhook_event, webhook_fingerprint, HelpdeskApi, HelpdeskAttachmentUpload,
    HelpdeskConfig, HelpdeskMessageEvent, HelpdeskWebhookEvent, MessageDirection,
};
use iris_media::{
    transcode_from_helpdesk, transcode_from_transport, MediaCategory, TranscodeLimits,
    TranscodedAttachment,
};
use iris_transport::{
    is_broadcast_status, is_group_chat, phone_digits, TransportClient, TransportContactEvent,
    TransportMessageContent, TransportMessageEvent, TransportStatusEvent,
};

use crate::correlation_dedup::DuplicateEventFilter;
use crate::correlation_error::CorrelationError;
use crate::correlation_mapping::{
    MappingInsertOutcome, MappingOrigin, MessageMappingEntry, MessageMappingStore,
    StatusTransition,
};
use crate::correlation_read_tracking::ReadTrackingTable;
use crate::correlation_resolver::ThreadResolver;
use crate::correlation_status::DeliveryStatus;

pub const SKIP_REASON_GROUP_CHAT: &str = "group_chat";
pub const SKIP_REASON_BROADCAST_STATUS: &str = "broadcast_status";
pub const SKIP_REASON_EMPTY_CONTENT: &str = "empty_content";
pub const SKIP_REASON_CONTACT_MISSING: &str = "contact_missing";
pub const SKIP_REASON_CONVERSATION_MISSING: &str = "conversation_missing";

pub const UNSUPPORTED_MESSAGE_PLACEHOLDER: &str = "[Unsupported message]";
pub const WEBHOOK_EMPTY_MESSAGE_NOTE: &str = "Unsupported message type or empty message";

#[derive(Debug, Clone, PartialEq, Eq)]
/// Outcome of one inbound transport event.
pub enum InboundOutcome {
    Relayed {
        transport_message_id: String,
        conversation_id: i64,
        helpdesk_message_id: i64,
        threaded: bool,
    },
    SelfSentMirrored {
        transport_message_id: String,
        conversation_id: i64,
    },
    /// Bridge-originated echo; the mapping already exists.
    AlreadyMapped { transport_message_id: String },
    Skipped {
        transport_message_id: String,
        reason: &'static str,
    },
    Failed {
        transport_message_id: String,
        detail: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Outcome of one transport status event.
pub enum StatusOutcome {
    Applied {
        transport_message_id: String,
        status: DeliveryStatus,
    },
    Ignored { transport_message_id: String },
    Missing { transport_message_id: String },
    UnknownCode {
        transport_message_id: String,
        code: u8,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Outcome of one webhook delivery.
pub enum WebhookOutcome {
    Processed,
    DuplicateIgnored,
    Ignored,
    DecodeRejected { reason: String },
    Failed { detail: String },
}

struct ExtractedContent {
    text: String,
    attachments: Vec<HelpdeskAttachmentUpload>,
    quoted_message_id: Option<String>,
}

impl ExtractedContent {
    fn is_empty(&self) -> bool {
        self.text.trim().is_empty() && self.attachments.is_empty()
    }
}

/// Correlation engine for one tenant session. Owned exclusively by the
/// session registry; all operations for the session run sequentially.
pub struct CorrelationEngine {
    session_id: String,
    helpdesk: Arc<dyn HelpdeskApi>,
    transport: Arc<dyn TransportClient>,
    resolver: ThreadResolver,
    mappings: MessageMappingStore,
    dedup: DuplicateEventFilter,
    read_tracking: ReadTrackingTable,
    transcode_limits: TranscodeLimits,
}

impl std::fmt::Debug for CorrelationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CorrelationEngine")
            .field("session_id", &self.session_id)
            .finish_non_exhaustive()
    }
}

impl CorrelationEngine {
    /// Builds the engine for a session. An incomplete helpdesk configuration
    /// refuses initialization; re-initialization after a config fix is an
    /// explicit registry operation.
    pub fn new(
        session_id: &str,
        config: &HelpdeskConfig,
        helpdesk: Arc<dyn HelpdeskApi>,
        transport: Arc<dyn TransportClient>,
        mapping_snapshot_path: Option<PathBuf>,
    ) -> Result<Self, CorrelationError> {
        config.validate().map_err(CorrelationError::from)?;
        let mappings = match mapping_snapshot_path {
            Some(path) => MessageMappingStore::with_snapshot_path(path),
            None => MessageMappingStore::new(),
        };
        Ok(Self {
            session_id: session_id.trim().to_string(),
            resolver: ThreadResolver::new(helpdesk.clone()),
            helpdesk,
            transport,
            mappings,
            dedup: DuplicateEventFilter::new(),
            read_tracking: ReadTrackingTable::new(),
            transcode_limits: TranscodeLimits::default(),
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn mapping_for(&self, transport_message_id: &str) -> Option<&MessageMappingEntry> {
        self.mappings.get(transport_message_id)
    }

    pub fn tracked_unread_count(&self) -> usize {
        self.read_tracking.len()
    }

    /// Processes a batch of inbound transport messages in arrival order.
    pub async fn handle_inbound_messages(
        &mut self,
        events: Vec<TransportMessageEvent>,
    ) -> Vec<InboundOutcome> {
        let mut outcomes = Vec::with_capacity(events.len());
        for event in events {
            let outcome = if event.key.from_self {
                self.process_self_sent(&event).await
            } else {
                self.process_incoming(&event).await
            };
            if let InboundOutcome::Failed { transport_message_id, detail } = &outcome {
                tracing::warn!(
                    session_id = %self.session_id,
                    transport_message_id = %transport_message_id,
                    detail = %detail,
                    "dropping inbound transport event"
                );
            }
            outcomes.push(outcome);
        }
        outcomes
    }

    async fn process_incoming(&mut self, event: &TransportMessageEvent) -> InboundOutcome {
        let message_id = event.key.message_id.clone();
        if is_group_chat(&event.key.chat_id) {
            return InboundOutcome::Skipped {
                transport_message_id: message_id,
                reason: SKIP_REASON_GROUP_CHAT,
            };
        }
        if is_broadcast_status(&event.key.chat_id) {
            return InboundOutcome::Skipped {
                transport_message_id: message_id,
                reason: SKIP_REASON_BROADCAST_STATUS,
            };
        }

        let extracted = self.extract_content(event).await;
        if extracted.is_empty() {
            return InboundOutcome::Skipped {
                transport_message_id: message_id,
                reason: SKIP_REASON_EMPTY_CONTENT,
            };
        }

        let thread = match self
            .resolver
            .resolve(&event.key.chat_id, event.push_name.as_deref())
            .await
        {
            Ok(thread) => thread,
            Err(error) => {
                return InboundOutcome::Failed {
                    transport_message_id: message_id,
                    detail: error.to_string(),
                }
            }
        };

        // Reply correlation: a quoted transport id with a live mapping turns
        // into a threaded reply; a missing quote target never blocks posting.
        let quoted_target = extracted
            .quoted_message_id
            .as_deref()
            .and_then(|quoted| self.mappings.get(quoted))
            .map(|entry| entry.helpdesk_message_id)
            .filter(|_| extracted.attachments.is_empty());

        let created = if let Some(in_reply_to) = quoted_target {
            self.helpdesk
                .create_threaded_reply(
                    thread.conversation_id,
                    &extracted.text,
                    MessageDirection::Incoming,
                    Some(&message_id),
                    in_reply_to,
                )
                .await
        } else {
            self.helpdesk
                .create_contact_message(
                    &thread.contact_source_id,
                    thread.conversation_id,
                    &extracted.text,
                    extracted.attachments,
                )
                .await
        };
        let created = match created {
            Ok(record) => record,
            Err(error) => {
                return InboundOutcome::Failed {
                    transport_message_id: message_id,
                    detail: error.to_string(),
                }
            }
        };

        let now = current_unix_timestamp();
        self.mappings.insert(
            MessageMappingEntry {
                transport_message_id: message_id.clone(),
                conversation_id: thread.conversation_id,
                helpdesk_message_id: created.id,
                contact_phone: phone_digits(&event.key.chat_id).to_string(),
                last_status: DeliveryStatus::Pending,
                origin: MappingOrigin::Device,
                contact_id: thread.contact_id,
                inbox_id: thread.inbox_id,
                created_at_unix: now,
            },
            now,
        );
        self.read_tracking
            .track(&message_id, &event.key.chat_id, thread.conversation_id, now);

        InboundOutcome::Relayed {
            transport_message_id: message_id,
            conversation_id: thread.conversation_id,
            helpdesk_message_id: created.id,
            threaded: quoted_target.is_some(),
        }
    }

    /// Self-originated transport events. A mapped bridge-origin id is an echo
    /// of the bridge's own send and only confirms observability; an unmapped
    /// id originated on the agent's device and is mirrored into the helpdesk.
    async fn process_self_sent(&mut self, event: &TransportMessageEvent) -> InboundOutcome {
        let message_id = event.key.message_id.clone();
        if let Some(entry) = self.mappings.get(&message_id) {
            // The origin tag recorded at send time distinguishes the bridge's
            // own echoes from device sends that were already mirrored.
            tracing::debug!(
                session_id = %self.session_id,
                transport_message_id = %message_id,
                origin = entry.origin.as_str(),
                "self-sent event already mapped"
            );
            return InboundOutcome::AlreadyMapped {
                transport_message_id: message_id,
            };
        }

        let extracted = self.extract_content(event).await;
        if extracted.is_empty() {
            return InboundOutcome::Skipped {
                transport_message_id: message_id,
                reason: SKIP_REASON_EMPTY_CONTENT,
            };
        }

        // Device-originated sends reflect an existing thread; never create
        // contacts or conversations for them.
        let phone = phone_digits(&event.key.chat_id).to_string();
        let search = match self.helpdesk.search_contact(&phone).await {
            Ok(search) => search,
            Err(error) => {
                return InboundOutcome::Failed {
                    transport_message_id: message_id,
                    detail: error.to_string(),
                }
            }
        };
        let Some(contact) = search.payload.first() else {
            return InboundOutcome::Skipped {
                transport_message_id: message_id,
                reason: SKIP_REASON_CONTACT_MISSING,
            };
        };
        let conversations = match self.helpdesk.list_conversations(contact.id).await {
            Ok(conversations) => conversations,
            Err(error) => {
                return InboundOutcome::Failed {
                    transport_message_id: message_id,
                    detail: error.to_string(),
                }
            }
        };
        let Some(conversation) = conversations.payload.first() else {
            return InboundOutcome::Skipped {
                transport_message_id: message_id,
                reason: SKIP_REASON_CONVERSATION_MISSING,
            };
        };

        let created = match self
            .helpdesk
            .create_agent_message(
                conversation.id,
                &extracted.text,
                MessageDirection::Outgoing,
                Some(&message_id),
                extracted.attachments,
            )
            .await
        {
            Ok(record) => record,
            Err(error) => {
                return InboundOutcome::Failed {
                    transport_message_id: message_id,
                    detail: error.to_string(),
                }
            }
        };

        let now = current_unix_timestamp();
        let conversation_id = conversation.id;
        self.mappings.insert(
            MessageMappingEntry {
                transport_message_id: message_id.clone(),
                conversation_id,
                helpdesk_message_id: created.id,
                contact_phone: phone,
                last_status: DeliveryStatus::Pending,
                origin: MappingOrigin::Device,
                contact_id: Some(contact.id),
                inbox_id: contact.first_inbox_id(),
                created_at_unix: now,
            },
            now,
        );
        // The agent's own device has already read what it sent.
        self.apply_and_push_status(&message_id, DeliveryStatus::Read).await;

        InboundOutcome::SelfSentMirrored {
            transport_message_id: message_id,
            conversation_id,
        }
    }

    /// Processes transport delivery-status updates under the monotonic rule.
    pub async fn handle_status_updates(
        &mut self,
        events: Vec<TransportStatusEvent>,
    ) -> Vec<StatusOutcome> {
        let mut outcomes = Vec::with_capacity(events.len());
        for event in events {
            let Some(status) = DeliveryStatus::from_code(event.status_code) else {
                tracing::warn!(
                    session_id = %self.session_id,
                    transport_message_id = %event.message_id,
                    code = event.status_code,
                    "ignoring unknown transport status code"
                );
                outcomes.push(StatusOutcome::UnknownCode {
                    transport_message_id: event.message_id,
                    code: event.status_code,
                });
                continue;
            };
            let outcome = match self.apply_and_push_status(&event.message_id, status).await {
                StatusTransition::Applied { to, .. } => StatusOutcome::Applied {
                    transport_message_id: event.message_id,
                    status: to,
                },
                StatusTransition::Ignored { .. } => StatusOutcome::Ignored {
                    transport_message_id: event.message_id,
                },
                StatusTransition::Missing => StatusOutcome::Missing {
                    transport_message_id: event.message_id,
                },
            };
            outcomes.push(outcome);
        }
        outcomes
    }

    /// Advances the stored status and pushes the new label to the helpdesk.
    /// A failed push is logged only: local state has already advanced and the
    /// contract is eventual, not guaranteed, consistency.
    async fn apply_and_push_status(
        &mut self,
        transport_message_id: &str,
        status: DeliveryStatus,
    ) -> StatusTransition {
        let now = current_unix_timestamp();
        let transition = self.mappings.apply_status(transport_message_id, status, now);
        if let StatusTransition::Applied { to, .. } = transition {
            if let Some(entry) = self.mappings.get(transport_message_id) {
                let conversation_id = entry.conversation_id;
                let helpdesk_message_id = entry.helpdesk_message_id;
                if let Err(error) = self
                    .helpdesk
                    .update_message_status(conversation_id, helpdesk_message_id, to.helpdesk_label())
                    .await
                {
                    tracing::warn!(
                        session_id = %self.session_id,
                        transport_message_id = %transport_message_id,
                        status = to.helpdesk_label(),
                        %error,
                        "helpdesk status push failed"
                    );
                }
            }
        }
        transition
    }

    /// Contact metadata pushes are observability-only; the helpdesk record is
    /// refreshed lazily on the next thread resolution.
    pub fn handle_contact_upserts(&self, events: Vec<TransportContactEvent>) {
        for event in events {
            tracing::debug!(
                session_id = %self.session_id,
                chat_id = %event.chat_id,
                display_name = event.display_name.as_deref().unwrap_or_default(),
                "transport contact upsert"
            );
        }
    }

    /// Entry point for one helpdesk webhook delivery.
    pub async fn handle_webhook_event(&mut self, payload: &Value) -> WebhookOutcome {
        let fingerprint = webhook_fingerprint(payload, &self.session_id);
        let now_ms = current_unix_timestamp_ms();
        if !self.dedup.should_process(&fingerprint, now_ms) {
            return WebhookOutcome::DuplicateIgnored;
        }
        self.dedup.prune(now_ms);

        let event = match decode_webhook_event(payload) {
            Ok(event) => event,
            Err(error) => {
                tracing::warn!(
                    session_id = %self.session_id,
                    %error,
                    "rejecting undecodable webhook payload"
                );
                return WebhookOutcome::DecodeRejected {
                    reason: error.to_string(),
                };
            }
        };

        match event {
            HelpdeskWebhookEvent::MessageCreated(message)
            | HelpdeskWebhookEvent::MessageUpdated(message) => {
                if message.sender_is_bridge_agent() || !message.is_outgoing() {
                    return WebhookOutcome::Ignored;
                }
                self.dedup.record(&fingerprint, now_ms);
                self.relay_agent_message(&message).await
            }
            HelpdeskWebhookEvent::ConversationTypingOn {
                conversation_id,
                unread_count,
            } => {
                if unread_count == 0 {
                    self.mark_conversation_read(conversation_id).await;
                    WebhookOutcome::Processed
                } else {
                    WebhookOutcome::Ignored
                }
            }
            HelpdeskWebhookEvent::ConversationUpdated {
                conversation_id,
                unread_count,
                agent_seen_recently,
            } => {
                if unread_count == 0 && agent_seen_recently {
                    self.mark_conversation_read(conversation_id).await;
                    WebhookOutcome::Processed
                } else {
                    WebhookOutcome::Ignored
                }
            }
            HelpdeskWebhookEvent::Unrecognized { event } => {
                tracing::info!(
                    session_id = %self.session_id,
                    event = %event,
                    "ignoring unhandled webhook event type"
                );
                WebhookOutcome::Ignored
            }
        }
    }

    /// Relays a human agent reply from the helpdesk to the transport.
    async fn relay_agent_message(&mut self, message: &HelpdeskMessageEvent) -> WebhookOutcome {
        let Some(contact_id) = message.contact_id else {
            return WebhookOutcome::Failed {
                detail: "message event carries no contact id".to_string(),
            };
        };
        let contact = match self.helpdesk.show_contact(contact_id).await {
            Ok(response) => response.payload,
            Err(error) => {
                return WebhookOutcome::Failed {
                    detail: format!("contact lookup failed: {error}"),
                }
            }
        };
        let Some(chat_id) = contact
            .identifier
            .as_deref()
            .map(str::trim)
            .filter(|identifier| !identifier.is_empty())
            .map(str::to_string)
        else {
            return WebhookOutcome::Failed {
                detail: format!("contact {contact_id} has no transport identifier"),
            };
        };

        let caption = message.trimmed_content().map(str::to_string);
        if !message.attachments.is_empty() {
            for attachment in &message.attachments {
                if let Err(error) = self
                    .relay_one_attachment(message, &chat_id, attachment, caption.as_deref())
                    .await
                {
                    tracing::warn!(
                        session_id = %self.session_id,
                        conversation_id = message.conversation_id,
                        data_url = %attachment.data_url,
                        %error,
                        "attachment relay failed"
                    );
                    let file_name = attachment.file_name.as_deref().unwrap_or("attachment");
                    let note = format!("Failed to deliver attachment: {file_name}");
                    if let Err(error) = self.transport.send_text(&chat_id, &note).await {
                        tracing::warn!(
                            session_id = %self.session_id,
                            %error,
                            "could not notify chat about failed attachment"
                        );
                    }
                }
            }
            return WebhookOutcome::Processed;
        }

        if message.content_type.as_deref() == Some("text") {
            if let Some(text) = caption {
                match self.transport.send_text(&chat_id, &text).await {
                    Ok(receipt) => {
                        self.record_bridge_mapping(&receipt.message_id, message, &chat_id);
                        return WebhookOutcome::Processed;
                    }
                    Err(error) => {
                        return WebhookOutcome::Failed {
                            detail: format!("transport text send failed: {error}"),
                        }
                    }
                }
            }
        }

        // Neither text nor attachment: explain in the helpdesk conversation
        // instead of sending anything to the transport.
        if let Err(error) = self
            .helpdesk
            .create_agent_message(
                message.conversation_id,
                WEBHOOK_EMPTY_MESSAGE_NOTE,
                MessageDirection::Outgoing,
                None,
                Vec::new(),
            )
            .await
        {
            return WebhookOutcome::Failed {
                detail: format!("could not post empty-message note: {error}"),
            };
        }
        WebhookOutcome::Processed
    }

    async fn relay_one_attachment(
        &mut self,
        message: &HelpdeskMessageEvent,
        chat_id: &str,
        attachment: &iris_helpdesk::HelpdeskWebhookAttachment,
        caption: Option<&str>,
    ) -> Result<(), CorrelationError> {
        let bytes = self.helpdesk.download_attachment(&attachment.data_url).await?;
        let transcoded = transcode_from_helpdesk(
            bytes,
            attachment.file_type.as_deref().unwrap_or_default(),
            attachment.file_name.as_deref(),
            &self.transcode_limits,
        )?;
        let receipt = self
            .dispatch_attachment(chat_id, transcoded, caption)
            .await?;
        self.record_bridge_mapping(&receipt.message_id, message, chat_id);
        Ok(())
    }

    /// Category-directed transport dispatch. Image and video sends accept an
    /// inline caption; audio and document captions go out as a separate text
    /// message afterwards.
    async fn dispatch_attachment(
        &self,
        chat_id: &str,
        attachment: TranscodedAttachment,
        caption: Option<&str>,
    ) -> Result<iris_transport::TransportSendReceipt, CorrelationError> {
        let receipt = match attachment.category {
            MediaCategory::Image => {
                self.transport
                    .send_image(chat_id, attachment.bytes, caption)
                    .await?
            }
            MediaCategory::Video => {
                self.transport
                    .send_video(chat_id, attachment.bytes, caption)
                    .await?
            }
            MediaCategory::Audio => {
                let receipt = self.transport.send_audio(chat_id, attachment.bytes).await?;
                if let Some(text) = caption {
                    self.transport.send_text(chat_id, text).await?;
                }
                receipt
            }
            MediaCategory::Document | MediaCategory::Sticker => {
                let receipt = self
                    .transport
                    .send_document(
                        chat_id,
                        attachment.bytes,
                        &attachment.file_name,
                        &attachment.mimetype,
                    )
                    .await?;
                if let Some(text) = caption {
                    self.transport.send_text(chat_id, text).await?;
                }
                receipt
            }
        };
        Ok(receipt)
    }

    fn record_bridge_mapping(
        &mut self,
        transport_message_id: &str,
        message: &HelpdeskMessageEvent,
        chat_id: &str,
    ) {
        let now = current_unix_timestamp();
        let outcome = self.mappings.insert(
            MessageMappingEntry {
                transport_message_id: transport_message_id.to_string(),
                conversation_id: message.conversation_id,
                helpdesk_message_id: message.message_id,
                contact_phone: phone_digits(chat_id).to_string(),
                last_status: DeliveryStatus::Pending,
                origin: MappingOrigin::Bridge,
                contact_id: message.contact_id,
                inbox_id: None,
                created_at_unix: now,
            },
            now,
        );
        if outcome == MappingInsertOutcome::AlreadyMapped {
            tracing::warn!(
                session_id = %self.session_id,
                transport_message_id = %transport_message_id,
                "transport receipt id already mapped; keeping first mapping"
            );
        }
    }

    /// Marks all tracked transport messages of a conversation as read.
    /// Entries are re-tracked when the transport relay fails so the next read
    /// signal retries them.
    async fn mark_conversation_read(&mut self, conversation_id: i64) {
        let entries = self.read_tracking.take_for_conversation(conversation_id);
        if entries.is_empty() {
            return;
        }

        let mut by_chat: Vec<(String, Vec<String>)> = Vec::new();
        for entry in &entries {
            match by_chat.iter_mut().find(|(chat, _)| chat == &entry.chat_id) {
                Some((_, ids)) => ids.push(entry.transport_message_id.clone()),
                None => by_chat.push((
                    entry.chat_id.clone(),
                    vec![entry.transport_message_id.clone()],
                )),
            }
        }

        for (chat_id, message_ids) in by_chat {
            if let Err(error) = self.transport.mark_read(&chat_id, &message_ids).await {
                tracing::warn!(
                    session_id = %self.session_id,
                    conversation_id,
                    chat_id = %chat_id,
                    %error,
                    "transport mark-read failed; keeping entries for retry"
                );
                let now = current_unix_timestamp();
                for entry in entries
                    .iter()
                    .filter(|entry| entry.chat_id == chat_id)
                {
                    self.read_tracking.track(
                        &entry.transport_message_id,
                        &entry.chat_id,
                        entry.conversation_id,
                        now,
                    );
                }
            }
        }
    }

    /// Extracts relayable text and attachments from a transport message.
    /// Per-attachment failures degrade to an inline fallback line; they never
    /// abort the event.
    async fn extract_content(&self, event: &TransportMessageEvent) -> ExtractedContent {
        let mut extracted = ExtractedContent {
            text: String::new(),
            attachments: Vec::new(),
            quoted_message_id: None,
        };
        match &event.content {
            TransportMessageContent::Text { text } => {
                extracted.text = text.clone();
            }
            TransportMessageContent::ExtendedText {
                text,
                quoted_message_id,
            } => {
                extracted.text = text.clone();
                extracted.quoted_message_id = quoted_message_id.clone();
            }
            TransportMessageContent::Image { caption, .. } => {
                extracted.text = caption.clone().unwrap_or_default();
                self.pull_media(event, "Image", &mut extracted).await;
            }
            TransportMessageContent::Video { caption, .. } => {
                extracted.text = caption.clone().unwrap_or_default();
                self.pull_media(event, "Video", &mut extracted).await;
            }
            TransportMessageContent::Audio { .. } => {
                self.pull_media(event, "Audio", &mut extracted).await;
            }
            TransportMessageContent::Sticker { .. } => {
                self.pull_media(event, "Sticker", &mut extracted).await;
            }
            TransportMessageContent::Document { .. } => {
                self.pull_media(event, "Document", &mut extracted).await;
            }
            TransportMessageContent::Protocol => {}
            TransportMessageContent::Unknown => {
                extracted.text = UNSUPPORTED_MESSAGE_PLACEHOLDER.to_string();
            }
        }
        extracted
    }

    async fn pull_media(
        &self,
        event: &TransportMessageEvent,
        label: &str,
        extracted: &mut ExtractedContent,
    ) {
        let reported_mime = event
            .content
            .media()
            .map(|media| media.mimetype.clone())
            .unwrap_or_default();
        let downloaded = match self.transport.download_media(event).await {
            Ok(bytes) => bytes,
            Err(error) => {
                tracing::warn!(
                    session_id = %self.session_id,
                    transport_message_id = %event.key.message_id,
                    %error,
                    "transport media download failed"
                );
                extracted.text = format!("[{label} - download failed]");
                return;
            }
        };
        match transcode_from_transport(
            downloaded,
            &reported_mime,
            &event.key.message_id,
            &self.transcode_limits,
        ) {
            Ok(attachment) => extracted.attachments.push(HelpdeskAttachmentUpload {
                bytes: attachment.bytes,
                file_name: attachment.file_name,
                mimetype: attachment.mimetype,
            }),
            Err(error) => {
                tracing::warn!(
                    session_id = %self.session_id,
                    transport_message_id = %event.key.message_id,
                    %error,
                    "transport media transcode failed"
                );
                extracted.text = format!("[{label} - download failed]");
            }
        }
    }
}

/// Maps webhook handler outcomes onto the plain-text acknowledgment bodies
/// the webhook endpoint always answers with.
pub fn webhook_acknowledgment(outcome: &WebhookOutcome) -> &'static str {
    match outcome {
        WebhookOutcome::DuplicateIgnored => "Duplicate webhook ignored!",
        _ => "Webhook received!",
    }
}
