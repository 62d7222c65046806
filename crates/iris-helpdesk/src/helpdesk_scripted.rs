//! Stateful in-memory helpdesk for engine tests and dry runs.
//!
//! Mimics the remote contract the correlation core cares about: contacts are
//! findable only by search, the create-contact response withholds the routing
//! identifier (forcing the re-search step), and every call is logged in
//! arrival order so tests can assert exact call sequences.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::helpdesk_api::HelpdeskApi;
use crate::helpdesk_types::{
    ContactInbox, ContactRecord, ContactSearchResponse, ContactShowResponse,
    ConversationCreateResponse, ConversationListResponse, ConversationRecord, HelpdeskApiError,
    HelpdeskAttachmentUpload, InboxRef, MessageDirection, MessageRecord, NewContact,
};

#[derive(Debug, Clone, PartialEq, Eq)]
/// One message recorded by the scripted helpdesk.
pub struct ScriptedMessage {
    pub surface: &'static str,
    pub conversation_id: i64,
    pub content: String,
    pub direction: String,
    pub source_id: Option<String>,
    pub in_reply_to: Option<i64>,
    pub attachment_names: Vec<String>,
}

#[derive(Default)]
struct ScriptedState {
    contacts: Vec<ContactRecord>,
    conversations: HashMap<i64, Vec<ConversationRecord>>,
    attachment_bytes: HashMap<String, Vec<u8>>,
    failing_methods: HashSet<String>,
    calls: Vec<String>,
    messages: Vec<ScriptedMessage>,
    status_updates: Vec<(i64, i64, String)>,
    next_contact_id: i64,
    next_conversation_id: i64,
    next_message_id: i64,
}

/// Scripted `HelpdeskApi` implementation.
pub struct ScriptedHelpdeskApi {
    state: Mutex<ScriptedState>,
}

impl Default for ScriptedHelpdeskApi {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedHelpdeskApi {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ScriptedState {
                next_contact_id: 100,
                next_conversation_id: 500,
                next_message_id: 1_000,
                ..ScriptedState::default()
            }),
        }
    }

    /// Seeds a known contact with its routing identifier and inbox.
    pub async fn seed_contact(
        &self,
        contact_id: i64,
        phone_number: &str,
        name: &str,
        source_id: &str,
        inbox_id: i64,
        conversation_ids: &[i64],
    ) {
        let mut state = self.state.lock().await;
        state.contacts.push(ContactRecord {
            id: contact_id,
            name: Some(name.to_string()),
            identifier: Some(format!("{}@s.whatsapp.net", phone_number.trim_start_matches('+'))),
            phone_number: Some(phone_number.to_string()),
            contact_inboxes: vec![ContactInbox {
                source_id: source_id.to_string(),
                inbox: Some(InboxRef { id: inbox_id }),
            }],
        });
        state.conversations.insert(
            contact_id,
            conversation_ids
                .iter()
                .map(|id| ConversationRecord { id: *id })
                .collect(),
        );
    }

    pub async fn script_attachment(&self, url: &str, bytes: Vec<u8>) {
        let mut state = self.state.lock().await;
        state.attachment_bytes.insert(url.to_string(), bytes);
    }

    /// Makes the named method fail with a 500 until cleared.
    pub async fn set_failing(&self, method: &str) {
        let mut state = self.state.lock().await;
        state.failing_methods.insert(method.to_string());
    }

    pub async fn clear_failing(&self, method: &str) {
        let mut state = self.state.lock().await;
        state.failing_methods.remove(method);
    }

    pub async fn calls(&self) -> Vec<String> {
        self.state.lock().await.calls.clone()
    }

    pub async fn messages(&self) -> Vec<ScriptedMessage> {
        self.state.lock().await.messages.clone()
    }

    pub async fn status_updates(&self) -> Vec<(i64, i64, String)> {
        self.state.lock().await.status_updates.clone()
    }

    async fn enter(&self, method: &str, detail: &str) -> Result<(), HelpdeskApiError> {
        let mut state = self.state.lock().await;
        let call = if detail.is_empty() {
            method.to_string()
        } else {
            format!("{method}:{detail}")
        };
        state.calls.push(call);
        if state.failing_methods.contains(method) {
            return Err(HelpdeskApiError::RequestFailed {
                status: 500,
                detail: format!("scripted failure for {method}"),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl HelpdeskApi for ScriptedHelpdeskApi {
    async fn search_contact(
        &self,
        phone: &str,
    ) -> Result<ContactSearchResponse, HelpdeskApiError> {
        self.enter("search_contact", phone).await?;
        let state = self.state.lock().await;
        let digits = phone.trim().trim_start_matches('+');
        let payload = state
            .contacts
            .iter()
            .filter(|contact| {
                contact
                    .phone_number
                    .as_deref()
                    .map(|number| number.trim_start_matches('+') == digits)
                    .unwrap_or(false)
            })
            .cloned()
            .collect();
        Ok(ContactSearchResponse { payload })
    }

    async fn show_contact(
        &self,
        contact_id: i64,
    ) -> Result<ContactShowResponse, HelpdeskApiError> {
        self.enter("show_contact", &contact_id.to_string()).await?;
        let state = self.state.lock().await;
        let contact = state
            .contacts
            .iter()
            .find(|contact| contact.id == contact_id)
            .cloned()
            .ok_or(HelpdeskApiError::RequestFailed {
                status: 404,
                detail: format!("contact {contact_id} not found"),
            })?;
        Ok(ContactShowResponse { payload: contact })
    }

    async fn list_conversations(
        &self,
        contact_id: i64,
    ) -> Result<ConversationListResponse, HelpdeskApiError> {
        self.enter("list_conversations", &contact_id.to_string())
            .await?;
        let state = self.state.lock().await;
        Ok(ConversationListResponse {
            payload: state
                .conversations
                .get(&contact_id)
                .cloned()
                .unwrap_or_default(),
        })
    }

    async fn create_contact(
        &self,
        contact: &NewContact,
    ) -> Result<ContactRecord, HelpdeskApiError> {
        self.enter("create_contact", &contact.phone_number).await?;
        let mut state = self.state.lock().await;
        let contact_id = state.next_contact_id;
        state.next_contact_id += 1;
        let stored = ContactRecord {
            id: contact_id,
            name: Some(contact.name.clone()),
            identifier: Some(contact.identifier.clone()),
            phone_number: Some(contact.phone_number.clone()),
            contact_inboxes: vec![ContactInbox {
                source_id: format!("src-{contact_id}"),
                inbox: Some(InboxRef { id: 1 }),
            }],
        };
        state.contacts.push(stored.clone());
        state.conversations.entry(contact_id).or_default();
        // The real create response does not reliably expose the routing
        // identifier; callers must re-search to obtain it.
        Ok(ContactRecord {
            contact_inboxes: Vec::new(),
            ..stored
        })
    }

    async fn create_conversation(
        &self,
        contact_source_id: &str,
    ) -> Result<ConversationCreateResponse, HelpdeskApiError> {
        self.enter("create_conversation", contact_source_id).await?;
        let mut state = self.state.lock().await;
        let contact_id = state
            .contacts
            .iter()
            .find(|contact| contact.first_source_id() == Some(contact_source_id))
            .map(|contact| contact.id)
            .ok_or(HelpdeskApiError::RequestFailed {
                status: 404,
                detail: format!("no contact with source id {contact_source_id}"),
            })?;
        let conversation_id = state.next_conversation_id;
        state.next_conversation_id += 1;
        state
            .conversations
            .entry(contact_id)
            .or_default()
            .push(ConversationRecord { id: conversation_id });
        Ok(ConversationCreateResponse { id: conversation_id })
    }

    async fn create_contact_message(
        &self,
        contact_source_id: &str,
        conversation_id: i64,
        content: &str,
        attachments: Vec<HelpdeskAttachmentUpload>,
    ) -> Result<MessageRecord, HelpdeskApiError> {
        self.enter("create_contact_message", contact_source_id)
            .await?;
        let mut state = self.state.lock().await;
        let message_id = state.next_message_id;
        state.next_message_id += 1;
        state.messages.push(ScriptedMessage {
            surface: "contact",
            conversation_id,
            content: content.to_string(),
            direction: "incoming".to_string(),
            source_id: None,
            in_reply_to: None,
            attachment_names: attachments
                .iter()
                .map(|attachment| attachment.file_name.clone())
                .collect(),
        });
        Ok(MessageRecord {
            id: message_id,
            content: Some(content.to_string()),
        })
    }

    async fn create_agent_message(
        &self,
        conversation_id: i64,
        content: &str,
        direction: MessageDirection,
        source_id: Option<&str>,
        attachments: Vec<HelpdeskAttachmentUpload>,
    ) -> Result<MessageRecord, HelpdeskApiError> {
        self.enter("create_agent_message", &conversation_id.to_string())
            .await?;
        let mut state = self.state.lock().await;
        let message_id = state.next_message_id;
        state.next_message_id += 1;
        state.messages.push(ScriptedMessage {
            surface: "agent",
            conversation_id,
            content: content.to_string(),
            direction: direction.as_str().to_string(),
            source_id: source_id.map(str::to_string),
            in_reply_to: None,
            attachment_names: attachments
                .iter()
                .map(|attachment| attachment.file_name.clone())
                .collect(),
        });
        Ok(MessageRecord {
            id: message_id,
            content: Some(content.to_string()),
        })
    }

    async fn create_threaded_reply(
        &self,
        conversation_id: i64,
        content: &str,
        direction: MessageDirection,
        source_id: Option<&str>,
        in_reply_to: i64,
    ) -> Result<MessageRecord, HelpdeskApiError> {
        self.enter("create_threaded_reply", &conversation_id.to_string())
            .await?;
        let mut state = self.state.lock().await;
        let message_id = state.next_message_id;
        state.next_message_id += 1;
        state.messages.push(ScriptedMessage {
            surface: "reply",
            conversation_id,
            content: content.to_string(),
            direction: direction.as_str().to_string(),
            source_id: source_id.map(str::to_string),
            in_reply_to: Some(in_reply_to),
            attachment_names: Vec::new(),
        });
        Ok(MessageRecord {
            id: message_id,
            content: Some(content.to_string()),
        })
    }

    async fn update_message_status(
        &self,
        conversation_id: i64,
        message_id: i64,
        status_label: &str,
    ) -> Result<(), HelpdeskApiError> {
        self.enter("update_message_status", status_label).await?;
        let mut state = self.state.lock().await;
        state
            .status_updates
            .push((conversation_id, message_id, status_label.to_string()));
        Ok(())
    }

    async fn download_attachment(&self, url: &str) -> Result<Vec<u8>, HelpdeskApiError> {
        self.enter("download_attachment", url).await?;
        let state = self.state.lock().await;
        state
            .attachment_bytes
            .get(url)
            .cloned()
            .ok_or(HelpdeskApiError::RequestFailed {
                status: 404,
                detail: format!("no scripted bytes for {url}"),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::ScriptedHelpdeskApi;
    use crate::helpdesk_api::HelpdeskApi;
    use crate::helpdesk_types::NewContact;

    #[tokio::test]
    async fn unit_created_contacts_are_only_resolvable_via_research() {
        let api = ScriptedHelpdeskApi::new();
        let created = api
            .create_contact(&NewContact {
                identifier: "6281234567890@s.whatsapp.net".to_string(),
                name: "Dina".to_string(),
                phone_number: "+6281234567890".to_string(),
            })
            .await
            .expect("create");
        assert!(created.contact_inboxes.is_empty());

        let searched = api.search_contact("6281234567890").await.expect("search");
        assert_eq!(searched.payload.len(), 1);
        assert_eq!(
            searched.payload[0].first_source_id(),
            Some(format!("src-{}", created.id).as_str())
        );
    }

    #[tokio::test]
    async fn unit_scripted_failures_surface_as_request_failed() {
        let api = ScriptedHelpdeskApi::new();
        api.set_failing("search_contact").await;
        assert!(api.search_contact("123").await.is_err());
        api.clear_failing("search_contact").await;
        assert!(api.search_contact("123").await.is_ok());
    }
}
