//! Unified helpdesk API seam consumed by the correlation core.
//!
//! The trait folds both credential scopes and the public inbox surface into
//! one interface so the engine can be driven against a scripted in-memory
//! implementation in tests. `HelpdeskRestApi` is the production binding.

use std::time::Duration;

use async_trait::async_trait;

use crate::helpdesk_agent_client::HelpdeskAgentClient;
use crate::helpdesk_config::HelpdeskConfig;
use crate::helpdesk_public_client::HelpdeskPublicClient;
use crate::helpdesk_types::{
    ContactRecord, ContactSearchResponse, ContactShowResponse, ConversationCreateResponse,
    ConversationListResponse, HelpdeskApiError, HelpdeskAttachmentUpload, MessageDirection,
    MessageRecord, NewContact,
};

const ATTACHMENT_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// Helpdesk operations the correlation engine depends on.
#[async_trait]
pub trait HelpdeskApi: Send + Sync {
    async fn search_contact(&self, phone: &str)
        -> Result<ContactSearchResponse, HelpdeskApiError>;

    async fn show_contact(&self, contact_id: i64)
        -> Result<ContactShowResponse, HelpdeskApiError>;

    async fn list_conversations(
        &self,
        contact_id: i64,
    ) -> Result<ConversationListResponse, HelpdeskApiError>;

    async fn create_contact(
        &self,
        contact: &NewContact,
    ) -> Result<ContactRecord, HelpdeskApiError>;

    async fn create_conversation(
        &self,
        contact_source_id: &str,
    ) -> Result<ConversationCreateResponse, HelpdeskApiError>;

    /// Contact-side message create on the public inbox surface.
    async fn create_contact_message(
        &self,
        contact_source_id: &str,
        conversation_id: i64,
        content: &str,
        attachments: Vec<HelpdeskAttachmentUpload>,
    ) -> Result<MessageRecord, HelpdeskApiError>;

    /// Account-side message create, attributed to the bridge's bot token.
    async fn create_agent_message(
        &self,
        conversation_id: i64,
        content: &str,
        direction: MessageDirection,
        source_id: Option<&str>,
        attachments: Vec<HelpdeskAttachmentUpload>,
    ) -> Result<MessageRecord, HelpdeskApiError>;

    async fn create_threaded_reply(
        &self,
        conversation_id: i64,
        content: &str,
        direction: MessageDirection,
        source_id: Option<&str>,
        in_reply_to: i64,
    ) -> Result<MessageRecord, HelpdeskApiError>;

    async fn update_message_status(
        &self,
        conversation_id: i64,
        message_id: i64,
        status_label: &str,
    ) -> Result<(), HelpdeskApiError>;

    /// Downloads a webhook attachment by its `data_url`.
    async fn download_attachment(&self, url: &str) -> Result<Vec<u8>, HelpdeskApiError>;
}

/// Production binding over the agent/bot REST client and the public client.
pub struct HelpdeskRestApi {
    agent: HelpdeskAgentClient,
    public: HelpdeskPublicClient,
    inbox_identifier: String,
    download_http: reqwest::Client,
}

impl HelpdeskRestApi {
    pub fn from_config(config: &HelpdeskConfig) -> Result<Self, HelpdeskApiError> {
        Ok(Self {
            agent: HelpdeskAgentClient::from_config(config)?,
            public: HelpdeskPublicClient::from_config(config)?,
            inbox_identifier: config.inbox_identifier.trim().to_string(),
            download_http: reqwest::Client::new(),
        })
    }
}

#[async_trait]
impl HelpdeskApi for HelpdeskRestApi {
    async fn search_contact(
        &self,
        phone: &str,
    ) -> Result<ContactSearchResponse, HelpdeskApiError> {
        self.agent.search_contact(phone).await
    }

    async fn show_contact(
        &self,
        contact_id: i64,
    ) -> Result<ContactShowResponse, HelpdeskApiError> {
        self.agent.show_contact(contact_id).await
    }

    async fn list_conversations(
        &self,
        contact_id: i64,
    ) -> Result<ConversationListResponse, HelpdeskApiError> {
        self.agent.list_conversations(contact_id).await
    }

    async fn create_contact(
        &self,
        contact: &NewContact,
    ) -> Result<ContactRecord, HelpdeskApiError> {
        self.public
            .create_contact(&self.inbox_identifier, contact)
            .await
    }

    async fn create_conversation(
        &self,
        contact_source_id: &str,
    ) -> Result<ConversationCreateResponse, HelpdeskApiError> {
        self.public
            .create_conversation(&self.inbox_identifier, contact_source_id)
            .await
    }

    async fn create_contact_message(
        &self,
        contact_source_id: &str,
        conversation_id: i64,
        content: &str,
        attachments: Vec<HelpdeskAttachmentUpload>,
    ) -> Result<MessageRecord, HelpdeskApiError> {
        self.public
            .create_message_with_attachments(
                &self.inbox_identifier,
                contact_source_id,
                conversation_id,
                content,
                attachments,
            )
            .await
    }

    async fn create_agent_message(
        &self,
        conversation_id: i64,
        content: &str,
        direction: MessageDirection,
        source_id: Option<&str>,
        attachments: Vec<HelpdeskAttachmentUpload>,
    ) -> Result<MessageRecord, HelpdeskApiError> {
        if attachments.is_empty() {
            self.agent
                .create_message(conversation_id, content, direction, source_id)
                .await
        } else {
            self.agent
                .create_message_with_attachments(conversation_id, content, attachments, source_id)
                .await
        }
    }

    async fn create_threaded_reply(
        &self,
        conversation_id: i64,
        content: &str,
        direction: MessageDirection,
        source_id: Option<&str>,
        in_reply_to: i64,
    ) -> Result<MessageRecord, HelpdeskApiError> {
        self.agent
            .create_threaded_reply(conversation_id, content, direction, source_id, in_reply_to)
            .await
    }

    async fn update_message_status(
        &self,
        conversation_id: i64,
        message_id: i64,
        status_label: &str,
    ) -> Result<(), HelpdeskApiError> {
        self.agent
            .update_message_status(conversation_id, message_id, status_label)
            .await
    }

    async fn download_attachment(&self, url: &str) -> Result<Vec<u8>, HelpdeskApiError> {
        let response = self
            .download_http
            .get(url)
            .timeout(ATTACHMENT_DOWNLOAD_TIMEOUT)
            .send()
            .await
            .map_err(|error| HelpdeskApiError::RequestError(error.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(HelpdeskApiError::RequestFailed {
                status: status.as_u16(),
                detail: format!("attachment download from {url} failed"),
            });
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|error| HelpdeskApiError::RequestError(error.to_string()))?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;

    use super::{HelpdeskApi, HelpdeskRestApi};
    use crate::helpdesk_config::HelpdeskConfig;

    #[tokio::test]
    async fn functional_download_attachment_returns_raw_bytes() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/blob/1");
            then.status(200).body(&[0x89, 0x50, 0x4E, 0x47]);
        });

        let api = HelpdeskRestApi::from_config(&HelpdeskConfig {
            session_id: "session-1".to_string(),
            base_url: server.base_url(),
            agent_token: "agent-token".to_string(),
            bot_token: "bot-token".to_string(),
            inbox_identifier: "inbox-key".to_string(),
            account_id: "7".to_string(),
        })
        .expect("api");

        let bytes = api
            .download_attachment(&format!("{}/blob/1", server.base_url()))
            .await
            .expect("download");
        assert_eq!(bytes, vec![0x89, 0x50, 0x4E, 0x47]);
    }
}
