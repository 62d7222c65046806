//! Public (unauthenticated) inbox API client.
//!
//! Contact, conversation, and contact-side message creation run through the
//! inbox-scoped public endpoints, so relayed transport messages appear as the
//! contact speaking, not as an agent. The create-contact response does not
//! reliably expose the routing identifier; callers re-search afterwards.

use serde_json::json;

use crate::helpdesk_agent_client::{
    execute_json, multipart_file, JSON_CALL_TIMEOUT, MULTIPART_CALL_TIMEOUT,
};
use crate::helpdesk_config::HelpdeskConfig;
use crate::helpdesk_types::{
    ContactRecord, ConversationCreateResponse, HelpdeskApiError, HelpdeskAttachmentUpload,
    MessageRecord, NewContact,
};

/// Client for the inbox-scoped public endpoints.
pub struct HelpdeskPublicClient {
    http: reqwest::Client,
    base_url: String,
}

impl HelpdeskPublicClient {
    pub fn from_config(config: &HelpdeskConfig) -> Result<Self, HelpdeskApiError> {
        config.validate()?;
        Ok(Self {
            http: reqwest::Client::new(),
            base_url: config.normalized_base_url(),
        })
    }

    fn inbox_url(&self, inbox_identifier: &str, path: &str) -> String {
        format!(
            "{}/public/api/v1/inboxes/{}/{}",
            self.base_url, inbox_identifier, path
        )
    }

    pub async fn create_contact(
        &self,
        inbox_identifier: &str,
        contact: &NewContact,
    ) -> Result<ContactRecord, HelpdeskApiError> {
        let request = self
            .http
            .post(self.inbox_url(inbox_identifier, "contacts"))
            .json(contact)
            .timeout(JSON_CALL_TIMEOUT);
        execute_json(request).await
    }

    pub async fn create_conversation(
        &self,
        inbox_identifier: &str,
        contact_source_id: &str,
    ) -> Result<ConversationCreateResponse, HelpdeskApiError> {
        let request = self
            .http
            .post(self.inbox_url(
                inbox_identifier,
                &format!("contacts/{contact_source_id}/conversations"),
            ))
            .json(&json!({}))
            .timeout(JSON_CALL_TIMEOUT);
        execute_json(request).await
    }

    pub async fn create_message(
        &self,
        inbox_identifier: &str,
        contact_source_id: &str,
        conversation_id: i64,
        content: &str,
    ) -> Result<MessageRecord, HelpdeskApiError> {
        let request = self
            .http
            .post(self.inbox_url(
                inbox_identifier,
                &format!("contacts/{contact_source_id}/conversations/{conversation_id}/messages"),
            ))
            .json(&json!({ "content": content }))
            .timeout(JSON_CALL_TIMEOUT);
        execute_json(request).await
    }

    /// Creates a contact-side message with attachments, one multipart call per
    /// attachment. When an upload fails the content is still delivered as a
    /// plain message with an inline failure note, and only if that fallback
    /// also fails does the original error propagate.
    pub async fn create_message_with_attachments(
        &self,
        inbox_identifier: &str,
        contact_source_id: &str,
        conversation_id: i64,
        content: &str,
        attachments: Vec<HelpdeskAttachmentUpload>,
    ) -> Result<MessageRecord, HelpdeskApiError> {
        if attachments.is_empty() {
            return self
                .create_message(inbox_identifier, contact_source_id, conversation_id, content)
                .await;
        }

        let url = self.inbox_url(
            inbox_identifier,
            &format!("contacts/{contact_source_id}/conversations/{conversation_id}/messages"),
        );
        let mut first_created: Option<MessageRecord> = None;
        for attachment in attachments {
            let failed_name = attachment.file_name.clone();
            let form = reqwest::multipart::Form::new()
                .text("content", content.to_string())
                .part("attachments[]", multipart_file(attachment)?);
            let request = self
                .http
                .post(&url)
                .multipart(form)
                .timeout(MULTIPART_CALL_TIMEOUT);
            match execute_json::<MessageRecord>(request).await {
                Ok(message) => {
                    if first_created.is_none() {
                        first_created = Some(message);
                    }
                }
                Err(error) => {
                    let fallback = format!(
                        "{content}\n\n[attachment delivery failed: {failed_name}]"
                    );
                    let fallback_result = self
                        .create_message(
                            inbox_identifier,
                            contact_source_id,
                            conversation_id,
                            &fallback,
                        )
                        .await;
                    match fallback_result {
                        Ok(message) => {
                            if first_created.is_none() {
                                first_created = Some(message);
                            }
                        }
                        Err(_) => return Err(error),
                    }
                }
            }
        }
        first_created.ok_or_else(|| {
            HelpdeskApiError::RequestError("no attachment message was created".to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;
    use serde_json::json;

    use super::HelpdeskPublicClient;
    use crate::helpdesk_config::HelpdeskConfig;
    use crate::helpdesk_types::{HelpdeskAttachmentUpload, NewContact};

    fn config_for(server: &MockServer) -> HelpdeskConfig {
        HelpdeskConfig {
            session_id: "session-1".to_string(),
            base_url: server.base_url(),
            agent_token: "agent-token".to_string(),
            bot_token: "bot-token".to_string(),
            inbox_identifier: "inbox-key".to_string(),
            account_id: "7".to_string(),
        }
    }

    #[tokio::test]
    async fn functional_create_contact_posts_identity_payload() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/public/api/v1/inboxes/inbox-key/contacts")
                .json_body_includes(
                    json!({
                        "identifier": "6281234567890@s.whatsapp.net",
                        "name": "Dina",
                        "phone_number": "+6281234567890"
                    })
                    .to_string(),
                );
            then.status(200).json_body(json!({ "id": 42 }));
        });

        let client = HelpdeskPublicClient::from_config(&config_for(&server)).expect("client");
        let contact = client
            .create_contact(
                "inbox-key",
                &NewContact {
                    identifier: "6281234567890@s.whatsapp.net".to_string(),
                    name: "Dina".to_string(),
                    phone_number: "+6281234567890".to_string(),
                },
            )
            .await
            .expect("create");
        mock.assert();
        assert_eq!(contact.id, 42);
    }

    #[tokio::test]
    async fn functional_create_conversation_targets_contact_source_id() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/public/api/v1/inboxes/inbox-key/contacts/src-1/conversations");
            then.status(200).json_body(json!({ "id": 11 }));
        });

        let client = HelpdeskPublicClient::from_config(&config_for(&server)).expect("client");
        let conversation = client
            .create_conversation("inbox-key", "src-1")
            .await
            .expect("create");
        mock.assert();
        assert_eq!(conversation.id, 11);
    }

    #[tokio::test]
    async fn regression_attachment_failure_falls_back_to_inline_text_note() {
        let server = MockServer::start();
        let multipart_mock = server.mock(|when, then| {
            when.method(POST)
                .path("/public/api/v1/inboxes/inbox-key/contacts/src-1/conversations/11/messages")
                .body_includes("form-data");
            then.status(500).body("upload broken");
        });
        let fallback_mock = server.mock(|when, then| {
            when.method(POST)
                .path("/public/api/v1/inboxes/inbox-key/contacts/src-1/conversations/11/messages")
                .json_body_includes(
                    json!({ "content": "photo\n\n[attachment delivery failed: IMG_1.png]" })
                        .to_string(),
                );
            then.status(200).json_body(json!({ "id": 77 }));
        });

        let client = HelpdeskPublicClient::from_config(&config_for(&server)).expect("client");
        let message = client
            .create_message_with_attachments(
                "inbox-key",
                "src-1",
                11,
                "photo",
                vec![HelpdeskAttachmentUpload {
                    bytes: vec![1, 2, 3],
                    file_name: "IMG_1.png".to_string(),
                    mimetype: "image/png".to_string(),
                }],
            )
            .await
            .expect("fallback should succeed");
        multipart_mock.assert();
        fallback_mock.assert();
        assert_eq!(message.id, 77);
    }
}
