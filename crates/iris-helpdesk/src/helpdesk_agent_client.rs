//! Account-scoped helpdesk REST client.
//!
//! Read/search/status calls authenticate with the agent token; message
//! creation authenticates with the bot token so bridge-originated messages
//! are attributable to the synthetic agent. JSON calls time out at 10 s,
//! multipart attachment creates at 30 s.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::json;

use crate::helpdesk_config::HelpdeskConfig;
use crate::helpdesk_types::{
    ContactSearchResponse, ContactShowResponse, ConversationListResponse, HelpdeskApiError,
    HelpdeskAttachmentUpload, MessageDirection, MessageRecord,
};

pub const JSON_CALL_TIMEOUT: Duration = Duration::from_secs(10);
pub const MULTIPART_CALL_TIMEOUT: Duration = Duration::from_secs(30);

const ACCESS_TOKEN_HEADER: &str = "api_access_token";

/// REST client for one tenant's helpdesk account.
pub struct HelpdeskAgentClient {
    http: reqwest::Client,
    base_url: String,
    agent_token: String,
    bot_token: String,
    account_id: String,
}

impl HelpdeskAgentClient {
    pub fn from_config(config: &HelpdeskConfig) -> Result<Self, HelpdeskApiError> {
        config.validate()?;
        Ok(Self {
            http: reqwest::Client::new(),
            base_url: config.normalized_base_url(),
            agent_token: config.agent_token.trim().to_string(),
            bot_token: config.bot_token.trim().to_string(),
            account_id: config.account_id.trim().to_string(),
        })
    }

    fn account_url(&self, path: &str) -> String {
        format!(
            "{}/api/v1/accounts/{}/{}",
            self.base_url, self.account_id, path
        )
    }

    /// Searches contacts by phone-number match.
    pub async fn search_contact(
        &self,
        query: &str,
    ) -> Result<ContactSearchResponse, HelpdeskApiError> {
        let request = self
            .http
            .get(self.account_url("contacts/search"))
            .query(&[("sort", "phone_number"), ("q", query)])
            .header(ACCESS_TOKEN_HEADER, &self.agent_token)
            .timeout(JSON_CALL_TIMEOUT);
        execute_json(request).await
    }

    pub async fn show_contact(
        &self,
        contact_id: i64,
    ) -> Result<ContactShowResponse, HelpdeskApiError> {
        let request = self
            .http
            .get(self.account_url(&format!("contacts/{contact_id}")))
            .header(ACCESS_TOKEN_HEADER, &self.agent_token)
            .timeout(JSON_CALL_TIMEOUT);
        execute_json(request).await
    }

    /// Lists a contact's conversations, platform-ordered.
    pub async fn list_conversations(
        &self,
        contact_id: i64,
    ) -> Result<ConversationListResponse, HelpdeskApiError> {
        let request = self
            .http
            .get(self.account_url(&format!("contacts/{contact_id}/conversations")))
            .header(ACCESS_TOKEN_HEADER, &self.agent_token)
            .timeout(JSON_CALL_TIMEOUT);
        execute_json(request).await
    }

    pub async fn create_message(
        &self,
        conversation_id: i64,
        content: &str,
        direction: MessageDirection,
        source_id: Option<&str>,
    ) -> Result<MessageRecord, HelpdeskApiError> {
        let body = json!({
            "content": content,
            "message_type": direction.as_str(),
            "source_id": source_id.unwrap_or_default(),
        });
        let request = self
            .http
            .post(self.account_url(&format!("conversations/{conversation_id}/messages")))
            .header(ACCESS_TOKEN_HEADER, &self.bot_token)
            .json(&body)
            .timeout(JSON_CALL_TIMEOUT);
        execute_json(request).await
    }

    /// Posts a reply threaded onto an existing helpdesk message.
    pub async fn create_threaded_reply(
        &self,
        conversation_id: i64,
        content: &str,
        direction: MessageDirection,
        source_id: Option<&str>,
        in_reply_to: i64,
    ) -> Result<MessageRecord, HelpdeskApiError> {
        let body = json!({
            "content": content,
            "message_type": direction.as_str(),
            "source_id": source_id.unwrap_or_default(),
            "content_attributes": { "in_reply_to": in_reply_to },
        });
        let request = self
            .http
            .post(self.account_url(&format!("conversations/{conversation_id}/messages")))
            .header(ACCESS_TOKEN_HEADER, &self.bot_token)
            .json(&body)
            .timeout(JSON_CALL_TIMEOUT);
        execute_json(request).await
    }

    pub async fn create_message_with_attachments(
        &self,
        conversation_id: i64,
        content: &str,
        attachments: Vec<HelpdeskAttachmentUpload>,
        source_id: Option<&str>,
    ) -> Result<MessageRecord, HelpdeskApiError> {
        let mut form = reqwest::multipart::Form::new()
            .text("content", content.to_string())
            .text("message_type", MessageDirection::Outgoing.as_str());
        for attachment in attachments {
            form = form.part("attachments[]", multipart_file(attachment)?);
        }
        let request = self
            .http
            .post(self.account_url(&format!("conversations/{conversation_id}/messages")))
            .header(ACCESS_TOKEN_HEADER, &self.bot_token)
            .header("source_id", source_id.unwrap_or_default())
            .multipart(form)
            .timeout(MULTIPART_CALL_TIMEOUT);
        execute_json(request).await
    }

    /// Pushes a delivery-status label onto an existing message. Callers treat
    /// a failure here as log-only; local state has already advanced.
    pub async fn update_message_status(
        &self,
        conversation_id: i64,
        message_id: i64,
        status_label: &str,
    ) -> Result<(), HelpdeskApiError> {
        let request = self
            .http
            .patch(self.account_url(&format!(
                "conversations/{conversation_id}/messages/{message_id}"
            )))
            .header(ACCESS_TOKEN_HEADER, &self.agent_token)
            .json(&json!({ "status": status_label }))
            .timeout(JSON_CALL_TIMEOUT);
        execute_unit(request).await
    }
}

pub(crate) fn multipart_file(
    attachment: HelpdeskAttachmentUpload,
) -> Result<reqwest::multipart::Part, HelpdeskApiError> {
    reqwest::multipart::Part::bytes(attachment.bytes)
        .file_name(attachment.file_name)
        .mime_str(&attachment.mimetype)
        .map_err(|error| {
            HelpdeskApiError::RequestError(format!("invalid attachment mime type: {error}"))
        })
}

pub(crate) async fn execute_json<T: DeserializeOwned>(
    request: reqwest::RequestBuilder,
) -> Result<T, HelpdeskApiError> {
    let response = request
        .send()
        .await
        .map_err(|error| HelpdeskApiError::RequestError(error.to_string()))?;
    let status = response.status();
    if !status.is_success() {
        let detail = response.text().await.unwrap_or_default();
        return Err(HelpdeskApiError::RequestFailed {
            status: status.as_u16(),
            detail,
        });
    }
    response
        .json::<T>()
        .await
        .map_err(|error| HelpdeskApiError::ParseFailed(error.to_string()))
}

pub(crate) async fn execute_unit(
    request: reqwest::RequestBuilder,
) -> Result<(), HelpdeskApiError> {
    let response = request
        .send()
        .await
        .map_err(|error| HelpdeskApiError::RequestError(error.to_string()))?;
    let status = response.status();
    if !status.is_success() {
        let detail = response.text().await.unwrap_or_default();
        return Err(HelpdeskApiError::RequestFailed {
            status: status.as_u16(),
            detail,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;
    use serde_json::json;

    use super::HelpdeskAgentClient;
    use crate::helpdesk_config::HelpdeskConfig;
    use crate::helpdesk_types::{HelpdeskApiError, MessageDirection};

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
    async fn functional_search_contact_uses_agent_token_and_phone_sort() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/api/v1/accounts/7/contacts/search")
                .query_param("sort", "phone_number")
                .query_param("q", "6281234567890")
                .header("api_access_token", "agent-token");
            then.status(200).json_body(json!({
                "payload": [
                    { "id": 42, "contact_inboxes": [{ "source_id": "src-1" }] }
                ]
            }));
        });

        let client = HelpdeskAgentClient::from_config(&config_for(&server)).expect("client");
        let response = client.search_contact("6281234567890").await.expect("search");
        mock.assert();
        assert_eq!(response.payload.len(), 1);
        assert_eq!(response.payload[0].first_source_id(), Some("src-1"));
    }

    #[tokio::test]
    async fn functional_create_message_uses_bot_token() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/api/v1/accounts/7/conversations/11/messages")
                .header("api_access_token", "bot-token")
                .json_body_includes(
                    json!({ "content": "hello", "message_type": "incoming" }).to_string(),
                );
            then.status(200).json_body(json!({ "id": 99, "content": "hello" }));
        });

        let client = HelpdeskAgentClient::from_config(&config_for(&server)).expect("client");
        let message = client
            .create_message(11, "hello", MessageDirection::Incoming, Some("WAMID-1"))
            .await
            .expect("create");
        mock.assert();
        assert_eq!(message.id, 99);
    }

    #[tokio::test]
    async fn functional_threaded_reply_carries_in_reply_to_attribute() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/api/v1/accounts/7/conversations/11/messages")
                .json_body_includes(
                    json!({ "content_attributes": { "in_reply_to": 55 } }).to_string(),
                );
            then.status(200).json_body(json!({ "id": 100 }));
        });

        let client = HelpdeskAgentClient::from_config(&config_for(&server)).expect("client");
        let message = client
            .create_threaded_reply(11, "re: hello", MessageDirection::Incoming, None, 55)
            .await
            .expect("reply");
        mock.assert();
        assert_eq!(message.id, 100);
    }

    #[tokio::test]
    async fn functional_update_message_status_patches_with_agent_token() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(httpmock::Method::PATCH)
                .path("/api/v1/accounts/7/conversations/11/messages/99")
                .header("api_access_token", "agent-token")
                .json_body_includes(json!({ "status": "read" }).to_string());
            then.status(200).json_body(json!({ "id": 99 }));
        });

        let client = HelpdeskAgentClient::from_config(&config_for(&server)).expect("client");
        client
            .update_message_status(11, 99, "read")
            .await
            .expect("update");
        mock.assert();
    }

    #[tokio::test]
    async fn regression_non_success_status_surfaces_request_failed() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/api/v1/accounts/7/contacts/search");
            then.status(503).body("maintenance");
        });

        let client = HelpdeskAgentClient::from_config(&config_for(&server)).expect("client");
        let error = client
            .search_contact("6281234567890")
            .await
            .expect_err("should fail");
        match error {
            HelpdeskApiError::RequestFailed { status, detail } => {
                assert_eq!(status, 503);
                assert_eq!(detail, "maintenance");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }
}
