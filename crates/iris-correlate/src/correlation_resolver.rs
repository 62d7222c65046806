//! Identity-to-thread resolution.
//!
//! Maps a transport chat identity onto the helpdesk contact routing
//! identifier and its open conversation, creating both when absent. The
//! create-contact response does not reliably expose the platform-assigned
//! routing identifier, so creation is always followed by a re-search. Any
//! remote failure aborts resolution; nothing is partially persisted.

use std::sync::Arc;

use iris_helpdesk::{HelpdeskApi, NewContact};
use iris_transport::{formatted_phone, phone_digits};

use crate::correlation_error::CorrelationError;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Resolved pairing of contact routing identifier and open conversation.
pub struct ResolvedThread {
    pub contact_source_id: String,
    pub conversation_id: i64,
    pub contact_id: Option<i64>,
    pub inbox_id: Option<i64>,
}

/// Resolver over the helpdesk API for one tenant inbox.
pub struct ThreadResolver {
    helpdesk: Arc<dyn HelpdeskApi>,
}

impl ThreadResolver {
    pub fn new(helpdesk: Arc<dyn HelpdeskApi>) -> Self {
        Self { helpdesk }
    }

    /// Finds or creates the helpdesk thread for a transport chat identity.
    pub async fn resolve(
        &self,
        chat_id: &str,
        push_name: Option<&str>,
    ) -> Result<ResolvedThread, CorrelationError> {
        let phone = phone_digits(chat_id);
        let search = self
            .helpdesk
            .search_contact(phone)
            .await
            .map_err(resolution_failure)?;

        match search.payload.first() {
            Some(contact) => {
                let contact_source_id = contact
                    .first_source_id()
                    .ok_or_else(|| {
                        CorrelationError::ResolutionFailed(format!(
                            "contact {} has no inbox routing identifier",
                            contact.id
                        ))
                    })?
                    .to_string();
                let conversations = self
                    .helpdesk
                    .list_conversations(contact.id)
                    .await
                    .map_err(resolution_failure)?;
                let conversation_id = match conversations.payload.first() {
                    // Multiple open conversations are possible; the first
                    // platform-ordered one is authoritative, never merged.
                    Some(conversation) => conversation.id,
                    None => {
                        self.helpdesk
                            .create_conversation(&contact_source_id)
                            .await
                            .map_err(resolution_failure)?
                            .id
                    }
                };
                Ok(ResolvedThread {
                    contact_source_id,
                    conversation_id,
                    contact_id: Some(contact.id),
                    inbox_id: contact.first_inbox_id(),
                })
            }
            None => self.create_and_resolve(chat_id, phone, push_name).await,
        }
    }

    async fn create_and_resolve(
        &self,
        chat_id: &str,
        phone: &str,
        push_name: Option<&str>,
    ) -> Result<ResolvedThread, CorrelationError> {
        let phone_number = formatted_phone(chat_id);
        let name = push_name
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| phone_number.clone());
        self.helpdesk
            .create_contact(&NewContact {
                identifier: chat_id.trim().to_string(),
                name,
                phone_number,
            })
            .await
            .map_err(resolution_failure)?;

        let research = self
            .helpdesk
            .search_contact(phone)
            .await
            .map_err(resolution_failure)?;
        let contact = research.payload.first().ok_or_else(|| {
            CorrelationError::ResolutionFailed(format!(
                "contact for {phone} not found after creation"
            ))
        })?;
        let contact_source_id = contact
            .first_source_id()
            .ok_or_else(|| {
                CorrelationError::ResolutionFailed(format!(
                    "re-search for {phone} did not expose a routing identifier"
                ))
            })?
            .to_string();

        let conversation = self
            .helpdesk
            .create_conversation(&contact_source_id)
            .await
            .map_err(resolution_failure)?;
        Ok(ResolvedThread {
            contact_source_id,
            conversation_id: conversation.id,
            contact_id: Some(contact.id),
            inbox_id: contact.first_inbox_id(),
        })
    }
}

fn resolution_failure(error: iris_helpdesk::HelpdeskApiError) -> CorrelationError {
    CorrelationError::ResolutionFailed(error.to_string())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use iris_helpdesk::{HelpdeskApi, ScriptedHelpdeskApi};

    use super::ThreadResolver;
    use crate::correlation_error::CorrelationError;

    #[tokio::test]
    async fn functional_unknown_contact_is_created_researched_then_conversed() {
        let helpdesk = Arc::new(ScriptedHelpdeskApi::new());
        let resolver = ThreadResolver::new(helpdesk.clone());

        let thread = resolver
            .resolve("6281234567890@s.whatsapp.net", Some("Dina"))
            .await
            .expect("resolve");
        assert_eq!(thread.contact_source_id, "src-100");
        assert_eq!(thread.conversation_id, 500);
        assert_eq!(thread.contact_id, Some(100));

        let calls = helpdesk.calls().await;
        assert_eq!(
            calls,
            vec![
                "search_contact:6281234567890".to_string(),
                "create_contact:+6281234567890".to_string(),
                "search_contact:6281234567890".to_string(),
                "create_conversation:src-100".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn functional_known_contact_without_conversation_reuses_routing_id() {
        let helpdesk = Arc::new(ScriptedHelpdeskApi::new());
        helpdesk
            .seed_contact(42, "+6281234567890", "Dina", "src-existing", 3, &[])
            .await;
        let resolver = ThreadResolver::new(helpdesk.clone());

        let thread = resolver
            .resolve("6281234567890@s.whatsapp.net", None)
            .await
            .expect("resolve");
        assert_eq!(thread.contact_source_id, "src-existing");
        assert_eq!(thread.conversation_id, 500);
        assert_eq!(thread.inbox_id, Some(3));

        let calls = helpdesk.calls().await;
        assert_eq!(
            calls,
            vec![
                "search_contact:6281234567890".to_string(),
                "list_conversations:42".to_string(),
                "create_conversation:src-existing".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn functional_existing_open_conversation_takes_first_platform_ordered() {
        let helpdesk = Arc::new(ScriptedHelpdeskApi::new());
        helpdesk
            .seed_contact(42, "+6281234567890", "Dina", "src-existing", 3, &[71, 72])
            .await;
        let resolver = ThreadResolver::new(helpdesk.clone());

        let thread = resolver
            .resolve("6281234567890@s.whatsapp.net", None)
            .await
            .expect("resolve");
        assert_eq!(thread.conversation_id, 71);
        assert!(!helpdesk
            .calls()
            .await
            .iter()
            .any(|call| call.starts_with("create_conversation")));
    }

    #[tokio::test]
    async fn regression_remote_failure_surfaces_as_resolution_failed() {
        let helpdesk = Arc::new(ScriptedHelpdeskApi::new());
        helpdesk.set_failing("search_contact").await;
        let resolver = ThreadResolver::new(helpdesk);

        let error = resolver
            .resolve("6281234567890@s.whatsapp.net", None)
            .await
            .expect_err("should fail");
        assert!(matches!(error, CorrelationError::ResolutionFailed(_)));
    }

    #[tokio::test]
    async fn regression_display_name_falls_back_to_formatted_phone() {
        let helpdesk = Arc::new(ScriptedHelpdeskApi::new());
        let resolver = ThreadResolver::new(helpdesk.clone());
        resolver
            .resolve("6281234567890@s.whatsapp.net", Some("  "))
            .await
            .expect("resolve");

        let search = helpdesk.search_contact("6281234567890").await.expect("search");
        assert_eq!(
            search.payload[0].name.as_deref(),
            Some("+6281234567890")
        );
    }
}
