//! Per-tenant helpdesk configuration record.

use serde::{Deserialize, Serialize};

use crate::helpdesk_types::HelpdeskApiError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
/// Connection settings for one tenant's helpdesk account.
pub struct HelpdeskConfig {
    pub session_id: String,
    pub base_url: String,
    pub agent_token: String,
    pub bot_token: String,
    pub inbox_identifier: String,
    pub account_id: String,
}

impl HelpdeskConfig {
    /// Rejects blank fields. A failed validation is the configuration-missing
    /// case: the engine refuses to initialize for the session until fixed.
    pub fn validate(&self) -> Result<(), HelpdeskApiError> {
        for (field, value) in [
            ("session_id", &self.session_id),
            ("base_url", &self.base_url),
            ("agent_token", &self.agent_token),
            ("bot_token", &self.bot_token),
            ("inbox_identifier", &self.inbox_identifier),
            ("account_id", &self.account_id),
        ] {
            if value.trim().is_empty() {
                return Err(HelpdeskApiError::ConfigurationMissing {
                    detail: format!("helpdesk config field '{field}' is empty"),
                });
            }
        }
        Ok(())
    }

    /// Base URL without a trailing slash, ready for path concatenation.
    pub fn normalized_base_url(&self) -> String {
        self.base_url.trim().trim_end_matches('/').to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::HelpdeskConfig;
    use crate::helpdesk_types::HelpdeskApiError;

    fn sample() -> HelpdeskConfig {
        HelpdeskConfig {
            session_id: "session-1".to_string(),
            base_url: "https://desk.example.com/".to_string(),
            agent_token: "agent-token".to_string(),
            bot_token: "bot-token".to_string(),
            inbox_identifier: "inbox-key".to_string(),
            account_id: "7".to_string(),
        }
    }

    #[test]
    fn unit_validate_accepts_complete_config_and_normalizes_base_url() {
        let config = sample();
        config.validate().expect("valid");
        assert_eq!(config.normalized_base_url(), "https://desk.example.com");
    }

    #[test]
    fn regression_validate_names_the_blank_field() {
        let mut config = sample();
        config.bot_token = "  ".to_string();
        let error = config.validate().expect_err("blank bot token");
        match error {
            HelpdeskApiError::ConfigurationMissing { detail } => {
                assert!(detail.contains("bot_token"), "{detail}");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }
}
