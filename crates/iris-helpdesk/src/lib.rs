//! Helpdesk (ticketing-platform) HTTP surface.
//!
//! Two credential scopes drive the account REST API: an agent token for
//! read/search/status operations and a bot token for message creation. The
//! unauthenticated public inbox API creates contacts, conversations, and
//! contact-side messages. Webhook payloads are decoded into tagged event
//! variants exactly once, at this boundary.

pub mod helpdesk_agent_client;
pub mod helpdesk_api;
pub mod helpdesk_config;
pub mod helpdesk_public_client;
pub mod helpdesk_scripted;
pub mod helpdesk_types;
pub mod helpdesk_webhook;

pub use helpdesk_agent_client::*;
pub use helpdesk_api::*;
pub use helpdesk_config::*;
pub use helpdesk_public_client::*;
pub use helpdesk_scripted::*;
pub use helpdesk_types::*;
pub use helpdesk_webhook::*;
