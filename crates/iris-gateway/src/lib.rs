//! Webhook ingress and tenant configuration surface.
//!
//! One POST endpoint per tenant receives helpdesk webhook events; responses
//! are always HTTP 200 plain text except for the configuration-missing case,
//! which returns 400 with a JSON error body. Tenant helpdesk configuration is
//! stored as one atomically-written JSON file per session.

pub mod gateway_config_store;
pub mod gateway_webhook;

pub use gateway_config_store::*;
pub use gateway_webhook::*;
