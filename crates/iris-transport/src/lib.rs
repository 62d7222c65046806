//! Transport boundary contract for the bridge.
//!
//! The socket client itself is owned by the session supervisor; this crate
//! defines the typed events it delivers, the chat-identity helpers, and the
//! async client trait the correlation engine drives for sends, read receipts,
//! and media downloads.

pub mod transport_client;
pub mod transport_contract;
pub mod transport_recording;

pub use transport_client::*;
pub use transport_contract::*;
pub use transport_recording::*;
