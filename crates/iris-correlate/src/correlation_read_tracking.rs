//! Read tracking for transport messages relayed into the helpdesk.
//!
//! When the human agent reads a conversation, the corresponding transport
//! messages must be marked read on the contact's side. Entries live until the
//! mark-read relay succeeds or the retention window lapses.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use iris_core::retention_deadline;

pub const READ_TRACKING_RETENTION_SECS: u64 = 24 * 60 * 60;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
/// One transport message awaiting an agent read signal.
pub struct ReadTrackingEntry {
    pub transport_message_id: String,
    pub chat_id: String,
    pub conversation_id: i64,
    pub recorded_at_unix: u64,
}

#[derive(Default)]
/// Table of unread relayed messages, keyed by transport message id.
pub struct ReadTrackingTable {
    entries: HashMap<String, ReadTrackingEntry>,
}

impl ReadTrackingTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track(
        &mut self,
        transport_message_id: &str,
        chat_id: &str,
        conversation_id: i64,
        now_unix: u64,
    ) {
        self.sweep(now_unix);
        let key = transport_message_id.trim().to_string();
        self.entries.insert(
            key.clone(),
            ReadTrackingEntry {
                transport_message_id: key,
                chat_id: chat_id.trim().to_string(),
                conversation_id,
                recorded_at_unix: now_unix,
            },
        );
    }

    /// Removes and returns all tracked entries for a conversation. Callers
    /// relay the mark-read to the transport; removal happens up front so a
    /// replayed read signal is a no-op.
    pub fn take_for_conversation(&mut self, conversation_id: i64) -> Vec<ReadTrackingEntry> {
        let keys = self
            .entries
            .values()
            .filter(|entry| entry.conversation_id == conversation_id)
            .map(|entry| entry.transport_message_id.clone())
            .collect::<Vec<_>>();
        let mut taken = keys
            .iter()
            .filter_map(|key| self.entries.remove(key))
            .collect::<Vec<_>>();
        taken.sort_by(|a, b| {
            a.recorded_at_unix
                .cmp(&b.recorded_at_unix)
                .then_with(|| a.transport_message_id.cmp(&b.transport_message_id))
        });
        taken
    }

    pub fn sweep(&mut self, now_unix: u64) {
        self.entries.retain(|_, entry| {
            retention_deadline(entry.recorded_at_unix, READ_TRACKING_RETENTION_SECS) > now_unix
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
