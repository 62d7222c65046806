//! Message mapping store: transport message id → helpdesk coordinates.
//!
//! Entries are created the instant a message is dispatched to either side and
//! are insert-once per transport id. Eviction is a lazy sweep over an
//! insertion-ordered queue on every access; entries expire after 24 hours
//! regardless of status. An optional snapshot path mirrors the table to disk
//! atomically for audit/replay; the in-memory table stays authoritative.

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use iris_core::{retention_deadline, write_text_atomic};

use crate::correlation_status::DeliveryStatus;

pub const MAPPING_RETENTION_SECS: u64 = 24 * 60 * 60;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
/// Origin side of a mapped message, recorded explicitly at send time.
pub enum MappingOrigin {
    /// Sent by the bridge itself in response to a helpdesk action.
    Bridge,
    /// Originated on the human agent's own device or from the contact.
    Device,
}

impl MappingOrigin {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bridge => "bridge",
            Self::Device => "device",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
/// Correlation record linking one transport message to its helpdesk message.
pub struct MessageMappingEntry {
    pub transport_message_id: String,
    pub conversation_id: i64,
    pub helpdesk_message_id: i64,
    pub contact_phone: String,
    pub last_status: DeliveryStatus,
    pub origin: MappingOrigin,
    #[serde(default)]
    pub contact_id: Option<i64>,
    #[serde(default)]
    pub inbox_id: Option<i64>,
    pub created_at_unix: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Outcome of a mapping insert.
pub enum MappingInsertOutcome {
    Inserted,
    /// An entry already exists for this transport id; the first mapping wins.
    AlreadyMapped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Outcome of a status-transition attempt.
pub enum StatusTransition {
    Applied {
        from: DeliveryStatus,
        to: DeliveryStatus,
    },
    /// Downgrade or repeat; silently ignored by callers.
    Ignored { stored: DeliveryStatus },
    /// No mapping for the transport id.
    Missing,
}

#[derive(Default)]
/// In-memory mapping table with lazy retention sweeps.
pub struct MessageMappingStore {
    entries: HashMap<String, MessageMappingEntry>,
    insertion_order: VecDeque<(String, u64)>,
    snapshot_path: Option<PathBuf>,
}

impl MessageMappingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store mirrored to `path`, restoring any existing snapshot.
    pub fn with_snapshot_path(path: PathBuf) -> Self {
        let mut store = Self {
            snapshot_path: Some(path),
            ..Self::default()
        };
        store.restore_snapshot();
        store
    }

    fn restore_snapshot(&mut self) {
        let Some(path) = self.snapshot_path.clone() else {
            return;
        };
        let Ok(raw) = std::fs::read_to_string(&path) else {
            return;
        };
        match serde_json::from_str::<Vec<MessageMappingEntry>>(&raw) {
            Ok(entries) => {
                for entry in entries {
                    self.insertion_order
                        .push_back((entry.transport_message_id.clone(), entry.created_at_unix));
                    self.entries
                        .insert(entry.transport_message_id.clone(), entry);
                }
            }
            Err(error) => {
                tracing::warn!(
                    path = %path.display(),
                    %error,
                    "ignoring unreadable mapping snapshot"
                );
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, transport_message_id: &str) -> Option<&MessageMappingEntry> {
        self.entries.get(transport_message_id.trim())
    }

    /// Inserts a new mapping. At most one entry exists per transport id; a
    /// second insert is rejected and the stored entry is untouched.
    pub fn insert(
        &mut self,
        entry: MessageMappingEntry,
        now_unix: u64,
    ) -> MappingInsertOutcome {
        self.sweep(now_unix);
        let key = entry.transport_message_id.trim().to_string();
        if self.entries.contains_key(&key) {
            return MappingInsertOutcome::AlreadyMapped;
        }
        self.insertion_order
            .push_back((key.clone(), entry.created_at_unix));
        self.entries.insert(key, entry);
        self.write_snapshot();
        MappingInsertOutcome::Inserted
    }

    /// Applies a status transition under the strictly-greater rule.
    pub fn apply_status(
        &mut self,
        transport_message_id: &str,
        next: DeliveryStatus,
        now_unix: u64,
    ) -> StatusTransition {
        self.sweep(now_unix);
        let Some(entry) = self.entries.get_mut(transport_message_id.trim()) else {
            return StatusTransition::Missing;
        };
        let stored = entry.last_status;
        if !stored.can_advance_to(next) {
            return StatusTransition::Ignored { stored };
        }
        entry.last_status = next;
        self.write_snapshot();
        StatusTransition::Applied { from: stored, to: next }
    }

    /// Evicts entries older than the retention window. Invoked lazily from
    /// every mutating access; safe to call at any time.
    pub fn sweep(&mut self, now_unix: u64) {
        let mut evicted = false;
        while let Some((key, created_at)) = self.insertion_order.front() {
            if retention_deadline(*created_at, MAPPING_RETENTION_SECS) > now_unix {
                break;
            }
            // Entries are re-keyed only on insert, so the queue head matches
            // the map entry unless the entry was already evicted.
            if let Some(entry) = self.entries.get(key) {
                if entry.created_at_unix == *created_at {
                    self.entries.remove(key);
                    evicted = true;
                }
            }
            self.insertion_order.pop_front();
        }
        if evicted {
            self.write_snapshot();
        }
    }

    fn write_snapshot(&self) {
        let Some(path) = &self.snapshot_path else {
            return;
        };
        let mut entries = self.entries.values().cloned().collect::<Vec<_>>();
        entries.sort_by(|a, b| {
            a.created_at_unix
                .cmp(&b.created_at_unix)
                .then_with(|| a.transport_message_id.cmp(&b.transport_message_id))
        });
        match serde_json::to_string_pretty(&entries) {
            Ok(serialized) => {
                if let Err(error) = write_text_atomic(Path::new(path), &serialized) {
                    tracing::warn!(
                        path = %path.display(),
                        %error,
                        "failed to write mapping snapshot"
                    );
                }
            }
            Err(error) => {
                tracing::warn!(%error, "failed to serialize mapping snapshot");
            }
        }
    }
}
