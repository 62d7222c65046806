//! Short-horizon duplicate suppression for webhook deliveries.
//!
//! The helpdesk retries webhook deliveries, so identical events can arrive
//! more than once. Fingerprints are consulted before any side effect and kept
//! for five minutes; pruning happens opportunistically on every ingress call,
//! never on a timer.

use std::collections::HashMap;

use iris_core::retention_deadline;

pub const DEDUP_RETENTION_MS: u64 = 5 * 60 * 1000;

#[derive(Default)]
/// Fingerprint cache for webhook ingress.
pub struct DuplicateEventFilter {
    first_seen: HashMap<String, u64>,
}

impl DuplicateEventFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when the fingerprint has not been seen inside the retention
    /// window. Does not record; callers record only once they commit to
    /// processing.
    pub fn should_process(&self, fingerprint: &str, now_ms: u64) -> bool {
        match self.first_seen.get(fingerprint) {
            Some(seen_ms) => retention_deadline(*seen_ms, DEDUP_RETENTION_MS) <= now_ms,
            None => true,
        }
    }

    pub fn record(&mut self, fingerprint: &str, now_ms: u64) {
        self.first_seen.insert(fingerprint.to_string(), now_ms);
    }

    /// Drops fingerprints older than the retention window.
    pub fn prune(&mut self, now_ms: u64) {
        self.first_seen
            .retain(|_, seen_ms| retention_deadline(*seen_ms, DEDUP_RETENTION_MS) > now_ms);
    }

    pub fn len(&self) -> usize {
        self.first_seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.first_seen.is_empty()
    }
}
