//! Foundational low-level utilities shared across iris crates.
//!
//! Provides atomic file-write helpers and Unix-time utilities used by the
//! tenant config store, mapping snapshots, and retention-window sweeps.

pub mod atomic_io;
pub mod time_utils;

pub use atomic_io::write_text_atomic;
pub use time_utils::{
    current_unix_timestamp, current_unix_timestamp_ms, is_expired_unix, retention_deadline,
};
