//! Rejected action audit buffer.

use std::collections::VecDeque;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use gm_common::GroupAction;
use serde::Serialize;

/// Entries kept before the buffer is trimmed.
const MAX_ENTRIES: usize = 1000;

/// Entries kept after trimming.
const TRIM_TO: usize = 500;

/// A refused group action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectionLogEntry {
    pub timestamp: DateTime<Utc>,
    pub group_id: String,
    pub action: GroupAction,
    pub reason: String,
}

/// Bounded in-memory log of refused actions, newest last.
///
/// Once it grows past 1000 entries only the newest 500 are kept.
#[derive(Debug, Default)]
pub struct RejectionLog {
    entries: Mutex<VecDeque<RejectionLogEntry>>,
}

impl RejectionLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry, trimming the oldest on overflow.
    pub fn record(&self, entry: RejectionLogEntry) {
        let Ok(mut entries) = self.entries.lock() else {
            return;
        };
        entries.push_back(entry);
        if entries.len() > MAX_ENTRIES {
            let excess = entries.len() - TRIM_TO;
            entries.drain(..excess);
        }
    }

    /// Up to `limit` of the newest entries, newest first.
    pub fn recent(&self, limit: usize) -> Vec<RejectionLogEntry> {
        let Ok(entries) = self.entries.lock() else {
            return Vec::new();
        };
        entries.iter().rev().take(limit).cloned().collect()
    }

    /// Drop every entry.
    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }

    /// Number of entries held. Zero if the lock is poisoned.
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    /// Whether the log holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
