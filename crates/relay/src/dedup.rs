//! Set of units already committed to processing.

use std::{collections::HashSet, sync::Mutex};

use crate::types::ProcessedKey;

/// Process-lifetime record of handled posts and albums. Entries are never
/// evicted.
#[derive(Debug, Default)]
pub struct DedupTracker {
    seen: Mutex<HashSet<ProcessedKey>>,
}

impl DedupTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn seen(&self, key: &ProcessedKey) -> bool {
        self.seen
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(key)
    }

    pub fn mark_seen(&self, key: ProcessedKey) {
        self.seen
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key);
    }

    /// Insert `key`, returning `true` when it was not present before.
    pub fn try_mark(&self, key: ProcessedKey) -> bool {
        self.seen
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.seen.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
