use crate::patch::IdentifierMapping;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Stale identifier -> resolved identifier, shared by every clone.
///
/// There is no eviction: the key space is bounded by the distinct stale ids
/// a run touches. Entries are write-once; a second `put` for the same key
/// keeps the first value.
#[derive(Debug, Clone, Default)]
pub struct IdentifierCache {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl IdentifierCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, stale_id: &str) -> Option<String> {
        self.entries.lock().get(stale_id).cloned()
    }

    /// Records a mapping and returns the value now stored for `stale_id`.
    pub fn put(&self, stale_id: &str, resolved_id: &str) -> String {
        self.entries
            .lock()
            .entry(stale_id.to_string())
            .or_insert_with(|| resolved_id.to_string())
            .clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// One-shot export of every entry, ordered by stale id.
    pub fn snapshot(&self) -> IdentifierMapping {
        self.entries
            .lock()
            .iter()
            .map(|(stale, resolved)| (stale.clone(), resolved.clone()))
            .collect()
    }
}
