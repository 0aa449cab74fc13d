use crate::domain::ContentGroup;
use std::collections::{HashMap, HashSet};

/// Last fetched catalog and synchronized ids for one target store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedCatalog {
    pub groups: Vec<ContentGroup>,
    pub enabled_ids: Vec<String>,
}

/// Per-session memo of catalog payloads keyed by target store, plus the
/// in-flight marker that keeps at most one fetch outstanding per key.
///
/// The cache only seeds a load; once the ledger exists it is the source of truth.
#[derive(Debug, Default)]
pub struct SessionCache {
    entries: HashMap<String, CachedCatalog>,
    in_flight: HashSet<String>,
}

impl SessionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&CachedCatalog> {
        self.entries.get(key)
    }

    pub fn set(&mut self, key: &str, entry: CachedCatalog) {
        self.entries.insert(key.to_string(), entry);
    }

    pub fn invalidate(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Claims the fetch slot for `key`. Returns false when a fetch is already
    /// outstanding; the caller must then wait for that one instead.
    pub fn begin_fetch(&mut self, key: &str) -> bool {
        self.in_flight.insert(key.to_string())
    }

    pub fn finish_fetch(&mut self, key: &str) {
        self.in_flight.remove(key);
    }

    pub fn is_in_flight(&self, key: &str) -> bool {
        self.in_flight.contains(key)
    }

    /// Refreshes the cached synchronized ids after a successful sync.
    pub fn record_synced(&mut self, key: &str, ids: Vec<String>) {
        if let Some(entry) = self.entries.get_mut(key) {
            entry.enabled_ids = ids;
        }
    }
}
