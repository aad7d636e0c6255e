//! Most recently integrated record per identity key.

use std::collections::HashMap;

use crate::normalize::IdentityKey;
use crate::record::Record;

/// Owns the latest record for every integrated key.
///
/// Callers only ever receive borrows or clones; the cached instance itself
/// never leaves the cache.
#[derive(Debug, Clone)]
pub struct RecordCache<R> {
    entries: HashMap<IdentityKey, R>,
}

impl<R> Default for RecordCache<R> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<R: Record> RecordCache<R> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `record` under `key`, returning the entry it replaced.
    pub fn insert(&mut self, key: IdentityKey, record: R) -> Option<R> {
        self.entries.insert(key, record)
    }

    #[must_use]
    pub fn get(&self, key: &IdentityKey) -> Option<&R> {
        self.entries.get(key)
    }

    /// An independent copy of the cached record, safe to hand downstream.
    #[must_use]
    pub fn checkout(&self, key: &IdentityKey) -> Option<R> {
        self.entries.get(key).cloned()
    }

    #[must_use]
    pub fn contains(&self, key: &IdentityKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &IdentityKey> {
        self.entries.keys()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
