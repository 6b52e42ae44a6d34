//! In-memory reference store.

use super::{ReferenceEntry, ReferenceStore};
use crate::error::StorageError;
use std::collections::BTreeMap;
use std::sync::RwLock;

#[derive(Clone, Debug)]
struct Slot {
    entry: ReferenceEntry,
    deleted: bool,
}

/// Reference entries held in memory, keyed by segment.
///
/// Deleting an entry only marks it, and [`restore`](Self::restore) brings it back;
/// bulk reads skip marked entries. Mutation between batches is fine: each batch works
/// from its own snapshot.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    slots: RwLock<BTreeMap<String, Slot>>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store where every entry is active.
    #[must_use]
    pub fn from_entries(entries: impl IntoIterator<Item = ReferenceEntry>) -> Self {
        let store = Self::new();
        for entry in entries {
            store.insert(entry);
        }
        store
    }

    /// Insert or overwrite an entry, reactivating it if it was deleted.
    pub fn insert(&self, entry: ReferenceEntry) {
        let mut slots = self.slots.write().unwrap_or_else(|p| p.into_inner());
        slots.insert(
            entry.key.clone(),
            Slot {
                entry,
                deleted: false,
            },
        );
    }

    /// Mark an entry deleted. Returns `false` if the key is unknown or already deleted.
    pub fn soft_delete(&self, key: &str) -> bool {
        self.set_deleted(key, true)
    }

    /// Undo [`soft_delete`](Self::soft_delete). Returns `false` if the key is unknown
    /// or already active.
    pub fn restore(&self, key: &str) -> bool {
        self.set_deleted(key, false)
    }

    /// Number of active entries.
    #[must_use]
    pub fn active_len(&self) -> usize {
        let slots = self.slots.read().unwrap_or_else(|p| p.into_inner());
        slots.values().filter(|s| !s.deleted).count()
    }

    fn set_deleted(&self, key: &str, deleted: bool) -> bool {
        let mut slots = self.slots.write().unwrap_or_else(|p| p.into_inner());
        match slots.get_mut(key) {
            Some(slot) if slot.deleted != deleted => {
                slot.deleted = deleted;
                true
            }
            _ => false,
        }
    }
}

impl ReferenceStore for InMemoryStore {
    fn bulk_read_active_entries(&self) -> Result<Vec<ReferenceEntry>, StorageError> {
        let slots = self.slots.read().unwrap_or_else(|p| p.into_inner());
        Ok(slots
            .values()
            .filter(|s| !s.deleted)
            .map(|s| s.entry.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deleted_entries_are_not_read() {
        let store = InMemoryStore::from_entries(vec![
            ReferenceEntry::new("1300001", "Beijing", "Beijing", "China Mobile"),
            ReferenceEntry::new("1390000", "Shanghai", "Shanghai", "China Unicom"),
        ]);
        assert!(store.soft_delete("1390000"));
        assert!(!store.soft_delete("1390000"));

        let keys: Vec<_> = store
            .bulk_read_active_entries()
            .unwrap()
            .into_iter()
            .map(|e| e.key)
            .collect();
        assert_eq!(keys, vec!["1300001".to_string()]);

        assert!(store.restore("1390000"));
        assert_eq!(store.active_len(), 2);
    }
}
