//! Reference data: the key → (province, city, carrier) mapping consulted by workers.
//!
//! The mapping lives behind a [`ReferenceStore`], an external collaborator whose only
//! required capability is a bulk read of its currently active entries. At the start of
//! each batch [`load_snapshot`] performs that read once and freezes the result into a
//! [`ReferenceSnapshot`], which every worker then borrows read-only.
//!
//! Stores shipped with the crate:
//! - [`InMemoryStore`]: entries held in memory, with soft-delete and restore
//! - [`CsvReferenceStore`]: a `key,province,city,isp[,deleted_at]` file
//! - [`JsonReferenceStore`]: an object keyed by segment, `{"1300001": {"province": .., "city": .., "isp": ..}}`

pub mod csv;
pub mod json;
pub mod memory;

pub use self::csv::CsvReferenceStore;
pub use self::json::JsonReferenceStore;
pub use self::memory::InMemoryStore;

use crate::error::StorageError;
use std::collections::HashMap;
use tracing::{debug, info};

/// One reference row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReferenceEntry {
    pub key: String,
    pub province: String,
    pub city: String,
    pub carrier_name: String,
}

impl ReferenceEntry {
    pub fn new(
        key: impl Into<String>,
        province: impl Into<String>,
        city: impl Into<String>,
        carrier_name: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            province: province.into(),
            city: city.into(),
            carrier_name: carrier_name.into(),
        }
    }
}

/// Source of reference entries.
///
/// Implementations must return only active entries; anything soft-deleted is invisible
/// to enrichment. The call happens once per batch, before any row is processed.
pub trait ReferenceStore: Send + Sync {
    /// Read every currently active entry.
    ///
    /// # Errors
    /// Returns [`StorageError`] when the store cannot be read. The batch aborts.
    fn bulk_read_active_entries(&self) -> Result<Vec<ReferenceEntry>, StorageError>;
}

impl<S: ReferenceStore + ?Sized> ReferenceStore for &S {
    fn bulk_read_active_entries(&self) -> Result<Vec<ReferenceEntry>, StorageError> {
        (**self).bulk_read_active_entries()
    }
}

impl<S: ReferenceStore + ?Sized> ReferenceStore for Box<S> {
    fn bulk_read_active_entries(&self) -> Result<Vec<ReferenceEntry>, StorageError> {
        (**self).bulk_read_active_entries()
    }
}

/// Immutable point-in-time key → entry mapping for one batch.
///
/// Shared by reference across all workers; it is never mutated after construction, so
/// no locking is involved.
#[derive(Clone, Debug, Default)]
pub struct ReferenceSnapshot {
    entries: HashMap<String, ReferenceEntry>,
}

impl ReferenceSnapshot {
    /// Build a snapshot. On duplicate keys the entry read last wins.
    #[must_use]
    pub fn from_entries(entries: impl IntoIterator<Item = ReferenceEntry>) -> Self {
        let entries = entries.into_iter();
        let mut map = HashMap::with_capacity(entries.size_hint().0);
        for entry in entries {
            if let Some(prev) = map.insert(entry.key.clone(), entry) {
                debug!(key = %prev.key, "duplicate reference key, keeping the later entry");
            }
        }
        Self { entries: map }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&ReferenceEntry> {
        self.entries.get(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<ReferenceEntry> for ReferenceSnapshot {
    fn from_iter<I: IntoIterator<Item = ReferenceEntry>>(iter: I) -> Self {
        Self::from_entries(iter)
    }
}

/// Perform the single bulk read for a batch and freeze it.
///
/// # Errors
/// Propagates the store's [`StorageError`].
pub fn load_snapshot<S: ReferenceStore + ?Sized>(
    store: &S,
) -> Result<ReferenceSnapshot, StorageError> {
    let entries = store.bulk_read_active_entries()?;
    let read = entries.len();
    let snapshot = ReferenceSnapshot::from_entries(entries);
    info!(read, unique = snapshot.len(), "loaded reference snapshot");
    Ok(snapshot)
}
