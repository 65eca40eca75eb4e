//! Low-level storage engine trait.
//!
//! Defines [`StorageEngine`], the innermost storage layer. Engines know
//! nothing about tenants: scoping is applied one layer up, in the
//! [`RecordStore`](super::RecordStore).

use super::record::Record;

/// Low-level key-value storage for records.
///
/// All operations are synchronous. Wrapped in `Box<dyn StorageEngine>` by the
/// record store.
pub trait StorageEngine: Send + Sync + 'static {
    /// Retrieve a record by key, or `None` if not present.
    fn get(&self, key: &str) -> Option<Record>;

    /// Computes and stores the next record for `key` as one atomic step.
    ///
    /// `next` sees the current record, if any, while no other writer can
    /// touch the key. When it fails the entry is left as it was. Returns the
    /// record that was replaced.
    ///
    /// # Errors
    ///
    /// Returns whatever `next` returns.
    fn upsert(
        &self,
        key: &str,
        next: &mut dyn FnMut(Option<&Record>) -> anyhow::Result<Record>,
    ) -> anyhow::Result<Option<Record>>;

    /// Removes `key` only if `should_remove` holds for the record stored at
    /// the moment of removal. Returns the removed record.
    fn remove_if(&self, key: &str, should_remove: &dyn Fn(&Record) -> bool) -> Option<Record>;

    /// Number of stored records across all tenants.
    fn entry_count(&self) -> usize;

    /// Clear all entries, returning how many were removed. Takes `&self` for
    /// `Box<dyn StorageEngine>` compatibility.
    fn clear(&self) -> usize;

    /// Return a point-in-time snapshot of all entries.
    ///
    /// The snapshot is mutation-tolerant (concurrent modifications do not fail).
    fn snapshot_iter(&self) -> Vec<(String, Record)>;
}
