//! In-memory [`StorageEngine`] implementation backed by [`DashMap`].

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::storage::engine::StorageEngine;
use crate::storage::record::Record;

/// In-memory storage backed by [`DashMap`] for concurrent access without
/// external locking.
///
/// Conditional writes hold the key's shard lock for the whole
/// read-decide-write step, so two writers racing on one key are serialized.
pub struct HashMapStorage {
    entries: DashMap<String, Record>,
}

impl HashMapStorage {
    /// Creates a new, empty `HashMapStorage`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }
}

impl Default for HashMapStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageEngine for HashMapStorage {
    fn get(&self, key: &str) -> Option<Record> {
        self.entries.get(key).map(|r| r.clone())
    }

    fn upsert(
        &self,
        key: &str,
        next: &mut dyn FnMut(Option<&Record>) -> anyhow::Result<Record>,
    ) -> anyhow::Result<Option<Record>> {
        match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut slot) => {
                let record = next(Some(slot.get()))?;
                Ok(Some(slot.insert(record)))
            }
            Entry::Vacant(slot) => {
                let record = next(None)?;
                slot.insert(record);
                Ok(None)
            }
        }
    }

    fn remove_if(&self, key: &str, should_remove: &dyn Fn(&Record) -> bool) -> Option<Record> {
        self.entries
            .remove_if(key, |_, record| should_remove(record))
            .map(|(_, r)| r)
    }

    fn entry_count(&self) -> usize {
        self.entries.len()
    }

    fn clear(&self) -> usize {
        let mut removed = 0;
        self.entries.retain(|_, _| {
            removed += 1;
            false
        });
        removed
    }

    fn snapshot_iter(&self) -> Vec<(String, Record)> {
        let mut entries: Vec<(String, Record)> = self
            .entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn record(n: i64) -> Record {
        Record::new(serde_json::json!(n), n)
    }

    fn put(storage: &HashMapStorage, key: &str, n: i64) -> Option<Record> {
        storage.upsert(key, &mut |_| Ok(record(n))).unwrap()
    }

    #[test]
    fn upsert_reports_the_replaced_record() {
        let storage = HashMapStorage::new();
        assert!(put(&storage, "a", 1).is_none());
        let old = put(&storage, "a", 2);
        assert_eq!(old.map(|r| r.value), Some(serde_json::json!(1)));
        assert_eq!(storage.entry_count(), 1);
        assert_eq!(storage.get("a").map(|r| r.value), Some(serde_json::json!(2)));
    }

    #[test]
    fn failed_upsert_leaves_entry_untouched() {
        let storage = HashMapStorage::new();
        put(&storage, "a", 1);

        let err = storage
            .upsert("a", &mut |_| anyhow::bail!("refused"))
            .unwrap_err();
        assert_eq!(err.to_string(), "refused");
        assert_eq!(storage.get("a").map(|r| r.value), Some(serde_json::json!(1)));

        assert!(storage.upsert("b", &mut |_| anyhow::bail!("refused")).is_err());
        assert!(storage.get("b").is_none());
    }

    #[test]
    fn remove_if_checks_the_current_record() {
        let storage = HashMapStorage::new();
        put(&storage, "a", 1);

        assert!(storage.remove_if("a", &|r| r.value == serde_json::json!(2)).is_none());
        assert!(storage.get("a").is_some());

        let removed = storage.remove_if("a", &|r| r.value == serde_json::json!(1));
        assert_eq!(removed.map(|r| r.value), Some(serde_json::json!(1)));
        assert!(storage.remove_if("a", &|_| true).is_none());
    }

    #[test]
    fn concurrent_upserts_see_each_other() {
        let storage = Arc::new(HashMapStorage::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let storage = Arc::clone(&storage);
                std::thread::spawn(move || {
                    for _ in 0..250 {
                        storage
                            .upsert("counter", &mut |current| {
                                let n = current
                                    .and_then(|r| r.value.as_i64())
                                    .unwrap_or_default();
                                Ok(record(n + 1))
                            })
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(
            storage.get("counter").map(|r| r.value),
            Some(serde_json::json!(2000))
        );
    }

    #[test]
    fn snapshot_is_sorted_by_key() {
        let storage = HashMapStorage::new();
        put(&storage, "c", 3);
        put(&storage, "a", 1);
        put(&storage, "b", 2);

        let keys: Vec<String> = storage.snapshot_iter().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
    }

    #[test]
    fn clear_reports_removed_entries() {
        let storage = HashMapStorage::default();
        put(&storage, "a", 1);
        put(&storage, "b", 2);
        assert_eq!(storage.clear(), 2);
        assert_eq!(storage.entry_count(), 0);
    }
}
