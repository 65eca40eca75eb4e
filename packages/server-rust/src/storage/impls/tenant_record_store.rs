//! Record store that applies tenant scoping on top of a [`StorageEngine`].
//!
//! [`TenantRecordStore`] is the reference data-access layer. It calls the
//! [`TenantResolver`] before every read and the [`WriteInterceptor`] chain
//! before every write, and keeps a per-tenant scan cache that is only reused
//! while the resolved tenant stays the same.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use parking_lot::Mutex;
use tenancy_core::{IsolationError, ResolvedTenant, TenantResolver};
use tracing::{debug, warn};

use crate::storage::engine::StorageEngine;
use crate::storage::interceptor::{CompositeWriteInterceptor, WriteInterceptor};
use crate::storage::record::Record;
use crate::storage::record_store::RecordStore;

/// Returns the current wall-clock time as milliseconds since the Unix epoch.
#[allow(clippy::cast_possible_truncation)]
fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

/// Scan results for one tenant at one store generation.
struct ScanCache {
    scope: ResolvedTenant,
    generation: u64,
    entries: Vec<(String, Record)>,
}

/// Tenant-aware record store over a single storage engine.
pub struct TenantRecordStore {
    name: String,
    engine: Box<dyn StorageEngine>,
    resolver: Arc<dyn TenantResolver>,
    interceptor: Arc<CompositeWriteInterceptor>,
    /// Bumped on every write; cached scans from older generations are stale.
    generation: AtomicU64,
    scan_cache: Mutex<Option<ScanCache>>,
}

impl TenantRecordStore {
    /// Creates a new `TenantRecordStore` with the given dependencies.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        engine: Box<dyn StorageEngine>,
        resolver: Arc<dyn TenantResolver>,
        interceptor: Arc<CompositeWriteInterceptor>,
    ) -> Self {
        Self {
            name: name.into(),
            engine,
            resolver,
            interceptor,
            generation: AtomicU64::new(0),
            scan_cache: Mutex::new(None),
        }
    }

    fn bump_generation(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
    }

    fn scope(&self) -> ResolvedTenant {
        self.resolver.resolve_current_tenant()
    }

    /// Cached scan for `scope`, if it may be reused.
    ///
    /// Root scans span every tenant and are never cached. A cache built for a
    /// different tenant is dropped instead of reused.
    fn cached_scan(&self, scope: &ResolvedTenant, generation: u64) -> Option<Vec<(String, Record)>> {
        if self.resolver.is_root(scope) {
            return None;
        }
        let mut cache = self.scan_cache.lock();
        match cache.as_ref() {
            Some(hit) if hit.scope == *scope && hit.generation == generation => {
                Some(hit.entries.clone())
            }
            Some(stale) => {
                if stale.scope != *scope {
                    debug!(
                        store = %self.name,
                        from = %stale.scope,
                        to = %scope,
                        "tenant changed; invalidating scan cache"
                    );
                }
                *cache = None;
                None
            }
            None => None,
        }
    }

    fn store_scan(&self, scope: &ResolvedTenant, generation: u64, entries: &[(String, Record)]) {
        if self.resolver.is_root(scope) {
            return;
        }
        *self.scan_cache.lock() = Some(ScanCache {
            scope: scope.clone(),
            generation,
            entries: entries.to_vec(),
        });
    }
}

#[async_trait]
impl RecordStore for TenantRecordStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get(&self, key: &str) -> anyhow::Result<Option<Record>> {
        let scope = self.scope();
        Ok(self
            .engine
            .get(key)
            .filter(|record| record.is_visible_to(scope.tenant())))
    }

    async fn put(
        &self,
        key: &str,
        value: serde_json::Value,
    ) -> anyhow::Result<Option<serde_json::Value>> {
        let scope = self.scope();
        let now = now_millis();

        let replaced = self.engine.upsert(key, &mut |current| {
            let Some(old) = current else {
                let mut fresh = Record::new(value.clone(), now);
                self.interceptor.before_insert(key, &mut fresh);
                return Ok(fresh);
            };

            if let (Some(owner), Some(requested)) = (&old.tenant_id, scope.tenant()) {
                if owner != requested {
                    warn!(
                        store = %self.name,
                        key,
                        owner = %owner,
                        requested = %requested,
                        "write rejected: key owned by another tenant"
                    );
                    return Err(IsolationError::ResourceTenantMismatch {
                        owner: owner.clone(),
                        requested: requested.clone(),
                    }
                    .into());
                }
            }

            let mut next = old.updated(value.clone(), now);
            self.interceptor.before_update(key, &mut next);
            if old.tenant_id.is_some() && old.tenant_id != next.tenant_id {
                anyhow::bail!(
                    "write interceptor reassigned tenant of '{key}' in store '{}'",
                    self.name
                );
            }
            if old.tenant_id.is_none() && next.tenant_id.is_some() {
                debug!(store = %self.name, key, "unowned record claimed on update");
            }
            Ok(next)
        })?;
        self.bump_generation();

        // An unowned record claimed by a tenant was never visible to it.
        Ok(replaced
            .filter(|old| old.is_visible_to(scope.tenant()))
            .map(|old| old.value))
    }

    async fn remove(&self, key: &str) -> anyhow::Result<Option<Record>> {
        let scope = self.scope();
        let removed = self
            .engine
            .remove_if(key, &|record| record.is_visible_to(scope.tenant()));
        if removed.is_some() {
            self.bump_generation();
        }
        Ok(removed)
    }

    async fn scan(&self) -> anyhow::Result<Vec<(String, Record)>> {
        let scope = self.scope();
        let generation = self.generation.load(Ordering::Acquire);

        if let Some(entries) = self.cached_scan(&scope, generation) {
            return Ok(entries);
        }

        let entries: Vec<(String, Record)> = self
            .engine
            .snapshot_iter()
            .into_iter()
            .filter(|(_, record)| record.is_visible_to(scope.tenant()))
            .collect();
        self.store_scan(&scope, generation, &entries);
        Ok(entries)
    }

    async fn count(&self) -> anyhow::Result<usize> {
        let scope = self.scope();
        if scope.is_root() {
            return Ok(self.engine.entry_count());
        }
        Ok(self.scan().await?.len())
    }

    async fn purge(&self) -> anyhow::Result<usize> {
        let scope = self.scope();
        if scope.is_root() {
            let removed = self.engine.clear();
            self.bump_generation();
            return Ok(removed);
        }

        let visible = |record: &Record| record.is_visible_to(scope.tenant());
        let mut removed = 0;
        for (key, record) in self.engine.snapshot_iter() {
            if visible(&record) && self.engine.remove_if(&key, &visible).is_some() {
                removed += 1;
            }
        }
        self.bump_generation();
        Ok(removed)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
