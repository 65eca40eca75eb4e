//! Tenant-aware record store trait.
//!
//! Defines [`RecordStore`], the data-access interface business services call.
//! Implementations are bound by two contracts:
//!
//! - before every read they ask the [`TenantResolver`](tenancy_core::TenantResolver)
//!   for the active scope and hide rows owned by other tenants;
//! - before every write they run the configured
//!   [`WriteInterceptor`](super::WriteInterceptor) chain.

use async_trait::async_trait;

use super::record::Record;

/// Tenant-scoped storage for one named collection.
///
/// Used as `Arc<dyn RecordStore>`. Errors are `anyhow` errors; isolation
/// violations are carried as [`tenancy_core::IsolationError`] and can be
/// recovered with `downcast_ref`.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Name of the collection this store manages.
    fn name(&self) -> &str;

    /// Get a record visible in the current scope.
    async fn get(&self, key: &str) -> anyhow::Result<Option<Record>>;

    /// Insert or update a record, returning the previous payload.
    ///
    /// A key that exists but belongs to another tenant is rejected, never
    /// overwritten.
    async fn put(&self, key: &str, value: serde_json::Value)
        -> anyhow::Result<Option<serde_json::Value>>;

    /// Remove a record visible in the current scope.
    async fn remove(&self, key: &str) -> anyhow::Result<Option<Record>>;

    /// All records visible in the current scope, ordered by key.
    async fn scan(&self) -> anyhow::Result<Vec<(String, Record)>>;

    /// Number of records visible in the current scope.
    async fn count(&self) -> anyhow::Result<usize>;

    /// Remove every record visible in the current scope. Returns the number removed.
    async fn purge(&self) -> anyhow::Result<usize>;
}
