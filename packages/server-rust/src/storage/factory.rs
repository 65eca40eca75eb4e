//! Factory for creating fully-wired [`RecordStore`] instances.
//!
//! [`RecordStoreFactory`] is the dependency injection point that connects
//! every store to the shared [`TenantResolver`] and to a
//! [`CompositeWriteInterceptor`] assembled from the registered interceptors.

use std::sync::Arc;

use tenancy_core::TenantResolver;

use crate::storage::engines::HashMapStorage;
use crate::storage::impls::TenantRecordStore;
use crate::storage::interceptor::{CompositeWriteInterceptor, WriteInterceptor};
use crate::storage::record_store::RecordStore;

/// Factory for creating tenant-aware [`RecordStore`] instances.
pub struct RecordStoreFactory {
    resolver: Arc<dyn TenantResolver>,
    interceptor: Arc<CompositeWriteInterceptor>,
}

impl RecordStoreFactory {
    /// Creates a factory. Interceptors run in the order given.
    #[must_use]
    pub fn new(
        resolver: Arc<dyn TenantResolver>,
        interceptors: Vec<Arc<dyn WriteInterceptor>>,
    ) -> Self {
        Self {
            resolver,
            interceptor: Arc::new(CompositeWriteInterceptor::new(interceptors)),
        }
    }

    /// Creates an in-memory [`RecordStore`] for the named collection.
    ///
    /// Every store shares the resolver and interceptor chain; each gets a
    /// fresh [`HashMapStorage`] engine.
    #[must_use]
    pub fn create(&self, collection: &str) -> Arc<dyn RecordStore> {
        Arc::new(TenantRecordStore::new(
            collection,
            Box::new(HashMapStorage::new()),
            Arc::clone(&self.resolver),
            Arc::clone(&self.interceptor),
        ))
    }
}
