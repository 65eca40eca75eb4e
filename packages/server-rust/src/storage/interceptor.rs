//! Write interceptor trait and composite implementation.
//!
//! Defines [`WriteInterceptor`], invoked by a [`RecordStore`](super::RecordStore)
//! immediately before a record is first persisted or subsequently updated,
//! and [`CompositeWriteInterceptor`] which fans out to multiple interceptors.

use std::sync::Arc;

use tenancy_core::TenantScoped;

/// Hook run by the data-access layer before every write.
///
/// Interceptors may mutate the record about to be stored. They are
/// registered once at startup and shared read-only afterwards.
///
/// Used as `Arc<dyn WriteInterceptor>`.
pub trait WriteInterceptor: Send + Sync {
    /// Called before a record is stored for the first time.
    fn before_insert(&self, key: &str, record: &mut dyn TenantScoped);

    /// Called before an existing record is overwritten.
    fn before_update(&self, key: &str, record: &mut dyn TenantScoped);
}

/// Composite interceptor that runs several interceptors in registration order.
#[derive(Default)]
pub struct CompositeWriteInterceptor {
    interceptors: Vec<Arc<dyn WriteInterceptor>>,
}

impl CompositeWriteInterceptor {
    /// Creates a composite interceptor with the given list of interceptors.
    #[must_use]
    pub fn new(interceptors: Vec<Arc<dyn WriteInterceptor>>) -> Self {
        Self { interceptors }
    }
}

impl WriteInterceptor for CompositeWriteInterceptor {
    fn before_insert(&self, key: &str, record: &mut dyn TenantScoped) {
        for interceptor in &self.interceptors {
            interceptor.before_insert(key, record);
        }
    }

    fn before_update(&self, key: &str, record: &mut dyn TenantScoped) {
        for interceptor in &self.interceptors {
            interceptor.before_update(key, record);
        }
    }
}
