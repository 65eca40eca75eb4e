//! Concrete [`RecordStore`](super::RecordStore) implementations.

pub mod tenant_record_store;

pub use tenant_record_store::TenantRecordStore;
