//! Tenant-aware storage.
//!
//! Provides the trait hierarchy and shared types of the data-access layer:
//!
//! - **Layer 1** ([`StorageEngine`]): Low-level in-memory key-value storage,
//!   unaware of tenants
//! - **Layer 2** ([`RecordStore`]): Tenant scoping on every read and write
//!
//! Additionally defines [`WriteInterceptor`] for hooks that run before every
//! write and [`CompositeWriteInterceptor`] for fan-out to multiple hooks, and
//! [`RecordStoreFactory`] which wires stores to the shared resolver and
//! interceptor chain.

pub mod engine;
pub mod engines;
pub mod factory;
pub mod impls;
pub mod interceptor;
pub mod record;
pub mod record_store;

pub use engine::*;
pub use engines::HashMapStorage;
pub use factory::RecordStoreFactory;
pub use impls::TenantRecordStore;
pub use interceptor::*;
pub use record::*;
pub use record_store::*;
