//! Tenancy server: tenant context propagation and access isolation.
//!
//! - [`context`]: per-unit-of-work context slot and its accessor
//! - [`isolation`]: tenant resolver, write-time stamper and access gate
//! - [`storage`]: reference tenant-aware record store
//! - [`service`]: tower operation pipeline, domain services and scheduled jobs
//! - [`network`]: HTTP front end

pub mod context;
pub mod isolation;
pub mod module;
pub mod network;
pub mod service;
pub mod storage;
pub mod telemetry;

pub use context::{ContextAccessor, FixedAccessor, TaskLocalAccessor};
pub use isolation::{AccessGate, ContextTenantResolver, TenantStamper};
pub use module::TenancyModule;
