//! Tenant isolation policy.
//!
//! - [`resolver`]: query scope for the data layer
//! - [`stamper`]: write-time ownership stamping
//! - [`gate`]: allow/deny decisions with operator bypass and audit logging

pub mod gate;
pub mod resolver;
pub mod stamper;

pub use gate::AccessGate;
pub use resolver::ContextTenantResolver;
pub use stamper::TenantStamper;
