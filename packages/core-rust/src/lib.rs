//! Tenancy core: tenant identities, execution context, actors and the isolation error taxonomy.

pub mod context;
pub mod error;
pub mod traits;
pub mod types;

pub use context::ExecutionContext;
pub use error::{ContextField, IsolationError};
pub use traits::{TenantResolver, TenantScoped};
pub use types::{Actor, BranchId, ResolvedTenant, TenantId};

#[cfg(test)]
mod tests {
    #[test]
    fn crate_loads() {
        // Empty body: if this test runs, the crate compiles and loads.
    }
}
