//! Context-backed [`TenantResolver`].

use std::sync::Arc;

use tenancy_core::{ResolvedTenant, TenantResolver};
use tracing::debug;

use crate::context::ContextAccessor;

/// Resolves the query scope from the execution context.
///
/// A bound, non-empty tenant scopes the query to that tenant. Anything else
/// resolves to root. Root resolutions are logged at `debug` with `implicit`
/// telling an explicit system unit of work apart from a unit of work that
/// simply had no tenant bound.
pub struct ContextTenantResolver {
    accessor: Arc<dyn ContextAccessor>,
}

impl ContextTenantResolver {
    #[must_use]
    pub fn new(accessor: Arc<dyn ContextAccessor>) -> Self {
        Self { accessor }
    }
}

impl TenantResolver for ContextTenantResolver {
    fn resolve_current_tenant(&self) -> ResolvedTenant {
        let ctx = self.accessor.snapshot();
        let resolved = ctx.resolved_tenant();
        if resolved.is_root() {
            if ctx.system {
                debug!(implicit = false, "resolved root scope for system unit of work");
            } else {
                debug!(implicit = true, "no tenant bound; resolved root scope");
                metrics::counter!("tenancy_implicit_root_resolutions_total").increment(1);
            }
        }
        resolved
    }
}

#[cfg(test)]
mod tests {
    use tenancy_core::{ExecutionContext, TenantId};

    use super::*;
    use crate::context::{run, FixedAccessor, TaskLocalAccessor};

    #[test]
    fn bound_tenant_is_returned() {
        let resolver = ContextTenantResolver::new(Arc::new(FixedAccessor::for_tenant("T1")));
        let resolved = resolver.resolve_current_tenant();
        assert_eq!(resolved, ResolvedTenant::Tenant(TenantId::new("T1")));
        assert!(!resolver.is_root(&resolved));
    }

    #[test]
    fn absent_tenant_falls_back_to_root() {
        let resolver = ContextTenantResolver::new(Arc::new(FixedAccessor::default()));
        let resolved = resolver.resolve_current_tenant();
        assert_eq!(resolved, ResolvedTenant::Root);
        assert!(resolver.is_root(&resolved));
    }

    #[test]
    fn system_context_resolves_to_root() {
        let resolver =
            ContextTenantResolver::new(Arc::new(FixedAccessor::new(ExecutionContext::system())));
        assert!(resolver.resolve_current_tenant().is_root());
    }

    #[tokio::test]
    async fn task_local_resolution_follows_the_unit_of_work() {
        let resolver = ContextTenantResolver::new(Arc::new(TaskLocalAccessor));
        assert!(resolver.resolve_current_tenant().is_root());

        let inside = run(ExecutionContext::for_tenant("T9", None), async {
            resolver.resolve_current_tenant()
        })
        .await;
        assert_eq!(inside, ResolvedTenant::Tenant(TenantId::new("T9")));
        assert!(resolver.resolve_current_tenant().is_root());
    }
}
