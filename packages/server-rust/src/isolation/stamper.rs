//! Write-time tenant stamping.

use std::sync::Arc;

use tenancy_core::{ResolvedTenant, TenantResolver, TenantScoped};
use tracing::trace;

use crate::context::ContextAccessor;
use crate::storage::interceptor::WriteInterceptor;

/// Assigns the active tenant (and branch) to records that carry none.
///
/// Never overwrites an owner that is already set and never clears one. In
/// root scope records are left unstamped.
pub struct TenantStamper {
    resolver: Arc<dyn TenantResolver>,
    accessor: Arc<dyn ContextAccessor>,
}

impl TenantStamper {
    #[must_use]
    pub fn new(resolver: Arc<dyn TenantResolver>, accessor: Arc<dyn ContextAccessor>) -> Self {
        Self { resolver, accessor }
    }

    fn stamp(&self, key: &str, record: &mut dyn TenantScoped, phase: &'static str) {
        let ResolvedTenant::Tenant(tenant) = self.resolver.resolve_current_tenant() else {
            return;
        };

        if record.tenant_id().is_none() {
            trace!(key, phase, tenant_id = %tenant, "stamping tenant");
            record.set_tenant_id(tenant.clone());
        }

        // Branch stamping only applies to rows of the bound tenant.
        if record.tracks_branch()
            && record.branch_id().is_none()
            && record.tenant_id() == Some(&tenant)
        {
            if let Some(branch) = self.accessor.branch_id() {
                trace!(key, phase, branch_id = %branch, "stamping branch");
                record.set_branch_id(branch);
            }
        }
    }
}

impl WriteInterceptor for TenantStamper {
    fn before_insert(&self, key: &str, record: &mut dyn TenantScoped) {
        self.stamp(key, record, "insert");
    }

    fn before_update(&self, key: &str, record: &mut dyn TenantScoped) {
        self.stamp(key, record, "update");
    }
}
