use crate::types::{BranchId, ResolvedTenant, TenantId};

/// Tenant identity bound to one in-flight unit of work.
///
/// Created empty when a unit of work begins, populated by the dispatcher,
/// read by business logic and the data layer, and dropped when the unit of
/// work ends.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionContext {
    /// Tenant scope for multi-tenant isolation. `None` means root scope.
    pub tenant_id: Option<TenantId>,
    /// Branch within the tenant, if the caller selected one.
    pub branch_id: Option<BranchId>,
    /// Set when the unit of work deliberately runs in root scope (operator
    /// requests, system jobs). Distinguishes intended root access from a
    /// dispatcher that forgot to bind a tenant.
    pub system: bool,
}

impl ExecutionContext {
    /// Context scoped to a tenant and optional branch.
    #[must_use]
    pub fn for_tenant(tenant_id: impl Into<TenantId>, branch_id: Option<BranchId>) -> Self {
        Self {
            tenant_id: Some(tenant_id.into()),
            branch_id,
            system: false,
        }
    }

    /// Context for an intentional root/system unit of work.
    #[must_use]
    pub fn system() -> Self {
        Self {
            tenant_id: None,
            branch_id: None,
            system: true,
        }
    }

    /// Scope this context grants the data layer.
    #[must_use]
    pub fn resolved_tenant(&self) -> ResolvedTenant {
        ResolvedTenant::from_identity(self.tenant_id.as_ref())
    }

    /// Whether neither a tenant nor a branch is bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tenant_id.is_none() && self.branch_id.is_none()
    }
}
