use crate::types::{BranchId, ResolvedTenant, TenantId};

/// A persisted business entity owned by a tenant.
///
/// The tenant field stays `None` until the first write and is never
/// reassigned by the write path afterwards. Branch ownership is optional;
/// entities without a branch keep the default implementations.
pub trait TenantScoped: Send {
    /// Tenant that owns this record, if already stamped.
    fn tenant_id(&self) -> Option<&TenantId>;

    /// Assigns the owning tenant.
    fn set_tenant_id(&mut self, tenant_id: TenantId);

    /// Branch that owns this record, if the entity tracks branches.
    fn branch_id(&self) -> Option<&BranchId> {
        None
    }

    /// Assigns the owning branch. Ignored by entities without a branch.
    fn set_branch_id(&mut self, _branch_id: BranchId) {}

    /// Whether the entity tracks branch ownership at all.
    fn tracks_branch(&self) -> bool {
        false
    }
}

/// Query-time hook consulted by the data-access layer.
///
/// Called before every query so that results can be restricted to the active
/// tenant, or left unrestricted in root scope.
pub trait TenantResolver: Send + Sync {
    /// Tenant the current unit of work is scoped to.
    fn resolve_current_tenant(&self) -> ResolvedTenant;

    /// Whether `identity` carries no tenant restriction. Used by the data
    /// layer to decide if tenant-keyed session or cache state may be reused.
    fn is_root(&self, identity: &ResolvedTenant) -> bool {
        identity.is_root()
    }
}
