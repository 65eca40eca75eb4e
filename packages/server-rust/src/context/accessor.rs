//! Validated read/write access to the execution context.
//!
//! Business code and the isolation hooks never touch the slot directly; they
//! hold an `Arc<dyn ContextAccessor>`. Production wiring uses
//! [`TaskLocalAccessor`], tests can substitute [`FixedAccessor`].

use parking_lot::Mutex;
use tenancy_core::{BranchId, ExecutionContext, IsolationError, TenantId};
use tracing::{debug, trace, warn};

use super::slot;

/// Read/write façade over the execution context of the current unit of work.
pub trait ContextAccessor: Send + Sync {
    /// Bind identity to the current unit of work, replacing any previous
    /// value. Empty identifiers are stored as absent.
    ///
    /// # Errors
    ///
    /// Returns [`IsolationError::NoUnitOfWork`] when there is no unit of work
    /// to bind to.
    fn set_context(
        &self,
        tenant_id: Option<TenantId>,
        branch_id: Option<BranchId>,
    ) -> Result<(), IsolationError>;

    /// Tenant of the current unit of work, if any.
    fn tenant_id(&self) -> Option<TenantId>;

    /// Branch of the current unit of work, if any.
    fn branch_id(&self) -> Option<BranchId>;

    /// Copy of the whole context. Empty outside a unit of work.
    fn snapshot(&self) -> ExecutionContext;

    /// Remove tenant and branch from the current unit of work. Idempotent.
    fn clear(&self);

    /// Tenant of the current unit of work.
    ///
    /// # Errors
    ///
    /// Returns [`IsolationError::MissingContext`] when no tenant is bound.
    fn require_tenant_id(&self) -> Result<TenantId, IsolationError> {
        self.tenant_id().ok_or_else(|| {
            debug!("tenant required but none bound to the current unit of work");
            IsolationError::missing_tenant()
        })
    }

    /// Branch of the current unit of work.
    ///
    /// # Errors
    ///
    /// Returns [`IsolationError::MissingContext`] when no branch is bound.
    fn require_branch_id(&self) -> Result<BranchId, IsolationError> {
        self.branch_id().ok_or_else(|| {
            debug!("branch required but none bound to the current unit of work");
            IsolationError::missing_branch()
        })
    }

    fn has_tenant(&self) -> bool {
        self.tenant_id().is_some()
    }

    fn has_branch(&self) -> bool {
        self.branch_id().is_some()
    }
}

fn non_empty_tenant(id: Option<TenantId>) -> Option<TenantId> {
    id.filter(|t| !t.is_empty())
}

fn non_empty_branch(id: Option<BranchId>) -> Option<BranchId> {
    id.filter(|b| !b.is_empty())
}

fn bind(ctx: &mut ExecutionContext, tenant_id: Option<TenantId>, branch_id: Option<BranchId>) {
    ctx.tenant_id = non_empty_tenant(tenant_id);
    ctx.branch_id = non_empty_branch(branch_id);
    ctx.system = false;
}

// ---------------------------------------------------------------------------
// TaskLocalAccessor
// ---------------------------------------------------------------------------

/// Accessor backed by the task-local slot of the running unit of work.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskLocalAccessor;

impl ContextAccessor for TaskLocalAccessor {
    fn set_context(
        &self,
        tenant_id: Option<TenantId>,
        branch_id: Option<BranchId>,
    ) -> Result<(), IsolationError> {
        let tenant_field = tenant_id.as_ref().map(ToString::to_string);
        let branch_field = branch_id.as_ref().map(ToString::to_string);
        match slot::write(|ctx| bind(ctx, tenant_id, branch_id)) {
            Some(()) => {
                trace!(
                    tenant_id = tenant_field.as_deref(),
                    branch_id = branch_field.as_deref(),
                    "execution context bound"
                );
                Ok(())
            }
            None => {
                warn!(
                    tenant_id = tenant_field.as_deref(),
                    "context written outside of a unit of work"
                );
                Err(IsolationError::NoUnitOfWork)
            }
        }
    }

    fn tenant_id(&self) -> Option<TenantId> {
        slot::read(|ctx| ctx.tenant_id.clone()).flatten()
    }

    fn branch_id(&self) -> Option<BranchId> {
        slot::read(|ctx| ctx.branch_id.clone()).flatten()
    }

    fn snapshot(&self) -> ExecutionContext {
        slot::current().unwrap_or_default()
    }

    fn clear(&self) {
        if slot::write(|ctx| *ctx = ExecutionContext::default()).is_some() {
            trace!("execution context cleared");
        }
    }
}

// ---------------------------------------------------------------------------
// FixedAccessor
// ---------------------------------------------------------------------------

/// Accessor holding a single context in memory, independent of any task.
///
/// Intended for tests and for code paths that want to exercise isolation
/// logic without a dispatcher. Every caller sharing the instance sees the
/// same context.
#[derive(Debug, Default)]
pub struct FixedAccessor {
    ctx: Mutex<ExecutionContext>,
}

impl FixedAccessor {
    #[must_use]
    pub fn new(ctx: ExecutionContext) -> Self {
        Self {
            ctx: Mutex::new(ctx),
        }
    }

    /// Accessor bound to `tenant_id` with no branch.
    #[must_use]
    pub fn for_tenant(tenant_id: impl Into<TenantId>) -> Self {
        Self::new(ExecutionContext::for_tenant(tenant_id, None))
    }
}

impl ContextAccessor for FixedAccessor {
    fn set_context(
        &self,
        tenant_id: Option<TenantId>,
        branch_id: Option<BranchId>,
    ) -> Result<(), IsolationError> {
        bind(&mut self.ctx.lock(), tenant_id, branch_id);
        Ok(())
    }

    fn tenant_id(&self) -> Option<TenantId> {
        self.ctx.lock().tenant_id.clone()
    }

    fn branch_id(&self) -> Option<BranchId> {
        self.ctx.lock().branch_id.clone()
    }

    fn snapshot(&self) -> ExecutionContext {
        self.ctx.lock().clone()
    }

    fn clear(&self) {
        *self.ctx.lock() = ExecutionContext::default();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
