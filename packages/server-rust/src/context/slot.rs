//! Task-local execution context slot.
//!
//! One slot exists per unit of work. It is created by [`run`], [`run_sync`],
//! or [`spawn_in_context`] and disappears when that scope is left, whatever
//! the exit path: normal return, error, panic unwind, or the owning future
//! being dropped on cancellation. Tokio worker threads are reused across
//! tasks, but a task-local never outlives its scope, so nothing bound for
//! one unit of work can be observed by the next one on the same thread.

use std::cell::RefCell;
use std::future::Future;

use tenancy_core::ExecutionContext;
use tokio::task::JoinHandle;

tokio::task_local! {
    static SLOT: RefCell<ExecutionContext>;
}

/// Run `fut` as a unit of work bound to `ctx`.
pub async fn run<F>(ctx: ExecutionContext, fut: F) -> F::Output
where
    F: Future,
{
    SLOT.scope(RefCell::new(ctx), fut).await
}

/// Run a synchronous unit of work bound to `ctx`.
pub fn run_sync<R>(ctx: ExecutionContext, f: impl FnOnce() -> R) -> R {
    SLOT.sync_scope(RefCell::new(ctx), f)
}

/// Spawn a child task that starts with a copy of the caller's context.
///
/// Tokio tasks do not inherit task-locals. The child gets its own slot, so
/// later writes on either side stay invisible to the other. Called outside a
/// unit of work, the child starts with an empty context.
pub fn spawn_in_context<F>(fut: F) -> JoinHandle<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    let ctx = current().unwrap_or_default();
    tokio::spawn(SLOT.scope(RefCell::new(ctx), fut))
}

/// Whether the caller runs inside a unit of work.
#[must_use]
pub fn is_active() -> bool {
    SLOT.try_with(|_| ()).is_ok()
}

/// Copy of the current context, or `None` outside a unit of work.
#[must_use]
pub fn current() -> Option<ExecutionContext> {
    read(Clone::clone)
}

/// Read the slot. Returns `None` outside a unit of work.
pub(crate) fn read<R>(f: impl FnOnce(&ExecutionContext) -> R) -> Option<R> {
    SLOT.try_with(|cell| f(&cell.borrow())).ok()
}

/// Mutate the slot. Returns `None` outside a unit of work.
pub(crate) fn write<R>(f: impl FnOnce(&mut ExecutionContext) -> R) -> Option<R> {
    SLOT.try_with(|cell| f(&mut cell.borrow_mut())).ok()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tenancy_core::{BranchId, TenantId};

    use super::*;

    #[tokio::test]
    async fn run_exposes_context_inside_scope_only() {
        assert!(!is_active());

        let seen = run(ExecutionContext::for_tenant("T1", None), async {
            tokio::task::yield_now().await;
            current()
        })
        .await;

        assert_eq!(seen.and_then(|c| c.tenant_id), Some(TenantId::new("T1")));
        assert!(!is_active());
        assert!(current().is_none());
    }

    #[test]
    fn run_sync_scopes_blocking_work() {
        let branch = run_sync(
            ExecutionContext::for_tenant("T1", Some(BranchId::new("B7"))),
            || read(|c| c.branch_id.clone()),
        );
        assert_eq!(branch.flatten(), Some(BranchId::new("B7")));
        assert!(!is_active());
    }

    #[tokio::test]
    async fn nested_scope_shadows_and_restores_outer() {
        run(ExecutionContext::for_tenant("outer", None), async {
            run(ExecutionContext::for_tenant("inner", None), async {
                assert_eq!(
                    current().and_then(|c| c.tenant_id),
                    Some(TenantId::new("inner"))
                );
            })
            .await;
            assert_eq!(
                current().and_then(|c| c.tenant_id),
                Some(TenantId::new("outer"))
            );
        })
        .await;
    }

    #[tokio::test]
    async fn spawned_child_gets_a_copy_not_a_share() {
        run(ExecutionContext::for_tenant("T1", None), async {
            let child = spawn_in_context(async {
                write(|c| c.tenant_id = Some(TenantId::new("child")));
                tokio::time::sleep(Duration::from_millis(5)).await;
                current().and_then(|c| c.tenant_id)
            });
            let child_seen = child.await.unwrap();
            assert_eq!(child_seen, Some(TenantId::new("child")));
            assert_eq!(
                current().and_then(|c| c.tenant_id),
                Some(TenantId::new("T1"))
            );
        })
        .await;
    }

    #[tokio::test]
    async fn plain_spawn_does_not_inherit() {
        run(ExecutionContext::for_tenant("T1", None), async {
            let handle = tokio::spawn(async { is_active() });
            assert!(!handle.await.unwrap());
        })
        .await;
    }

    #[tokio::test]
    async fn write_outside_scope_is_rejected() {
        assert!(write(|c| c.tenant_id = Some(TenantId::new("T1"))).is_none());
        assert!(read(|c| c.tenant_id.clone()).is_none());
    }
}
