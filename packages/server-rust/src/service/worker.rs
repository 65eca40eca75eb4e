//! Background worker for scheduled and on-demand jobs.
//!
//! Provides a generic `BackgroundWorker<R>` that processes tasks from an mpsc channel
//! via a `BackgroundRunnable` implementation, with optional periodic tick callbacks.
//! Every task is its own unit of work: it runs with the execution context its
//! [`JobScope`] names, and the slot is released when the task returns.

use async_trait::async_trait;
use tenancy_core::{BranchId, ExecutionContext, TenantId};
use tokio::sync::mpsc;
use tracing::debug;

use crate::context;

// ---------------------------------------------------------------------------
// JobScope
// ---------------------------------------------------------------------------

/// Tenant scope a scheduled task runs under.
pub trait JobScope {
    fn context(&self) -> ExecutionContext;
}

/// A job payload paired with the tenant it runs for.
#[derive(Debug, Clone)]
pub struct TenantJob<T> {
    pub context: ExecutionContext,
    pub payload: T,
}

impl<T> TenantJob<T> {
    /// Job bound to one tenant (and optionally a branch).
    pub fn for_tenant(tenant: impl Into<TenantId>, branch: Option<BranchId>, payload: T) -> Self {
        Self {
            context: ExecutionContext::for_tenant(tenant, branch),
            payload,
        }
    }

    /// Cross-tenant maintenance job running in root scope.
    pub fn system(payload: T) -> Self {
        Self {
            context: ExecutionContext::system(),
            payload,
        }
    }
}

impl<T> JobScope for TenantJob<T> {
    fn context(&self) -> ExecutionContext {
        self.context.clone()
    }
}

// ---------------------------------------------------------------------------
// BackgroundRunnable trait
// ---------------------------------------------------------------------------

/// Trait for task handlers executed by `BackgroundWorker`.
#[async_trait]
pub trait BackgroundRunnable: Send + 'static {
    /// The type of task this runnable processes.
    type Task: JobScope + Send + 'static;

    /// Process a single task. Runs inside the task's unit of work.
    async fn run(&mut self, task: Self::Task);

    /// Called periodically in system scope. Default is a no-op.
    async fn on_tick(&mut self) {}

    /// Called once when the worker is shutting down. Default is a no-op.
    async fn shutdown(&mut self) {}
}

// ---------------------------------------------------------------------------
// BackgroundWorker
// ---------------------------------------------------------------------------

/// Generic background worker that processes tasks via an mpsc channel.
///
/// The worker spawns a tokio task that:
/// 1. Listens for tasks on the mpsc channel
/// 2. Calls `BackgroundRunnable::run()` for each task inside the task's scope
/// 3. Periodically calls `BackgroundRunnable::on_tick()` inside a system scope
/// 4. Calls `BackgroundRunnable::shutdown()` when stopped
pub struct BackgroundWorker<R: BackgroundRunnable> {
    tx: Option<mpsc::Sender<R::Task>>,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl<R: BackgroundRunnable> BackgroundWorker<R> {
    /// Start the background worker with the given runnable and tick interval.
    ///
    /// The channel capacity is fixed at 256.
    pub fn start(mut runnable: R, tick_interval_ms: u64) -> Self {
        let (tx, mut rx) = mpsc::channel::<R::Task>(256);
        let (shutdown_tx, mut shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            let mut tick_interval =
                tokio::time::interval(std::time::Duration::from_millis(tick_interval_ms));
            // Skip the first immediate tick so on_tick doesn't fire at startup.
            tick_interval.tick().await;

            loop {
                tokio::select! {
                    task = rx.recv() => {
                        let Some(task) = task else { break };
                        let scope = task.context();
                        debug!(
                            tenant = %scope.resolved_tenant(),
                            system = scope.system,
                            "running scheduled task"
                        );
                        context::run(scope, runnable.run(task)).await;
                    }
                    _ = tick_interval.tick() => {
                        context::run(ExecutionContext::system(), runnable.on_tick()).await;
                    }
                    _ = &mut shutdown_rx => {
                        break;
                    }
                }
            }

            runnable.shutdown().await;
        });

        Self {
            tx: Some(tx),
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    /// Submit a task to the worker.
    ///
    /// # Errors
    ///
    /// Returns an error if the worker has been stopped or the channel is closed.
    pub async fn submit(&self, task: R::Task) -> anyhow::Result<()> {
        match &self.tx {
            Some(tx) => tx
                .send(task)
                .await
                .map_err(|_| anyhow::anyhow!("worker channel closed")),
            None => Err(anyhow::anyhow!("worker not running")),
        }
    }

    /// Stop the worker gracefully, waiting for the worker task to complete.
    pub async fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        self.tx.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
