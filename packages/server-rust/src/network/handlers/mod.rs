//! HTTP handler definitions.
//!
//! This module defines `AppState` (the shared state carried through axum
//! extractors) and re-exports all handler functions for convenient access
//! when building the router.

pub mod health;
pub mod records;

pub use health::{health_handler, liveness_handler};
pub use records::{
    delete_record_handler, get_record_handler, purge_collection_handler, put_record_handler,
    scan_records_handler,
};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tenancy_core::{Actor, ExecutionContext};
use tower::ServiceExt;

use crate::module::TenancyModule;
use crate::network::extract::ApiError;
use crate::service::{Operation, OperationContext, OperationPipeline, OperationResponse, RecordService};

/// Shared application state passed to all axum handlers via `State` extraction.
///
/// Holds `Arc` references to shared resources so cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    /// Served collections, listed by the health endpoint.
    pub records: Arc<RecordService>,
    /// Operation pipeline every record request is dispatched through.
    pub pipeline: OperationPipeline,
    /// Deadline stamped on each dispatched operation.
    pub operation_timeout_ms: u64,
    next_call_id: Arc<AtomicU64>,
    /// Server process start time, used for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    /// State dispatching through `module`'s pipeline over `records`.
    #[must_use]
    pub fn new(module: &TenancyModule, records: Arc<RecordService>) -> Self {
        Self {
            pipeline: module.operation_pipeline(&records),
            operation_timeout_ms: module.config().default_operation_timeout_ms,
            records,
            next_call_id: Arc::new(AtomicU64::new(1)),
            start_time: Instant::now(),
        }
    }

    /// Operation context for `actor`, requesting the tenant and branch the
    /// HTTP layer already bound.
    pub(crate) fn operation_context(
        &self,
        service_name: &'static str,
        actor: Actor,
        bound: &ExecutionContext,
    ) -> OperationContext {
        let call_id = self.next_call_id.fetch_add(1, Ordering::Relaxed);
        let mut ctx = OperationContext::new(call_id, service_name, actor, self.operation_timeout_ms);
        if let Some(tenant) = &bound.tenant_id {
            ctx = ctx.with_tenant(tenant.clone());
        }
        if let Some(branch) = &bound.branch_id {
            ctx = ctx.with_branch(branch.clone());
        }
        ctx
    }

    /// Runs `op` through a fresh clone of the pipeline.
    pub(crate) async fn dispatch(&self, op: Operation) -> Result<OperationResponse, ApiError> {
        Ok(self.pipeline.clone().oneshot(op).await?)
    }
}
