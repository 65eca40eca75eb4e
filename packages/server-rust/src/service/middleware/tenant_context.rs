//! Tenant context middleware for operations.
//!
//! Decides which tenant an operation runs as and binds it to the execution
//! slot for exactly the lifetime of the inner call. Operations whose caller
//! may not act on the requested tenant are rejected before the inner service
//! is touched.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tower::{Layer, Service};
use tracing::{debug_span, Instrument};

use crate::context;
use crate::isolation::AccessGate;
use crate::service::operation::{Operation, OperationError, OperationResponse};

// ---------------------------------------------------------------------------
// TenantContextLayer
// ---------------------------------------------------------------------------

/// Tower layer that runs every operation inside its own unit of work.
#[derive(Clone)]
pub struct TenantContextLayer {
    gate: Arc<AccessGate>,
}

impl TenantContextLayer {
    #[must_use]
    pub fn new(gate: Arc<AccessGate>) -> Self {
        Self { gate }
    }
}

impl<S> Layer<S> for TenantContextLayer {
    type Service = TenantContextService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        TenantContextService {
            inner,
            gate: Arc::clone(&self.gate),
        }
    }
}

// ---------------------------------------------------------------------------
// TenantContextService
// ---------------------------------------------------------------------------

/// Service wrapper that binds the execution context around the inner call.
#[derive(Clone)]
pub struct TenantContextService<S> {
    inner: S,
    gate: Arc<AccessGate>,
}

impl<S> Service<Operation> for TenantContextService<S>
where
    S: Service<Operation, Response = OperationResponse, Error = OperationError> + Send,
    S::Future: Send + 'static,
{
    type Response = OperationResponse;
    type Error = OperationError;
    type Future = Pin<Box<dyn Future<Output = Result<OperationResponse, OperationError>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, op: Operation) -> Self::Future {
        let ctx = op.ctx();
        let bound = match self.gate.context_for(
            &ctx.actor,
            ctx.requested_tenant.as_ref(),
            ctx.requested_branch.clone(),
        ) {
            Ok(bound) => bound,
            Err(err) => return Box::pin(async move { Err(err.into()) }),
        };

        let span = debug_span!(
            "unit_of_work",
            call_id = ctx.call_id,
            tenant_id = bound.tenant_id.as_ref().map_or("-", |t| t.as_str()),
            branch_id = bound.branch_id.as_ref().map_or("-", |b| b.as_str()),
            system = bound.system,
        );

        // The inner service may read the context while building its future,
        // so the call itself happens inside the scope as well.
        let inner = &mut self.inner;
        let fut = context::run_sync(bound.clone(), || inner.call(op));
        Box::pin(context::run(bound, fut).instrument(span))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
