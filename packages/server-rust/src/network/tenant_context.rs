//! HTTP dispatch layer binding the tenant context for each request.
//!
//! Reads the authenticated [`Actor`] from request extensions and the
//! requested tenant and branch from configurable headers, asks the
//! [`AccessGate`] what to bind, and runs the rest of the stack inside that
//! unit of work. Requests that fail the gate are answered here.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::extract::Request;
use axum::response::{IntoResponse, Response};
use tenancy_core::{Actor, BranchId, IsolationError, TenantId};
use tower::{Layer, Service};
use tracing::{debug, debug_span, Instrument};

use super::extract::IsolationRejection;
use crate::context;
use crate::isolation::AccessGate;
use crate::service::config::IsolationConfig;

/// Tower layer that opens one unit of work per HTTP request.
#[derive(Clone)]
pub struct HttpTenantContextLayer {
    gate: Arc<AccessGate>,
    tenant_header: Arc<str>,
    branch_header: Arc<str>,
}

impl HttpTenantContextLayer {
    #[must_use]
    pub fn new(gate: Arc<AccessGate>, config: &IsolationConfig) -> Self {
        Self {
            gate,
            tenant_header: Arc::from(config.tenant_header.to_ascii_lowercase()),
            branch_header: Arc::from(config.branch_header.to_ascii_lowercase()),
        }
    }
}

impl<S> Layer<S> for HttpTenantContextLayer {
    type Service = HttpTenantContextService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        HttpTenantContextService {
            inner,
            gate: Arc::clone(&self.gate),
            tenant_header: Arc::clone(&self.tenant_header),
            branch_header: Arc::clone(&self.branch_header),
        }
    }
}

#[derive(Clone)]
pub struct HttpTenantContextService<S> {
    inner: S,
    gate: Arc<AccessGate>,
    tenant_header: Arc<str>,
    branch_header: Arc<str>,
}

fn header_value(req: &Request, name: &str) -> Option<String> {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl<S> Service<Request> for HttpTenantContextService<S>
where
    S: Service<Request, Response = Response> + Send,
    S::Future: Send + 'static,
    S::Error: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Response, S::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request) -> Self::Future {
        let Some(actor) = req.extensions().get::<Actor>().cloned() else {
            debug!(path = %req.uri().path(), "request without authenticated actor");
            let rejection = IsolationRejection(IsolationError::missing_tenant());
            return Box::pin(async move { Ok(rejection.into_response()) });
        };

        let requested_tenant = header_value(&req, &self.tenant_header).map(TenantId::new);
        let requested_branch = header_value(&req, &self.branch_header).map(BranchId::new);

        let bound = match self
            .gate
            .context_for(&actor, requested_tenant.as_ref(), requested_branch)
        {
            Ok(bound) => bound,
            Err(err) => {
                return Box::pin(async move { Ok(IsolationRejection(err).into_response()) });
            }
        };

        let span = debug_span!(
            "unit_of_work",
            actor = %actor.id,
            tenant_id = bound.tenant_id.as_ref().map_or("-", |t| t.as_str()),
            branch_id = bound.branch_id.as_ref().map_or("-", |b| b.as_str()),
            system = bound.system,
        );

        req.extensions_mut().insert(bound.clone());
        let inner = &mut self.inner;
        let fut = context::run_sync(bound.clone(), || inner.call(req));
        Box::pin(context::run(bound, fut).instrument(span))
    }
}
