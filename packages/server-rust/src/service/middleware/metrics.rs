//! Metrics middleware for operations.
//!
//! Records operation duration and outcome on a `tracing` span and in the
//! `metrics` registry. Sits inside the tenant context layer, so the span
//! carries the tenant the operation runs as.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

use tower::{Layer, Service};
use tracing::{info_span, Instrument};

use crate::context;
use crate::service::operation::{Operation, OperationError, OperationResponse};

/// Tower layer that instruments operations with timing and counting.
#[derive(Debug, Clone)]
pub struct MetricsLayer;

impl<S> Layer<S> for MetricsLayer {
    type Service = MetricsService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MetricsService { inner }
    }
}

#[derive(Debug, Clone)]
pub struct MetricsService<S> {
    inner: S,
}

fn outcome(result: &Result<OperationResponse, OperationError>) -> &'static str {
    match result {
        Ok(_) => "ok",
        Err(OperationError::Isolation(err)) if err.is_authorization_failure() => "denied",
        Err(_) => "error",
    }
}

impl<S> Service<Operation> for MetricsService<S>
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
        let service_name = op.ctx().service_name;
        let call_id = op.ctx().call_id;
        let tenant = context::current()
            .map(|c| c.resolved_tenant().to_string())
            .unwrap_or_default();

        let span = info_span!(
            "operation",
            service = service_name,
            call_id = call_id,
            tenant = %tenant,
            duration_ms = tracing::field::Empty,
            outcome = tracing::field::Empty,
        );

        let fut = self.inner.call(op);

        Box::pin(
            async move {
                let start = Instant::now();
                let result = fut.await;
                let elapsed = start.elapsed();
                let outcome = outcome(&result);

                #[allow(clippy::cast_possible_truncation)]
                let duration_ms = elapsed.as_millis() as u64;
                tracing::Span::current().record("duration_ms", duration_ms);
                tracing::Span::current().record("outcome", outcome);

                metrics::counter!(
                    "tenancy_operations_total",
                    "service" => service_name,
                    "outcome" => outcome,
                )
                .increment(1);
                metrics::histogram!("tenancy_operation_duration_seconds", "service" => service_name)
                    .record(elapsed.as_secs_f64());

                tracing::info!(
                    service = service_name,
                    call_id = call_id,
                    duration_ms = duration_ms,
                    outcome = outcome,
                    "operation complete"
                );

                result
            }
            .instrument(span),
        )
    }
}
