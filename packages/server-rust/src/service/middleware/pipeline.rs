//! Pipeline composition: combines all middleware layers into a single service stack.

use std::sync::Arc;

use tower::util::BoxCloneSyncService;
use tower::ServiceBuilder;

use super::load_shed::LoadShedLayer;
use super::metrics::MetricsLayer;
use super::tenant_context::TenantContextLayer;
use super::timeout::TimeoutLayer;
use crate::isolation::AccessGate;
use crate::service::config::ServerConfig;
use crate::service::operation::{Operation, OperationError, OperationResponse};
use crate::service::router::OperationRouter;

/// The assembled operation pipeline. Cloneable, so every caller (an HTTP
/// handler, a test) can take its own handle and `oneshot` an operation.
pub type OperationPipeline = BoxCloneSyncService<Operation, OperationResponse, OperationError>;

/// Build the operation pipeline by wrapping the `OperationRouter` with middleware layers.
///
/// Layer order (outermost to innermost):
/// 1. `LoadShedLayer` -- reject when overloaded (fail fast before doing any work)
/// 2. `TimeoutLayer` -- enforce per-operation timeouts; expiry drops the unit of work
/// 3. `TenantContextLayer` -- authorize the caller and bind its tenant
/// 4. `MetricsLayer` -- record timing and outcome (closest to the actual handler)
#[must_use]
pub fn build_operation_pipeline(
    router: OperationRouter,
    gate: Arc<AccessGate>,
    config: &ServerConfig,
) -> OperationPipeline {
    BoxCloneSyncService::new(
        ServiceBuilder::new()
            .layer(LoadShedLayer::new(config.max_concurrent_operations))
            .layer(TimeoutLayer)
            .layer(TenantContextLayer::new(gate))
            .layer(MetricsLayer)
            .service(router),
    )
}
