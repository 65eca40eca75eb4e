//! Tower middleware layers for the operation pipeline.
//!
//! - [`timeout`]: Per-operation timeout enforcement
//! - [`tenant_context`]: Binds the caller's tenant for the unit of work
//! - [`metrics`]: Operation timing and counting
//! - [`load_shed`]: Semaphore-based concurrency limiting
//! - [`pipeline`]: Composes all layers into a single service stack

pub mod load_shed;
pub mod metrics;
pub mod pipeline;
pub mod tenant_context;
pub mod timeout;

pub use load_shed::LoadShedLayer;
pub use metrics::MetricsLayer;
pub use pipeline::{build_operation_pipeline, OperationPipeline};
pub use tenant_context::TenantContextLayer;
pub use timeout::TimeoutLayer;
