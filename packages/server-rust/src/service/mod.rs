//! Operation routing and execution framework.
//!
//! This module implements the service-oriented operation pipeline:
//!
//! 1. **Middleware** (`middleware`): Tower layers (load-shedding, timeout, tenant context, metrics)
//! 2. **Routing** (`router`): Dispatch to domain services by `service_name`
//! 3. **Domain services** (`domain`): Tenant-scoped record operations and record statistics
//! 4. **Background workers** (`worker`): Scheduled jobs, each run as its own unit of work

pub mod config;
pub mod domain;
pub mod middleware;
pub mod operation;
pub mod router;
pub mod worker;

pub use config::{IsolationConfig, ServerConfig};
pub use domain::{RecordService, RecordStatsJob, StatsReport};
pub use operation::{service_names, Operation, OperationContext, OperationError, OperationResponse};
pub use middleware::OperationPipeline;
pub use router::OperationRouter;
pub use worker::{BackgroundRunnable, BackgroundWorker, JobScope, TenantJob};
