//! Startup wiring for the isolation subsystem.
//!
//! Builds the accessor, resolver, stamper and gate once and hands out shared
//! references to the data layer and the dispatchers.

use std::sync::Arc;

use tenancy_core::{Actor, TenantResolver};

use crate::context::{ContextAccessor, TaskLocalAccessor};
use crate::isolation::{AccessGate, ContextTenantResolver, TenantStamper};
use crate::service::config::ServerConfig;
use crate::service::domain::RecordService;
use crate::service::middleware::{build_operation_pipeline, OperationPipeline};
use crate::service::operation::{service_names, OperationContext};
use crate::service::router::OperationRouter;
use crate::service::worker::{BackgroundRunnable, BackgroundWorker};
use crate::storage::{RecordStoreFactory, WriteInterceptor};

/// Shared isolation components.
pub struct TenancyModule {
    config: ServerConfig,
    accessor: Arc<dyn ContextAccessor>,
    resolver: Arc<dyn TenantResolver>,
    gate: Arc<AccessGate>,
    factory: RecordStoreFactory,
}

impl TenancyModule {
    /// Wires the production accessor backed by the task-local slot.
    #[must_use]
    pub fn new(config: ServerConfig) -> Self {
        Self::with_accessor(config, Arc::new(TaskLocalAccessor))
    }

    /// Wires every component around the given accessor.
    #[must_use]
    pub fn with_accessor(config: ServerConfig, accessor: Arc<dyn ContextAccessor>) -> Self {
        let resolver: Arc<dyn TenantResolver> =
            Arc::new(ContextTenantResolver::new(Arc::clone(&accessor)));
        let stamper: Arc<dyn WriteInterceptor> = Arc::new(TenantStamper::new(
            Arc::clone(&resolver),
            Arc::clone(&accessor),
        ));
        let gate = Arc::new(AccessGate::new(Arc::clone(&accessor), &config.isolation));
        let factory = RecordStoreFactory::new(Arc::clone(&resolver), vec![stamper]);
        Self {
            config,
            accessor,
            resolver,
            gate,
            factory,
        }
    }

    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    #[must_use]
    pub fn accessor(&self) -> Arc<dyn ContextAccessor> {
        Arc::clone(&self.accessor)
    }

    #[must_use]
    pub fn resolver(&self) -> Arc<dyn TenantResolver> {
        Arc::clone(&self.resolver)
    }

    #[must_use]
    pub fn gate(&self) -> Arc<AccessGate> {
        Arc::clone(&self.gate)
    }

    #[must_use]
    pub fn store_factory(&self) -> &RecordStoreFactory {
        &self.factory
    }

    /// Record service over an in-memory store per named collection.
    #[must_use]
    pub fn record_service<'a>(
        &self,
        collections: impl IntoIterator<Item = &'a str>,
    ) -> Arc<RecordService> {
        let service = collections
            .into_iter()
            .fold(RecordService::new(self.gate(), self.accessor()), |svc, name| {
                svc.with_store(self.factory.create(name))
            });
        Arc::new(service)
    }

    /// Operation pipeline with `records` routed to the record and admin services.
    #[must_use]
    pub fn operation_pipeline(&self, records: &Arc<RecordService>) -> OperationPipeline {
        let mut router = OperationRouter::new();
        router.register(service_names::RECORDS, Arc::clone(records));
        router.register(service_names::ADMIN, Arc::clone(records));
        build_operation_pipeline(router, self.gate(), &self.config)
    }

    /// Operation context with the configured default timeout.
    #[must_use]
    pub fn operation_context(
        &self,
        call_id: u64,
        service_name: &'static str,
        actor: Actor,
    ) -> OperationContext {
        OperationContext::new(
            call_id,
            service_name,
            actor,
            self.config.default_operation_timeout_ms,
        )
    }

    /// Starts a scheduled-job worker ticking at the configured interval.
    pub fn start_worker<R: BackgroundRunnable>(&self, runnable: R) -> BackgroundWorker<R> {
        BackgroundWorker::start(runnable, self.config.job_tick_interval_ms)
    }
}
