//! Network module with deferred startup lifecycle.
//!
//! `new()` assembles shared state, `start()` binds the TCP listener, and
//! `serve()` starts accepting connections.

use std::future::Future;
use std::sync::Arc;

use axum::routing::{delete, get};
use axum::Router;
use tokio::net::TcpListener;
use tracing::info;

use super::config::NetworkConfig;
use super::handlers::{
    delete_record_handler, get_record_handler, health_handler, liveness_handler,
    purge_collection_handler, put_record_handler, scan_records_handler, AppState,
};
use super::identity::trusted_identity;
use super::middleware::build_http_layers;
use super::tenant_context::HttpTenantContextLayer;
use crate::isolation::AccessGate;
use crate::module::TenancyModule;
use crate::service::{IsolationConfig, RecordService};

/// Manages the HTTP server lifecycle.
pub struct NetworkModule {
    config: NetworkConfig,
    isolation: IsolationConfig,
    gate: Arc<AccessGate>,
    state: AppState,
    listener: Option<TcpListener>,
}

impl NetworkModule {
    /// Creates a new network module without binding any port.
    ///
    /// Record requests are dispatched through `tenancy`'s operation
    /// pipeline over `records`.
    #[must_use]
    pub fn new(config: NetworkConfig, tenancy: &TenancyModule, records: Arc<RecordService>) -> Self {
        Self {
            config,
            isolation: tenancy.config().isolation.clone(),
            gate: tenancy.gate(),
            state: AppState::new(tenancy, records),
            listener: None,
        }
    }

    /// Assembles the axum router with all routes and middleware.
    ///
    /// Routes:
    /// - `GET /health`, `GET /health/live` -- no identity required
    /// - `GET /records/{collection}` -- scan
    /// - `GET|PUT|DELETE /records/{collection}/{key}`
    /// - `DELETE /admin/collections/{collection}` -- operator purge
    pub fn build_router(&self) -> Router {
        let api = Router::new()
            .route("/records/{collection}", get(scan_records_handler))
            .route(
                "/records/{collection}/{key}",
                get(get_record_handler)
                    .put(put_record_handler)
                    .delete(delete_record_handler),
            )
            .route(
                "/admin/collections/{collection}",
                delete(purge_collection_handler),
            )
            .layer(HttpTenantContextLayer::new(
                Arc::clone(&self.gate),
                &self.isolation,
            ));

        let mut router = Router::new()
            .route("/health", get(health_handler))
            .route("/health/live", get(liveness_handler))
            .merge(api);

        if self.config.trust_identity_headers {
            router = router.layer(axum::middleware::from_fn(trusted_identity));
        }

        router
            .layer(build_http_layers(&self.config))
            .with_state(self.state.clone())
    }

    /// Binds the TCP listener to the configured host and port.
    ///
    /// Returns the actual bound port, which may differ from the configured
    /// port when port 0 is used.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound (e.g., port in use).
    pub async fn start(&mut self) -> anyhow::Result<u16> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&addr).await?;
        let port = listener.local_addr()?.port();

        info!("TCP listener bound to {}:{}", self.config.host, port);

        self.listener = Some(listener);
        Ok(port)
    }

    /// Serves connections until the shutdown signal fires.
    ///
    /// # Errors
    ///
    /// Returns an error if `start()` was not called first or the server
    /// encounters a fatal I/O error.
    pub async fn serve(
        mut self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> anyhow::Result<()> {
        let listener = self
            .listener
            .take()
            .ok_or_else(|| anyhow::anyhow!("start() must be called before serve()"))?;
        let router = self.build_router();

        info!("serving HTTP connections");
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await?;
        info!("HTTP server stopped");
        Ok(())
    }
}
