//! Tenancy server binary.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tenancy_server::network::{NetworkConfig, NetworkModule};
use tenancy_server::service::{IsolationConfig, RecordStatsJob, ServerConfig};
use tenancy_server::telemetry::init_tracing;
use tenancy_server::TenancyModule;
use tracing::info;

/// Multi-tenant record server with tenant isolation.
#[derive(Parser, Debug)]
#[command(name = "tenancy-server")]
#[command(version, about, long_about = None)]
struct Args {
    /// Bind address
    #[arg(long, env = "TENANCY_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on (0 picks a free port)
    #[arg(long, env = "TENANCY_PORT", default_value_t = 8080)]
    port: u16,

    /// Node identifier used in logs
    #[arg(long, env = "TENANCY_NODE_ID", default_value = "node-1")]
    node_id: String,

    /// Collections served under /records
    #[arg(long = "collection", env = "TENANCY_COLLECTIONS", value_delimiter = ',', default_value = "records")]
    collections: Vec<String>,

    /// Per-request timeout in milliseconds
    #[arg(long, env = "TENANCY_REQUEST_TIMEOUT_MS", default_value_t = 30_000)]
    request_timeout_ms: u64,

    /// Maximum concurrent operations before load shedding
    #[arg(long, env = "TENANCY_MAX_CONCURRENT", default_value_t = 1000)]
    max_concurrent_operations: u32,

    /// Accept x-actor-* identity headers from an authenticating proxy
    #[arg(long, env = "TENANCY_TRUST_IDENTITY_HEADERS")]
    trust_identity_headers: bool,

    /// Interval in milliseconds between scheduled record statistics runs
    #[arg(long, env = "TENANCY_JOB_TICK_MS", default_value_t = 60_000)]
    job_tick_interval_ms: u64,

    /// Emit logs as JSON
    #[arg(long, env = "TENANCY_LOG_JSON")]
    log_json: bool,

    #[command(flatten)]
    isolation: IsolationConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.log_json)?;

    let config = ServerConfig {
        node_id: args.node_id,
        default_operation_timeout_ms: args.request_timeout_ms,
        max_concurrent_operations: args.max_concurrent_operations,
        job_tick_interval_ms: args.job_tick_interval_ms,
        isolation: args.isolation,
    };
    info!(
        node_id = %config.node_id,
        operator_roles = ?config.isolation.operator_roles,
        "starting tenancy server"
    );

    let tenancy = TenancyModule::new(config);
    let records = tenancy.record_service(args.collections.iter().map(String::as_str));

    let network = NetworkConfig {
        host: args.host,
        port: args.port,
        request_timeout: Duration::from_millis(args.request_timeout_ms),
        trust_identity_headers: args.trust_identity_headers,
    };
    let mut stats = tenancy.start_worker(RecordStatsJob::new(Arc::clone(&records)));
    let mut server = NetworkModule::new(network, &tenancy, records);
    server.start().await?;
    let served = server
        .serve(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await;
    stats.stop().await;
    served
}
