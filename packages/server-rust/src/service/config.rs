use serde::Deserialize;

/// Server-level configuration for the operation routing framework.
///
/// Controls operation timeouts, concurrency limits, and background task intervals.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Unique identifier for this server node.
    pub node_id: String,
    /// Default timeout for operations in milliseconds.
    pub default_operation_timeout_ms: u64,
    /// Maximum number of concurrent operations before load shedding.
    pub max_concurrent_operations: u32,
    /// Interval between scheduled job ticks in milliseconds.
    pub job_tick_interval_ms: u64,
    /// Tenant isolation settings.
    pub isolation: IsolationConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            node_id: String::new(),
            default_operation_timeout_ms: 30_000,
            max_concurrent_operations: 1000,
            job_tick_interval_ms: 60_000,
            isolation: IsolationConfig::default(),
        }
    }
}

/// Tenant isolation settings.
///
/// Loadable from command-line flags, from the environment, or from any
/// `serde` source. Missing fields take the defaults below.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, clap::Args)]
#[serde(default)]
pub struct IsolationConfig {
    /// Role markers that grant the operator bypass. Matched case-insensitively.
    #[arg(
        long = "operator-role",
        env = "TENANCY_OPERATOR_ROLES",
        value_delimiter = ',',
        default_value = "OPERATOR"
    )]
    pub operator_roles: Vec<String>,
    /// HTTP header carrying the tenant a caller asks to act on.
    #[arg(long, env = "TENANCY_TENANT_HEADER", default_value = "x-tenant-id")]
    pub tenant_header: String,
    /// HTTP header carrying the requested branch.
    #[arg(long, env = "TENANCY_BRANCH_HEADER", default_value = "x-branch-id")]
    pub branch_header: String,
}

impl Default for IsolationConfig {
    fn default() -> Self {
        Self {
            operator_roles: vec!["OPERATOR".to_string()],
            tenant_header: "x-tenant-id".to_string(),
            branch_header: "x-branch-id".to_string(),
        }
    }
}
