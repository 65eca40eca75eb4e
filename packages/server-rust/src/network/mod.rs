//! HTTP front end: configuration, transport middleware, the tenant context
//! layer, extractors and handlers.

pub mod config;
pub mod extract;
pub mod handlers;
pub mod identity;
pub mod middleware;
pub mod module;
pub mod tenant_context;

pub use config::NetworkConfig;
pub use extract::{ApiError, CurrentContext, CurrentTenant, IsolationRejection};
pub use handlers::AppState;
pub use module::NetworkModule;
pub use tenant_context::HttpTenantContextLayer;
