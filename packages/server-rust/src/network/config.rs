//! Network configuration types.

use std::time::Duration;

/// Top-level network configuration for the HTTP front end.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Bind address for the server.
    pub host: String,
    /// Port to listen on. 0 means OS-assigned.
    pub port: u16,
    /// Maximum time to wait for a request to complete.
    pub request_timeout: Duration,
    /// Accept `x-actor-*` identity headers from an authenticating proxy.
    ///
    /// Only enable behind a gateway that strips these headers from client
    /// traffic.
    pub trust_identity_headers: bool,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 0,
            request_timeout: Duration::from_secs(30),
            trust_identity_headers: false,
        }
    }
}
