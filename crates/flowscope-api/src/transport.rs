// Shared transport configuration for building the reqwest::Client.
//
// The appliance authenticates with a session cookie, so every client
// built here carries a cookie store.

use std::time::Duration;

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Per-request timeout.
    pub timeout: Duration,
    /// Accept self-signed certificates (appliances on a LAN rarely have real ones).
    pub accept_invalid_certs: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            accept_invalid_certs: true,
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, crate::error::Error> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(concat!("flowscope/", env!("CARGO_PKG_VERSION")))
            .cookie_store(true)
            .danger_accept_invalid_certs(self.accept_invalid_certs)
            .build()
            .map_err(|e| crate::error::Error::Tls(format!("failed to build HTTP client: {e}")))
    }
}
