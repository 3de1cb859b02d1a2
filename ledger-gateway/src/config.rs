//! Gateway configuration.
//!
//! This only configures the HTTP listen address. The underlying ledger
//! configuration is taken from `ledger::LedgerConfig::default()`.

use std::net::SocketAddr;

/// Configuration for the gateway's HTTP server.
#[derive(Clone, Debug)]
pub struct GatewayConfig {
    /// Address to bind the HTTP server to.
    pub listen_addr: SocketAddr,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        // Bind to all interfaces so the container port mapping is reachable
        // from the host when running under docker-compose.
        let addr: SocketAddr = "0.0.0.0:8081"
            .parse()
            .expect("hard-coded gateway listen address should parse");
        Self { listen_addr: addr }
    }
}
