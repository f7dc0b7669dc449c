//! Reachability checks for running services

use async_trait::async_trait;
use tokio::net::TcpStream;

/// A reachability check against a service's advertised port.
///
/// Failures are reported as a human-readable message and only ever land in
/// the service's status record.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    async fn check(&self, host: &str, port: u16) -> std::result::Result<(), String>;
}

/// Probe that succeeds when a TCP connection to the port can be opened.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpProbe;

#[async_trait]
impl HealthProbe for TcpProbe {
    async fn check(&self, host: &str, port: u16) -> std::result::Result<(), String> {
        TcpStream::connect((host, port))
            .await
            .map(drop)
            .map_err(|e| format!("cannot connect to {host}:{port}: {e}"))
    }
}
