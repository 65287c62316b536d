//! Well-known ports and host resolution.
//!
//! Vehicles hold a TCP stream to [`DEFAULT_VEHICLE_PORT`]; riders send UDP
//! datagrams to [`DEFAULT_CLIENT_PORT`].

use std::net::SocketAddr;

use crate::error::NetError;

/// TCP port the server accepts vehicles on.
pub const DEFAULT_VEHICLE_PORT: u16 = 50000;

/// UDP port the server receives ride requests on.
pub const DEFAULT_CLIENT_PORT: u16 = 50001;

/// Host agents connect to when nothing else is configured.
pub const DEFAULT_SERVER_HOST: &str = "127.0.0.1";

/// The environment variable used to override the server host.
pub const SERVER_HOST_ENV: &str = "FLEET_SERVER_HOST";

/// Resolve the server host: an explicit value wins, then
/// [`SERVER_HOST_ENV`], then [`DEFAULT_SERVER_HOST`].
#[must_use]
pub fn server_host(explicit: Option<&str>) -> String {
    match explicit {
        Some(host) => host.to_string(),
        None => std::env::var(SERVER_HOST_ENV).unwrap_or_else(|_| DEFAULT_SERVER_HOST.to_string()),
    }
}

/// Resolve `host:port` to the first matching socket address.
///
/// # Errors
///
/// Returns [`NetError::Io`] if the name cannot be resolved.
pub async fn resolve(host: &str, port: u16) -> Result<SocketAddr, NetError> {
    tokio::net::lookup_host((host, port))
        .await?
        .next()
        .ok_or_else(|| {
            NetError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no address for {host}:{port}"),
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_host_wins() {
        assert_eq!(server_host(Some("10.0.0.5")), "10.0.0.5");
    }

    #[test]
    fn test_ports_are_distinct() {
        assert_ne!(DEFAULT_VEHICLE_PORT, DEFAULT_CLIENT_PORT);
    }

    #[tokio::test]
    async fn test_resolve_loopback() {
        let addr = resolve("127.0.0.1", DEFAULT_CLIENT_PORT).await.unwrap();
        assert_eq!(addr.port(), DEFAULT_CLIENT_PORT);
        assert!(addr.ip().is_loopback());
    }
}
