//! TCP connection setup for backend sessions
//!
//! Resolves the backend address, connects to the first address that accepts,
//! then tunes the socket with socket2: Nagle off for small request/response
//! frames, keepalive on so dead peers surface while a session sits idle.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use socket2::{SockRef, TcpKeepalive};
use tokio::net::TcpStream;
use tracing::debug;

use crate::connection_error::ConnectionError;
use crate::constants::socket::{KEEPALIVE_INTERVAL, KEEPALIVE_TIME};

/// Connect to `host:port` and apply socket tuning
pub async fn connect_tcp(host: &str, port: u16) -> Result<TcpStream, ConnectionError> {
    let address = format!("{}:{}", host, port);
    let addrs: Vec<SocketAddr> = tokio::net::lookup_host(&address)
        .await
        .map_err(|e| ConnectionError::DnsResolution {
            address: address.clone(),
            source: Arc::new(e),
        })?
        .collect();

    if addrs.is_empty() {
        return Err(ConnectionError::DnsResolution {
            address,
            source: Arc::new(io::Error::new(
                io::ErrorKind::NotFound,
                "no addresses returned",
            )),
        });
    }

    let mut last_error = None;
    for addr in addrs {
        match TcpStream::connect(addr).await {
            Ok(stream) => {
                tune_socket(&stream)?;
                debug!(%addr, "Connected to {}", address);
                return Ok(stream);
            }
            Err(e) => {
                debug!(%addr, error = %e, "Connect attempt failed");
                last_error = Some(e);
            }
        }
    }

    Err(ConnectionError::TcpConnect {
        host: host.to_string(),
        port,
        source: Arc::new(last_error.unwrap_or_else(|| {
            io::Error::new(io::ErrorKind::NotConnected, "no address accepted")
        })),
    })
}

/// Apply nodelay and keepalive settings to a connected stream
pub fn tune_socket(stream: &TcpStream) -> Result<(), ConnectionError> {
    let sock = SockRef::from(stream);

    sock.set_tcp_nodelay(true)
        .map_err(|e| socket_config("TCP_NODELAY", e))?;

    let keepalive = TcpKeepalive::new()
        .with_time(KEEPALIVE_TIME)
        .with_interval(KEEPALIVE_INTERVAL);
    sock.set_tcp_keepalive(&keepalive)
        .map_err(|e| socket_config("SO_KEEPALIVE", e))?;

    Ok(())
}

fn socket_config(operation: &'static str, e: io::Error) -> ConnectionError {
    ConnectionError::SocketConfig {
        operation,
        source: Arc::new(e),
    }
}
