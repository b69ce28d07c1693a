//! Transport trait abstraction for pluggable datagram backends

use async_trait::async_trait;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

/// A bound datagram endpoint that can send to and receive from peers
#[async_trait]
pub trait DatagramEndpoint: Send + Sync + 'static {
    /// Send one datagram to `target`
    async fn send_to(&self, buf: &[u8], target: SocketAddr) -> io::Result<usize>;

    /// Wait for the next datagram; fails once the endpoint is closed
    async fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)>;

    /// Local address the endpoint is bound to
    fn local_addr(&self) -> io::Result<SocketAddr>;
}

/// Factory for binding local datagram endpoints
#[async_trait]
pub trait EndpointBinder: Send + Sync {
    /// Bind an endpoint on the given local port (0 picks an ephemeral port)
    async fn bind(&self, port: u16) -> io::Result<Arc<dyn DatagramEndpoint>>;

    /// Human-readable name for this transport
    fn name(&self) -> &'static str;
}
