//! UDP transport implementation backed by tokio sockets

use crate::transport::traits::{DatagramEndpoint, EndpointBinder};
use async_trait::async_trait;
use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use tokio::net::UdpSocket;

/// UDP socket wrapper implementing DatagramEndpoint
pub struct UdpEndpoint {
    inner: UdpSocket,
}

impl UdpEndpoint {
    pub fn new(socket: UdpSocket) -> Self {
        Self { inner: socket }
    }
}

#[async_trait]
impl DatagramEndpoint for UdpEndpoint {
    async fn send_to(&self, buf: &[u8], target: SocketAddr) -> io::Result<usize> {
        self.inner.send_to(buf, target).await
    }

    async fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        self.inner.recv_from(buf).await
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        self.inner.local_addr()
    }
}

/// Binds UDP endpoints on a local interface
pub struct UdpBinder {
    interface: Ipv4Addr,
}

impl UdpBinder {
    /// Bind on all interfaces, as the drone replies to whatever address sent the command
    pub fn new() -> Self {
        Self {
            interface: Ipv4Addr::UNSPECIFIED,
        }
    }

    /// Bind on loopback only (simulator and tests)
    pub fn loopback() -> Self {
        Self {
            interface: Ipv4Addr::LOCALHOST,
        }
    }
}

impl Default for UdpBinder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EndpointBinder for UdpBinder {
    async fn bind(&self, port: u16) -> io::Result<Arc<dyn DatagramEndpoint>> {
        let socket = UdpSocket::bind(SocketAddr::from((self.interface, port))).await?;
        Ok(Arc::new(UdpEndpoint::new(socket)))
    }

    fn name(&self) -> &'static str {
        "UDP"
    }
}
