//! In-memory datagram endpoints with a scripted peer, for tests

use crate::transport::traits::DatagramEndpoint;
use async_trait::async_trait;
use bytes::Bytes;
use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

type Datagram = (Bytes, SocketAddr);

/// Endpoint side handed to the code under test
pub(crate) struct MemoryEndpoint {
    local: SocketAddr,
    outbound: mpsc::UnboundedSender<Datagram>,
    inbound: Mutex<mpsc::UnboundedReceiver<Datagram>>,
}

/// Remote side controlled by the test
pub(crate) struct MemoryPeer {
    pub addr: SocketAddr,
    inbound_tx: mpsc::UnboundedSender<Datagram>,
    outbound_rx: mpsc::UnboundedReceiver<Datagram>,
}

/// Create a connected endpoint/peer pair
pub(crate) fn pair(local: SocketAddr, peer: SocketAddr) -> (Arc<MemoryEndpoint>, MemoryPeer) {
    let (outbound, outbound_rx) = mpsc::unbounded_channel();
    let (inbound_tx, inbound) = mpsc::unbounded_channel();

    let endpoint = Arc::new(MemoryEndpoint {
        local,
        outbound,
        inbound: Mutex::new(inbound),
    });
    let peer = MemoryPeer {
        addr: peer,
        inbound_tx,
        outbound_rx,
    };
    (endpoint, peer)
}

#[async_trait]
impl DatagramEndpoint for MemoryEndpoint {
    async fn send_to(&self, buf: &[u8], target: SocketAddr) -> io::Result<usize> {
        self.outbound
            .send((Bytes::copy_from_slice(buf), target))
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "peer gone"))?;
        Ok(buf.len())
    }

    async fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        let mut inbound = self.inbound.lock().await;
        match inbound.recv().await {
            Some((payload, from)) => {
                let n = payload.len().min(buf.len());
                buf[..n].copy_from_slice(&payload[..n]);
                Ok((n, from))
            }
            None => Err(io::Error::new(
                io::ErrorKind::ConnectionAborted,
                "endpoint closed",
            )),
        }
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        Ok(self.local)
    }
}

impl MemoryPeer {
    /// Deliver a datagram to the endpoint as if sent by the peer
    pub fn deliver(&self, payload: &[u8]) {
        let _ = self
            .inbound_tx
            .send((Bytes::copy_from_slice(payload), self.addr));
    }

    /// Next datagram the endpoint sent, as text
    pub async fn next_sent(&mut self) -> Option<String> {
        self.outbound_rx
            .recv()
            .await
            .map(|(payload, _)| String::from_utf8_lossy(&payload).into_owned())
    }

    /// Next datagram already sent, without waiting
    pub fn try_next_sent(&mut self) -> Option<String> {
        self.outbound_rx
            .try_recv()
            .ok()
            .map(|(payload, _)| String::from_utf8_lossy(&payload).into_owned())
    }

    /// Answer every received command with the script's reply (None = stay silent).
    /// Returns the log of commands the peer saw.
    pub fn respond_with<F>(mut self, mut script: F) -> (JoinHandle<()>, Arc<StdMutex<Vec<String>>>)
    where
        F: FnMut(&str) -> Option<String> + Send + 'static,
    {
        let seen = Arc::new(StdMutex::new(Vec::new()));
        let seen_clone = seen.clone();
        let handle = tokio::spawn(async move {
            while let Some(command) = self.next_sent().await {
                seen_clone.lock().unwrap().push(command.clone());
                if let Some(reply) = script(&command) {
                    self.deliver(reply.as_bytes());
                }
            }
        });
        (handle, seen)
    }
}

pub(crate) fn addr(port: u16) -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], port))
}
