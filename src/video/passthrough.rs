//! Decoder that yields raw stream datagrams without decoding them

use super::{Frame, FrameSource, VideoDecoder};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use std::net::SocketAddr;
use tokio::net::UdpSocket;
use tokio::time::Instant;
use tracing::info;

/// Largest datagram the drone sends on the video port
const MAX_VIDEO_DATAGRAM: usize = 2048;

/// Parse `udp://@host:port` (or a bare `host:port`) into a bind address
pub fn parse_stream_address(address: &str) -> Result<SocketAddr> {
    let bare = address
        .strip_prefix("udp://@")
        .or_else(|| address.strip_prefix("udp://"))
        .unwrap_or(address);
    let bare = bare.split('?').next().unwrap_or(bare);
    bare.parse()
        .with_context(|| format!("Invalid stream address: {}", address))
}

/// Frame source over a bound UDP socket; each datagram is one frame
pub struct UdpFrameSource {
    socket: Option<UdpSocket>,
    buf: Vec<u8>,
}

impl UdpFrameSource {
    pub async fn bind(addr: SocketAddr) -> Result<Self> {
        let socket = UdpSocket::bind(addr)
            .await
            .with_context(|| format!("Failed to bind video socket on {}", addr))?;
        Ok(Self {
            socket: Some(socket),
            buf: vec![0u8; MAX_VIDEO_DATAGRAM],
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        match &self.socket {
            Some(socket) => Ok(socket.local_addr()?),
            None => Err(anyhow!("Video source released")),
        }
    }
}

#[async_trait]
impl FrameSource for UdpFrameSource {
    async fn read_frame(&mut self) -> Result<Option<Frame>> {
        let socket = match &self.socket {
            Some(socket) => socket,
            None => return Ok(None),
        };
        let (n, _) = socket.recv_from(&mut self.buf).await?;
        Ok(Some(Frame {
            data: Bytes::copy_from_slice(&self.buf[..n]),
            received_at: Instant::now(),
        }))
    }

    async fn release(&mut self) -> Result<()> {
        if self.socket.take().is_some() {
            info!("[VIDEO] Stream source released");
        }
        Ok(())
    }
}

/// Default decoder: binds the stream address and passes datagrams through
#[derive(Debug, Default)]
pub struct UdpPassthroughDecoder;

#[async_trait]
impl VideoDecoder for UdpPassthroughDecoder {
    async fn open(&self, address: &str) -> Result<Box<dyn FrameSource>> {
        let addr = parse_stream_address(address)?;
        let source = UdpFrameSource::bind(addr).await?;
        info!("[VIDEO] Stream source opened on {}", address);
        Ok(Box::new(source))
    }
}
