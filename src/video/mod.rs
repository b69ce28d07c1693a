//! Video pass-through
//!
//! Decoding is not done here. The client only switches the stream on and off
//! and hands out frames from a source opened by an external decoder.

mod passthrough;

pub use passthrough::{UdpFrameSource, UdpPassthroughDecoder};

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use tokio::time::Instant;

/// One unit of video data as produced by a frame source
#[derive(Debug, Clone)]
pub struct Frame {
    pub data: Bytes,
    pub received_at: Instant,
}

/// An open stream of frames
#[async_trait]
pub trait FrameSource: Send + Sync {
    /// Next frame, or `None` once the source has been released
    async fn read_frame(&mut self) -> Result<Option<Frame>>;

    /// Release the underlying stream
    async fn release(&mut self) -> Result<()>;
}

/// Opens frame sources for a stream address such as `udp://@0.0.0.0:11111`
#[async_trait]
pub trait VideoDecoder: Send + Sync {
    async fn open(&self, address: &str) -> Result<Box<dyn FrameSource>>;
}
