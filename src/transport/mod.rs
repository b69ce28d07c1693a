pub mod traits;
pub mod udp;

#[cfg(test)]
pub(crate) mod testing;

pub use traits::{DatagramEndpoint, EndpointBinder};
pub use udp::{UdpBinder, UdpEndpoint};
