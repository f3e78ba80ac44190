use async_trait::async_trait;
use std::io;
use std::net::{Ipv6Addr, SocketAddr};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};

use meshbridge_config::{NodeConfig, PublicKey};
use meshbridge_core::Result;

/// Smallest MTU the user-space TCP/IP layer can attach with (the IPv6 minimum).
pub const MIN_MTU: u64 = 1280;

/// A byte stream opened through the stack.
pub trait MeshConn: AsyncRead + AsyncWrite + Unpin + Send + 'static {
    fn local_addr(&self) -> Option<SocketAddr> {
        None
    }

    fn peer_addr(&self) -> Option<SocketAddr> {
        None
    }
}

impl MeshConn for tokio::net::TcpStream {
    fn local_addr(&self) -> Option<SocketAddr> {
        tokio::net::TcpStream::local_addr(self).ok()
    }

    fn peer_addr(&self) -> Option<SocketAddr> {
        tokio::net::TcpStream::peer_addr(self).ok()
    }
}

pub type BoxedConn = Box<dyn MeshConn>;

/// The running mesh engine: identity, addressing, and link MTU.
#[async_trait]
pub trait MeshCore: Send + Sync {
    /// The node's own mesh address.
    fn address(&self) -> Ipv6Addr;

    /// The routed subnet, in CIDR form.
    fn subnet(&self) -> String;

    fn public_key(&self) -> PublicKey;

    /// Largest payload the core moves in one packet.
    fn mtu(&self) -> u64;

    /// Stop the core and release its sockets. Idempotent.
    async fn close(&self);
}

/// The dial capability: a user-space TCP/IP layer attached to a core.
#[async_trait]
pub trait Netstack: Send + Sync {
    async fn dial_tcp(&self, addr: SocketAddr) -> io::Result<BoxedConn>;

    fn mtu(&self) -> u64;
}

/// Creates cores and netstacks. This is the seam between the control layer
/// and the mesh engine it embeds.
#[async_trait]
pub trait StackProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Start a core from parsed configuration.
    /// Errors are `MeshError::CoreCreate`.
    async fn create_core(&self, config: &NodeConfig) -> Result<Arc<dyn MeshCore>>;

    /// Attach a TCP/IP layer to a running core.
    /// Errors are `MeshError::NetstackCreate`.
    async fn create_netstack(&self, core: Arc<dyn MeshCore>) -> Result<Arc<dyn Netstack>>;
}
