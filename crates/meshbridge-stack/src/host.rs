//! A stack provider backed by the host's own network stack.
//!
//! The core derives its identity and mesh address from the configured key,
//! checks every peer URI, and binds the configured listen sockets so that a
//! port conflict fails startup the same way the mesh daemon does. Dials go
//! out through host routing, which reaches mesh addresses whenever the host
//! has its own mesh interface up.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::io;
use std::net::{Ipv6Addr, SocketAddr, TcpListener, UdpSocket};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use meshbridge_config::{NodeConfig, PrivateKey, PublicKey};
use meshbridge_core::{MeshError, Result};

use crate::address::{addr_for_key, subnet_cidr};
use crate::peer::{PeerScheme, PeerUri};
use crate::provider::{BoxedConn, MIN_MTU, MeshCore, Netstack, StackProvider};

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Host-backed [`StackProvider`].
#[derive(Debug, Clone)]
pub struct HostStack {
    connect_timeout: Duration,
}

impl HostStack {
    pub fn new() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

impl Default for HostStack {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StackProvider for HostStack {
    fn name(&self) -> &str {
        "host"
    }

    async fn create_core(&self, config: &NodeConfig) -> Result<Arc<dyn MeshCore>> {
        let core = HostCore::start(config)?;
        Ok(Arc::new(core))
    }

    async fn create_netstack(&self, core: Arc<dyn MeshCore>) -> Result<Arc<dyn Netstack>> {
        let mtu = core.mtu();
        if mtu < MIN_MTU {
            return Err(MeshError::NetstackCreate(format!(
                "MTU {mtu} is below the IPv6 minimum of {MIN_MTU}"
            )));
        }
        debug!(mtu, "attached host netstack");
        Ok(Arc::new(HostNetstack {
            mtu,
            connect_timeout: self.connect_timeout,
        }))
    }
}

/// Sockets a core holds open for incoming peerings.
enum BoundSocket {
    Stream(TcpListener),
    Datagram(UdpSocket),
}

impl BoundSocket {
    fn local_addr(&self) -> io::Result<SocketAddr> {
        match self {
            BoundSocket::Stream(l) => l.local_addr(),
            BoundSocket::Datagram(s) => s.local_addr(),
        }
    }
}

pub struct HostCore {
    key: PrivateKey,
    address: Ipv6Addr,
    mtu: u64,
    peers: Vec<PeerUri>,
    listeners: Mutex<Vec<BoundSocket>>,
}

impl HostCore {
    pub fn start(config: &NodeConfig) -> Result<Self> {
        let key = match &config.private_key {
            Some(bytes) => PrivateKey::from_bytes(bytes)?,
            None => {
                info!("no private key configured, generating an ephemeral identity");
                PrivateKey::generate()?
            }
        };

        let peers = config
            .all_peers()
            .map(|p| PeerUri::parse(p).map_err(MeshError::CoreCreate))
            .collect::<Result<Vec<_>>>()?;

        let mut listeners = Vec::with_capacity(config.listen.len());
        for raw in &config.listen {
            let uri = PeerUri::parse(raw).map_err(MeshError::CoreCreate)?;
            let socket = bind_listen(&uri)?;
            if let Ok(addr) = socket.local_addr() {
                info!(listen = %uri, local = %addr, "bound peering listener");
            }
            listeners.push(socket);
        }

        let address = addr_for_key(&key.public_key());
        for peer in &peers {
            debug!(peer = %peer, "peer configured");
        }
        info!(
            address = %address,
            peers = peers.len(),
            listeners = listeners.len(),
            "mesh core started"
        );

        Ok(Self {
            key,
            address,
            mtu: config.effective_mtu(),
            peers,
            listeners: Mutex::new(listeners),
        })
    }

    pub fn peers(&self) -> &[PeerUri] {
        &self.peers
    }

    /// Local addresses of the peering listeners still open.
    pub fn listen_addrs(&self) -> Vec<SocketAddr> {
        self.listeners
            .lock()
            .iter()
            .filter_map(|l| l.local_addr().ok())
            .collect()
    }
}

fn bind_listen(uri: &PeerUri) -> Result<BoundSocket> {
    let bind_err = |e: io::Error| {
        MeshError::CoreCreate(format!("failed to bind listener {uri}: {e}"))
    };
    match uri.scheme {
        s if s.is_stream() => TcpListener::bind(&uri.target)
            .map(BoundSocket::Stream)
            .map_err(bind_err),
        PeerScheme::Quic => UdpSocket::bind(&uri.target)
            .map(BoundSocket::Datagram)
            .map_err(bind_err),
        other => Err(MeshError::CoreCreate(format!(
            "cannot listen on scheme '{other}' ({uri})"
        ))),
    }
}

#[async_trait]
impl MeshCore for HostCore {
    fn address(&self) -> Ipv6Addr {
        self.address
    }

    fn subnet(&self) -> String {
        subnet_cidr(&self.key.public_key())
    }

    fn public_key(&self) -> PublicKey {
        self.key.public_key()
    }

    fn mtu(&self) -> u64 {
        self.mtu
    }

    async fn close(&self) {
        let closed: Vec<_> = self.listeners.lock().drain(..).collect();
        if !closed.is_empty() {
            info!(count = closed.len(), "closed peering listeners");
        }
        debug!(address = %self.address, "mesh core stopped");
    }
}

struct HostNetstack {
    mtu: u64,
    connect_timeout: Duration,
}

#[async_trait]
impl Netstack for HostNetstack {
    async fn dial_tcp(&self, addr: SocketAddr) -> io::Result<BoxedConn> {
        let stream = tokio::time::timeout(self.connect_timeout, tokio::net::TcpStream::connect(addr))
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, format!("dial {addr} timed out")))??;
        if let Err(e) = stream.set_nodelay(true) {
            warn!(error = %e, "failed to set TCP_NODELAY");
        }
        debug!(%addr, "dialed through host netstack");
        Ok(Box::new(stream))
    }

    fn mtu(&self) -> u64 {
        self.mtu
    }
}
