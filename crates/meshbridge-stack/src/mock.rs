//! Mock stack provider for deterministic testing.
//!
//! Cores get real identities (key and address derivation are the same as the
//! host stack), but nothing is bound and every dial is recorded. Dials either
//! fail, or are redirected to a fixed local target so tests can play the part
//! of the remote side.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::io;
use std::net::{Ipv6Addr, SocketAddr};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Notify;

use meshbridge_config::{NodeConfig, PrivateKey, PublicKey};
use meshbridge_core::{MeshError, Result};

use crate::address::{addr_for_key, subnet_cidr};
use crate::provider::{BoxedConn, MeshCore, Netstack, StackProvider};

#[derive(Default)]
struct MockState {
    dials: Mutex<Vec<SocketAddr>>,
    dialed: Notify,
    cores_created: AtomicUsize,
    cores_closed: AtomicUsize,
}

/// A mock stack provider.
///
/// # Example
/// ```
/// use meshbridge_stack::mock::MockStack;
/// let stack = MockStack::new().with_mtu(64);
/// assert!(stack.dials().is_empty());
/// ```
#[derive(Clone)]
pub struct MockStack {
    state: Arc<MockState>,
    mtu: Option<u64>,
    redirect: Option<SocketAddr>,
    dial_error: Option<io::ErrorKind>,
    core_error: Option<String>,
    netstack_error: Option<String>,
    create_delay: Option<Duration>,
}

impl MockStack {
    pub fn new() -> Self {
        Self {
            state: Arc::new(MockState::default()),
            mtu: None,
            redirect: None,
            dial_error: None,
            core_error: None,
            netstack_error: None,
            create_delay: None,
        }
    }

    /// Override the MTU reported by cores (ignores `IfMTU`, no lower bound).
    pub fn with_mtu(mut self, mtu: u64) -> Self {
        self.mtu = Some(mtu);
        self
    }

    /// Connect every dial to `target` instead of the requested address.
    pub fn with_redirect(mut self, target: SocketAddr) -> Self {
        self.redirect = Some(target);
        self
    }

    /// Fail every dial with `kind`.
    pub fn with_dial_error(mut self, kind: io::ErrorKind) -> Self {
        self.dial_error = Some(kind);
        self
    }

    pub fn with_core_error(mut self, reason: &str) -> Self {
        self.core_error = Some(reason.to_string());
        self
    }

    pub fn with_netstack_error(mut self, reason: &str) -> Self {
        self.netstack_error = Some(reason.to_string());
        self
    }

    /// Make core creation take at least `delay`.
    pub fn with_create_delay(mut self, delay: Duration) -> Self {
        self.create_delay = Some(delay);
        self
    }

    /// Every address dialed so far, in order.
    pub fn dials(&self) -> Vec<SocketAddr> {
        self.state.dials.lock().clone()
    }

    /// Wait until at least `count` dials have been recorded.
    pub async fn wait_for_dials(&self, count: usize, timeout: Duration) -> bool {
        let wait = async {
            loop {
                let notified = self.state.dialed.notified();
                if self.state.dials.lock().len() >= count {
                    return;
                }
                notified.await;
            }
        };
        tokio::time::timeout(timeout, wait).await.is_ok()
    }

    pub fn cores_created(&self) -> usize {
        self.state.cores_created.load(Ordering::SeqCst)
    }

    pub fn cores_closed(&self) -> usize {
        self.state.cores_closed.load(Ordering::SeqCst)
    }
}

impl Default for MockStack {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StackProvider for MockStack {
    fn name(&self) -> &str {
        "mock"
    }

    async fn create_core(&self, config: &NodeConfig) -> Result<Arc<dyn MeshCore>> {
        if let Some(delay) = self.create_delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(ref reason) = self.core_error {
            return Err(MeshError::CoreCreate(reason.clone()));
        }
        let key = match &config.private_key {
            Some(bytes) => PrivateKey::from_bytes(bytes)?,
            None => PrivateKey::generate()?,
        };
        self.state.cores_created.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(MockCore {
            address: addr_for_key(&key.public_key()),
            key,
            mtu: self.mtu.unwrap_or_else(|| config.effective_mtu()),
            state: Arc::clone(&self.state),
        }))
    }

    async fn create_netstack(&self, core: Arc<dyn MeshCore>) -> Result<Arc<dyn Netstack>> {
        if let Some(ref reason) = self.netstack_error {
            return Err(MeshError::NetstackCreate(reason.clone()));
        }
        Ok(Arc::new(MockNetstack {
            mtu: core.mtu(),
            redirect: self.redirect,
            dial_error: self.dial_error,
            state: Arc::clone(&self.state),
        }))
    }
}

struct MockCore {
    key: PrivateKey,
    address: Ipv6Addr,
    mtu: u64,
    state: Arc<MockState>,
}

#[async_trait]
impl MeshCore for MockCore {
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
        self.state.cores_closed.fetch_add(1, Ordering::SeqCst);
    }
}

struct MockNetstack {
    mtu: u64,
    redirect: Option<SocketAddr>,
    dial_error: Option<io::ErrorKind>,
    state: Arc<MockState>,
}

#[async_trait]
impl Netstack for MockNetstack {
    async fn dial_tcp(&self, addr: SocketAddr) -> io::Result<BoxedConn> {
        self.state.dials.lock().push(addr);
        self.state.dialed.notify_waiters();

        if let Some(kind) = self.dial_error {
            return Err(io::Error::new(kind, format!("mock dial to {addr} failed")));
        }
        match self.redirect {
            Some(target) => {
                let stream = tokio::net::TcpStream::connect(target).await?;
                Ok(Box::new(stream))
            }
            None => Err(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                format!("mock stack has no route to {addr}"),
            )),
        }
    }

    fn mtu(&self) -> u64 {
        self.mtu
    }
}
