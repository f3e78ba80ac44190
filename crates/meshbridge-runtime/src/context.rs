//! Lifecycle of a node.
//!
//! The state machine is `Uninitialized -> Initializing -> Running` and back.
//! Only transitions take the lock, and never across an `.await`: `init`
//! reserves the slot, builds the instance unlocked, then publishes it or
//! rolls back. Readers clone the `Arc<Instance>` and release the lock
//! immediately, so nobody observes a half-built or torn-down instance.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{info, warn};

use meshbridge_config::ConfigLoader;
use meshbridge_core::{EventBus, MeshError, Result, ServiceEvent};
use meshbridge_proxy::ServiceScope;
use meshbridge_stack::{HostStack, StackProvider};

use crate::instance::Instance;

/// How long `shutdown` waits for background tasks before closing the core.
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

enum LifecycleState {
    Uninitialized,
    Initializing,
    Running(Arc<Instance>),
}

/// Handle owning at most one running [`Instance`].
pub struct Context {
    provider: Arc<dyn StackProvider>,
    state: Mutex<LifecycleState>,
    events: EventBus,
    shutdown_grace: Duration,
}

/// Rolls an `Initializing` reservation back unless it was published, so a
/// failed or dropped `init` leaves the context reusable.
struct Reservation<'a> {
    state: &'a Mutex<LifecycleState>,
    armed: bool,
}

impl Reservation<'_> {
    fn publish(mut self, instance: Arc<Instance>) {
        *self.state.lock() = LifecycleState::Running(instance);
        self.armed = false;
    }
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        if self.armed {
            *self.state.lock() = LifecycleState::Uninitialized;
        }
    }
}

impl Context {
    pub fn new(provider: Arc<dyn StackProvider>) -> Self {
        Self {
            provider,
            state: Mutex::new(LifecycleState::Uninitialized),
            events: EventBus::default(),
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
        }
    }

    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Start a node from configuration text (JSON or TOML).
    pub async fn init(&self, config_text: Option<&str>) -> Result<()> {
        let text = config_text.ok_or(MeshError::NoConfig)?;

        let reservation = {
            let mut state = self.state.lock();
            if !matches!(*state, LifecycleState::Uninitialized) {
                return Err(MeshError::AlreadyInitialized);
            }
            *state = LifecycleState::Initializing;
            Reservation {
                state: &self.state,
                armed: true,
            }
        };

        let config = ConfigLoader::from_text(text)?;
        let core = self.provider.create_core(&config).await?;
        let netstack = match self.provider.create_netstack(Arc::clone(&core)).await {
            Ok(netstack) => netstack,
            Err(e) => {
                core.close().await;
                return Err(e);
            }
        };

        let instance = Arc::new(Instance::new(
            core,
            netstack,
            ServiceScope::new(self.events.clone()),
        ));
        let address = instance.address();
        reservation.publish(instance);

        info!(address = %address, provider = self.provider.name(), "node initialized");
        self.events.publish(ServiceEvent::Initialized { address });
        Ok(())
    }

    /// Tear down the running instance, if any. Idempotent; a no-op while
    /// another call is still initializing.
    pub async fn shutdown(&self) {
        let instance = {
            let mut state = self.state.lock();
            match std::mem::replace(&mut *state, LifecycleState::Uninitialized) {
                LifecycleState::Running(instance) => instance,
                LifecycleState::Initializing => {
                    *state = LifecycleState::Initializing;
                    warn!("shutdown requested while initializing, ignoring");
                    return;
                }
                LifecycleState::Uninitialized => return,
            }
        };

        instance.close(self.shutdown_grace).await;
        self.events.publish(ServiceEvent::ShutDown);
        info!("node shut down");
    }

    fn instance(&self) -> Result<Arc<Instance>> {
        match &*self.state.lock() {
            LifecycleState::Running(instance) => Ok(Arc::clone(instance)),
            _ => Err(MeshError::NotInitialized),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.instance().is_ok()
    }

    /// The node's mesh IPv6 address.
    pub fn address(&self) -> Result<String> {
        Ok(self.instance()?.address())
    }

    /// The routed `/64` subnet in CIDR form.
    pub fn subnet(&self) -> Result<String> {
        Ok(self.instance()?.subnet())
    }

    /// Hex-encoded public key.
    pub fn public_key(&self) -> Result<String> {
        Ok(self.instance()?.public_key())
    }

    pub fn mtu(&self) -> Result<u64> {
        Ok(self.instance()?.mtu())
    }

    /// Start the SOCKS5 proxy on an ephemeral loopback port.
    pub fn start_socks5(&self) -> Result<u16> {
        self.instance()?.start_socks5()
    }

    pub async fn stop_socks5(&self) -> Result<()> {
        self.instance()?.stop_socks5().await
    }

    /// Open a single-use relay to `remote` and return its loopback port.
    pub fn create_relay(&self, remote: &str) -> Result<u16> {
        self.instance()?.create_relay(remote)
    }

    /// Status events: lifecycle changes and background service outcomes.
    pub fn subscribe(&self) -> broadcast::Receiver<ServiceEvent> {
        self.events.subscribe()
    }

    /// Background tasks of the running instance, 0 when not running.
    pub fn active_tasks(&self) -> usize {
        self.instance().map(|i| i.active_tasks()).unwrap_or(0)
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new(Arc::new(HostStack::new()))
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        if let LifecycleState::Running(instance) = &*self.state.get_mut() {
            instance.abort();
        }
    }
}
