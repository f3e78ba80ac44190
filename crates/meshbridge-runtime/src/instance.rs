use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use meshbridge_core::{MeshError, Result};
use meshbridge_proxy::{ServiceScope, Socks5Handle};
use meshbridge_stack::{MeshCore, Netstack};

/// A running node: the core, its netstack, and the services spawned on it.
pub struct Instance {
    core: Arc<dyn MeshCore>,
    netstack: Arc<dyn Netstack>,
    scope: ServiceScope,
    socks: Mutex<Option<Socks5Handle>>,
}

impl Instance {
    pub fn new(core: Arc<dyn MeshCore>, netstack: Arc<dyn Netstack>, scope: ServiceScope) -> Self {
        Self {
            core,
            netstack,
            scope,
            socks: Mutex::new(None),
        }
    }

    pub fn address(&self) -> String {
        self.core.address().to_string()
    }

    pub fn subnet(&self) -> String {
        self.core.subnet()
    }

    pub fn public_key(&self) -> String {
        self.core.public_key().to_hex()
    }

    pub fn mtu(&self) -> u64 {
        self.core.mtu()
    }

    pub fn create_relay(&self, remote: &str) -> Result<u16> {
        meshbridge_proxy::spawn_relay(remote, Arc::clone(&self.netstack), &self.scope)
    }

    /// Start the SOCKS5 proxy. A previous proxy whose accept loop died on
    /// its own is replaced; its failure was already reported as
    /// `Socks5Stopped { error }`.
    pub fn start_socks5(&self) -> Result<u16> {
        let mut slot = self.socks.lock();
        if let Some(previous) = slot.as_ref() {
            if !previous.is_finished() {
                return Err(MeshError::AlreadyStarted {
                    port: previous.port(),
                });
            }
            debug!(port = previous.port(), "replacing exited SOCKS5 proxy");
        }
        let handle = meshbridge_proxy::start_socks5(Arc::clone(&self.netstack), &self.scope)?;
        let port = handle.port();
        *slot = Some(handle);
        Ok(port)
    }

    pub async fn stop_socks5(&self) -> Result<()> {
        let handle = self.socks.lock().take().ok_or(MeshError::AlreadyStopped)?;
        let port = handle.port();
        let exited = handle.is_finished();
        handle.stop().await?;
        if exited {
            return Err(MeshError::AlreadyStopped);
        }
        debug!(port, "SOCKS5 proxy stopped on request");
        Ok(())
    }

    /// Port of the running SOCKS5 proxy, if any.
    pub fn socks5_port(&self) -> Option<u16> {
        self.socks
            .lock()
            .as_ref()
            .filter(|h| !h.is_finished())
            .map(Socks5Handle::port)
    }

    /// Background tasks still running for this instance.
    pub fn active_tasks(&self) -> usize {
        self.scope.active_tasks()
    }

    /// Cancel every service without waiting.
    pub(crate) fn abort(&self) {
        self.scope.cancel_token().cancel();
    }

    /// Cancel every service, wait up to `grace` for them, then stop the core.
    pub(crate) async fn close(&self, grace: Duration) {
        // Dropping the handle is enough: the scope cancels its accept loop.
        drop(self.socks.lock().take());
        let clean = self.scope.shutdown(grace).await;
        self.core.close().await;
        info!(address = %self.core.address(), clean, "instance closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshbridge_config::NodeConfig;
    use meshbridge_core::EventBus;
    use meshbridge_stack::{MockStack, StackProvider};

    async fn instance(stack: &MockStack) -> Instance {
        let core = stack.create_core(&NodeConfig::generate().unwrap()).await.unwrap();
        let netstack = stack.create_netstack(Arc::clone(&core)).await.unwrap();
        Instance::new(core, netstack, ServiceScope::new(EventBus::default()))
    }

    /// A handle whose accept loop has already exited.
    async fn exited_handle(inst: &Instance) -> Socks5Handle {
        let scope = ServiceScope::new(EventBus::default());
        let handle = meshbridge_proxy::start_socks5(Arc::clone(&inst.netstack), &scope).unwrap();
        scope.cancel_token().cancel();
        tokio::time::timeout(Duration::from_secs(5), async {
            while !handle.is_finished() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();
        handle
    }

    #[tokio::test]
    async fn test_start_replaces_exited_proxy() {
        let inst = instance(&MockStack::new()).await;
        *inst.socks.lock() = Some(exited_handle(&inst).await);
        assert_eq!(inst.socks5_port(), None);

        let port = inst.start_socks5().unwrap();
        assert_eq!(inst.socks5_port(), Some(port));
        assert!(tokio::net::TcpStream::connect(("127.0.0.1", port)).await.is_ok());
        inst.close(Duration::from_secs(5)).await;
    }

    #[tokio::test]
    async fn test_stop_on_exited_proxy_is_already_stopped() {
        let inst = instance(&MockStack::new()).await;
        *inst.socks.lock() = Some(exited_handle(&inst).await);

        let err = inst.stop_socks5().await.unwrap_err();
        assert_eq!(err.code(), meshbridge_core::ErrorCode::AlreadyStopped);
        assert!(inst.socks.lock().is_none());
        inst.close(Duration::from_secs(5)).await;
    }
}
