use serde::{Deserialize, Serialize};

use std::sync::Arc;
use tokio::sync::broadcast;

/// Where a relay session gave up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelayStage {
    Accept,
    Resolve,
    Dial,
}

impl std::fmt::Display for RelayStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RelayStage::Accept => "accept",
            RelayStage::Resolve => "resolve",
            RelayStage::Dial => "dial",
        };
        f.write_str(s)
    }
}

/// Status of the long-running services owned by a context.
///
/// Background tasks have no caller to return an error to, so they publish
/// what happened here instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ServiceEvent {
    // ── Instance lifecycle ─────────────────────────────────────
    Initialized {
        address: String,
    },
    ShutDown,

    // ── SOCKS5 ─────────────────────────────────────────────────
    Socks5Started {
        port: u16,
    },
    Socks5Stopped {
        port: u16,
        /// Set when the accept loop died on its own rather than being stopped.
        error: Option<String>,
    },

    // ── Relay sessions ─────────────────────────────────────────
    RelayListening {
        port: u16,
        remote: String,
    },
    RelayConnected {
        port: u16,
        remote: String,
        dialed: String,
    },
    RelayFailed {
        port: u16,
        remote: String,
        stage: RelayStage,
        reason: String,
    },
    RelayClosed {
        port: u16,
        remote: String,
        /// Bytes moved from the local connection to the remote one.
        sent: u64,
        /// Bytes moved from the remote connection to the local one.
        received: u64,
    },
}

/// A broadcast-based bus for service status events.
#[derive(Clone)]
pub struct EventBus {
    sender: Arc<broadcast::Sender<ServiceEvent>>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn publish(&self, event: ServiceEvent) {
        // Ignore send errors (no subscribers).
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ServiceEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
