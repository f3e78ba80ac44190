//! Single-shot TCP relay.
//!
//! A relay binds an ephemeral loopback port, accepts exactly one connection
//! on it, dials the remote address through the mesh stack and pumps bytes
//! both ways until either side ends. Failures after the port is handed out
//! surface only as log lines and [`ServiceEvent`]s.

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use meshbridge_core::{MeshError, RelayStage, Result, ServiceEvent};
use meshbridge_stack::Netstack;

use crate::pump::{chunk_size, proxy_streams};
use crate::scope::ServiceScope;

/// Loopback address relays and the SOCKS5 proxy listen on.
pub const LOOPBACK_ANY_PORT: &str = "127.0.0.1:0";

/// Bind a loopback listener on an ephemeral port.
///
/// Must be called from within a tokio runtime.
pub(crate) fn bind_loopback() -> Result<(TcpListener, u16)> {
    let listen_err = |e: std::io::Error| MeshError::Listen {
        addr: LOOPBACK_ANY_PORT.to_string(),
        reason: e.to_string(),
    };
    let std_listener = std::net::TcpListener::bind(LOOPBACK_ANY_PORT).map_err(listen_err)?;
    std_listener.set_nonblocking(true).map_err(listen_err)?;
    let port = std_listener.local_addr().map_err(listen_err)?.port();
    let listener = TcpListener::from_std(std_listener).map_err(listen_err)?;
    Ok((listener, port))
}

/// Start a relay to `remote` (`host:port`) and return the local port.
pub fn spawn_relay(remote: &str, netstack: Arc<dyn Netstack>, scope: &ServiceScope) -> Result<u16> {
    let (listener, port) = bind_loopback()?;
    let remote = remote.to_string();
    info!(port, remote = %remote, "relay listening");
    scope.publish(ServiceEvent::RelayListening {
        port,
        remote: remote.clone(),
    });

    let session_scope = scope.clone();
    scope.spawn(async move {
        run_session(listener, port, remote, netstack, session_scope).await;
    });
    Ok(port)
}

async fn run_session(
    listener: TcpListener,
    port: u16,
    remote: String,
    netstack: Arc<dyn Netstack>,
    scope: ServiceScope,
) {
    let cancel = scope.cancel_token().clone();
    let fail = |stage: RelayStage, reason: String| {
        warn!(port, remote = %remote, %stage, reason = %reason, "relay session failed");
        scope.publish(ServiceEvent::RelayFailed {
            port,
            remote: remote.clone(),
            stage,
            reason,
        });
    };

    // Accept exactly one connection; the listener is dropped right after.
    let accepted = tokio::select! {
        res = listener.accept() => res,
        _ = cancel.cancelled() => {
            debug!(port, "relay cancelled before accept");
            return;
        }
    };
    drop(listener);
    let (local, peer) = match accepted {
        Ok(pair) => pair,
        Err(e) => return fail(RelayStage::Accept, e.to_string()),
    };
    debug!(port, %peer, "relay accepted local connection");

    let target = tokio::select! {
        res = resolve_first(&remote) => res,
        _ = cancel.cancelled() => return,
    };
    let target = match target {
        Ok(addr) => addr,
        Err(e) => return fail(RelayStage::Resolve, e.to_string()),
    };

    let dialed = tokio::select! {
        res = netstack.dial_tcp(target) => res,
        _ = cancel.cancelled() => return,
    };
    let conn = match dialed {
        Ok(conn) => conn,
        Err(e) => return fail(RelayStage::Dial, e.to_string()),
    };

    info!(port, remote = %remote, %target, "relay connected");
    scope.publish(ServiceEvent::RelayConnected {
        port,
        remote: remote.clone(),
        dialed: target.to_string(),
    });

    let (sent, received) = proxy_streams(local, conn, chunk_size(netstack.mtu()), &cancel).await;
    info!(port, sent, received, "relay closed");
    scope.publish(ServiceEvent::RelayClosed {
        port,
        remote,
        sent,
        received,
    });
}

/// Resolve `host:port` on the host and take the first address.
pub async fn resolve_first(remote: &str) -> Result<SocketAddr> {
    let resolve_err = |reason: String| MeshError::Resolve {
        addr: remote.to_string(),
        reason,
    };
    let mut addrs = tokio::net::lookup_host(remote)
        .await
        .map_err(|e| resolve_err(e.to_string()))?;
    addrs
        .next()
        .ok_or_else(|| resolve_err("no addresses found".to_string()))
}
