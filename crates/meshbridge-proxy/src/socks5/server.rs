use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use meshbridge_core::{MeshError, Result, ServiceEvent};
use meshbridge_stack::Netstack;

use super::protocol::{self, Reply, TargetAddr};
use crate::pump::{chunk_size, proxy_streams};
use crate::relay::{bind_loopback, resolve_first};
use crate::scope::ServiceScope;

/// A running SOCKS5 accept loop.
///
/// Stopping it closes the listener; connections already handed to client
/// tasks run until they end or the owning scope shuts down.
pub struct Socks5Handle {
    port: u16,
    stop: CancellationToken,
    task: JoinHandle<()>,
}

impl Socks5Handle {
    pub fn port(&self) -> u16 {
        self.port
    }

    /// True once the accept loop has exited, whether stopped or failed.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop accepting and wait for the accept loop to exit.
    pub async fn stop(self) -> Result<()> {
        self.stop.cancel();
        self.task
            .await
            .map_err(|e| MeshError::ProxyStop(format!("accept loop did not exit cleanly: {e}")))
    }
}

/// Bind `127.0.0.1:0` and serve SOCKS5 on it, dialing through `netstack`.
pub fn start_socks5(netstack: Arc<dyn Netstack>, scope: &ServiceScope) -> Result<Socks5Handle> {
    let (listener, port) = bind_loopback()?;
    let stop = scope.cancel_token().child_token();
    info!(port, "SOCKS5 proxy listening");
    scope.publish(ServiceEvent::Socks5Started { port });

    let task = scope.spawn(accept_loop(listener, port, netstack, scope.clone(), stop.clone()));
    Ok(Socks5Handle { port, stop, task })
}

async fn accept_loop(
    listener: TcpListener,
    port: u16,
    netstack: Arc<dyn Netstack>,
    scope: ServiceScope,
    stop: CancellationToken,
) {
    let error = loop {
        let accepted = tokio::select! {
            res = listener.accept() => res,
            _ = stop.cancelled() => break None,
        };
        match accepted {
            Ok((stream, peer)) => {
                debug!(port, %peer, "SOCKS5 client connected");
                let netstack = Arc::clone(&netstack);
                let cancel = scope.cancel_token().clone();
                scope.spawn(async move {
                    tokio::select! {
                        res = serve_client(stream, netstack, &cancel) => {
                            if let Err(e) = res {
                                debug!(%peer, error = %e, "SOCKS5 client ended with error");
                            }
                        }
                        _ = cancel.cancelled() => {}
                    }
                });
            }
            Err(e) => {
                warn!(port, error = %e, "SOCKS5 accept failed, stopping proxy");
                break Some(e.to_string());
            }
        }
    };

    drop(listener);
    info!(port, "SOCKS5 proxy stopped");
    scope.publish(ServiceEvent::Socks5Stopped { port, error });
}

async fn serve_client(
    mut stream: TcpStream,
    netstack: Arc<dyn Netstack>,
    cancel: &CancellationToken,
) -> std::io::Result<()> {
    if !protocol::negotiate(&mut stream).await? {
        debug!("SOCKS5 client offered no acceptable auth method");
        return Ok(());
    }

    let target = match protocol::read_request(&mut stream).await? {
        Ok(target) => target,
        Err(reply) => {
            return protocol::write_reply(&mut stream, reply, protocol::unspecified()).await;
        }
    };

    let addr = match &target {
        TargetAddr::Ip(addr) => *addr,
        TargetAddr::Domain(host, port) => match resolve_first(&format!("{host}:{port}")).await {
            Ok(addr) => addr,
            Err(e) => {
                debug!(%target, error = %e, "SOCKS5 target did not resolve");
                return protocol::write_reply(&mut stream, Reply::HostUnreachable, protocol::unspecified())
                    .await;
            }
        },
    };

    let conn = match netstack.dial_tcp(addr).await {
        Ok(conn) => conn,
        Err(e) => {
            debug!(%target, error = %e, "SOCKS5 dial failed");
            let reply = Reply::from_dial_error(&e);
            return protocol::write_reply(&mut stream, reply, protocol::unspecified()).await;
        }
    };

    let bound = conn.local_addr().unwrap_or_else(protocol::unspecified);
    protocol::write_reply(&mut stream, Reply::Succeeded, bound).await?;
    debug!(%target, %addr, "SOCKS5 connection established");

    let (sent, received) = proxy_streams(stream, conn, chunk_size(netstack.mtu()), cancel).await;
    debug!(%target, sent, received, "SOCKS5 connection closed");
    Ok(())
}
