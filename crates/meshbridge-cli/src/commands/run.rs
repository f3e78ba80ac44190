use std::path::Path;

use tokio::sync::broadcast;
use tracing::{info, warn};

use meshbridge_config::ConfigLoader;
use meshbridge_core::{MeshError, Result, ServiceEvent};
use meshbridge_runtime::Context;

pub(super) async fn cmd_run(config_path: Option<&Path>, socks: bool, relays: Vec<String>) -> Result<()> {
    let text = ConfigLoader::read_text(config_path)?;
    let ctx = Context::default();
    let events = ctx.subscribe();
    let logger = tokio::spawn(log_events(events));

    ctx.init(Some(text.as_str())).await?;
    println!("address: {}", ctx.address()?);
    println!("subnet:  {}", ctx.subnet()?);

    if let Err(e) = start_services(&ctx, socks, &relays) {
        ctx.shutdown().await;
        logger.abort();
        return Err(e);
    }

    info!("node running, press Ctrl-C to stop");
    let interrupted = tokio::signal::ctrl_c().await;
    info!("shutting down");
    ctx.shutdown().await;
    logger.abort();
    interrupted.map_err(MeshError::Io)
}

fn start_services(ctx: &Context, socks: bool, relays: &[String]) -> Result<()> {
    if socks {
        let port = ctx.start_socks5()?;
        println!("socks5:  127.0.0.1:{port}");
    }
    for remote in relays {
        let port = ctx.create_relay(remote)?;
        println!("relay:   127.0.0.1:{port} -> {remote}");
    }
    Ok(())
}

async fn log_events(mut events: broadcast::Receiver<ServiceEvent>) {
    loop {
        match events.recv().await {
            Ok(ServiceEvent::Socks5Stopped { port, error: Some(error) }) => {
                warn!(port, %error, "socks5 proxy stopped unexpectedly");
            }
            Ok(ServiceEvent::RelayFailed { port, remote, stage, reason }) => {
                warn!(port, %remote, %stage, %reason, "relay failed");
            }
            Ok(ServiceEvent::RelayClosed { port, remote, sent, received }) => {
                info!(port, %remote, sent, received, "relay closed");
            }
            Ok(event) => info!(?event, "service event"),
            Err(broadcast::error::RecvError::Lagged(n)) => warn!(skipped = n, "event log lagged"),
            Err(broadcast::error::RecvError::Closed) => return,
        }
    }
}
