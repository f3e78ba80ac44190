use tracing_subscriber::EnvFilter;

use meshbridge_core::{MeshError, Result};

/// Filter used when neither an explicit filter nor `RUST_LOG` is given.
pub const DEFAULT_FILTER: &str = "info";

/// Install the global tracing subscriber.
///
/// `filter` takes precedence over `RUST_LOG`. Fails with `InvalidArgument`
/// for an unparseable filter and `AlreadyInitialized` if a subscriber is
/// already installed.
pub fn init_logging(filter: Option<&str>, json: bool) -> Result<()> {
    let env_filter = match filter {
        Some(f) => EnvFilter::try_new(f)
            .map_err(|e| MeshError::InvalidArgument(format!("invalid log filter '{f}': {e}")))?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
    };

    let installed = if json {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .json()
            .with_target(true)
            .try_init()
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .try_init()
    };
    installed.map_err(|_| MeshError::AlreadyInitialized)
}
