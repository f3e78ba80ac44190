//! # meshbridge-runtime
//!
//! A [`Context`] owns at most one running [`Instance`]: a mesh core, the
//! netstack attached to it, and the relay and SOCKS5 services dialing
//! through that netstack. Both the C ABI and the CLI drive a `Context`.

pub mod context;
pub mod instance;
pub mod logging;

pub use context::{Context, DEFAULT_SHUTDOWN_GRACE};
pub use instance::Instance;
pub use logging::init_logging;
