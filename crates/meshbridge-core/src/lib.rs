//! # meshbridge-core
//!
//! Shared vocabulary for the meshbridge workspace: the error type, the stable
//! error-code taxonomy exposed to hosts, and the service status events that
//! background tasks publish.

pub mod error;
pub mod event;

pub use error::{ErrorCode, MeshError, Result};
pub use event::{EventBus, RelayStage, ServiceEvent};
