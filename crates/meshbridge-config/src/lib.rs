//! # meshbridge-config
//!
//! Node configuration for the embedded mesh stack: key material, peers,
//! listen addresses, and node metadata. Reads JSON or TOML text, from a host
//! call or from a file.

pub mod keys;
pub mod loader;
pub mod schema;

pub use keys::{PrivateKey, PublicKey};
pub use loader::ConfigLoader;
pub use schema::{ConfigWarning, NodeConfig, WarningSeverity};
