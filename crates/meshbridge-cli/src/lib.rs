//! # meshbridge-cli
//!
//! Command-line front-end for the meshbridge runtime.
//!
//! ## Commands
//!
//! - `meshbridge genkey`: print a new private key
//! - `meshbridge genconf`: print a default config with a new key
//! - `meshbridge address`: print the mesh address of a config's key
//! - `meshbridge run`: start a node with SOCKS5 and relays until Ctrl-C

pub mod commands;

pub use commands::{Cli, exit_code};
