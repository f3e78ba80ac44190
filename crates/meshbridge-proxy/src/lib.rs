//! # meshbridge-proxy
//!
//! Local services that carry host traffic into the mesh: a single-shot TCP
//! relay and a SOCKS5 proxy. Both dial outbound connections through a
//! [`meshbridge_stack::Netstack`] and move bytes with the same MTU-chunked
//! pump. Every task they spawn belongs to a [`ServiceScope`] so the owner
//! can cancel and join them.

pub mod pump;
pub mod relay;
pub mod scope;
pub mod socks5;

pub use pump::{chunk_size, proxy_streams};
pub use relay::spawn_relay;
pub use scope::ServiceScope;
pub use socks5::{Socks5Handle, start_socks5};
