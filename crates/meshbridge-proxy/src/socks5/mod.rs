//! SOCKS5 proxy whose CONNECTs are dialed through the mesh stack.

pub mod protocol;
pub mod server;

pub use server::{Socks5Handle, start_socks5};
