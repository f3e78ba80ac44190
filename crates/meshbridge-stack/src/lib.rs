//! # meshbridge-stack
//!
//! The seam between the control layer and the mesh engine. A
//! [`StackProvider`] starts a [`MeshCore`] from configuration and attaches a
//! [`Netstack`] that can dial TCP over the mesh. [`HostStack`] runs on the
//! host network; [`MockStack`] records dials for tests.

pub mod address;
pub mod host;
pub mod mock;
pub mod peer;
pub mod provider;

pub use address::{addr_for_key, is_mesh_address, subnet_cidr, subnet_for_key};
pub use host::HostStack;
pub use mock::MockStack;
pub use peer::{PeerScheme, PeerUri};
pub use provider::{BoxedConn, MIN_MTU, MeshConn, MeshCore, Netstack, StackProvider};
