//! Mesh addressing: every node's IPv6 address is derived from its public key.
//!
//! The key is bit-inverted, the leading run of one bits is counted and
//! dropped together with the first zero bit, and the remaining bits are
//! packed after a two-byte header of `[0x02, ones]`. Keys with more leading
//! zero bits therefore get numerically smaller addresses. All addresses fall
//! in `200::/7`; the routed `/64` subnet of a node lives in `300::/8`.

use std::net::{IpAddr, Ipv6Addr};

use meshbridge_config::PublicKey;

/// First byte of every node address.
pub const ADDRESS_PREFIX: u8 = 0x02;

/// Length of the routed subnet prefix.
pub const SUBNET_PREFIX_LEN: u8 = 64;

/// The mesh IPv6 address for `key`.
pub fn addr_for_key(key: &PublicKey) -> Ipv6Addr {
    let mut inverted = *key.as_bytes();
    for b in inverted.iter_mut() {
        *b = !*b;
    }

    let mut packed = Vec::with_capacity(inverted.len());
    let mut done = false;
    let mut ones: u8 = 0;
    let mut bits: u8 = 0;
    let mut n_bits = 0;
    for idx in 0..8 * inverted.len() {
        let bit = (inverted[idx / 8] >> (7 - idx % 8)) & 1;
        if !done && bit != 0 {
            ones = ones.wrapping_add(1);
            continue;
        }
        if !done && bit == 0 {
            done = true;
            continue;
        }
        bits = (bits << 1) | bit;
        n_bits += 1;
        if n_bits == 8 {
            n_bits = 0;
            packed.push(bits);
        }
    }

    let mut addr = [0u8; 16];
    addr[0] = ADDRESS_PREFIX;
    addr[1] = ones;
    let n = packed.len().min(addr.len() - 2);
    addr[2..2 + n].copy_from_slice(&packed[..n]);
    Ipv6Addr::from(addr)
}

/// The network address of the `/64` subnet routed to `key`.
pub fn subnet_for_key(key: &PublicKey) -> Ipv6Addr {
    let addr = addr_for_key(key).octets();
    let mut subnet = [0u8; 16];
    subnet[..8].copy_from_slice(&addr[..8]);
    subnet[0] |= 0x01;
    Ipv6Addr::from(subnet)
}

/// `subnet_for_key` rendered in CIDR form, e.g. `300:1234::/64`.
pub fn subnet_cidr(key: &PublicKey) -> String {
    format!("{}/{}", subnet_for_key(key), SUBNET_PREFIX_LEN)
}

/// Whether `ip` is a node address (`200::/8`).
pub fn is_node_address(ip: &IpAddr) -> bool {
    matches!(ip, IpAddr::V6(v6) if v6.octets()[0] == ADDRESS_PREFIX)
}

/// Whether `ip` is inside the mesh range at all (`200::/7`).
pub fn is_mesh_address(ip: &IpAddr) -> bool {
    matches!(ip, IpAddr::V6(v6) if v6.octets()[0] & 0xfe == ADDRESS_PREFIX)
}
