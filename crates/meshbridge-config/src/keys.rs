//! Ed25519 key material for mesh node identities.
//!
//! A private key is stored the way the mesh daemon stores it: the 32-byte
//! seed followed by the 32-byte public key, hex-encoded in configs.

use ring::rand::{SecureRandom, SystemRandom};
use ring::signature::{Ed25519KeyPair, KeyPair};

use meshbridge_core::{MeshError, Result};

pub const SEED_LEN: usize = 32;
pub const PUBLIC_KEY_LEN: usize = 32;
pub const PRIVATE_KEY_LEN: usize = SEED_LEN + PUBLIC_KEY_LEN;

/// A node's Ed25519 public key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey([u8; PUBLIC_KEY_LEN]);

impl PublicKey {
    pub fn from_bytes(bytes: [u8; PUBLIC_KEY_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

/// A node's Ed25519 private key (seed ‖ public key).
#[derive(Clone, PartialEq, Eq)]
pub struct PrivateKey([u8; PRIVATE_KEY_LEN]);

impl PrivateKey {
    /// Generate a fresh key from the system random source.
    pub fn generate() -> Result<Self> {
        let mut seed = [0u8; SEED_LEN];
        SystemRandom::new()
            .fill(&mut seed)
            .map_err(|_| MeshError::CoreCreate("system random source unavailable".into()))?;
        Self::from_seed(&seed)
    }

    pub fn from_seed(seed: &[u8; SEED_LEN]) -> Result<Self> {
        let pair = Ed25519KeyPair::from_seed_unchecked(seed)
            .map_err(|e| MeshError::CoreCreate(format!("rejected ed25519 seed: {e}")))?;
        let mut key = [0u8; PRIVATE_KEY_LEN];
        key[..SEED_LEN].copy_from_slice(seed);
        key[SEED_LEN..].copy_from_slice(pair.public_key().as_ref());
        Ok(Self(key))
    }

    /// Accepts either a bare 32-byte seed or the full 64-byte form. In the
    /// 64-byte form the public half must match the one derived from the seed.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        match bytes.len() {
            SEED_LEN => {
                let mut seed = [0u8; SEED_LEN];
                seed.copy_from_slice(bytes);
                Self::from_seed(&seed)
            }
            PRIVATE_KEY_LEN => {
                let mut seed = [0u8; SEED_LEN];
                seed.copy_from_slice(&bytes[..SEED_LEN]);
                let key = Self::from_seed(&seed)?;
                if key.0[SEED_LEN..] != bytes[SEED_LEN..] {
                    return Err(MeshError::CoreCreate(
                        "private key public half does not match its seed".into(),
                    ));
                }
                Ok(key)
            }
            n => Err(MeshError::CoreCreate(format!(
                "private key must be {SEED_LEN} or {PRIVATE_KEY_LEN} bytes, got {n}"
            ))),
        }
    }

    pub fn from_hex(text: &str) -> Result<Self> {
        let bytes = hex::decode(text.trim())
            .map_err(|e| MeshError::ConfigParse(format!("private key is not valid hex: {e}")))?;
        Self::from_bytes(&bytes)
    }

    pub fn seed(&self) -> &[u8] {
        &self.0[..SEED_LEN]
    }

    pub fn as_bytes(&self) -> &[u8; PRIVATE_KEY_LEN] {
        &self.0
    }

    pub fn public_key(&self) -> PublicKey {
        let mut public = [0u8; PUBLIC_KEY_LEN];
        public.copy_from_slice(&self.0[SEED_LEN..]);
        PublicKey(public)
    }

    /// Lowercase hex of all 64 bytes.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl std::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrivateKey")
            .field("public", &self.public_key().to_hex())
            .finish_non_exhaustive()
    }
}
