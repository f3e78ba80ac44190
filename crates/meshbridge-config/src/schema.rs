use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use crate::keys::PrivateKey;

/// Default interface MTU, matching the mesh daemon's default.
pub const DEFAULT_IF_MTU: u64 = 65535;

/// The mesh daemon refuses to advertise node info larger than this.
pub const MAX_NODE_INFO_BYTES: usize = 16384;

/// Node configuration: the subset of the mesh daemon's config the embedded
/// stack needs. Field names keep the daemon's PascalCase spelling so existing
/// config files (HJSON, JSON or TOML) parse unchanged; unknown fields are
/// ignored.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct NodeConfig {
    /// Raw key bytes as decoded from hex. Length and consistency are checked
    /// when the stack starts, not at parse time.
    #[serde(with = "hex_opt", skip_serializing_if = "Option::is_none")]
    pub private_key: Option<Vec<u8>>,
    /// Outbound peer URIs, e.g. `tls://1.2.3.4:443`.
    pub peers: Vec<String>,
    /// Peers bound to a specific local interface.
    pub interface_peers: BTreeMap<String, Vec<String>>,
    /// Listen URIs for incoming peerings, e.g. `tcp://0.0.0.0:0`.
    pub listen: Vec<String>,
    /// Hex public keys allowed to peer with us. Empty = allow all.
    pub allowed_public_keys: Vec<String>,
    /// Free-form metadata advertised to the network.
    pub node_info: serde_json::Map<String, serde_json::Value>,
    /// Hide the default platform/version node info.
    pub node_info_privacy: bool,
    #[serde(rename = "IfMTU")]
    pub if_mtu: u64,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            private_key: None,
            peers: vec![],
            interface_peers: BTreeMap::new(),
            listen: vec![],
            allowed_public_keys: vec![],
            node_info: serde_json::Map::new(),
            node_info_privacy: false,
            if_mtu: DEFAULT_IF_MTU,
        }
    }
}

impl std::fmt::Debug for NodeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeConfig")
            .field("private_key", &self.private_key.as_ref().map(|_| "<redacted>"))
            .field("peers", &self.peers)
            .field("interface_peers", &self.interface_peers)
            .field("listen", &self.listen)
            .field("allowed_public_keys", &self.allowed_public_keys)
            .field("node_info", &self.node_info)
            .field("node_info_privacy", &self.node_info_privacy)
            .field("if_mtu", &self.if_mtu)
            .finish()
    }
}

impl NodeConfig {
    /// A default config carrying a freshly generated private key.
    pub fn generate() -> meshbridge_core::Result<Self> {
        let key = PrivateKey::generate()?;
        Ok(Self {
            private_key: Some(key.as_bytes().to_vec()),
            ..Self::default()
        })
    }

    /// All peer URIs, global and per-interface.
    pub fn all_peers(&self) -> impl Iterator<Item = &String> {
        self.peers
            .iter()
            .chain(self.interface_peers.values().flatten())
    }

    /// Validate the config and return a list of warnings/errors.
    /// Returns `Err` with all messages joined if any severity is Error.
    pub fn validate(&self) -> Result<Vec<ConfigWarning>, String> {
        let mut warnings = Vec::new();

        // ── Peers ───
        if self.peers.is_empty() && self.interface_peers.is_empty() && self.listen.is_empty() {
            warnings.push(ConfigWarning {
                field: "Peers".into(),
                message: "no peers and no listen addresses, node will be isolated".into(),
                severity: WarningSeverity::Warning,
                hint: Some("Add a public peer, e.g. \"tls://host:port\"".into()),
            });
        }
        let mut seen = HashSet::new();
        for peer in self.all_peers() {
            if peer.trim().is_empty() {
                warnings.push(ConfigWarning {
                    field: "Peers".into(),
                    message: "empty peer URI".into(),
                    severity: WarningSeverity::Error,
                    hint: None,
                });
            } else if !seen.insert(peer.as_str()) {
                warnings.push(ConfigWarning {
                    field: "Peers".into(),
                    message: format!("duplicate peer '{peer}'"),
                    severity: WarningSeverity::Info,
                    hint: None,
                });
            }
        }

        // ── Allowed keys ───
        for key in &self.allowed_public_keys {
            let valid = key.len() == crate::keys::PUBLIC_KEY_LEN * 2
                && key.chars().all(|c| c.is_ascii_hexdigit());
            if !valid {
                warnings.push(ConfigWarning {
                    field: "AllowedPublicKeys".into(),
                    message: format!("'{key}' is not a hex-encoded ed25519 public key"),
                    severity: WarningSeverity::Error,
                    hint: Some("Expected 64 hex characters".into()),
                });
            }
        }

        // ── Node info ───
        let info_len = serde_json::to_vec(&self.node_info)
            .map(|v| v.len())
            .unwrap_or(0);
        if info_len > MAX_NODE_INFO_BYTES {
            warnings.push(ConfigWarning {
                field: "NodeInfo".into(),
                message: format!("node info is {info_len} bytes, limit is {MAX_NODE_INFO_BYTES}"),
                severity: WarningSeverity::Error,
                hint: None,
            });
        }

        // ── MTU ───
        if self.if_mtu > DEFAULT_IF_MTU {
            warnings.push(ConfigWarning {
                field: "IfMTU".into(),
                message: format!("IfMTU {} exceeds {DEFAULT_IF_MTU} and will be clamped", self.if_mtu),
                severity: WarningSeverity::Warning,
                hint: None,
            });
        }

        // ── Key ───
        if self.private_key.is_none() {
            warnings.push(ConfigWarning {
                field: "PrivateKey".into(),
                message: "no private key, an ephemeral identity will be generated".into(),
                severity: WarningSeverity::Info,
                hint: Some("Run `meshbridge genkey` and set PrivateKey to keep a stable address".into()),
            });
        }

        let errors: Vec<_> = warnings
            .iter()
            .filter(|w| w.severity == WarningSeverity::Error)
            .map(|w| w.to_string())
            .collect();
        if !errors.is_empty() {
            return Err(errors.join("\n"));
        }
        Ok(warnings)
    }

    /// MTU actually used by the stack.
    pub fn effective_mtu(&self) -> u64 {
        self.if_mtu.min(DEFAULT_IF_MTU)
    }
}

// ── Warnings ───────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ConfigWarning {
    pub field: String,
    pub message: String,
    pub severity: WarningSeverity,
    pub hint: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningSeverity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = match self.severity {
            WarningSeverity::Error => "error",
            WarningSeverity::Warning => "warning",
            WarningSeverity::Info => "info",
        };
        write!(f, "{}: {}: {}", tag, self.field, self.message)?;
        if let Some(ref h) = self.hint {
            write!(f, " ({})", h)?;
        }
        Ok(())
    }
}

mod hex_opt {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Vec<u8>>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(bytes) => s.serialize_str(&hex::encode(bytes)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Vec<u8>>, D::Error> {
        let raw: Option<String> = Option::deserialize(d)?;
        match raw {
            None => Ok(None),
            Some(s) if s.trim().is_empty() => Ok(None),
            Some(s) => hex::decode(s.trim())
                .map(Some)
                .map_err(|e| serde::de::Error::custom(format!("PrivateKey is not valid hex: {e}"))),
        }
    }
}
