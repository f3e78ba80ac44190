use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use meshbridge_core::{MeshError, Result};

use crate::schema::NodeConfig;

/// Environment variable naming the config file used by the CLI.
pub const CONFIG_ENV: &str = "MESHBRIDGE_CONFIG";

/// Parses node configuration from text or disk.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Parse config text. A leading `{` selects HJSON, which covers plain
    /// JSON and the daemon's commented `-genconf` output; anything else is
    /// read as TOML. Validation errors are reported as parse errors, warnings
    /// are logged.
    pub fn from_text(text: &str) -> Result<NodeConfig> {
        let trimmed = text.trim_start();
        if trimmed.is_empty() {
            return Err(MeshError::ConfigParse("configuration is empty".into()));
        }

        let config = Self::parse_document(trimmed).map_err(MeshError::ConfigParse)?;

        match config.validate() {
            Ok(warnings) => {
                for w in &warnings {
                    warn!("{}", w);
                }
            }
            Err(e) => {
                return Err(MeshError::ConfigValidation {
                    field: "config".into(),
                    reason: e,
                });
            }
        }

        debug!(
            peers = config.peers.len(),
            listen = config.listen.len(),
            mtu = config.if_mtu,
            "parsed node configuration"
        );
        Ok(config)
    }

    /// Resolve the config path: explicit path > MESHBRIDGE_CONFIG env.
    pub fn resolve_path(explicit: Option<&Path>) -> Option<PathBuf> {
        if let Some(p) = explicit {
            return Some(p.to_path_buf());
        }
        std::env::var(CONFIG_ENV).ok().map(PathBuf::from)
    }

    /// Read the config file as text. The text, not the parsed struct, is what
    /// the runtime takes, so callers go through the same path as the C ABI.
    pub fn read_text(path: Option<&Path>) -> Result<String> {
        let Some(config_path) = Self::resolve_path(path) else {
            return Err(MeshError::NoConfig);
        };
        info!(?config_path, "loading configuration");
        let raw = std::fs::read_to_string(&config_path).map_err(|e| {
            MeshError::ConfigParse(format!("failed to read {}: {}", config_path.display(), e))
        })?;
        Ok(Self::apply_env_overrides(raw))
    }

    /// Load and parse the config file.
    pub fn load(path: Option<&Path>) -> Result<NodeConfig> {
        let raw = Self::read_text(path)?;
        Self::from_text(&raw)
    }

    /// `MESHBRIDGE_PRIVATE_KEY` replaces the key in the file, and
    /// `MESHBRIDGE_PEERS` (comma separated) replaces the peer list. Both are
    /// applied on the parsed form and re-serialized as JSON; text that fails
    /// to parse is passed through so the real parse reports the error.
    fn apply_env_overrides(raw: String) -> String {
        let key = std::env::var("MESHBRIDGE_PRIVATE_KEY").ok();
        let peers = std::env::var("MESHBRIDGE_PEERS").ok();
        if key.is_none() && peers.is_none() {
            return raw;
        }

        let Ok(mut config) = Self::parse_document(raw.trim_start()) else {
            return raw;
        };

        if let Some(k) = key {
            match hex::decode(k.trim()) {
                Ok(bytes) => config.private_key = Some(bytes),
                Err(e) => warn!(error = %e, "ignoring MESHBRIDGE_PRIVATE_KEY, not valid hex"),
            }
        }
        if let Some(p) = peers {
            config.peers = p
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }

        serde_json::to_string(&config).unwrap_or(raw)
    }

    fn parse_document(text: &str) -> std::result::Result<NodeConfig, String> {
        if text.starts_with('{') {
            deser_hjson::from_str::<NodeConfig>(text).map_err(|e| format!("invalid JSON config: {e}"))
        } else {
            toml::from_str::<NodeConfig>(text).map_err(|e| format!("invalid TOML config: {e}"))
        }
    }
}
