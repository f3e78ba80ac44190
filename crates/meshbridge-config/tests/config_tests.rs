#[cfg(test)]
mod tests {
    use meshbridge_config::schema::*;
    use meshbridge_config::{ConfigLoader, PrivateKey};
    use meshbridge_core::ErrorCode;
    use std::io::Write;

    // ── Default tests ──────────────────────────────────────────

    #[test]
    fn test_node_config_defaults() {
        let config = NodeConfig::default();
        assert!(config.private_key.is_none());
        assert!(config.peers.is_empty());
        assert!(config.listen.is_empty());
        assert!(!config.node_info_privacy);
        assert_eq!(config.if_mtu, 65535);
    }

    #[test]
    fn test_generate_has_valid_key() {
        let config = NodeConfig::generate().unwrap();
        let bytes = config.private_key.as_ref().unwrap();
        assert_eq!(bytes.len(), 64);
        PrivateKey::from_bytes(bytes).unwrap();
    }

    #[test]
    fn test_debug_redacts_private_key() {
        let config = NodeConfig::generate().unwrap();
        let key_hex = hex::encode(config.private_key.as_ref().unwrap());
        let dbg = format!("{config:?}");
        assert!(dbg.contains("<redacted>"));
        assert!(!dbg.contains(&key_hex));
    }

    // ── Parsing tests ──────────────────────────────────────────

    #[test]
    fn test_parse_json_daemon_style() {
        let key = PrivateKey::generate().unwrap();
        let text = format!(
            r#"{{
                "PrivateKey": "{}",
                "Peers": ["tls://192.0.2.1:443", "tcp://[2001:db8::1]:9000"],
                "Listen": [],
                "NodeInfo": {{"name": "phone"}},
                "NodeInfoPrivacy": true,
                "IfMTU": 1500,
                "AdminListen": "none",
                "MulticastInterfaces": []
            }}"#,
            key.to_hex()
        );
        let config = ConfigLoader::from_text(&text).unwrap();
        assert_eq!(config.private_key.as_deref(), Some(&key.as_bytes()[..]));
        assert_eq!(config.peers.len(), 2);
        assert_eq!(config.node_info["name"], "phone");
        assert!(config.node_info_privacy);
        assert_eq!(config.if_mtu, 1500);
    }

    #[test]
    fn test_parse_daemon_genconf_hjson() {
        let key = PrivateKey::generate().unwrap();
        let text = format!(
            r#"{{
  # Your private key. DO NOT share this with anyone!
  PrivateKey: {}

  # List of connection strings for outbound peer connections.
  Peers: [
    tls://192.0.2.1:443
  ]

  InterfacePeers: {{}}
  Listen: []
  AdminListen: none
  MulticastInterfaces: [
    {{
      Regex: .*
      Beacon: true
      Listen: true
      Port: 0
      Priority: 0
      Password: ""
    }}
  ]
  AllowedPublicKeys: []
  IfName: auto
  IfMTU: 65535
  NodeInfoPrivacy: false
  NodeInfo: {{}}
}}"#,
            key.to_hex()
        );
        let config = ConfigLoader::from_text(&text).unwrap();
        assert_eq!(config.private_key.as_deref(), Some(&key.as_bytes()[..]));
        assert_eq!(config.peers, vec!["tls://192.0.2.1:443".to_string()]);
        assert_eq!(config.if_mtu, 65535);
        assert!(config.node_info.is_empty());
    }

    #[test]
    fn test_parse_hjson_comments_and_bare_keys() {
        let config =
            ConfigLoader::from_text("{\n  # comment\n  Peers: []\n  IfMTU: 1500\n  NodeInfo: {}\n}").unwrap();
        assert!(config.peers.is_empty());
        assert_eq!(config.if_mtu, 1500);
    }

    #[test]
    fn test_parse_toml() {
        let text = r#"
Peers = ["tls://192.0.2.1:443"]
IfMTU = 1280

[NodeInfo]
name = "laptop"
"#;
        let config = ConfigLoader::from_text(text).unwrap();
        assert_eq!(config.peers, vec!["tls://192.0.2.1:443".to_string()]);
        assert_eq!(config.if_mtu, 1280);
        assert_eq!(config.node_info["name"], "laptop");
    }

    #[test]
    fn test_partial_json_applies_defaults() {
        let config = ConfigLoader::from_text(r#"{"Peers": ["tcp://192.0.2.7:1"]}"#).unwrap();
        assert_eq!(config.if_mtu, 65535);
        assert!(config.private_key.is_none());
    }

    #[test]
    fn test_parse_json_roundtrip() {
        let config = NodeConfig::generate().unwrap();
        let json = serde_json::to_string_pretty(&config).unwrap();
        assert!(json.contains("\"PrivateKey\""));
        assert!(json.contains("\"IfMTU\""));
        let restored = ConfigLoader::from_text(&json).unwrap();
        assert_eq!(restored.private_key, config.private_key);
    }

    #[test]
    fn test_empty_text_is_parse_error() {
        let err = ConfigLoader::from_text("   \n").unwrap_err();
        assert_eq!(err.code(), ErrorCode::ConfigParse);
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        let err = ConfigLoader::from_text("{ \"Peers\": [").unwrap_err();
        assert_eq!(err.code(), ErrorCode::ConfigParse);
    }

    #[test]
    fn test_wrong_field_type_is_parse_error() {
        let err = ConfigLoader::from_text(r#"{"IfMTU": "big"}"#).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ConfigParse);
    }

    #[test]
    fn test_bad_key_hex_is_parse_error() {
        let err = ConfigLoader::from_text(r#"{"PrivateKey": "zz"}"#).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ConfigParse);
        assert!(err.to_string().contains("hex"));
    }

    #[test]
    fn test_short_key_parses_but_is_not_a_valid_key() {
        // Length is a stack-start concern, not a parse concern.
        let config = ConfigLoader::from_text(r#"{"PrivateKey": "abcd"}"#).unwrap();
        assert!(PrivateKey::from_bytes(config.private_key.as_ref().unwrap()).is_err());
    }

    // ── Validation tests ───────────────────────────────────────

    #[test]
    fn test_validate_isolated_node_warns() {
        let config = NodeConfig::default();
        let warnings = config.validate().unwrap();
        assert!(warnings.iter().any(|w| w.field == "Peers"));
        assert!(warnings.iter().any(|w| w.field == "PrivateKey"));
    }

    #[test]
    fn test_validate_empty_peer_is_error() {
        let config = NodeConfig {
            peers: vec!["".into()],
            ..NodeConfig::default()
        };
        assert!(config.validate().is_err());
        let err = ConfigLoader::from_text(r#"{"Peers": [""]}"#).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ConfigParse);
    }

    #[test]
    fn test_validate_duplicate_peer_is_info() {
        let config = NodeConfig {
            peers: vec!["tcp://192.0.2.1:1".into(), "tcp://192.0.2.1:1".into()],
            ..NodeConfig::default()
        };
        let warnings = config.validate().unwrap();
        assert!(
            warnings
                .iter()
                .any(|w| w.severity == WarningSeverity::Info && w.message.contains("duplicate"))
        );
    }

    #[test]
    fn test_validate_allowed_keys() {
        let good = PrivateKey::generate().unwrap().public_key().to_hex();
        let config = NodeConfig {
            allowed_public_keys: vec![good],
            peers: vec!["tcp://192.0.2.1:1".into()],
            ..NodeConfig::default()
        };
        assert!(config.validate().is_ok());

        let config = NodeConfig {
            allowed_public_keys: vec!["1234".into()],
            ..NodeConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_node_info_limit() {
        let mut config = NodeConfig::default();
        config.node_info.insert(
            "blob".into(),
            serde_json::Value::String("x".repeat(MAX_NODE_INFO_BYTES)),
        );
        let err = config.validate().unwrap_err();
        assert!(err.contains("NodeInfo"));
    }

    #[test]
    fn test_effective_mtu_clamped() {
        let config = NodeConfig {
            if_mtu: 100_000,
            ..NodeConfig::default()
        };
        assert_eq!(config.effective_mtu(), 65535);
        let warnings = config.validate().unwrap();
        assert!(warnings.iter().any(|w| w.field == "IfMTU"));
    }

    #[test]
    fn test_all_peers_includes_interface_peers() {
        let mut config = NodeConfig {
            peers: vec!["tcp://192.0.2.1:1".into()],
            ..NodeConfig::default()
        };
        config
            .interface_peers
            .insert("eth0".into(), vec!["tcp://192.0.2.2:1".into()]);
        assert_eq!(config.all_peers().count(), 2);
    }

    // ── Loader tests ───────────────────────────────────────────

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"Peers": ["tls://192.0.2.9:443"], "IfMTU": 9000}}"#).unwrap();
        let config = ConfigLoader::load(Some(file.path())).unwrap();
        assert_eq!(config.if_mtu, 9000);
        assert_eq!(config.peers.len(), 1);
    }

    #[test]
    fn test_load_missing_file_is_parse_error() {
        let err = ConfigLoader::load(Some(std::path::Path::new(
            "/nonexistent/meshbridge/config.json",
        )))
        .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ConfigParse);
    }

    #[test]
    fn test_resolve_path_explicit_wins() {
        let p = std::path::Path::new("/tmp/explicit.json");
        assert_eq!(ConfigLoader::resolve_path(Some(p)), Some(p.to_path_buf()));
    }
}
