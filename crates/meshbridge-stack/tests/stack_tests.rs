#[cfg(test)]
mod tests {
    use meshbridge_config::{NodeConfig, PrivateKey};
    use meshbridge_core::ErrorCode;
    use meshbridge_stack::host::HostCore;
    use meshbridge_stack::{HostStack, MeshCore, MockStack, StackProvider, addr_for_key};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    fn keyed_config() -> NodeConfig {
        NodeConfig {
            private_key: Some(PrivateKey::generate().unwrap().as_bytes().to_vec()),
            ..Default::default()
        }
    }

    // ── Host core ──────────────────────────────────────────────

    #[tokio::test]
    async fn test_host_core_identity_matches_key() {
        let config = keyed_config();
        let key = PrivateKey::from_bytes(config.private_key.as_ref().unwrap()).unwrap();
        let core = HostStack::new().create_core(&config).await.unwrap();
        assert_eq!(core.address(), addr_for_key(&key.public_key()));
        assert_eq!(core.public_key(), key.public_key());
        assert!(core.subnet().starts_with("3"));
        assert_eq!(core.mtu(), 65535);
        core.close().await;
    }

    #[tokio::test]
    async fn test_host_core_without_key_is_ephemeral() {
        let a = HostStack::new().create_core(&NodeConfig::default()).await.unwrap();
        let b = HostStack::new().create_core(&NodeConfig::default()).await.unwrap();
        assert_ne!(a.address(), b.address());
    }

    #[test]
    fn test_host_core_binds_listeners_and_parses_peers() {
        let mut config = keyed_config();
        config.listen = vec!["tcp://127.0.0.1:0".into(), "quic://127.0.0.1:0".into()];
        config.peers = vec!["tls://192.0.2.1:443".into()];
        let core = HostCore::start(&config).unwrap();
        assert_eq!(core.listen_addrs().len(), 2);
        assert_eq!(core.peers().len(), 1);
    }

    #[tokio::test]
    async fn test_host_core_close_releases_listeners() {
        let mut config = keyed_config();
        config.listen = vec!["tcp://127.0.0.1:0".into()];
        let core = HostCore::start(&config).unwrap();
        let addr = core.listen_addrs()[0];
        core.close().await;
        assert!(core.listen_addrs().is_empty());
        // The port is free again.
        std::net::TcpListener::bind(addr).unwrap();
    }

    #[test]
    fn test_host_core_listen_conflict() {
        let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let mut config = keyed_config();
        config.listen = vec![format!("tcp://{}", taken.local_addr().unwrap())];
        let err = HostCore::start(&config).err().unwrap();
        assert_eq!(err.code(), ErrorCode::CoreCreateFailed);
    }

    #[test]
    fn test_host_core_bad_peer_uri() {
        let mut config = keyed_config();
        config.peers = vec!["gopher://192.0.2.1:70".into()];
        let err = HostCore::start(&config).err().unwrap();
        assert_eq!(err.code(), ErrorCode::CoreCreateFailed);
    }

    #[test]
    fn test_host_core_cannot_listen_on_socks() {
        let mut config = keyed_config();
        config.listen = vec!["socks://127.0.0.1:1080".into()];
        let err = HostCore::start(&config).err().unwrap();
        assert_eq!(err.code(), ErrorCode::CoreCreateFailed);
    }

    #[tokio::test]
    async fn test_host_core_bad_key() {
        let config = NodeConfig {
            private_key: Some(vec![1, 2, 3]),
            ..Default::default()
        };
        let err = HostStack::new().create_core(&config).await.err().unwrap();
        assert_eq!(err.code(), ErrorCode::CoreCreateFailed);
    }

    // ── Host netstack ──────────────────────────────────────────

    #[tokio::test]
    async fn test_host_netstack_rejects_small_mtu() {
        let mut config = keyed_config();
        config.if_mtu = 1000;
        let stack = HostStack::new();
        let core = stack.create_core(&config).await.unwrap();
        let err = stack.create_netstack(core).await.err().unwrap();
        assert_eq!(err.code(), ErrorCode::NetstackCreateFailed);
    }

    #[tokio::test]
    async fn test_host_netstack_dials_local_listener() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let target = listener.local_addr().unwrap();
        let stack = HostStack::new();
        let core = stack.create_core(&keyed_config()).await.unwrap();
        let net = stack.create_netstack(core).await.unwrap();
        assert_eq!(net.mtu(), 65535);

        let server = tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4];
            sock.read_exact(&mut buf).await.unwrap();
            sock.write_all(&buf).await.unwrap();
        });

        let mut conn = net.dial_tcp(target).await.unwrap();
        assert_eq!(conn.peer_addr(), Some(target));
        conn.write_all(b"ping").await.unwrap();
        let mut buf = [0u8; 4];
        conn.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"ping");
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_host_netstack_refused() {
        let port = {
            let l = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            l.local_addr().unwrap().port()
        };
        let stack = HostStack::new().with_connect_timeout(Duration::from_secs(2));
        let core = stack.create_core(&keyed_config()).await.unwrap();
        let net = stack.create_netstack(core).await.unwrap();
        let err = net
            .dial_tcp(format!("127.0.0.1:{port}").parse().unwrap())
            .await
            .err()
            .unwrap();
        assert_eq!(err.kind(), std::io::ErrorKind::ConnectionRefused);
    }

    // ── Mock stack ─────────────────────────────────────────────

    #[tokio::test]
    async fn test_mock_derives_real_address() {
        let config = keyed_config();
        let key = PrivateKey::from_bytes(config.private_key.as_ref().unwrap()).unwrap();
        let core = MockStack::new().create_core(&config).await.unwrap();
        assert_eq!(core.address(), addr_for_key(&key.public_key()));
    }

    #[tokio::test]
    async fn test_mock_netstack_error() {
        let stack = MockStack::new().with_netstack_error("no tun");
        let core = stack.create_core(&keyed_config()).await.unwrap();
        let err = stack.create_netstack(core).await.err().unwrap();
        assert_eq!(err.code(), ErrorCode::NetstackCreateFailed);
    }

    #[tokio::test]
    async fn test_mock_small_mtu_allowed() {
        let stack = MockStack::new().with_mtu(64);
        let core = stack.create_core(&keyed_config()).await.unwrap();
        let net = stack.create_netstack(Arc::clone(&core)).await.unwrap();
        assert_eq!(net.mtu(), 64);
    }

    #[tokio::test]
    async fn test_mock_clones_share_recordings() {
        let stack = MockStack::new();
        let observer = stack.clone();
        let core = stack.create_core(&keyed_config()).await.unwrap();
        let net = stack.create_netstack(core).await.unwrap();
        let _ = net.dial_tcp("[200::1]:80".parse().unwrap()).await;
        assert_eq!(observer.dials().len(), 1);
        assert_eq!(observer.cores_created(), 1);
    }
}
