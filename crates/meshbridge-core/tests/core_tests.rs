#[cfg(test)]
mod tests {
    use meshbridge_core::*;

    // ── Error code tests ───────────────────────────────────────

    #[test]
    fn test_error_codes_are_stable() {
        assert_eq!(ErrorCode::Ok.as_i32(), 0);
        assert_eq!(ErrorCode::NoConfig.as_i32(), 1);
        assert_eq!(ErrorCode::AlreadyInitialized.as_i32(), 2);
        assert_eq!(ErrorCode::ConfigParse.as_i32(), 3);
        assert_eq!(ErrorCode::CoreCreateFailed.as_i32(), 4);
        assert_eq!(ErrorCode::NetstackCreateFailed.as_i32(), 5);
        assert_eq!(ErrorCode::NotInitialized.as_i32(), 6);
        assert_eq!(ErrorCode::AlreadyStarted.as_i32(), 7);
        assert_eq!(ErrorCode::AlreadyStopped.as_i32(), 8);
        assert_eq!(ErrorCode::ListenFailed.as_i32(), 9);
        assert_eq!(ErrorCode::ProxyStopError.as_i32(), 10);
        assert_eq!(ErrorCode::ResolveFailed.as_i32(), 11);
        assert_eq!(ErrorCode::DialFailed.as_i32(), 12);
        assert_eq!(ErrorCode::InvalidArgument.as_i32(), 13);
        assert_eq!(ErrorCode::Internal.as_i32(), 14);
    }

    #[test]
    fn test_error_codes_unique() {
        let mut seen = std::collections::HashSet::new();
        for code in ErrorCode::ALL {
            assert!(seen.insert(code.as_i32()), "duplicate code {code}");
        }
    }

    #[test]
    fn test_abi_values_are_negative() {
        assert_eq!(ErrorCode::Ok.to_abi(), 0);
        for code in ErrorCode::ALL.iter().skip(1) {
            assert!(code.to_abi() < 0);
        }
    }

    #[test]
    fn test_from_abi_roundtrip() {
        for code in ErrorCode::ALL {
            assert_eq!(ErrorCode::from_abi(code.to_abi()), Some(code));
            assert_eq!(ErrorCode::from_abi(code.as_i32()), Some(code));
        }
        assert_eq!(ErrorCode::from_abi(-999), None);
        assert_eq!(ErrorCode::from_abi(i32::MIN), None);
    }

    #[test]
    fn test_error_code_display() {
        let s = ErrorCode::AlreadyStopped.to_string();
        assert!(s.contains("already_stopped"));
        assert!(s.contains('8'));
    }

    // ── MeshError tests ────────────────────────────────────────

    #[test]
    fn test_mesh_error_codes() {
        assert_eq!(MeshError::NoConfig.code(), ErrorCode::NoConfig);
        assert_eq!(MeshError::AlreadyInitialized.code(), ErrorCode::AlreadyInitialized);
        assert_eq!(MeshError::NotInitialized.code(), ErrorCode::NotInitialized);
        assert_eq!(MeshError::ConfigParse("x".into()).code(), ErrorCode::ConfigParse);
        assert_eq!(
            MeshError::ConfigValidation {
                field: "IfMTU".into(),
                reason: "too small".into()
            }
            .code(),
            ErrorCode::ConfigParse
        );
        assert_eq!(MeshError::CoreCreate("x".into()).code(), ErrorCode::CoreCreateFailed);
        assert_eq!(
            MeshError::NetstackCreate("x".into()).code(),
            ErrorCode::NetstackCreateFailed
        );
        assert_eq!(
            MeshError::AlreadyStarted { port: 1080 }.code(),
            ErrorCode::AlreadyStarted
        );
        assert_eq!(MeshError::AlreadyStopped.code(), ErrorCode::AlreadyStopped);
        assert_eq!(MeshError::ProxyStop("x".into()).code(), ErrorCode::ProxyStopError);
        assert_eq!(
            MeshError::Dial {
                addr: "[200::1]:22".into(),
                reason: "refused".into()
            }
            .code(),
            ErrorCode::DialFailed
        );
        let io = std::io::Error::other("boom");
        assert_eq!(MeshError::from(io).code(), ErrorCode::Internal);
    }

    #[test]
    fn test_mesh_error_display() {
        let err = MeshError::Listen {
            addr: "127.0.0.1:0".into(),
            reason: "address in use".into(),
        };
        let s = err.to_string();
        assert!(s.contains("127.0.0.1:0"));
        assert!(s.contains("address in use"));

        let err = MeshError::AlreadyStarted { port: 40123 };
        assert!(err.to_string().contains("40123"));
    }

    // ── Event tests ────────────────────────────────────────────

    #[test]
    fn test_service_event_serde_tagged() {
        let event = ServiceEvent::RelayFailed {
            port: 5000,
            remote: "203.0.113.5:22".into(),
            stage: RelayStage::Dial,
            reason: "unreachable".into(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "relay_failed");
        assert_eq!(json["stage"], "dial");
        assert_eq!(json["port"], 5000);
        let restored: ServiceEvent = serde_json::from_value(json).unwrap();
        assert_eq!(restored, event);
    }

    #[tokio::test]
    async fn test_event_bus_delivers_to_subscribers() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();
        bus.publish(ServiceEvent::Socks5Started { port: 1080 });
        let got = rx.recv().await.unwrap();
        assert_eq!(got, ServiceEvent::Socks5Started { port: 1080 });
    }

    #[test]
    fn test_event_bus_without_subscribers_is_silent() {
        let bus = EventBus::default();
        bus.publish(ServiceEvent::ShutDown);
    }
}
