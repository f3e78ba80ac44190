//! Peer and listen URI handling.

use std::fmt;
use url::Url;

/// Link transports the mesh engine understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerScheme {
    Tcp,
    Tls,
    Quic,
    Ws,
    Wss,
    Socks,
    SocksTls,
    Unix,
}

impl PeerScheme {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "tcp" => Some(Self::Tcp),
            "tls" => Some(Self::Tls),
            "quic" => Some(Self::Quic),
            "ws" => Some(Self::Ws),
            "wss" => Some(Self::Wss),
            "socks" => Some(Self::Socks),
            "sockstls" => Some(Self::SocksTls),
            "unix" => Some(Self::Unix),
            _ => None,
        }
    }

    /// Whether a listener on this scheme binds a TCP socket.
    pub fn is_stream(self) -> bool {
        matches!(self, Self::Tcp | Self::Tls | Self::Ws | Self::Wss)
    }
}

impl fmt::Display for PeerScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Tcp => "tcp",
            Self::Tls => "tls",
            Self::Quic => "quic",
            Self::Ws => "ws",
            Self::Wss => "wss",
            Self::Socks => "socks",
            Self::SocksTls => "sockstls",
            Self::Unix => "unix",
        };
        f.write_str(s)
    }
}

/// A parsed peer or listen URI.
#[derive(Debug, Clone)]
pub struct PeerUri {
    pub scheme: PeerScheme,
    /// `host:port` for network schemes, the socket path for `unix`.
    pub target: String,
    raw: String,
}

impl PeerUri {
    pub fn parse(raw: &str) -> Result<Self, String> {
        let url = Url::parse(raw.trim()).map_err(|e| format!("invalid peer URI '{raw}': {e}"))?;
        let scheme = PeerScheme::parse(url.scheme())
            .ok_or_else(|| format!("unsupported peer scheme '{}' in '{raw}'", url.scheme()))?;

        let target = if scheme == PeerScheme::Unix {
            if url.path().is_empty() {
                return Err(format!("unix peer URI '{raw}' has no path"));
            }
            url.path().to_string()
        } else {
            let host = url
                .host_str()
                .ok_or_else(|| format!("peer URI '{raw}' has no host"))?;
            let port = url
                .port_or_known_default()
                .ok_or_else(|| format!("peer URI '{raw}' has no port"))?;
            // `host_str` keeps the brackets on IPv6 literals.
            format!("{host}:{port}")
        };

        Ok(Self {
            scheme,
            target,
            raw: raw.trim().to_string(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for PeerUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tls_peer() {
        let p = PeerUri::parse("tls://192.0.2.1:443").unwrap();
        assert_eq!(p.scheme, PeerScheme::Tls);
        assert_eq!(p.target, "192.0.2.1:443");
    }

    #[test]
    fn test_parse_ipv6_peer_keeps_brackets() {
        let p = PeerUri::parse("tcp://[2001:db8::1]:9000").unwrap();
        assert_eq!(p.target, "[2001:db8::1]:9000");
    }

    #[test]
    fn test_parse_peer_with_query() {
        let p = PeerUri::parse("quic://peer.example.net:443?key=abcd").unwrap();
        assert_eq!(p.scheme, PeerScheme::Quic);
        assert_eq!(p.target, "peer.example.net:443");
        assert!(!p.scheme.is_stream());
    }

    #[test]
    fn test_parse_unix() {
        let p = PeerUri::parse("unix:///var/run/mesh.sock").unwrap();
        assert_eq!(p.scheme, PeerScheme::Unix);
        assert_eq!(p.target, "/var/run/mesh.sock");
    }

    #[test]
    fn test_rejects_unknown_scheme() {
        let err = PeerUri::parse("http://192.0.2.1:80").unwrap_err();
        assert!(err.contains("unsupported"));
    }

    #[test]
    fn test_rejects_missing_port() {
        assert!(PeerUri::parse("tcp://192.0.2.1").is_err());
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(PeerUri::parse("not a uri").is_err());
    }
}
