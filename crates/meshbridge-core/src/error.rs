use thiserror::Error;

/// Stable error codes returned across the host boundary.
///
/// The numbering is part of the ABI contract: values are never reused or
/// renumbered. Host entry points return the negated value so that calls
/// yielding a port number can share a single integer result.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Ok = 0,
    /// A required input (config text, address) was absent.
    NoConfig = 1,
    AlreadyInitialized = 2,
    ConfigParse = 3,
    CoreCreateFailed = 4,
    NetstackCreateFailed = 5,
    NotInitialized = 6,
    AlreadyStarted = 7,
    AlreadyStopped = 8,
    ListenFailed = 9,
    ProxyStopError = 10,
    ResolveFailed = 11,
    DialFailed = 12,
    /// Null handle, non-UTF-8 text, or an otherwise unusable argument.
    InvalidArgument = 13,
    Internal = 14,
}

impl ErrorCode {
    pub const ALL: [ErrorCode; 15] = [
        ErrorCode::Ok,
        ErrorCode::NoConfig,
        ErrorCode::AlreadyInitialized,
        ErrorCode::ConfigParse,
        ErrorCode::CoreCreateFailed,
        ErrorCode::NetstackCreateFailed,
        ErrorCode::NotInitialized,
        ErrorCode::AlreadyStarted,
        ErrorCode::AlreadyStopped,
        ErrorCode::ListenFailed,
        ErrorCode::ProxyStopError,
        ErrorCode::ResolveFailed,
        ErrorCode::DialFailed,
        ErrorCode::InvalidArgument,
        ErrorCode::Internal,
    ];

    /// The positive code value.
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// The value written across the C boundary: `0` for `Ok`, negative otherwise.
    pub fn to_abi(self) -> i32 {
        -(self as i32)
    }

    /// Inverse of [`ErrorCode::to_abi`]. Accepts either sign.
    pub fn from_abi(value: i32) -> Option<Self> {
        let v = value.checked_abs()?;
        Self::ALL.iter().copied().find(|c| c.as_i32() == v)
    }

    pub fn name(self) -> &'static str {
        match self {
            ErrorCode::Ok => "ok",
            ErrorCode::NoConfig => "no_config",
            ErrorCode::AlreadyInitialized => "already_initialized",
            ErrorCode::ConfigParse => "config_parse",
            ErrorCode::CoreCreateFailed => "core_create_failed",
            ErrorCode::NetstackCreateFailed => "netstack_create_failed",
            ErrorCode::NotInitialized => "not_initialized",
            ErrorCode::AlreadyStarted => "already_started",
            ErrorCode::AlreadyStopped => "already_stopped",
            ErrorCode::ListenFailed => "listen_failed",
            ErrorCode::ProxyStopError => "proxy_stop_error",
            ErrorCode::ResolveFailed => "resolve_failed",
            ErrorCode::DialFailed => "dial_failed",
            ErrorCode::InvalidArgument => "invalid_argument",
            ErrorCode::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name(), self.as_i32())
    }
}

/// Unified error type for the meshbridge workspace.
#[derive(Error, Debug)]
pub enum MeshError {
    // ── Lifecycle errors ───────────────────────────────────────
    #[error("no configuration supplied")]
    NoConfig,

    #[error("instance already initialized")]
    AlreadyInitialized,

    #[error("instance not initialized")]
    NotInitialized,

    // ── Config errors ──────────────────────────────────────────
    #[error("config parse error: {0}")]
    ConfigParse(String),

    #[error("config validation failed: {field}: {reason}")]
    ConfigValidation { field: String, reason: String },

    // ── Stack errors ───────────────────────────────────────────
    #[error("mesh core failed to start: {0}")]
    CoreCreate(String),

    #[error("netstack failed to attach: {0}")]
    NetstackCreate(String),

    // ── Proxy errors ───────────────────────────────────────────
    #[error("socks5 proxy already started on port {port}")]
    AlreadyStarted { port: u16 },

    #[error("socks5 proxy not running")]
    AlreadyStopped,

    #[error("failed to listen on {addr}: {reason}")]
    Listen { addr: String, reason: String },

    #[error("failed to stop socks5 proxy: {0}")]
    ProxyStop(String),

    #[error("failed to resolve {addr}: {reason}")]
    Resolve { addr: String, reason: String },

    #[error("dial {addr} failed: {reason}")]
    Dial { addr: String, reason: String },

    // ── Boundary errors ────────────────────────────────────────
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    // ── Generic wrappers ───────────────────────────────────────
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl MeshError {
    /// The stable code this error is reported as across the host boundary.
    pub fn code(&self) -> ErrorCode {
        match self {
            MeshError::NoConfig => ErrorCode::NoConfig,
            MeshError::AlreadyInitialized => ErrorCode::AlreadyInitialized,
            MeshError::NotInitialized => ErrorCode::NotInitialized,
            MeshError::ConfigParse(_) => ErrorCode::ConfigParse,
            MeshError::ConfigValidation { .. } => ErrorCode::ConfigParse,
            MeshError::CoreCreate(_) => ErrorCode::CoreCreateFailed,
            MeshError::NetstackCreate(_) => ErrorCode::NetstackCreateFailed,
            MeshError::AlreadyStarted { .. } => ErrorCode::AlreadyStarted,
            MeshError::AlreadyStopped => ErrorCode::AlreadyStopped,
            MeshError::Listen { .. } => ErrorCode::ListenFailed,
            MeshError::ProxyStop(_) => ErrorCode::ProxyStopError,
            MeshError::Resolve { .. } => ErrorCode::ResolveFailed,
            MeshError::Dial { .. } => ErrorCode::DialFailed,
            MeshError::InvalidArgument(_) => ErrorCode::InvalidArgument,
            MeshError::Io(_) | MeshError::Serialization(_) => ErrorCode::Internal,
        }
    }
}

pub type Result<T> = std::result::Result<T, MeshError>;
