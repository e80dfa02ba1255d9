use thiserror::Error;

/// Gateway-level errors surfaced to callers.
///
/// Every variant has a machine-stable [`reason_tag`](GatewayError::reason_tag)
/// alongside its human-readable `Display` text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    #[error("session is not initialized")]
    NotInitialized,

    #[error("session is not connected")]
    NotConnected,

    #[error("session is logged out; re-authentication required")]
    LoggedOut,

    #[error("no challenge is pending")]
    NoChallenge,

    #[error("invalid intent: {0}")]
    InvalidIntent(String),

    #[error("invalid target: {0}")]
    InvalidTarget(String),

    #[error("batch of {len} items exceeds the limit of {max}")]
    BatchTooLarge { len: usize, max: usize },

    #[error("transport failure: {0}")]
    TransientTransportFailure(String),
}

impl GatewayError {
    pub fn reason_tag(&self) -> &'static str {
        match self {
            GatewayError::NotInitialized => "NOT_INITIALIZED",
            GatewayError::NotConnected => "NOT_CONNECTED",
            GatewayError::LoggedOut => "LOGGED_OUT",
            GatewayError::NoChallenge => "NO_CHALLENGE",
            GatewayError::InvalidIntent(_) => "INVALID_INTENT",
            GatewayError::InvalidTarget(_) => "INVALID_TARGET",
            GatewayError::BatchTooLarge { .. } => "BATCH_TOO_LARGE",
            GatewayError::TransientTransportFailure(_) => "TRANSIENT_TRANSPORT_FAILURE",
        }
    }

    /// Shorthand for [`GatewayError::InvalidIntent`].
    pub fn invalid(msg: impl Into<String>) -> Self {
        GatewayError::InvalidIntent(msg.into())
    }
}

/// Errors reported by a transport implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("payload rejected: {0}")]
    Rejected(String),

    #[error("transport request timed out")]
    Timeout,

    #[error("transport closed: {0}")]
    Closed(String),

    #[error("session logged out")]
    LoggedOut,

    #[error("bridge error: {0}")]
    Bridge(String),
}

impl From<TransportError> for GatewayError {
    fn from(e: TransportError) -> Self {
        match e {
            TransportError::LoggedOut => GatewayError::LoggedOut,
            other => GatewayError::TransientTransportFailure(other.to_string()),
        }
    }
}

/// Errors from the credential store.
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("credential storage error: {0}")]
    Storage(String),

    #[error("invalid credential entry name: '{0}'")]
    InvalidName(String),
}

impl From<std::io::Error> for CredentialError {
    fn from(e: std::io::Error) -> Self {
        CredentialError::Storage(e.to_string())
    }
}
