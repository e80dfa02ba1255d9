//! Session lifecycle types: connection state, challenges, close reasons and
//! the status snapshot published to read-only consumers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use std::fmt;
use std::str::FromStr;

/// States of the single process-wide connection.
///
/// - Uninitialized: no transport exists (process start, after logout)
/// - Connecting: a transport is being opened
/// - AwaitingChallenge: a QR value or pairing code was issued and is pending
/// - Connected: authenticated and able to send
/// - Disconnected: the transport closed; a reconnect may be scheduled
/// - LoggedOut: terminal until an operator reinitializes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Uninitialized,
    Connecting,
    AwaitingChallenge,
    Connected,
    Disconnected,
    LoggedOut,
}

impl SessionState {
    /// Whether a transport instance may exist in this state.
    pub fn has_transport(&self) -> bool {
        matches!(
            self,
            SessionState::Connecting | SessionState::AwaitingChallenge | SessionState::Connected
        )
    }

    /// States from which an explicit initialize starts a new transport.
    pub fn can_initialize(&self) -> bool {
        matches!(self, SessionState::Uninitialized | SessionState::LoggedOut)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionState::Uninitialized => "uninitialized",
            SessionState::Connecting => "connecting",
            SessionState::AwaitingChallenge => "awaiting_challenge",
            SessionState::Connected => "connected",
            SessionState::Disconnected => "disconnected",
            SessionState::LoggedOut => "logged_out",
        };
        f.write_str(s)
    }
}

impl FromStr for SessionState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "uninitialized" => Ok(SessionState::Uninitialized),
            "connecting" => Ok(SessionState::Connecting),
            "awaiting_challenge" => Ok(SessionState::AwaitingChallenge),
            "connected" => Ok(SessionState::Connected),
            "disconnected" => Ok(SessionState::Disconnected),
            "logged_out" => Ok(SessionState::LoggedOut),
            other => Err(format!("invalid session state: '{other}'")),
        }
    }
}

/// An authentication challenge pending on the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Challenge {
    /// QR payload to be rendered and scanned by the phone.
    Qr { value: String },
    /// Pairing code requested for a phone number.
    PairingCode {
        phone_number: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        custom_code: Option<String>,
        /// Formatted code for human entry (e.g. `ABCD-1234`).
        code: String,
    },
}

impl Challenge {
    /// The QR payload, if this is a QR challenge.
    pub fn qr_value(&self) -> Option<&str> {
        match self {
            Challenge::Qr { value } => Some(value),
            Challenge::PairingCode { .. } => None,
        }
    }
}

/// Bridge status code the transport reports for a revoked / logged out session.
pub const LOGGED_OUT_STATUS_CODE: u16 = 401;

/// Why the transport closed, as reported by the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloseReason {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(default)]
    pub message: String,
}

/// Classification of a close reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseKind {
    /// Explicit user action or server-forced revoke. Terminal.
    LoggedOut,
    /// Anything else: network error, timeout, stream reset.
    Transient,
}

impl CloseReason {
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            status_code: None,
            message: message.into(),
        }
    }

    pub fn logged_out(message: impl Into<String>) -> Self {
        Self {
            status_code: Some(LOGGED_OUT_STATUS_CODE),
            message: message.into(),
        }
    }

    pub fn kind(&self) -> CloseKind {
        match self.status_code {
            Some(LOGGED_OUT_STATUS_CODE) => CloseKind::LoggedOut,
            _ => CloseKind::Transient,
        }
    }
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status_code {
            Some(code) => write!(f, "{} (status {code})", self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Read-only snapshot of the session, as returned by status queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionStatus {
    pub connected: bool,
    pub state: SessionState,
    pub has_challenge: bool,
    pub reconnect_attempt: u32,
    /// Account identifier reported by the transport once connected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub own_identity: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl SessionStatus {
    pub fn initial() -> Self {
        Self {
            connected: false,
            state: SessionState::Uninitialized,
            has_challenge: false,
            reconnect_attempt: 0,
            own_identity: None,
            updated_at: Utc::now(),
        }
    }
}

impl Default for SessionStatus {
    fn default() -> Self {
        Self::initial()
    }
}
