//! Session events republished to read-only consumers (status endpoints,
//! QR/pairing renderers) via the connection event bus.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::session::SessionState;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    /// The session moved between lifecycle states.
    StateChanged {
        from: SessionState,
        to: SessionState,
        at: DateTime<Utc>,
    },
    /// A new QR payload is available for scanning.
    QrUpdated { value: String },
    /// A pairing code was issued for a phone number.
    PairingCodeIssued { phone_number: String, code: String },
    /// A reconnect timer was armed after a transient close.
    ReconnectScheduled { attempt: u32, delay_ms: u64 },
    /// The reconnect budget ran out; the session is terminal.
    ReconnectExhausted { attempts: u32 },
    /// Credential material was written to the credential store.
    CredentialsPersisted { entries: usize },
}

impl SessionEvent {
    /// SSE event name for this event.
    pub fn name(&self) -> &'static str {
        match self {
            SessionEvent::StateChanged { .. } => "state_changed",
            SessionEvent::QrUpdated { .. } => "qr_updated",
            SessionEvent::PairingCodeIssued { .. } => "pairing_code_issued",
            SessionEvent::ReconnectScheduled { .. } => "reconnect_scheduled",
            SessionEvent::ReconnectExhausted { .. } => "reconnect_exhausted",
            SessionEvent::CredentialsPersisted { .. } => "credentials_persisted",
        }
    }
}
