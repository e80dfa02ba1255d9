//! Transport port: the abstract chat-protocol client.
//!
//! Defined in chatgate-core so the session and dispatch layers never depend
//! on a concrete protocol implementation. The bridge adapter lives in
//! chatgate-infra. Uses native async fn in traits (RPITIT, no async_trait).

use std::future::Future;

use tokio::sync::mpsc;

use chatgate_types::credential::CredentialSet;
use chatgate_types::dispatch::MessageReceipt;
use chatgate_types::error::TransportError;
use chatgate_types::payload::CanonicalPayload;
use chatgate_types::session::CloseReason;

/// Events a transport reports about its connection.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// A QR payload for the phone to scan.
    Qr(String),
    /// The connection is open and authenticated.
    Open { own_identity: Option<String> },
    /// The connection closed.
    Closed(CloseReason),
    /// Credential material changed; carries only the changed entries.
    CredentialsUpdated(CredentialSet),
}

/// Handle a transport uses to report events for the generation it was
/// created for.
///
/// Events emitted after the session has moved on to a newer transport are
/// dropped by the session manager.
#[derive(Debug, Clone)]
pub struct EventSink {
    generation: u64,
    tx: mpsc::UnboundedSender<(u64, TransportEvent)>,
}

impl EventSink {
    pub(crate) fn new(generation: u64, tx: mpsc::UnboundedSender<(u64, TransportEvent)>) -> Self {
        Self { generation, tx }
    }

    /// A sink not attached to a session manager; events land on the returned receiver.
    pub fn channel(generation: u64) -> (Self, mpsc::UnboundedReceiver<(u64, TransportEvent)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { generation, tx }, rx)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Report an event. Returns `false` once the receiving side is gone.
    pub fn emit(&self, event: TransportEvent) -> bool {
        self.tx.send((self.generation, event)).is_ok()
    }
}

/// What a connector needs to open a transport.
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    pub session_id: String,
    /// Persisted credentials, or `None` for a fresh login (QR / pairing).
    pub credentials: Option<CredentialSet>,
}

/// A live chat-protocol client for one connection generation.
pub trait Transport: Send + Sync + 'static {
    /// Submit a payload to a qualified recipient and return its receipt.
    fn send(
        &self,
        jid: &str,
        payload: &CanonicalPayload,
    ) -> impl Future<Output = Result<MessageReceipt, TransportError>> + Send;

    /// Ask the network for a pairing code for `phone_number` (digits only).
    fn request_pairing_code(
        &self,
        phone_number: &str,
        custom_code: Option<&str>,
    ) -> impl Future<Output = Result<String, TransportError>> + Send;

    /// Invalidate the session server-side.
    fn logout(&self) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Close the connection without invalidating the session.
    fn disconnect(&self) -> impl Future<Output = ()> + Send;

    /// Whether a catalog item with this retailer id is listed.
    fn product_exists(
        &self,
        retailer_id: &str,
    ) -> impl Future<Output = Result<bool, TransportError>> + Send;
}

/// Factory that opens a fresh [`Transport`] for every (re)connect.
pub trait TransportConnector: Send + Sync + 'static {
    type Transport: Transport;

    fn connect(
        &self,
        options: ConnectOptions,
        events: EventSink,
    ) -> impl Future<Output = Result<Self::Transport, TransportError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn detached_sink_tags_events_with_generation() {
        let (sink, mut rx) = EventSink::channel(7);
        assert!(sink.emit(TransportEvent::Qr("qr-1".to_string())));

        let (generation, event) = rx.recv().await.unwrap();
        assert_eq!(generation, 7);
        assert_eq!(event, TransportEvent::Qr("qr-1".to_string()));
    }

    #[tokio::test]
    async fn emit_reports_closed_receiver() {
        let (sink, rx) = EventSink::channel(1);
        drop(rx);
        assert!(!sink.emit(TransportEvent::Open { own_identity: None }));
    }
}
