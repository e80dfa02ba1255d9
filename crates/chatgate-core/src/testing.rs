//! In-memory fakes for the transport, credential store and submitter ports.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::watch;
use tokio::time::Instant;

use chatgate_types::credential::CredentialSet;
use chatgate_types::dispatch::MessageReceipt;
use chatgate_types::error::{CredentialError, GatewayError, TransportError};
use chatgate_types::payload::CanonicalPayload;
use chatgate_types::session::CloseReason;

use crate::credential::CredentialStore;
use crate::dispatch::Submitter;
use crate::transport::{ConnectOptions, EventSink, Transport, TransportConnector, TransportEvent};

/// Shared state behind every fake transport a [`FakeConnector`] opens.
pub struct FakeNetwork {
    sinks: Mutex<Vec<EventSink>>,
    seen_credentials: Mutex<Vec<Option<CredentialSet>>>,
    fail_connects: AtomicUsize,
    connects: watch::Sender<usize>,
    connects_held: watch::Sender<bool>,
    sent: Mutex<Vec<(String, CanonicalPayload)>>,
    close_after_sends: Mutex<Option<(usize, CloseReason)>>,
    rejected_variants: Mutex<HashSet<&'static str>>,
    pairing_requests: Mutex<Vec<(String, Option<String>)>>,
    pairing_code: Mutex<String>,
    logouts: AtomicUsize,
    disconnects: AtomicUsize,
}

impl FakeNetwork {
    pub fn new() -> Arc<Self> {
        let (connects, _) = watch::channel(0);
        let (connects_held, _) = watch::channel(false);
        Arc::new(Self {
            sinks: Mutex::new(Vec::new()),
            seen_credentials: Mutex::new(Vec::new()),
            fail_connects: AtomicUsize::new(0),
            connects,
            connects_held,
            sent: Mutex::new(Vec::new()),
            close_after_sends: Mutex::new(None),
            rejected_variants: Mutex::new(HashSet::new()),
            pairing_requests: Mutex::new(Vec::new()),
            pairing_code: Mutex::new("ABCD1234".to_string()),
            logouts: AtomicUsize::new(0),
            disconnects: AtomicUsize::new(0),
        })
    }

    pub fn connect_count(&self) -> usize {
        *self.connects.borrow()
    }

    pub async fn wait_connects(&self, n: usize) {
        let mut rx = self.connects.subscribe();
        let _ = rx.wait_for(|count| *count >= n).await;
    }

    /// Park every `connect` call until [`Self::release_connects`].
    pub fn hold_connects(&self) {
        self.connects_held.send_replace(true);
    }

    pub fn release_connects(&self) {
        self.connects_held.send_replace(false);
    }

    pub fn fail_next_connects(&self, n: usize) {
        self.fail_connects.store(n, Ordering::SeqCst);
    }

    pub fn sink(&self, index: usize) -> EventSink {
        self.sinks.lock().unwrap()[index].clone()
    }

    pub fn last_sink(&self) -> EventSink {
        self.sinks.lock().unwrap().last().cloned().unwrap()
    }

    pub fn seen_credentials(&self) -> Vec<Option<CredentialSet>> {
        self.seen_credentials.lock().unwrap().clone()
    }

    pub fn reject_variant(&self, variant: &'static str) {
        self.rejected_variants.lock().unwrap().insert(variant);
    }

    /// Report `reason` on the current transport once `n` messages went out.
    pub fn close_after_sends(&self, n: usize, reason: CloseReason) {
        *self.close_after_sends.lock().unwrap() = Some((n, reason));
    }

    pub fn sent(&self) -> Vec<(String, CanonicalPayload)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn set_pairing_code(&self, code: &str) {
        *self.pairing_code.lock().unwrap() = code.to_string();
    }

    pub fn pairing_requests(&self) -> Vec<(String, Option<String>)> {
        self.pairing_requests.lock().unwrap().clone()
    }

    pub fn logouts(&self) -> usize {
        self.logouts.load(Ordering::SeqCst)
    }

    pub fn disconnects(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }
}

#[derive(Clone)]
pub struct FakeConnector {
    pub network: Arc<FakeNetwork>,
}

impl FakeConnector {
    pub fn new() -> Self {
        Self {
            network: FakeNetwork::new(),
        }
    }
}

pub struct FakeTransport {
    network: Arc<FakeNetwork>,
}

impl TransportConnector for FakeConnector {
    type Transport = FakeTransport;

    async fn connect(
        &self,
        options: ConnectOptions,
        events: EventSink,
    ) -> Result<FakeTransport, TransportError> {
        let network = &self.network;
        let mut held = network.connects_held.subscribe();
        let _ = held.wait_for(|held| !*held).await;
        network
            .seen_credentials
            .lock()
            .unwrap()
            .push(options.credentials);
        let failed = network
            .fail_connects
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            network.connects.send_modify(|count| *count += 1);
            return Err(TransportError::Closed("connection refused".to_string()));
        }
        network.sinks.lock().unwrap().push(events);
        network.connects.send_modify(|count| *count += 1);
        Ok(FakeTransport {
            network: Arc::clone(network),
        })
    }
}

impl Transport for FakeTransport {
    async fn send(
        &self,
        jid: &str,
        payload: &CanonicalPayload,
    ) -> Result<MessageReceipt, TransportError> {
        if self
            .network
            .rejected_variants
            .lock()
            .unwrap()
            .contains(payload.variant_name())
        {
            return Err(TransportError::Rejected(format!(
                "{} not supported",
                payload.variant_name()
            )));
        }
        let count = {
            let mut sent = self.network.sent.lock().unwrap();
            sent.push((jid.to_string(), payload.clone()));
            sent.len()
        };
        let close = self.network.close_after_sends.lock().unwrap().clone();
        if let Some((n, reason)) = close
            && n == count
        {
            self.network.last_sink().emit(TransportEvent::Closed(reason));
        }
        Ok(MessageReceipt {
            message_id: format!("msg-{count}"),
            jid: jid.to_string(),
            sent_at: Utc::now(),
        })
    }

    async fn request_pairing_code(
        &self,
        phone_number: &str,
        custom_code: Option<&str>,
    ) -> Result<String, TransportError> {
        self.network
            .pairing_requests
            .lock()
            .unwrap()
            .push((phone_number.to_string(), custom_code.map(str::to_string)));
        Ok(self.network.pairing_code.lock().unwrap().clone())
    }

    async fn logout(&self) -> Result<(), TransportError> {
        self.network.logouts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn disconnect(&self) {
        self.network.disconnects.fetch_add(1, Ordering::SeqCst);
    }

    async fn product_exists(&self, _retailer_id: &str) -> Result<bool, TransportError> {
        Ok(true)
    }
}

#[derive(Default)]
pub struct MemoryStore {
    sets: Mutex<HashMap<String, CredentialSet>>,
    pub saves: AtomicUsize,
    pub clears: AtomicUsize,
}

impl MemoryStore {
    pub fn with(session_id: &str, set: CredentialSet) -> Self {
        let store = Self::default();
        store.sets.lock().unwrap().insert(session_id.to_string(), set);
        store
    }

    pub fn stored(&self, session_id: &str) -> Option<CredentialSet> {
        self.sets.lock().unwrap().get(session_id).cloned()
    }
}

impl CredentialStore for Arc<MemoryStore> {
    async fn load(&self, session_id: &str) -> Result<Option<CredentialSet>, CredentialError> {
        Ok(self.stored(session_id))
    }

    async fn save(&self, session_id: &str, credentials: &CredentialSet) -> Result<(), CredentialError> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.sets
            .lock()
            .unwrap()
            .insert(session_id.to_string(), credentials.clone());
        Ok(())
    }

    async fn clear(&self, session_id: &str) -> Result<(), CredentialError> {
        self.clears.fetch_add(1, Ordering::SeqCst);
        self.sets.lock().unwrap().remove(session_id);
        Ok(())
    }
}

/// Submitter that records every call with its (virtual) timestamp.
pub struct RecordingSubmitter {
    ready: AtomicBool,
    calls: Mutex<Vec<(Instant, String, CanonicalPayload)>>,
    failing_jids: Mutex<HashSet<String>>,
    rejected_variants: Mutex<HashSet<&'static str>>,
    listed: Mutex<Option<bool>>,
}

impl RecordingSubmitter {
    pub fn new() -> Self {
        Self {
            ready: AtomicBool::new(true),
            calls: Mutex::new(Vec::new()),
            failing_jids: Mutex::new(HashSet::new()),
            rejected_variants: Mutex::new(HashSet::new()),
            listed: Mutex::new(None),
        }
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    pub fn fail_jid(&self, jid: &str) {
        self.failing_jids.lock().unwrap().insert(jid.to_string());
    }

    pub fn reject_variant(&self, variant: &'static str) {
        self.rejected_variants.lock().unwrap().insert(variant);
    }

    pub fn set_listed(&self, listed: Option<bool>) {
        *self.listed.lock().unwrap() = listed;
    }

    pub fn calls(&self) -> Vec<(Instant, String, CanonicalPayload)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl Submitter for RecordingSubmitter {
    fn ready(&self) -> Result<(), GatewayError> {
        if self.ready.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(GatewayError::NotConnected)
        }
    }

    async fn submit(
        &self,
        jid: &str,
        payload: &CanonicalPayload,
    ) -> Result<MessageReceipt, GatewayError> {
        let index = {
            let mut calls = self.calls.lock().unwrap();
            calls.push((Instant::now(), jid.to_string(), payload.clone()));
            calls.len()
        };
        if self.failing_jids.lock().unwrap().contains(jid) {
            return Err(GatewayError::TransientTransportFailure(format!(
                "recipient {jid} unreachable"
            )));
        }
        if self
            .rejected_variants
            .lock()
            .unwrap()
            .contains(payload.variant_name())
        {
            return Err(GatewayError::TransientTransportFailure(format!(
                "{} rejected",
                payload.variant_name()
            )));
        }
        Ok(MessageReceipt {
            message_id: format!("msg-{index}"),
            jid: jid.to_string(),
            sent_at: Utc::now(),
        })
    }

    async fn probe_catalog(&self, _retailer_id: &str) -> Option<bool> {
        *self.listed.lock().unwrap()
    }
}
