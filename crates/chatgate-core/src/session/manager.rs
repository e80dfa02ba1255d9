//! Session manager: owns the single live transport and drives its lifecycle.
//!
//! All transitions and counter updates happen under one async mutex. A
//! single driver task consumes generation-tagged transport events and
//! reconnect-timer firings, so events from a transport that has already
//! been replaced are dropped instead of racing the current one.
//!
//! Senders never see the mutex: [`SessionManager::acquire`] reads a separate
//! slot that holds the transport only while the session is Connected.

use std::sync::{Arc, RwLock};

use chrono::Utc;
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use chatgate_types::config::ReconnectPolicy;
use chatgate_types::credential::CredentialSet;
use chatgate_types::dispatch::MessageReceipt;
use chatgate_types::error::{GatewayError, TransportError};
use chatgate_types::event::SessionEvent;
use chatgate_types::payload::CanonicalPayload;
use chatgate_types::session::{Challenge, CloseKind, CloseReason, SessionState, SessionStatus};

use crate::credential::CredentialStore;
use crate::dispatch::Submitter;
use crate::event::{ConnectionEventBus, SessionObserver, SessionSnapshot};
use crate::session::pairing::{
    IssuedPairingCode, custom_pairing_code, format_pairing_code, pairing_phone_number,
};
use crate::transport::{ConnectOptions, EventSink, Transport, TransportConnector, TransportEvent};

/// Construction parameters for a [`SessionManager`].
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub session_id: String,
    pub reconnect: ReconnectPolicy,
    /// Per-subscriber buffer of the session event stream.
    pub event_capacity: usize,
}

impl SessionSettings {
    pub fn new(session_id: impl Into<String>, reconnect: ReconnectPolicy) -> Self {
        Self {
            session_id: session_id.into(),
            reconnect,
            event_capacity: 256,
        }
    }
}

struct SessionInner<T> {
    state: SessionState,
    reconnect_attempt: u32,
    pending_challenge: Option<Challenge>,
    own_identity: Option<String>,
    transport: Option<Arc<T>>,
    credentials: Option<CredentialSet>,
    /// Bumped whenever the current transport is replaced or invalidated.
    generation: u64,
}

impl<T> SessionInner<T> {
    fn new() -> Self {
        Self {
            state: SessionState::Uninitialized,
            reconnect_attempt: 0,
            pending_challenge: None,
            own_identity: None,
            transport: None,
            credentials: None,
            generation: 0,
        }
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            status: SessionStatus {
                connected: self.state == SessionState::Connected,
                state: self.state,
                has_challenge: self.pending_challenge.is_some(),
                reconnect_attempt: self.reconnect_attempt,
                own_identity: self.own_identity.clone(),
                updated_at: Utc::now(),
            },
            challenge: self.pending_challenge.clone(),
        }
    }

    fn awaiting_login(&self) -> bool {
        matches!(
            self.state,
            SessionState::Connecting | SessionState::AwaitingChallenge
        )
    }
}

struct Shared<C: TransportConnector, S: CredentialStore> {
    connector: C,
    store: S,
    session_id: String,
    policy: ReconnectPolicy,
    bus: ConnectionEventBus,
    observer: SessionObserver,
    inner: Mutex<SessionInner<C::Transport>>,
    live: RwLock<Option<Arc<C::Transport>>>,
    events_tx: mpsc::UnboundedSender<(u64, TransportEvent)>,
    timers_tx: mpsc::UnboundedSender<u64>,
    shutdown: CancellationToken,
}

/// Owner of the process-wide session. Cheap to clone.
pub struct SessionManager<C: TransportConnector, S: CredentialStore> {
    shared: Arc<Shared<C, S>>,
}

impl<C: TransportConnector, S: CredentialStore> Clone for SessionManager<C, S> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<C: TransportConnector, S: CredentialStore> SessionManager<C, S> {
    /// Create the manager and start its driver task. Must be called from
    /// within a Tokio runtime. The session starts Uninitialized.
    pub fn spawn(connector: C, store: S, settings: SessionSettings) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (timers_tx, timers_rx) = mpsc::unbounded_channel();
        let bus = ConnectionEventBus::new(settings.event_capacity);
        let observer = bus.observer();
        let inner = SessionInner::new();
        bus.publish_snapshot(inner.snapshot());

        let shared = Arc::new(Shared {
            connector,
            store,
            session_id: settings.session_id,
            policy: settings.reconnect,
            bus,
            observer,
            inner: Mutex::new(inner),
            live: RwLock::new(None),
            events_tx,
            timers_tx,
            shutdown: CancellationToken::new(),
        });

        tokio::spawn(run_driver(Arc::clone(&shared), events_rx, timers_rx));
        Self { shared }
    }

    pub fn session_id(&self) -> &str {
        &self.shared.session_id
    }

    /// Read-only handle for status consumers.
    pub fn observer(&self) -> SessionObserver {
        self.shared.observer.clone()
    }

    /// Current status. Pure read; never blocks on the session lock.
    pub fn status(&self) -> SessionStatus {
        self.shared.observer.status()
    }

    /// The pending QR or pairing challenge.
    pub fn challenge(&self) -> Result<Challenge, GatewayError> {
        self.shared.observer.challenge().ok_or(GatewayError::NoChallenge)
    }

    /// Open a transport from Uninitialized or LoggedOut, using stored
    /// credentials when present. No-op while a session is already live.
    pub async fn initialize(&self) -> SessionStatus {
        let shared = &self.shared;
        let mut inner = shared.inner.lock().await;
        if !inner.state.can_initialize() {
            debug!(state = %inner.state, "initialize ignored, session already live");
            return inner.snapshot().status;
        }

        inner.reconnect_attempt = 0;
        if inner.credentials.is_none() {
            inner.credentials = match shared.store.load(&shared.session_id).await {
                Ok(credentials) => credentials,
                Err(e) => {
                    warn!(error = %e, "failed to load stored credentials, starting fresh login");
                    None
                }
            };
        }
        info!(
            session_id = %shared.session_id,
            has_credentials = inner.credentials.is_some(),
            "initializing session"
        );
        shared.transition(&mut inner, SessionState::Connecting);
        shared.open_transport(&mut inner).await;
        inner.snapshot().status
    }

    /// The transport to submit one message through.
    ///
    /// Fails with `NotInitialized`, `LoggedOut` or `NotConnected` unless the
    /// session is Connected. Callers must not hold the handle across sends.
    pub fn acquire(&self) -> Result<Arc<C::Transport>, GatewayError> {
        let live = self
            .shared
            .live
            .read()
            .map(|slot| slot.clone())
            .unwrap_or(None);
        if let Some(transport) = live {
            return Ok(transport);
        }
        Err(match self.status().state {
            SessionState::Uninitialized => GatewayError::NotInitialized,
            SessionState::LoggedOut => GatewayError::LoggedOut,
            _ => GatewayError::NotConnected,
        })
    }

    /// Request a pairing code as an alternative to scanning the QR value.
    ///
    /// Returns the code formatted for entry on the phone, with the phone
    /// number reduced to the digits that were sent to the transport.
    pub async fn request_pairing_code(
        &self,
        phone_number: &str,
        custom_code: Option<&str>,
    ) -> Result<IssuedPairingCode, GatewayError> {
        let shared = &self.shared;
        let phone_number = pairing_phone_number(phone_number)?;
        let custom_code = custom_pairing_code(custom_code)?;

        let (transport, generation) = {
            let inner = shared.inner.lock().await;
            let transport = inner.transport.clone().ok_or(GatewayError::NotInitialized)?;
            (transport, inner.generation)
        };

        let raw = transport
            .request_pairing_code(&phone_number, custom_code.as_deref())
            .await?;
        let code = format_pairing_code(&raw);

        let mut inner = shared.inner.lock().await;
        if inner.generation == generation && inner.awaiting_login() {
            inner.pending_challenge = Some(Challenge::PairingCode {
                phone_number: phone_number.clone(),
                custom_code,
                code: code.clone(),
            });
            shared.transition(&mut inner, SessionState::AwaitingChallenge);
        }
        info!(phone_number = %phone_number, "pairing code issued");
        shared.bus.publish(SessionEvent::PairingCodeIssued {
            phone_number: phone_number.clone(),
            code: code.clone(),
        });
        Ok(IssuedPairingCode { phone_number, code })
    }

    /// Invalidate the server-side session, discard credentials and return to
    /// Uninitialized. Idempotent. Returns whether there was anything to end.
    pub async fn logout(&self) -> bool {
        let shared = &self.shared;
        let mut inner = shared.inner.lock().await;
        let had_session = inner.transport.is_some()
            || inner.credentials.is_some()
            || inner.state != SessionState::Uninitialized;

        inner.generation += 1;
        shared.set_live(None);
        // Pairing, logout and the driver wait behind these transport calls.
        if let Some(transport) = inner.transport.take() {
            if let Err(e) = transport.logout().await {
                warn!(error = %e, "transport logout failed, discarding session locally");
            }
            transport.disconnect().await;
        }

        inner.credentials = None;
        if let Err(e) = shared.store.clear(&shared.session_id).await {
            warn!(error = %e, "failed to clear stored credentials");
        }
        inner.reconnect_attempt = 0;
        inner.own_identity = None;
        shared.transition(&mut inner, SessionState::Uninitialized);
        if had_session {
            info!(session_id = %shared.session_id, "session logged out");
        }
        had_session
    }

    /// Stop the driver and close the transport without invalidating the session.
    pub async fn shutdown(&self) {
        let shared = &self.shared;
        shared.shutdown.cancel();
        let mut inner = shared.inner.lock().await;
        inner.generation += 1;
        shared.set_live(None);
        if let Some(transport) = inner.transport.take() {
            transport.disconnect().await;
        }
        debug!("session manager shut down");
    }
}

impl<C: TransportConnector, S: CredentialStore> Submitter for SessionManager<C, S> {
    fn ready(&self) -> Result<(), GatewayError> {
        self.acquire().map(|_| ())
    }

    async fn submit(
        &self,
        jid: &str,
        payload: &CanonicalPayload,
    ) -> Result<MessageReceipt, GatewayError> {
        let transport = self.acquire()?;
        Ok(transport.send(jid, payload).await?)
    }

    async fn probe_catalog(&self, retailer_id: &str) -> Option<bool> {
        let transport = self.acquire().ok()?;
        match transport.product_exists(retailer_id).await {
            Ok(listed) => Some(listed),
            Err(e) => {
                debug!(retailer_id, error = %e, "catalog probe failed");
                None
            }
        }
    }
}

impl<C: TransportConnector, S: CredentialStore> Shared<C, S> {
    fn transition(&self, inner: &mut SessionInner<C::Transport>, to: SessionState) {
        let from = inner.state;
        inner.state = to;
        if to != SessionState::AwaitingChallenge {
            inner.pending_challenge = None;
        }
        if from != to {
            info!(%from, %to, attempt = inner.reconnect_attempt, "session state changed");
            self.bus.publish(SessionEvent::StateChanged {
                from,
                to,
                at: Utc::now(),
            });
        }
        self.bus.publish_snapshot(inner.snapshot());
    }

    fn set_live(&self, transport: Option<Arc<C::Transport>>) {
        match self.live.write() {
            Ok(mut slot) => *slot = transport,
            Err(poisoned) => *poisoned.into_inner() = transport,
        }
    }

    /// Open a new transport generation. A failed connect counts as a
    /// transient close of that generation.
    ///
    /// Runs under the session lock, so the connect call (bounded by the
    /// transport's own timeout) finishes before any other transition or
    /// queued event is handled. `status` and `acquire` never take the lock.
    async fn open_transport(&self, inner: &mut SessionInner<C::Transport>) {
        inner.generation += 1;
        let generation = inner.generation;
        let sink = EventSink::new(generation, self.events_tx.clone());
        let options = ConnectOptions {
            session_id: self.session_id.clone(),
            credentials: inner.credentials.clone(),
        };

        match self.connector.connect(options, sink).await {
            Ok(transport) => {
                debug!(generation, "transport opened");
                inner.transport = Some(Arc::new(transport));
            }
            Err(e) => {
                warn!(generation, error = %e, "transport connect failed");
                let reason = match e {
                    TransportError::LoggedOut => CloseReason::logged_out(e.to_string()),
                    other => CloseReason::transient(other.to_string()),
                };
                self.handle_close(inner, reason).await;
            }
        }
    }

    async fn handle_close(&self, inner: &mut SessionInner<C::Transport>, reason: CloseReason) {
        // Invalidates every event and timer issued for the closed generation.
        inner.generation += 1;
        inner.transport = None;
        inner.own_identity = None;
        self.set_live(None);
        self.transition(inner, SessionState::Disconnected);

        match reason.kind() {
            CloseKind::LoggedOut => {
                warn!(reason = %reason, "session logged out by the network");
                inner.credentials = None;
                if let Err(e) = self.store.clear(&self.session_id).await {
                    warn!(error = %e, "failed to clear revoked credentials");
                }
                self.transition(inner, SessionState::LoggedOut);
            }
            CloseKind::Transient if self.policy.allows(inner.reconnect_attempt) => {
                let delay = self.policy.delay_for(inner.reconnect_attempt);
                inner.reconnect_attempt += 1;
                let attempt = inner.reconnect_attempt;
                let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
                info!(attempt, delay_ms, reason = %reason, "reconnect scheduled");
                self.bus.publish_snapshot(inner.snapshot());
                self.bus
                    .publish(SessionEvent::ReconnectScheduled { attempt, delay_ms });

                let generation = inner.generation;
                let timers = self.timers_tx.clone();
                let shutdown = self.shutdown.clone();
                tokio::spawn(async move {
                    tokio::select! {
                        _ = shutdown.cancelled() => {}
                        _ = tokio::time::sleep(delay) => {
                            let _ = timers.send(generation);
                        }
                    }
                });
            }
            CloseKind::Transient => {
                let attempts = inner.reconnect_attempt;
                warn!(attempts, reason = %reason, "reconnect attempts exhausted");
                self.transition(inner, SessionState::LoggedOut);
                self.bus.publish(SessionEvent::ReconnectExhausted { attempts });
            }
        }
    }

    async fn on_transport_event(&self, generation: u64, event: TransportEvent) {
        let mut inner = self.inner.lock().await;
        if generation != inner.generation {
            debug!(generation, current = inner.generation, "dropping stale transport event");
            return;
        }

        match event {
            TransportEvent::Qr(value) => {
                if !inner.awaiting_login() {
                    return;
                }
                inner.pending_challenge = Some(Challenge::Qr {
                    value: value.clone(),
                });
                self.transition(&mut inner, SessionState::AwaitingChallenge);
                self.bus.publish(SessionEvent::QrUpdated { value });
            }
            TransportEvent::Open { own_identity } => {
                if !inner.awaiting_login() {
                    return;
                }
                inner.reconnect_attempt = 0;
                inner.own_identity = own_identity;
                self.set_live(inner.transport.clone());
                self.transition(&mut inner, SessionState::Connected);
            }
            TransportEvent::Closed(reason) => {
                if inner.state.has_transport() {
                    self.handle_close(&mut inner, reason).await;
                }
            }
            TransportEvent::CredentialsUpdated(update) => {
                let credentials = inner.credentials.get_or_insert_with(CredentialSet::new);
                credentials.merge(update);
                let entries = credentials.len();
                match self.store.save(&self.session_id, credentials).await {
                    Ok(()) => {
                        debug!(entries, "credentials persisted");
                        self.bus.publish(SessionEvent::CredentialsPersisted { entries });
                    }
                    Err(e) => warn!(error = %e, "failed to persist credentials"),
                }
            }
        }
    }

    async fn on_reconnect_due(&self, generation: u64) {
        let mut inner = self.inner.lock().await;
        if generation != inner.generation || inner.state != SessionState::Disconnected {
            debug!(generation, "dropping stale reconnect timer");
            return;
        }
        self.transition(&mut inner, SessionState::Connecting);
        self.open_transport(&mut inner).await;
    }
}

async fn run_driver<C: TransportConnector, S: CredentialStore>(
    shared: Arc<Shared<C, S>>,
    mut events: mpsc::UnboundedReceiver<(u64, TransportEvent)>,
    mut timers: mpsc::UnboundedReceiver<u64>,
) {
    let shutdown = shared.shutdown.clone();
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            Some((generation, event)) = events.recv() => {
                shared.on_transport_event(generation, event).await;
            }
            Some(generation) = timers.recv() => {
                shared.on_reconnect_due(generation).await;
            }
            else => break,
        }
    }
    debug!("session driver stopped");
}
